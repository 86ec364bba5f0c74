//! Domain error types for the analyzer.
//!
//! Mirrors the error kinds enumerated in the error-handling design: most are
//! recoverable (the pipeline logs a warning and degrades gracefully), a few are
//! fatal for the whole run. `main` converts the fatal ones into a process exit
//! code; recoverable ones never leave the module that produced them as an `Err` —
//! they are recorded as warnings on the analysis report instead.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can terminate a run (as opposed to being recorded as warnings).
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// The source file named on the command line does not exist.
    #[error("input not found: {path}")]
    InputNotFound { path: PathBuf },

    /// The AST compiler collaborator failed, or reported zero contracts.
    #[error("compile failure: {message}")]
    CompileFailure { message: String },

    /// A required AST child was missing (e.g. an `IfStatement` with no condition).
    #[error("malformed ast in {context}: {message}")]
    MalformedAst { context: String, message: String },

    /// The requested abstract domain has no implementation; the numeric-domain
    /// library that would back it is an external collaborator.
    #[error("domain limitation: {domain} cannot represent this analysis")]
    DomainLimitation { domain: String },

    /// The fixed-point loop hit its iteration cap before converging.
    #[error("fixed point not reached within {cap} iterations (cancelled-by-cap)")]
    FixedPointCap { cap: usize },

    /// Failure to write a report artifact.
    #[error("io error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Non-fatal issues recorded during analysis, surfaced in the combined log and
/// attached to the analysis report rather than aborting the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// An expression referenced a name never registered in the variable registry;
    /// the subexpression was downgraded to `Bottom`.
    UnregisteredVariable { name: String, cfg_id: String },

    /// A malformed node was skipped rather than aborting the fixed point.
    MalformedNodeSkipped { cfg_id: String, reason: String },

    /// An unrecognized rewriter idiom was left unchanged.
    UnknownIdiom { snippet: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnregisteredVariable { name, cfg_id } => {
                write!(f, "unregistered variable '{name}' used at {cfg_id}")
            }
            Warning::MalformedNodeSkipped { cfg_id, reason } => {
                write!(f, "skipped malformed node {cfg_id}: {reason}")
            }
            Warning::UnknownIdiom { snippet } => {
                write!(f, "rewriter left unrecognized idiom unchanged: {snippet}")
            }
        }
    }
}
