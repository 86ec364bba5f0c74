//! The AST-compiler external collaborator contract.

use super::AstNode;
use crate::error::AnalyzerError;
use std::collections::HashMap;
use std::path::Path;

/// Output of compiling a (rewritten) source file: the contract names found,
/// and the AST root for each. Mirrors spec §6's external collaborator
/// contract: `compile(source) -> {contracts: [name], ast(name) -> json}`.
#[derive(Debug, Clone, Default)]
pub struct CompiledAst {
    contracts: Vec<String>,
    roots: HashMap<String, AstNode>,
}

impl CompiledAst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_contract(&mut self, name: impl Into<String>, root: AstNode) {
        let name = name.into();
        self.contracts.push(name.clone());
        self.roots.insert(name, root);
    }

    pub fn contracts(&self) -> &[String] {
        &self.contracts
    }

    pub fn ast(&self, name: &str) -> Option<&AstNode> {
        self.roots.get(name)
    }

    /// The first contract compiled, used for the `./gen/ast.json` dump (spec §6).
    pub fn first(&self) -> Option<(&str, &AstNode)> {
        self.contracts
            .first()
            .map(|name| (name.as_str(), &self.roots[name]))
    }
}

/// The contract an AST-compiler collaborator must satisfy. Invoking the real
/// source-language compiler is explicitly out of scope (spec §1); callers
/// supply an implementation of this trait instead.
pub trait AstProvider {
    fn compile(&self, source: &str) -> Result<CompiledAst, AnalyzerError>;
}

/// Reads a pre-compiled AST dump from disk rather than invoking a compiler.
/// This is the shape a real deployment takes: an external step runs the
/// source-language compiler and writes its JSON output to the path this
/// provider is pointed at; `source` is ignored (it is only used for the
/// `CompileFailure` message on error, and to satisfy the trait's contract).
pub struct JsonFileAstProvider {
    path: std::path::PathBuf,
}

impl JsonFileAstProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl AstProvider for JsonFileAstProvider {
    fn compile(&self, _source: &str) -> Result<CompiledAst, AnalyzerError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| AnalyzerError::Io {
            path: self.path.clone(),
            source: e,
        })?;

        #[derive(serde::Deserialize)]
        struct Dump {
            contracts: Vec<(String, AstNode)>,
        }

        let dump: Dump = serde_json::from_str(&text).map_err(|e| AnalyzerError::CompileFailure {
            message: format!("could not parse AST dump {}: {e}", self.path.display()),
        })?;

        if dump.contracts.is_empty() {
            return Err(AnalyzerError::CompileFailure {
                message: "AST compiler reported zero contracts".to_string(),
            });
        }

        let mut compiled = CompiledAst::new();
        for (name, root) in dump.contracts {
            compiled.insert_contract(name, root);
        }
        Ok(compiled)
    }
}
