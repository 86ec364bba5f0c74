//! CLI argument surface (spec §6: `analyzer <source-file-path>
//! [--annotate-dependencies]`), following `iepathos-debtmap/src/cli/
//! args.rs`'s derive shape.

use crate::domain::DomainKind;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "analyzer", about = "Static-analysis core for a smart-contract security analyzer")]
pub struct Cli {
    /// Path to the contract source file to analyze.
    pub source: PathBuf,

    /// Include per-variable dependency chains in the reaching-definitions
    /// report (spec §6).
    #[arg(long)]
    pub annotate_dependencies: bool,

    /// Numeric abstract domain for the collecting-semantics engine (spec
    /// §4.3). Only `interval` has a working implementation; the others
    /// report `DomainLimitation` (spec §7).
    #[arg(long, value_enum, default_value = "interval")]
    pub domain: DomainArg,

    /// Iteration count past which widening is applied at `WhileJoin` nodes
    /// (spec §4.3, default 3).
    #[arg(long, default_value_t = 3)]
    pub widening_threshold: usize,

    /// Hard cap on fixed-point rounds before the engine reports
    /// `cancelled-by-cap` (spec §7 `FixedPointCap`).
    #[arg(long, default_value_t = 10_000)]
    pub iteration_cap: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DomainArg {
    Interval,
    Octagon,
    Polyhedra,
}

impl From<DomainArg> for DomainKind {
    fn from(value: DomainArg) -> Self {
        match value {
            DomainArg::Interval => DomainKind::Interval,
            DomainArg::Octagon => DomainKind::Octagon,
            DomainArg::Polyhedra => DomainKind::Polyhedra,
        }
    }
}
