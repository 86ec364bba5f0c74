//! Static-analysis core for a smart-contract security analyzer: control flow
//! graph construction, reaching-definitions / transaction-ordering-dependence
//! detection, an abstract collecting-semantics fixed-point engine, and a
//! source-to-source rewriter that normalizes value-transfer idioms ahead of
//! analysis.

pub mod ast;
pub mod cfg;
pub mod cli;
pub mod config;
pub mod dataflow;
pub mod domain;
pub mod error;
pub mod observability;
pub mod registry;
pub mod report;
pub mod rewriter;
pub mod semantics;
