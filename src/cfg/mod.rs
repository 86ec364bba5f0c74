//! Control flow graph construction over a contract's AST (spec §4.1).

mod builder;
mod types;

pub use builder::ControlFlowGraph;
pub use types::{CfgId, CfgKind, CfgMetadata, CfgNode};
