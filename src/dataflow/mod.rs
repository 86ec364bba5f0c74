//! Data-flow analyses over a built `ControlFlowGraph` (spec §4.2).

pub mod dependency;
pub mod reaching;
pub mod tod;
pub mod usedef;

pub use dependency::{render_chains, DependencyGraph};
pub use reaching::{Fact, ReachingDefinitions};
pub use tod::{detect as detect_tod, TodFinding, TodKind};
pub use usedef::UseDef;
