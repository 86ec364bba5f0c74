//! Analyzer configuration (spec §4.3 parameterization, §6 CLI surface).

use crate::domain::DomainKind;

/// Knobs the collecting-semantics engine and CLI need. Built straight from
/// parsed CLI args; no file-based config, since spec §6 names none.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub domain: DomainKind,
    /// Iteration count past which widening is applied at `WhileJoin` nodes
    /// (spec §4.3 "a configurable threshold (default 3)").
    pub widening_threshold: usize,
    /// Hard cap on fixed-point rounds before the engine gives up and reports
    /// `cancelled-by-cap` (spec §7 `FixedPointCap`).
    pub iteration_cap: usize,
    /// Whether the reaching-definitions report includes per-variable
    /// dependency chains (spec §6 `--annotate-dependencies`).
    pub annotate_dependencies: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            domain: DomainKind::Interval,
            widening_threshold: 3,
            iteration_cap: 10_000,
            annotate_dependencies: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.widening_threshold, 3);
        assert!(!config.annotate_dependencies);
    }
}
