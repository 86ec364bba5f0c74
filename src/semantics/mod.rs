//! Abstract collecting-semantics fixed-point engine (spec §4.3), generic over
//! any `AbstractDomain`.
//!
//! Shaped like `dataflow::ReachingDefinitions`'s worklist (same DFS order,
//! same round-and-test-fixed-point structure), generalized from a finite
//! subset lattice to a domain behind the `AbstractDomain` capability trait.

use crate::ast::AstKind;
use crate::cfg::{CfgId, CfgKind, ControlFlowGraph};
use crate::config::AnalyzerConfig;
use crate::domain::{lower, AbstractDomain, Interval};
use crate::registry::VariableRegistry;
use std::collections::{HashMap, HashSet};

/// A node's exit state: either a single state forwarded to every successor,
/// or one state per successor (spec §4.3 "produce two exit states, one per
/// successor").
#[derive(Debug, Clone)]
pub enum ExitState<D> {
    Uniform(D),
    PerSuccessor(HashMap<CfgId, D>),
}

impl<D: AbstractDomain> ExitState<D> {
    fn for_successor(&self, successor: &CfgId) -> D {
        match self {
            ExitState::Uniform(d) => d.clone(),
            ExitState::PerSuccessor(map) => map.get(successor).cloned().unwrap_or_else(D::bottom),
        }
    }

    /// Enumerates `(successor, value)` pairs for the `EXIT <iter> <cfg_id>
    /// <next> [...]` dump line (spec §6) — one line per real successor for a
    /// `Uniform` exit (same value repeated), one per branch for
    /// `PerSuccessor`. A sink node with no successors still needs a single
    /// line, so it reports `None`.
    pub fn entries(&self, next_nodes: &HashSet<CfgId>) -> Vec<(Option<CfgId>, D)> {
        match self {
            ExitState::Uniform(d) => {
                if next_nodes.is_empty() {
                    vec![(None, d.clone())]
                } else {
                    let mut ids: Vec<CfgId> = next_nodes.iter().cloned().collect();
                    ids.sort();
                    ids.into_iter().map(|id| (Some(id), d.clone())).collect()
                }
            }
            ExitState::PerSuccessor(map) => {
                let mut entries: Vec<(Option<CfgId>, D)> =
                    map.iter().map(|(k, v)| (Some(k.clone()), v.clone())).collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                entries
            }
        }
    }
}

/// One round's entry/exit snapshot, kept only for the `<basename>_analysis.txt`
/// dump (spec §6) — the live analysis itself never reads `history`, so the
/// O(|V| × iterations) cost spec §5 budgets is paid by the report writer, not
/// the fixed-point loop.
#[derive(Debug, Clone)]
pub struct IterationSnapshot<D> {
    pub entry: HashMap<CfgId, D>,
    pub exit: HashMap<CfgId, ExitState<D>>,
}

/// Per-node entry/exit tables plus the bookkeeping spec §8 scenario F and §6
/// report artifacts need (`Return` bounds, iteration count, cap status).
pub struct CollectingSemantics<D: AbstractDomain> {
    pub entry: HashMap<CfgId, D>,
    pub exit: HashMap<CfgId, ExitState<D>>,
    /// The evaluated bound at each `Return` node, computed against its entry
    /// state (spec §8 scenario F); kept alongside the identity exit rather
    /// than replacing it, since a return does not otherwise alter the state.
    pub return_bounds: HashMap<CfgId, Interval>,
    pub iterations: usize,
    /// Set when the iteration cap was hit before convergence (spec §7
    /// `FixedPointCap`: not an error, a "cancelled-by-cap" marker with the
    /// last computed state retained).
    pub cancelled_by_cap: bool,
    /// One entry per completed round, 1-indexed by position (`history[0]` is
    /// iteration 1) — feeds the `ENTRY`/`EXIT` lines of the analysis dump.
    pub history: Vec<IterationSnapshot<D>>,
}

impl<D: AbstractDomain> CollectingSemantics<D> {
    /// Runs the fixed point described in spec §4.3 to completion (or to the
    /// configured cap). `initial` seeds the start node's entry with the
    /// driver-supplied constants (spec §4.3 "the top element constrained
    /// only by driver-supplied constants in the constant registry").
    pub fn analyze(
        cfg: &ControlFlowGraph,
        registry: &VariableRegistry,
        config: &AnalyzerConfig,
        initial: D,
    ) -> Self {
        let order = cfg.metadata().ids_in_order().to_vec();

        let mut entry: HashMap<CfgId, D> =
            order.iter().map(|id| (id.clone(), D::bottom())).collect();
        entry.insert(cfg.entry.clone(), initial);

        let mut exit: HashMap<CfgId, ExitState<D>> =
            order.iter().map(|id| (id.clone(), ExitState::Uniform(D::bottom()))).collect();

        // Running join of every state computed so far, standing in for "the
        // registry's last known bound" a `FunctionDefinition` scope reset
        // reinjects for a state variable that would otherwise drop to top
        // (spec §4.3 "reinject its last known bound from the registry").
        let mut running_join = D::bottom();
        let mut return_bounds = HashMap::new();
        let mut history = Vec::new();

        let mut iterations = 0;
        let mut cancelled_by_cap = false;

        loop {
            iterations += 1;
            let mut changed = false;

            for id in &order {
                let node = cfg.metadata().get_node(id).expect("id came from metadata");

                let mut entry_raw = D::bottom();
                if id == &cfg.entry {
                    entry_raw = entry_raw.join(&entry[id]);
                }
                for pred in &node.prev_nodes {
                    let pred_exit = exit.get(pred).map(|e| e.for_successor(id)).unwrap_or_else(D::bottom);
                    entry_raw = entry_raw.join(&pred_exit);
                }

                let entry_raw = if node.kind == CfgKind::FunctionDefinition {
                    entry_raw.scope_reset(registry, &running_join)
                } else {
                    entry_raw
                };

                // Monotone accumulation (spec §8 invariant 3): round i+1's
                // entry never drops information a prior round established.
                // At a `WhileJoin` node past the widening threshold, widen
                // instead of join to force termination on domains with
                // infinite ascending chains (spec §4.3 "Widening").
                let prev = entry[id].clone();
                let entry_new = if node.kind == CfgKind::WhileJoin && iterations > config.widening_threshold {
                    prev.widen(&entry_raw)
                } else {
                    prev.join(&entry_raw)
                };

                if !entry_new.is_equal(&prev) {
                    changed = true;
                }
                entry.insert(id.clone(), entry_new.clone());
                running_join = running_join.join(&entry_new);

                let node_exit = compute_exit(node.kind, node.expr.as_ref(), node.branch_targets.as_ref(), &entry_new, registry);
                if node.kind == CfgKind::Return {
                    if let Some(expr) = node.expr.as_ref().and_then(|e| e.expression.as_deref()) {
                        return_bounds.insert(id.clone(), entry_new.get_bound(&lower(expr, registry)));
                    }
                }
                exit.insert(id.clone(), node_exit);
            }

            history.push(IterationSnapshot {
                entry: entry.clone(),
                exit: exit.clone(),
            });

            if !changed {
                break;
            }
            if iterations >= config.iteration_cap {
                cancelled_by_cap = true;
                break;
            }
        }

        Self {
            entry,
            exit,
            return_bounds,
            iterations,
            cancelled_by_cap,
            history,
        }
    }
}

/// Spec §4.3 step 1.b: dispatch on node kind to compute `exit[n, i]`.
fn compute_exit<D: AbstractDomain>(
    kind: CfgKind,
    expr: Option<&crate::ast::AstNode>,
    branch_targets: Option<&(CfgId, CfgId)>,
    entry: &D,
    registry: &VariableRegistry,
) -> ExitState<D> {
    match kind {
        CfgKind::IfStatement | CfgKind::WhileStatement => {
            let Some(expr) = expr else {
                return ExitState::Uniform(entry.clone());
            };
            let Some((true_target, false_target)) = branch_targets else {
                return ExitState::Uniform(entry.clone());
            };
            let lowered = lower(expr, registry);
            let mut map = HashMap::new();
            map.insert(true_target.clone(), entry.narrow(&lowered, true));
            map.insert(false_target.clone(), entry.narrow(&lowered, false));
            ExitState::PerSuccessor(map)
        }
        _ => {
            if let Some((lhs_name, rhs)) = assignment_target(kind, expr) {
                match registry.id_of(lhs_name) {
                    Some(id) => ExitState::Uniform(entry.assign(id, &lower(rhs, registry))),
                    None => ExitState::Uniform(entry.clone()),
                }
            } else {
                ExitState::Uniform(entry.clone())
            }
        }
    }
}

/// Spec §4.3 step 1.b: `VariableDeclaration[Statement]`, `Assignment`,
/// `ExpressionStatement` wrapping an assignment all evaluate an RHS against a
/// named LHS dimension.
fn assignment_target<'a>(kind: CfgKind, expr: Option<&'a crate::ast::AstNode>) -> Option<(&'a str, &'a crate::ast::AstNode)> {
    let expr = expr?;
    match kind {
        CfgKind::VariableDeclaration | CfgKind::VariableDeclarationStatement => {
            Some((expr.name.as_deref()?, expr.right.as_deref()?))
        }
        CfgKind::Assignment => Some((expr.left.as_deref()?.name.as_deref()?, expr.right.as_deref()?)),
        CfgKind::ExpressionStatement => {
            let inner = expr.expression.as_deref()?;
            if inner.kind != AstKind::Assignment {
                return None;
            }
            Some((inner.left.as_deref()?.name.as_deref()?, inner.right.as_deref()?))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::test_support::*;
    use crate::domain::{Interval, IntervalState};

    fn registry_with(names: &[(&str, bool)]) -> VariableRegistry {
        let mut r = VariableRegistry::new();
        for (name, is_state) in names {
            r.register(name, *is_state);
        }
        r
    }

    #[test]
    fn straight_line_assignment_narrows_to_a_point() {
        // scenario A: `x = 5; function f() { x = x + 1; }`
        let contract = contract(
            "C",
            vec![var_decl("x", Some(literal("5")), true)],
            vec![function("f", vec![expr_statement(assignment("x", binary_op("+", identifier("x"), literal("1"))))])],
        );
        let cfg = ControlFlowGraph::build(&contract).unwrap();
        let registry = registry_with(&[("x", true)]);
        let x = registry.id_of("x").unwrap();

        let initial = IntervalState::seeded([(x, Interval::point(5))]);
        let config = AnalyzerConfig::default();
        let result = CollectingSemantics::analyze(&cfg, &registry, &config, initial);

        let fn_exit = cfg
            .metadata()
            .ids_in_order()
            .iter()
            .find(|id| id.as_str().starts_with("FunctionExit"))
            .unwrap();
        assert_eq!(result.entry[fn_exit].get(x), Interval::point(6));
    }

    #[test]
    fn if_join_narrows_both_branches_before_merging() {
        // scenario B: `if (a < 10) { a = a + 1 } else { a = a - 1 }`, a ∈ [10,10]
        let contract = contract(
            "C",
            vec![],
            vec![function(
                "g",
                vec![if_stmt(
                    binary_op("<", identifier("a"), literal("10")),
                    vec![expr_statement(assignment("a", binary_op("+", identifier("a"), literal("1"))))],
                    vec![expr_statement(assignment("a", binary_op("-", identifier("a"), literal("1"))))],
                )],
            )],
        );
        let cfg = ControlFlowGraph::build(&contract).unwrap();
        let registry = registry_with(&[("a", false)]);
        let a = registry.id_of("a").unwrap();

        let initial = IntervalState::seeded([(a, Interval::point(10))]);
        let config = AnalyzerConfig::default();
        let result = CollectingSemantics::analyze(&cfg, &registry, &config, initial);

        let join = cfg
            .metadata()
            .ids_in_order()
            .iter()
            .find(|id| id.as_str().starts_with("IfConditionJoin"))
            .unwrap();
        assert_eq!(result.entry[join].get(a), Interval::point(9));
    }

    #[test]
    fn return_bound_is_recorded_for_the_return_node() {
        // scenario F: `return a + b;` with a ∈ [10,10], b ∈ [2,2]
        let contract = contract(
            "C",
            vec![],
            vec![function("h", vec![return_stmt(Some(binary_op("+", identifier("a"), identifier("b"))))])],
        );
        let cfg = ControlFlowGraph::build(&contract).unwrap();
        let registry = registry_with(&[("a", false), ("b", false)]);
        let (a, b) = (registry.id_of("a").unwrap(), registry.id_of("b").unwrap());

        let initial = IntervalState::seeded([(a, Interval::point(10)), (b, Interval::point(2))]);
        let config = AnalyzerConfig::default();
        let result = CollectingSemantics::analyze(&cfg, &registry, &config, initial);

        let ret = cfg
            .metadata()
            .ids_in_order()
            .iter()
            .find(|id| id.as_str().starts_with("Return"))
            .unwrap();
        assert_eq!(result.return_bounds[ret], Interval::point(12));
    }

    #[test]
    fn while_loop_reaches_a_fixed_point_without_widening() {
        // scenario C: `while (i < 3) { i = i + 1 }`, i ∈ [0,0], widening disabled
        // (iteration cap high enough that the bounded interval converges on
        // its own, per spec §4.3 "if the selected domain does not require
        // widening ... it may be disabled").
        let contract = contract(
            "C",
            vec![],
            vec![function(
                "loop",
                vec![while_stmt(
                    binary_op("<", identifier("i"), literal("3")),
                    vec![expr_statement(assignment("i", binary_op("+", identifier("i"), literal("1"))))],
                )],
            )],
        );
        let cfg = ControlFlowGraph::build(&contract).unwrap();
        let registry = registry_with(&[("i", false)]);
        let i = registry.id_of("i").unwrap();

        let initial = IntervalState::seeded([(i, Interval::point(0))]);
        let config = AnalyzerConfig {
            widening_threshold: usize::MAX,
            ..AnalyzerConfig::default()
        };
        let result = CollectingSemantics::analyze(&cfg, &registry, &config, initial);

        let while_join = cfg
            .metadata()
            .ids_in_order()
            .iter()
            .find(|id| id.as_str().starts_with("WhileJoin"))
            .unwrap();
        assert_eq!(result.entry[while_join].get(i), Interval::range(0, 3));
        assert!(!result.cancelled_by_cap);
    }
}
