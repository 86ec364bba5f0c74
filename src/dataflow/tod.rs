//! Transaction-ordering-dependence detection (spec §4.2 "TOD detection").

use super::reaching::ReachingDefinitions;
use crate::ast::{AstKind, AstNode};
use crate::cfg::{CfgId, CfgKind, ControlFlowGraph};
use crate::registry::VariableRegistry;
use std::collections::{HashSet, VecDeque};

/// Bounds the forward scan spec §4.2 describes as "successors (before the
/// next join)" — large enough for the short guard/transfer idioms this
/// analyzer's source rewriter produces, small enough to keep the scan O(1)
/// per use site rather than unbounded graph traversal.
const SENSITIVITY_SCAN_LIMIT: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodKind {
    /// Definition and use are in different functions.
    Tod,
    /// Definition and use are in the same function.
    IntraTod,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodFinding {
    pub variable: String,
    pub def_cfg_id: CfgId,
    pub def_function: String,
    pub use_cfg_id: CfgId,
    pub use_function: String,
    pub kind: TodKind,
}

/// Names send/call/transfer idioms the source rewriter (spec §4.4) turns
/// into a `BAL` guard/decrement; a node whose subtree still contains one of
/// these (unrecognized idiom, or TOD run against un-rewritten source) or
/// whose statement decrements `BAL` is "control-or-transfer sensitive"
/// (spec §4.2).
const TRANSFER_MEMBERS: [&str; 3] = ["call", "send", "transfer"];
const GUARD_CALLS: [&str; 2] = ["require", "assert"];

/// Computes the state-influenced variable set and emits TOD findings over
/// the whole CFG (spec §4.2 "TOD detection").
///
/// `mapping_origin` is the set of variable names the source rewriter
/// scalarized from a `mapping` declaration (spec §4.4) — excluded per spec's
/// filter ("variables classified as mapping-origin scalars are excluded").
pub fn detect(
    cfg: &ControlFlowGraph,
    reaching: &ReachingDefinitions,
    registry: &VariableRegistry,
    mapping_origin: &HashSet<String>,
) -> Vec<TodFinding> {
    let state_influenced = state_influenced_closure(reaching, registry);
    let mut findings = Vec::new();

    for use_id in cfg.metadata().ids_in_order() {
        let Some(used) = reaching.used_vars.get(use_id) else {
            continue;
        };
        for var in used {
            if !state_influenced.contains(var) || mapping_origin.contains(var) {
                continue;
            }
            if reaching
                .timestamp_influence
                .get(use_id)
                .is_some_and(|ts| ts.contains(var))
            {
                continue;
            }
            if !is_sensitive_use(cfg, use_id) {
                continue;
            }

            for (name, def_id) in reaching.in_sets.get(use_id).into_iter().flatten() {
                if name != var {
                    continue;
                }
                let def_function = reaching.node_to_function.get(def_id).cloned().unwrap_or_default();
                let use_function = reaching.node_to_function.get(use_id).cloned().unwrap_or_default();
                let kind = if def_function == use_function {
                    TodKind::IntraTod
                } else {
                    TodKind::Tod
                };
                findings.push(TodFinding {
                    variable: var.clone(),
                    def_cfg_id: def_id.clone(),
                    def_function,
                    use_cfg_id: use_id.clone(),
                    use_function,
                    kind,
                });
            }
        }
    }

    findings.sort_by(|a, b| {
        (&a.variable, &a.def_cfg_id, &a.use_cfg_id).cmp(&(&b.variable, &b.def_cfg_id, &b.use_cfg_id))
    });
    findings.dedup();
    findings
}

/// Spec §4.2, "Between iterations 1 and 2, promote transitively
/// state-influenced locals: if a local is defined using a state variable,
/// mark it as state-influenced". Iterates to closure since a chain of
/// locals can each depend on the previous one.
fn state_influenced_closure(reaching: &ReachingDefinitions, registry: &VariableRegistry) -> HashSet<String> {
    let mut influenced: HashSet<String> = (0..registry.len() as u32)
        .filter(|&id| registry.is_state_variable(id))
        .filter_map(|id| registry.get_by_id(id).map(|r| r.name.clone()))
        .collect();

    loop {
        let mut grew = false;
        for (id, defined) in &reaching.defined_vars {
            let used = reaching.used_vars.get(id).cloned().unwrap_or_default();
            if used.iter().any(|v| influenced.contains(v)) {
                for d in defined {
                    if influenced.insert(d.clone()) {
                        grew = true;
                    }
                }
            }
        }
        if !grew {
            break;
        }
    }

    influenced
}

fn is_sensitive_use(cfg: &ControlFlowGraph, id: &CfgId) -> bool {
    let node = cfg.metadata().get_node(id).expect("id came from metadata");
    if let Some(expr) = &node.expr {
        if contains_transfer_call(expr) || is_bal_decrement(expr) {
            return true;
        }
        if is_guard_call(expr) {
            return scan_forward_for_transfer(cfg, id);
        }
    }
    false
}

/// Spec §4.2: "a `require`/`assert` whose successors (before the next join)
/// contain such a call". Walks forward from `start`, stopping at the next
/// synthetic join/exit node.
fn scan_forward_for_transfer(cfg: &ControlFlowGraph, start: &CfgId) -> bool {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([start.clone()]);
    while let Some(id) = queue.pop_front() {
        if visited.len() >= SENSITIVITY_SCAN_LIMIT || !visited.insert(id.clone()) {
            continue;
        }
        let Some(node) = cfg.metadata().get_node(&id) else {
            continue;
        };
        if matches!(
            node.kind,
            CfgKind::IfConditionJoin | CfgKind::WhileJoin | CfgKind::FunctionExit | CfgKind::SourceExit
        ) {
            continue;
        }
        if id != *start {
            if let Some(expr) = &node.expr {
                if contains_transfer_call(expr) || is_bal_decrement(expr) {
                    return true;
                }
            }
        }
        for next in &node.next_nodes {
            queue.push_back(next.clone());
        }
    }
    false
}

fn is_bal_decrement(expr: &AstNode) -> bool {
    matches!(expr.kind, AstKind::Assignment)
        && expr.left.as_deref().and_then(|l| l.name.as_deref()) == Some("BAL")
}

fn is_guard_call(expr: &AstNode) -> bool {
    let target = match expr.kind {
        AstKind::ExpressionStatement => expr.expression.as_deref(),
        _ => Some(expr),
    };
    target.is_some_and(|call| {
        call.kind == AstKind::FunctionCall
            && call.base.as_deref().and_then(|b| b.name.as_deref()).is_some_and(|n| GUARD_CALLS.contains(&n))
    })
}

fn contains_transfer_call(expr: &AstNode) -> bool {
    if expr.kind == AstKind::FunctionCall {
        if let Some(base) = expr.base.as_deref() {
            if base.kind == AstKind::MemberAccess && base.name.as_deref().is_some_and(|n| TRANSFER_MEMBERS.contains(&n)) {
                return true;
            }
        }
        if expr.arguments.iter().any(contains_transfer_call) {
            return true;
        }
    }
    for child in [
        expr.left.as_deref(),
        expr.right.as_deref(),
        expr.operand.as_deref(),
        expr.condition.as_deref(),
        expr.base.as_deref(),
        expr.expression.as_deref(),
    ]
    .into_iter()
    .flatten()
    {
        if contains_transfer_call(child) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::test_support::*;

    fn member_call(base: &str, member: &str, arg: AstNode) -> AstNode {
        call(member_access(identifier(base), member), vec![arg])
    }

    #[test]
    fn inter_function_tod_found_when_use_is_transfer_sensitive() {
        let contract = contract(
            "C",
            vec![var_decl("owner", Some(literal("1")), true)],
            vec![
                function("setOwner", vec![expr_statement(assignment("owner", literal("2")))]),
                function(
                    "withdraw",
                    vec![
                        expr_statement(call(
                            identifier("require"),
                            vec![binary_op("==", identifier("owner"), identifier("msg.sender"))],
                        )),
                        expr_statement(member_call("msg.sender", "transfer", literal("1"))),
                    ],
                ),
            ],
        );
        let cfg = ControlFlowGraph::build(&contract).unwrap();
        let reaching = ReachingDefinitions::analyze(&cfg);
        let registry = {
            let mut r = VariableRegistry::new();
            r.register("owner", true);
            r
        };

        let findings = detect(&cfg, &reaching, &registry, &HashSet::new());
        let owner_finding = findings
            .iter()
            .find(|f| f.variable == "owner")
            .expect("require followed by a transfer call is transfer-sensitive");
        assert_eq!(owner_finding.kind, TodKind::Tod);
        assert_eq!(owner_finding.def_function, "setOwner");
        assert_eq!(owner_finding.use_function, "withdraw");
    }

    #[test]
    fn require_without_following_transfer_is_not_sensitive() {
        let contract = contract(
            "C",
            vec![var_decl("owner", Some(literal("1")), true)],
            vec![
                function("setOwner", vec![expr_statement(assignment("owner", literal("2")))]),
                function(
                    "withdraw",
                    vec![expr_statement(call(
                        identifier("require"),
                        vec![binary_op("==", identifier("owner"), identifier("msg.sender"))],
                    ))],
                ),
            ],
        );
        let cfg = ControlFlowGraph::build(&contract).unwrap();
        let reaching = ReachingDefinitions::analyze(&cfg);
        let registry = {
            let mut r = VariableRegistry::new();
            r.register("owner", true);
            r
        };

        let findings = detect(&cfg, &reaching, &registry, &HashSet::new());
        assert!(findings.iter().all(|f| f.variable != "owner"));
    }

    #[test]
    fn mapping_origin_variable_is_excluded() {
        let contract = contract(
            "C",
            vec![var_decl("balances", Some(literal("40")), true)],
            vec![function(
                "pay",
                vec![expr_statement(call(
                    member_access(identifier("msg.sender"), "transfer"),
                    vec![identifier("balances")],
                ))],
            )],
        );
        let cfg = ControlFlowGraph::build(&contract).unwrap();
        let reaching = ReachingDefinitions::analyze(&cfg);
        let mut registry = VariableRegistry::new();
        registry.register("balances", true);

        let mapping_origin = HashSet::from(["balances".to_string()]);
        let findings = detect(&cfg, &reaching, &registry, &mapping_origin);
        assert!(findings.iter().all(|f| f.variable != "balances"));
    }

    #[test]
    fn timestamp_influenced_use_is_excluded_from_tod() {
        let contract = contract(
            "C",
            vec![var_decl("deadline", Some(literal("1")), true)],
            vec![function(
                "check",
                vec![expr_statement(call(
                    member_access(identifier("recipient"), "transfer"),
                    vec![binary_op(
                        "-",
                        member_access(identifier("block"), "timestamp"),
                        identifier("deadline"),
                    )],
                ))],
            )],
        );
        let cfg = ControlFlowGraph::build(&contract).unwrap();
        let reaching = ReachingDefinitions::analyze(&cfg);
        let mut registry = VariableRegistry::new();
        registry.register("deadline", true);

        let findings = detect(&cfg, &reaching, &registry, &HashSet::new());
        assert!(findings.iter().all(|f| f.variable != "deadline"));
    }
}
