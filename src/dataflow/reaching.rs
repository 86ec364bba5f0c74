//! Reaching definitions fixed point (spec §4.2 "Algorithm (worklist to fixed
//! point)"), plus the per-traversal bookkeeping (`latest_definitions`,
//! `variable_dependencies`, `control_dependencies`, `timestamp_influence`)
//! the same section's steps 4-7 describe.

use super::usedef::{self, UseDef};
use crate::cfg::{CfgId, CfgKind, ControlFlowGraph};
use std::collections::{HashMap, HashSet};

/// A reaching-definitions fact: variable name paired with the cfg_id of the
/// node that defines it.
pub type Fact = (String, CfgId);

/// Everything spec §3's "Reaching-definitions store" names, computed in one
/// pass (spec §4.2).
#[derive(Debug, Clone, Default)]
pub struct ReachingDefinitions {
    pub used_vars: HashMap<CfgId, HashSet<String>>,
    pub defined_vars: HashMap<CfgId, HashSet<String>>,
    pub in_sets: HashMap<CfgId, HashSet<Fact>>,
    pub out_sets: HashMap<CfgId, HashSet<Fact>>,
    pub latest_definitions: HashMap<String, CfgId>,
    pub variable_dependencies: HashMap<String, HashSet<(CfgId, CfgId)>>,
    pub statement_dependencies: HashMap<CfgId, HashSet<(CfgId, String)>>,
    pub control_dependencies: HashMap<CfgId, CfgId>,
    pub timestamp_influence: HashMap<CfgId, HashSet<String>>,
    pub node_to_function: HashMap<CfgId, String>,
    pub iterations: usize,
}

impl ReachingDefinitions {
    /// Runs the fixed point described in spec §4.2 to completion — the
    /// lattice is a finite subset lattice over `(name, cfg_id)` pairs, so
    /// convergence is guaranteed (spec §4.2 "Failure semantics").
    pub fn analyze(cfg: &ControlFlowGraph) -> Self {
        let order = cfg.metadata().ids_in_order().to_vec();

        let mut used_vars = HashMap::new();
        let mut defined_vars = HashMap::new();
        let mut node_to_function = HashMap::new();
        let mut timestamp_influence = HashMap::new();

        for id in &order {
            let node = cfg.metadata().get_node(id).expect("id came from metadata");
            let UseDef { used, defined } = usedef::extract(node);

            let ts: HashSet<String> = used.iter().filter(|n| usedef::is_timestamp_source(n)).cloned().collect();
            if !ts.is_empty() {
                timestamp_influence.insert(id.clone(), ts);
            }
            if let Some(function) = &node.function {
                node_to_function.insert(id.clone(), function.clone());
            }
            used_vars.insert(id.clone(), used);
            defined_vars.insert(id.clone(), defined);
        }

        let control_dependencies = compute_control_dependencies(cfg);

        let mut in_sets: HashMap<CfgId, HashSet<Fact>> = order.iter().map(|id| (id.clone(), HashSet::new())).collect();
        let mut out_sets: HashMap<CfgId, HashSet<Fact>> = order.iter().map(|id| (id.clone(), HashSet::new())).collect();

        let mut iterations = 0;
        loop {
            iterations += 1;
            let mut changed = false;

            for id in &order {
                let node = cfg.metadata().get_node(id).expect("id came from metadata");

                let mut new_in = HashSet::new();
                for pred in &node.prev_nodes {
                    if let Some(out) = out_sets.get(pred) {
                        new_in.extend(out.iter().cloned());
                    }
                }

                let defined = &defined_vars[id];
                let mut new_out: HashSet<Fact> =
                    new_in.iter().filter(|(v, _)| !defined.contains(v)).cloned().collect();
                new_out.extend(defined.iter().map(|v| (v.clone(), id.clone())));

                if new_in != in_sets[id] || new_out != out_sets[id] {
                    changed = true;
                }
                in_sets.insert(id.clone(), new_in);
                out_sets.insert(id.clone(), new_out);
            }

            if !changed {
                break;
            }
        }

        // Final deterministic traversal building `latest_definitions`,
        // `variable_dependencies` and `statement_dependencies` in CFG
        // iteration order (spec §4.2 steps 5-6; spec §5 "ordering fully
        // determined by CFG DFS order").
        let mut latest_definitions: HashMap<String, CfgId> = HashMap::new();
        let mut variable_dependencies: HashMap<String, HashSet<(CfgId, CfgId)>> = HashMap::new();
        let mut statement_dependencies: HashMap<CfgId, HashSet<(CfgId, String)>> = HashMap::new();

        for id in &order {
            for var in &used_vars[id] {
                if let Some(def) = latest_definitions.get(var) {
                    variable_dependencies
                        .entry(var.clone())
                        .or_default()
                        .insert((id.clone(), def.clone()));
                    statement_dependencies
                        .entry(id.clone())
                        .or_default()
                        .insert((def.clone(), var.clone()));
                }
            }
            for var in &defined_vars[id] {
                latest_definitions.insert(var.clone(), id.clone());
            }
        }

        Self {
            used_vars,
            defined_vars,
            in_sets,
            out_sets,
            latest_definitions,
            variable_dependencies,
            statement_dependencies,
            control_dependencies,
            timestamp_influence,
            node_to_function,
            iterations,
        }
    }
}

/// Spec §4.2 "Control dependence": visiting an `IfStatement`/`WhileStatement`
/// walks the branch(es) until the join, marking every visited node as
/// control-dependent on the branch. A `while`'s false exit leaves the loop
/// entirely and is not control-dependent on anything; only its body is.
fn compute_control_dependencies(cfg: &ControlFlowGraph) -> HashMap<CfgId, CfgId> {
    let mut out = HashMap::new();

    for id in cfg.metadata().ids_in_order() {
        let node = cfg.metadata().get_node(id).expect("id came from metadata");
        let Some((true_target, false_target)) = &node.branch_targets else {
            continue;
        };
        let join = node.join_target.as_ref();

        match node.kind {
            CfgKind::IfStatement => {
                mark_dependent_region(cfg, true_target, join, id, &mut out);
                mark_dependent_region(cfg, false_target, join, id, &mut out);
            }
            CfgKind::WhileStatement => {
                mark_dependent_region(cfg, true_target, join, id, &mut out);
            }
            _ => {}
        }
    }

    out
}

fn mark_dependent_region(
    cfg: &ControlFlowGraph,
    start: &CfgId,
    join: Option<&CfgId>,
    branch: &CfgId,
    out: &mut HashMap<CfgId, CfgId>,
) {
    if Some(start) == join {
        return;
    }
    let mut visited = HashSet::new();
    let mut stack = vec![start.clone()];
    while let Some(id) = stack.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        out.entry(id.clone()).or_insert_with(|| branch.clone());
        let Some(node) = cfg.metadata().get_node(&id) else {
            continue;
        };
        for next in &node.next_nodes {
            if Some(next) != join {
                stack.push(next.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::test_support::*;
    use crate::cfg::ControlFlowGraph;

    #[test]
    fn straight_line_def_reaches_later_use() {
        let contract = contract(
            "C",
            vec![],
            vec![function(
                "f",
                vec![
                    var_decl_statement("x", Some(literal("1"))),
                    expr_statement(assignment("y", identifier("x"))),
                ],
            )],
        );
        let cfg = ControlFlowGraph::build(&contract).unwrap();
        let rd = ReachingDefinitions::analyze(&cfg);

        let def_id = rd.latest_definitions.get("x").unwrap();
        assert!(rd.variable_dependencies["x"]
            .iter()
            .any(|(_, def)| def == def_id));
    }

    #[test]
    fn redefinition_kills_prior_reaching_fact() {
        let contract = contract(
            "C",
            vec![],
            vec![function(
                "f",
                vec![
                    var_decl_statement("x", Some(literal("1"))),
                    expr_statement(assignment("x", literal("2"))),
                    expr_statement(assignment("y", identifier("x"))),
                ],
            )],
        );
        let cfg = ControlFlowGraph::build(&contract).unwrap();
        let rd = ReachingDefinitions::analyze(&cfg);

        let use_node = cfg
            .metadata()
            .ids_in_order()
            .iter()
            .find(|id| {
                rd.used_vars
                    .get(*id)
                    .is_some_and(|u| u.contains("x"))
                    && rd.defined_vars.get(*id).is_some_and(|d| d.contains("y"))
            })
            .unwrap();
        let reaching: Vec<_> = rd.in_sets[use_node].iter().filter(|(v, _)| v == "x").collect();
        assert_eq!(reaching.len(), 1);
    }

    #[test]
    fn if_body_nodes_are_control_dependent_on_condition() {
        let contract = contract(
            "C",
            vec![],
            vec![function(
                "f",
                vec![if_stmt(
                    identifier("a"),
                    vec![expr_statement(assignment("a", literal("1")))],
                    vec![],
                )],
            )],
        );
        let cfg = ControlFlowGraph::build(&contract).unwrap();
        let rd = ReachingDefinitions::analyze(&cfg);
        let cond = cfg
            .metadata()
            .ids_in_order()
            .iter()
            .find(|id| id.as_str().starts_with("IfStatement"))
            .unwrap();
        let body = cfg
            .metadata()
            .ids_in_order()
            .iter()
            .find(|id| id.as_str().starts_with("Assignment"))
            .unwrap();
        assert_eq!(rd.control_dependencies.get(body), Some(cond));
    }

    #[test]
    fn timestamp_use_is_recorded() {
        let contract = contract(
            "C",
            vec![],
            vec![function(
                "f",
                vec![expr_statement(assignment(
                    "deadline",
                    member_access(identifier("block"), "timestamp"),
                ))],
            )],
        );
        let cfg = ControlFlowGraph::build(&contract).unwrap();
        let rd = ReachingDefinitions::analyze(&cfg);
        assert!(rd.timestamp_influence.values().any(|s| s.contains("block.timestamp")));
    }
}
