//! Renders `reaching_definitions_output.txt` (spec §4.2's output section):
//! per-node used/defined variables, statement/control dependencies,
//! optional per-variable dependency chains, and the TOD summary.

use crate::cfg::CfgId;
use crate::dataflow::{render_chains, ReachingDefinitions, TodFinding, TodKind};

pub fn render_reaching_dump(
    order: &[CfgId],
    reaching: &ReachingDefinitions,
    tod_findings: &[TodFinding],
    annotate_dependencies: bool,
) -> String {
    let mut out = String::new();

    out.push_str("=== Used / Defined ===\n");
    for id in order {
        let used = reaching.used_vars.get(id).cloned().unwrap_or_default();
        let defined = reaching.defined_vars.get(id).cloned().unwrap_or_default();
        if used.is_empty() && defined.is_empty() {
            continue;
        }
        let mut used_sorted: Vec<&String> = used.iter().collect();
        used_sorted.sort();
        let mut defined_sorted: Vec<&String> = defined.iter().collect();
        defined_sorted.sort();
        let function = reaching.node_to_function.get(id).map(String::as_str).unwrap_or("-");
        out.push_str(&format!(
            "{id} ({function}): used={used_sorted:?} defined={defined_sorted:?}\n"
        ));
    }

    out.push_str("\n=== Control Dependencies ===\n");
    let mut cd: Vec<(&CfgId, &CfgId)> = reaching.control_dependencies.iter().collect();
    cd.sort();
    for (child, branch) in cd {
        out.push_str(&format!("{child} depends on {branch}\n"));
    }

    if annotate_dependencies {
        out.push_str("\n=== Dependency Chains ===\n");
        let chains = render_chains(&reaching.variable_dependencies);
        let mut vars: Vec<&String> = chains.keys().collect();
        vars.sort();
        for var in vars {
            let chain: Vec<String> = chains[var].iter().map(|id| id.to_string()).collect();
            out.push_str(&format!("{var}: {}\n", chain.join(" -> ")));
        }
    }

    out.push_str("\n=== Timestamp Influence ===\n");
    let mut ts: Vec<(&CfgId, &std::collections::HashSet<String>)> = reaching.timestamp_influence.iter().collect();
    ts.sort_by(|a, b| a.0.cmp(b.0));
    for (id, sources) in ts {
        let mut sorted: Vec<&String> = sources.iter().collect();
        sorted.sort();
        out.push_str(&format!("{id}: {sorted:?}\n"));
    }

    out.push_str("\n=== TOD Findings ===\n");
    for finding in tod_findings {
        let kind = match finding.kind {
            TodKind::Tod => "TOD",
            TodKind::IntraTod => "INTRA-TOD",
        };
        out.push_str(&format!(
            "{}: defined in {} ({}), used in {} ({}) [{}]\n",
            finding.variable, finding.def_cfg_id, finding.def_function, finding.use_cfg_id, finding.use_function, kind
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::ReachingDefinitions;

    #[test]
    fn tod_section_renders_canonical_line_shape() {
        let reaching = ReachingDefinitions::default();
        let findings = vec![TodFinding {
            variable: "owner".to_string(),
            def_cfg_id: CfgId("Assignment_0".to_string()),
            def_function: "setOwner".to_string(),
            use_cfg_id: CfgId("FunctionCall_1".to_string()),
            use_function: "withdraw".to_string(),
            kind: TodKind::Tod,
        }];
        let out = render_reaching_dump(&[], &reaching, &findings, false);
        assert!(out.contains("owner: defined in Assignment_0 (setOwner), used in FunctionCall_1 (withdraw) [TOD]"));
    }
}
