//! Pipeline orchestration (spec §2 "Pipeline"): rewrite → AST provider → CFG
//! build → reaching/TOD → collecting semantics → report artifacts.

use super::args::Cli;
use crate::ast::{AstProvider, JsonFileAstProvider};
use crate::cfg::{CfgKind, ControlFlowGraph};
use crate::config::AnalyzerConfig;
use crate::dataflow::{detect_tod, ReachingDefinitions};
use crate::domain::{DomainKind, Interval, IntervalState};
use crate::error::AnalyzerError;
use crate::registry::VariableRegistry;
use crate::report::{render_analysis_dump, render_reaching_dump, write_artifact, ReportWriter};
use crate::rewriter;
use crate::semantics::CollectingSemantics;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// Runs the full analysis pipeline for one invocation. Findings never affect
/// the return value's success (spec §6 "Exit code 0 on successful analysis:
/// findings do not affect exit code"); only pipeline failures do.
pub fn run(cli: &Cli) -> Result<(), AnalyzerError> {
    let config = AnalyzerConfig {
        domain: DomainKind::from(cli.domain),
        widening_threshold: cli.widening_threshold,
        iteration_cap: cli.iteration_cap,
        annotate_dependencies: cli.annotate_dependencies,
    };

    if config.domain != DomainKind::Interval {
        return Err(AnalyzerError::DomainLimitation {
            domain: config.domain.to_string(),
        });
    }

    if !cli.source.exists() {
        return Err(AnalyzerError::InputNotFound {
            path: cli.source.clone(),
        });
    }

    let mut report = ReportWriter::for_input(&cli.source)?;
    report.write_line(&format!("analyzing {}", cli.source.display()))?;

    let source = std::fs::read_to_string(&cli.source).map_err(|e| AnalyzerError::Io {
        path: cli.source.clone(),
        source: e,
    })?;

    info!("rewriting source idioms (spec §4.4)");
    let rewritten = rewriter::rewrite(&source);
    let mapping_origin = rewriter::mapping_origin_names(&source);

    // The AST compiler is an explicit external collaborator (spec §1, §6):
    // a real deployment invokes the source-language compiler ahead of time
    // and writes its JSON dump to `<basename>.ast.json` alongside the
    // source; this CLI reads that dump rather than compiling anything
    // itself.
    let ast_path = sibling_ast_path(&cli.source);
    let provider = JsonFileAstProvider::new(&ast_path);
    let compiled = provider.compile(&rewritten)?;
    let (contract_name, ast_root) = compiled.first().ok_or_else(|| AnalyzerError::CompileFailure {
        message: "AST compiler reported zero contracts".to_string(),
    })?;
    report.write_line(&format!("compiled contract '{contract_name}'"))?;

    dump_ast_json(ast_root)?;

    info!("building control flow graph (spec §4.1)");
    let cfg = ControlFlowGraph::build(ast_root)?;
    report.write_line(&format!("cfg built: {} nodes", cfg.metadata().len()))?;

    info!("running reaching-definitions fixed point (spec §4.2)");
    let reaching = ReachingDefinitions::analyze(&cfg);
    report.write_line(&format!(
        "reaching definitions converged after {} iterations",
        reaching.iterations
    ))?;

    let registry = build_registry(&cfg, &reaching);

    let tod_findings = detect_tod(&cfg, &reaching, &registry, &mapping_origin);
    report.write_line(&format!("tod findings: {}", tod_findings.len()))?;

    info!("running collecting-semantics fixed point (spec §4.3)");
    let initial = IntervalState::seeded(registry.constants());
    let semantics = CollectingSemantics::analyze(&cfg, &registry, &config, initial);
    if semantics.cancelled_by_cap {
        warn!(
            "collecting semantics hit the iteration cap ({}) before converging",
            config.iteration_cap
        );
        report.write_line(&format!(
            "WARNING: fixed point not reached within {} iterations (cancelled-by-cap)",
            config.iteration_cap
        ))?;
    } else {
        report.write_line(&format!("collecting semantics converged after {} iterations", semantics.iterations))?;
    }

    for (ret_id, bound) in sorted_return_bounds(&semantics.return_bounds) {
        report.write_line(&format!("return bound at {ret_id}: {}", format_bound(&bound)))?;
    }

    let order = cfg.metadata().ids_in_order().to_vec();
    let analysis_dump = render_analysis_dump(&registry, &order, &semantics.history);
    let analysis_path = write_artifact(&cli.source, "_analysis.txt", &analysis_dump)?;
    report.write_line(&format!("wrote {}", analysis_path.display()))?;

    let reaching_dump = render_reaching_dump(&order, &reaching, &tod_findings, config.annotate_dependencies);
    let reaching_path = reaching_sibling(&cli.source);
    std::fs::write(&reaching_path, &reaching_dump).map_err(|e| AnalyzerError::Io {
        path: reaching_path.clone(),
        source: e,
    })?;
    report.write_line(&format!("wrote {}", reaching_path.display()))?;

    Ok(())
}

fn format_bound(iv: &Interval) -> String {
    format!("[{}, {}]", iv.lo, iv.hi)
}

fn sorted_return_bounds(
    return_bounds: &std::collections::HashMap<crate::cfg::CfgId, Interval>,
) -> Vec<(crate::cfg::CfgId, Interval)> {
    let mut out: Vec<_> = return_bounds.iter().map(|(id, iv)| (id.clone(), *iv)).collect();
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

fn sibling_ast_path(source: &Path) -> std::path::PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    source
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{stem}.ast.json"))
}

fn reaching_sibling(source: &Path) -> std::path::PathBuf {
    source
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("reaching_definitions_output.txt")
}

/// Writes the raw AST of the first contract to `./gen/ast.json` (spec §6
/// "AST JSON dump... written once per run").
fn dump_ast_json(ast_root: &crate::ast::AstNode) -> Result<(), AnalyzerError> {
    let dir = Path::new("./gen");
    std::fs::create_dir_all(dir).map_err(|e| AnalyzerError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let path = dir.join("ast.json");
    let json = serde_json::to_string_pretty(ast_root).unwrap_or_default();
    std::fs::write(&path, json).map_err(|e| AnalyzerError::Io { path, source: e })
}

/// Registers every name the reaching-definitions pass saw used or defined,
/// flagging contract-level `VariableDeclaration`s as state variables (spec
/// §3 "Variable registry").
fn build_registry(cfg: &ControlFlowGraph, reaching: &ReachingDefinitions) -> VariableRegistry {
    let mut state_names: HashSet<String> = HashSet::new();
    for id in cfg.metadata().ids_in_order() {
        let node = cfg.metadata().get_node(id).expect("id came from metadata");
        if node.kind == CfgKind::VariableDeclaration {
            if let Some(expr) = &node.expr {
                if expr.state_variable == Some(true) {
                    if let Some(name) = &expr.name {
                        state_names.insert(name.clone());
                    }
                }
            }
        }
    }

    let mut names: Vec<&String> = reaching
        .used_vars
        .values()
        .chain(reaching.defined_vars.values())
        .flatten()
        .collect();
    names.sort();
    names.dedup();

    let mut registry = VariableRegistry::new();
    for name in names {
        registry.register(name, state_names.contains(name));
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::test_support::*;

    #[test]
    fn build_registry_flags_state_variables() {
        let contract = contract(
            "C",
            vec![var_decl("x", Some(literal("5")), true)],
            vec![function("f", vec![expr_statement(assignment("x", identifier("x")))])],
        );
        let cfg = ControlFlowGraph::build(&contract).unwrap();
        let reaching = ReachingDefinitions::analyze(&cfg);
        let registry = build_registry(&cfg, &reaching);
        let id = registry.id_of("x").unwrap();
        assert!(registry.is_state_variable(id));
    }
}
