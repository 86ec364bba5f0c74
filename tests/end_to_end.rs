//! Drives the `analyzer` binary end to end against hand-built AST fixtures
//! standing in for the external compiler (spec §6's "precompiled AST JSON
//! dump" contract), covering the CLI-observable slice of spec §8's
//! scenarios. The driver-constant scenarios (B, F) are exercised as unit
//! tests in `semantics::tests` instead, since this CLI has no surface for
//! supplying driver constants (only variables the program itself defines).

use assert_cmd::Command;
use contract_flow_analyzer::ast::test_support::*;
use contract_flow_analyzer::ast::AstNode;
use std::fs;
use std::path::Path;

fn write_fixture(dir: &Path, stem: &str, contract_name: &str, root: &AstNode) -> std::path::PathBuf {
    let source_path = dir.join(format!("{stem}.sol"));
    fs::write(&source_path, format!("contract {contract_name} {{ /* fixture */ }}\n")).unwrap();

    let ast_path = dir.join(format!("{stem}.ast.json"));
    let dump = serde_json::json!({
        "contracts": [[contract_name, root]],
    });
    fs::write(&ast_path, serde_json::to_string_pretty(&dump).unwrap()).unwrap();

    source_path
}

#[test]
fn missing_source_file_exits_nonzero() {
    let mut cmd = Command::cargo_bin("analyzer").unwrap();
    cmd.arg("/nonexistent/path/DoesNotExist.sol");
    cmd.assert().failure();
}

#[test]
fn unimplemented_domain_reports_domain_limitation() {
    let dir = tempfile::tempdir().unwrap();
    let root = contract("C", vec![], vec![]);
    let source = write_fixture(dir.path(), "Empty", "C", &root);

    let mut cmd = Command::cargo_bin("analyzer").unwrap();
    cmd.current_dir(dir.path()).arg(&source).arg("--domain").arg("octagon");
    let output = cmd.output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("domain limitation"));
}

#[test]
fn scenario_a_straight_line_propagation_converges_to_six() {
    let dir = tempfile::tempdir().unwrap();
    let root = contract(
        "C",
        vec![var_decl("x", Some(literal("5")), true)],
        vec![function(
            "f",
            vec![expr_statement(assignment(
                "x",
                binary_op("+", identifier("x"), literal("1")),
            ))],
        )],
    );
    let source = write_fixture(dir.path(), "Bank", "C", &root);

    let mut cmd = Command::cargo_bin("analyzer").unwrap();
    cmd.current_dir(dir.path()).arg(&source);
    cmd.assert().success();

    let analysis = fs::read_to_string(dir.path().join("Bank_analysis.txt")).unwrap();
    assert!(analysis.starts_with("dict_keys("));
    assert!(analysis.contains("[6, 6]"));

    let combined = fs::read_to_string(dir.path().join("Bank_output.txt")).unwrap();
    assert!(combined.contains("converged"));

    assert!(dir.path().join("reaching_definitions_output.txt").exists());
    assert!(dir.path().join("gen").join("ast.json").exists());
}

#[test]
fn scenario_e_tod_finding_spans_two_functions() {
    let dir = tempfile::tempdir().unwrap();
    let root = contract(
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
                    expr_statement(call(
                        member_access(identifier("msg.sender"), "transfer"),
                        vec![literal("1")],
                    )),
                ],
            ),
        ],
    );
    let source = write_fixture(dir.path(), "Ownable", "C", &root);

    let mut cmd = Command::cargo_bin("analyzer").unwrap();
    cmd.current_dir(dir.path()).arg(&source).arg("--annotate-dependencies");
    cmd.assert().success();

    let reaching = fs::read_to_string(dir.path().join("reaching_definitions_output.txt")).unwrap();
    assert!(reaching.contains("=== TOD Findings ==="));
    assert!(reaching.contains("owner: defined in"));
    assert!(reaching.contains("(setOwner)"));
    assert!(reaching.contains("(withdraw)"));
    assert!(reaching.contains("[TOD]"));
    assert!(reaching.contains("=== Dependency Chains ==="));
}

#[test]
fn reports_overwrite_on_repeated_runs() {
    let dir = tempfile::tempdir().unwrap();
    let root = contract(
        "C",
        vec![var_decl("x", Some(literal("1")), true)],
        vec![function("f", vec![expr_statement(assignment("x", literal("2")))])],
    );
    let source = write_fixture(dir.path(), "Counter", "C", &root);

    for _ in 0..2 {
        let mut cmd = Command::cargo_bin("analyzer").unwrap();
        cmd.current_dir(dir.path()).arg(&source);
        cmd.assert().success();
    }

    let analysis = fs::read_to_string(dir.path().join("Counter_analysis.txt")).unwrap();
    assert!(analysis.contains("[2, 2]"));
}
