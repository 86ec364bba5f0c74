//! Per-node used/defined variable extraction (spec §4.2 step 4: "Extract
//! use/def sets per kind").
//!
//! Operates directly on the owned expression subtree a `CfgNode` carries —
//! these subtrees never participate in CFG edges (spec §3 "CFG node"), so
//! this module is the only place that walks into them for reaching
//! definitions purposes.

use crate::ast::{AstKind, AstNode};
use crate::cfg::{CfgKind, CfgNode};
use std::collections::HashSet;

/// Names spec §4.2 step 7 recognizes as timestamp sources.
pub const TIMESTAMP_SOURCES: [&str; 3] = ["blocktimestamp", "block.timestamp", "now"];

/// The used/defined sets for a single node (spec §3 "Reaching-definitions
/// store... per node: `used_vars`, `defined_vars`").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UseDef {
    pub used: HashSet<String>,
    pub defined: HashSet<String>,
}

/// Dispatches on the node's kind to extract its use/def sets, per the
/// per-kind rules in spec §4.2 step 4.
pub fn extract(node: &CfgNode) -> UseDef {
    let Some(expr) = node.expr.as_ref() else {
        return UseDef::default();
    };

    match node.kind {
        CfgKind::VariableDeclaration | CfgKind::VariableDeclarationStatement => UseDef {
            defined: expr.name.iter().cloned().collect(),
            used: expr.right.as_deref().map(collect_uses).unwrap_or_default(),
        },
        CfgKind::Assignment => UseDef {
            defined: expr.left.as_deref().map(collect_lhs_defs).unwrap_or_default(),
            used: expr.right.as_deref().map(collect_uses).unwrap_or_default(),
        },
        CfgKind::ExpressionStatement => extract_expression_statement(expr),
        CfgKind::BinaryOperation | CfgKind::UnaryOperation | CfgKind::FunctionCall => UseDef {
            used: collect_uses(expr),
            defined: HashSet::new(),
        },
        CfgKind::IfStatement | CfgKind::WhileStatement => UseDef {
            // `expr` on a condition node *is* the condition subtree (the CFG
            // builder stores the condition, not the whole `IfStatement`).
            used: collect_uses(expr),
            defined: HashSet::new(),
        },
        CfgKind::Return => UseDef {
            used: expr.expression.as_deref().map(collect_uses).unwrap_or_default(),
            defined: HashSet::new(),
        },
        CfgKind::Throw => UseDef {
            used: expr.expression.as_deref().map(collect_uses).unwrap_or_default(),
            defined: HashSet::new(),
        },
        _ => UseDef::default(),
    }
}

fn extract_expression_statement(stmt: &AstNode) -> UseDef {
    let Some(inner) = stmt.expression.as_deref() else {
        return UseDef::default();
    };
    match inner.kind {
        AstKind::Assignment => UseDef {
            defined: inner.left.as_deref().map(collect_lhs_defs).unwrap_or_default(),
            used: inner.right.as_deref().map(collect_uses).unwrap_or_default(),
        },
        _ => UseDef {
            used: collect_uses(inner),
            defined: HashSet::new(),
        },
    }
}

/// The left-hand side of an assignment defines whatever name it resolves to.
/// By the time this runs the source rewriter has already flattened
/// `obj.field` to `field` (spec §4.4), so only bare identifiers are expected;
/// a `MemberAccess` LHS that slipped through is treated by its member name.
fn collect_lhs_defs(lhs: &AstNode) -> HashSet<String> {
    match lhs.kind {
        AstKind::Identifier => lhs.name.iter().cloned().collect(),
        AstKind::MemberAccess => lhs.name.iter().cloned().collect(),
        _ => HashSet::new(),
    }
}

/// Recursively collects every identifier/qualified-member name read by an
/// expression subtree.
pub fn collect_uses(expr: &AstNode) -> HashSet<String> {
    let mut out = HashSet::new();
    collect_uses_into(expr, &mut out);
    out
}

fn collect_uses_into(expr: &AstNode, out: &mut HashSet<String>) {
    match expr.kind {
        AstKind::Identifier => {
            if let Some(name) = &expr.name {
                out.insert(name.clone());
            }
        }
        AstKind::MemberAccess => {
            if let (Some(base), Some(member)) = (expr.base.as_deref(), expr.name.as_deref()) {
                if let Some(base_name) = &base.name {
                    out.insert(format!("{base_name}.{member}"));
                }
                collect_uses_into(base, out);
            }
        }
        AstKind::BinaryOperation => {
            if let Some(l) = expr.left.as_deref() {
                collect_uses_into(l, out);
            }
            if let Some(r) = expr.right.as_deref() {
                collect_uses_into(r, out);
            }
        }
        AstKind::UnaryOperation => {
            if let Some(o) = expr.operand.as_deref() {
                collect_uses_into(o, out);
            }
        }
        AstKind::Conditional => {
            if let Some(c) = expr.condition.as_deref() {
                collect_uses_into(c, out);
            }
            if let Some(l) = expr.left.as_deref() {
                collect_uses_into(l, out);
            }
            if let Some(r) = expr.right.as_deref() {
                collect_uses_into(r, out);
            }
        }
        AstKind::FunctionCall => {
            if let Some(base) = expr.base.as_deref() {
                collect_uses_into(base, out);
            }
            for arg in &expr.arguments {
                collect_uses_into(arg, out);
            }
        }
        AstKind::Assignment => {
            if let Some(r) = expr.right.as_deref() {
                collect_uses_into(r, out);
            }
            // the LHS of a nested assignment-as-expression is a def, not a
            // use, handled by the caller that recognizes `Assignment` kinds.
        }
        _ => {}
    }
}

/// `true` if `name` is one of the recognized timestamp-source identifiers
/// (spec §4.2 step 7).
pub fn is_timestamp_source(name: &str) -> bool {
    TIMESTAMP_SOURCES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::test_support::*;
    use crate::cfg::{CfgId, CfgKind, CfgNode};

    fn node_with_expr(kind: CfgKind, expr: AstNode) -> CfgNode {
        let mut node = CfgNode::new(CfgId("T_0".to_string()), kind);
        node.expr = Some(expr);
        node
    }

    #[test]
    fn assignment_defines_lhs_and_uses_rhs_identifiers() {
        let node = node_with_expr(
            CfgKind::Assignment,
            assignment("x", binary_op("+", identifier("x"), identifier("y"))),
        );
        let ud = extract(&node);
        assert_eq!(ud.defined, HashSet::from(["x".to_string()]));
        assert_eq!(ud.used, HashSet::from(["x".to_string(), "y".to_string()]));
    }

    #[test]
    fn if_condition_only_uses_no_defines() {
        let node = node_with_expr(CfgKind::IfStatement, binary_op("<", identifier("a"), literal("10")));
        let ud = extract(&node);
        assert!(ud.defined.is_empty());
        assert_eq!(ud.used, HashSet::from(["a".to_string()]));
    }

    #[test]
    fn timestamp_identifier_is_recognized() {
        assert!(is_timestamp_source("now"));
        assert!(is_timestamp_source("block.timestamp"));
        assert!(!is_timestamp_source("balance"));
    }

    #[test]
    fn member_access_use_records_qualified_name() {
        let node = node_with_expr(
            CfgKind::ExpressionStatement,
            expr_statement(member_access(identifier("block"), "timestamp")),
        );
        let ud = extract(&node);
        assert!(ud.used.contains("block.timestamp"));
    }
}
