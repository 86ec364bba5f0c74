//! Fixture builders standing in for a real AST-compiler invocation in tests.
//!
//! These construct `AstNode` trees directly instead of compiling Solidity-like
//! source text, since the compiler itself is an external collaborator (spec
//! §1) this crate does not implement. A monotone id counter keeps fixture node
//! ids distinct, matching the "stable integer id" requirement of spec §3
//! without needing a real parser behind it.

use super::{AstKind, AstNode};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

pub fn identifier(name: &str) -> AstNode {
    AstNode {
        name: Some(name.to_string()),
        ..AstNode::new(next_id(), AstKind::Identifier)
    }
}

pub fn literal(value: &str) -> AstNode {
    AstNode {
        value: Some(value.to_string()),
        ..AstNode::new(next_id(), AstKind::Literal)
    }
}

pub fn binary_op(op: &str, left: AstNode, right: AstNode) -> AstNode {
    AstNode {
        operator: Some(op.to_string()),
        left: Some(Box::new(left)),
        right: Some(Box::new(right)),
        ..AstNode::new(next_id(), AstKind::BinaryOperation)
    }
}

pub fn unary_op(op: &str, operand: AstNode) -> AstNode {
    AstNode {
        operator: Some(op.to_string()),
        operand: Some(Box::new(operand)),
        ..AstNode::new(next_id(), AstKind::UnaryOperation)
    }
}

pub fn assignment(name: &str, rhs: AstNode) -> AstNode {
    AstNode {
        operator: Some("=".to_string()),
        left: Some(Box::new(identifier(name))),
        right: Some(Box::new(rhs)),
        ..AstNode::new(next_id(), AstKind::Assignment)
    }
}

pub fn expr_statement(expr: AstNode) -> AstNode {
    AstNode {
        expression: Some(Box::new(expr)),
        ..AstNode::new(next_id(), AstKind::ExpressionStatement)
    }
}

pub fn var_decl(name: &str, init: Option<AstNode>, state_variable: bool) -> AstNode {
    AstNode {
        name: Some(name.to_string()),
        state_variable: Some(state_variable),
        right: init.map(Box::new),
        ..AstNode::new(next_id(), AstKind::VariableDeclaration)
    }
}

pub fn var_decl_statement(name: &str, init: Option<AstNode>) -> AstNode {
    AstNode {
        name: Some(name.to_string()),
        state_variable: Some(false),
        right: init.map(Box::new),
        ..AstNode::new(next_id(), AstKind::VariableDeclarationStatement)
    }
}

pub fn if_stmt(condition: AstNode, true_body: Vec<AstNode>, false_body: Vec<AstNode>) -> AstNode {
    AstNode {
        condition: Some(Box::new(condition)),
        true_body: Some(Box::new(block(true_body))),
        false_body: if false_body.is_empty() {
            None
        } else {
            Some(Box::new(block(false_body)))
        },
        ..AstNode::new(next_id(), AstKind::IfStatement)
    }
}

pub fn while_stmt(condition: AstNode, body: Vec<AstNode>) -> AstNode {
    AstNode {
        condition: Some(Box::new(condition)),
        body: Some(Box::new(block(body))),
        ..AstNode::new(next_id(), AstKind::WhileStatement)
    }
}

pub fn return_stmt(expr: Option<AstNode>) -> AstNode {
    AstNode {
        expression: expr.map(Box::new),
        ..AstNode::new(next_id(), AstKind::Return)
    }
}

pub fn throw_stmt() -> AstNode {
    AstNode::new(next_id(), AstKind::Throw)
}

pub fn member_access(base: AstNode, member: &str) -> AstNode {
    AstNode {
        base: Some(Box::new(base)),
        name: Some(member.to_string()),
        ..AstNode::new(next_id(), AstKind::MemberAccess)
    }
}

pub fn call(callee: AstNode, arguments: Vec<AstNode>) -> AstNode {
    AstNode {
        base: Some(Box::new(callee)),
        arguments,
        ..AstNode::new(next_id(), AstKind::FunctionCall)
    }
}

/// A block is represented as an `Unknown`-kind wrapper whose `children` are
/// its statements; the CFG builder flattens this rather than registering it.
pub fn block(statements: Vec<AstNode>) -> AstNode {
    AstNode {
        children: statements,
        ..AstNode::new(next_id(), AstKind::Unknown)
    }
}

pub fn function(name: &str, body: Vec<AstNode>) -> AstNode {
    AstNode {
        name: Some(name.to_string()),
        body: Some(Box::new(block(body))),
        ..AstNode::new(next_id(), AstKind::FunctionDefinition)
    }
}

pub fn contract(name: &str, declarations: Vec<AstNode>, functions: Vec<AstNode>) -> AstNode {
    let mut children = declarations;
    children.extend(functions);
    AstNode {
        name: Some(name.to_string()),
        children,
        ..AstNode::new(next_id(), AstKind::ContractDefinition)
    }
}
