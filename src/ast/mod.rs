//! The compiled abstract syntax tree, and the contract for the external
//! collaborator that produces it.
//!
//! Per the system purpose, the AST compiler itself — invoking the
//! source-language compiler on rewritten source to produce this tree — is out
//! of scope here and treated as an external collaborator. This module defines
//! the shape of its output and a narrow trait describing the contract, plus
//! one concrete adapter (reading a pre-compiled `ast.json`) and test fixtures
//! that stand in for a real compiler invocation in unit and end-to-end tests.

mod provider;
pub mod test_support;

pub use provider::{AstProvider, CompiledAst, JsonFileAstProvider};

use serde::{Deserialize, Serialize};

/// Recognized AST node kinds (spec data model §3), plus an `Unknown` catch-all
/// for node kinds the CFG builder treats as generic statements with no
/// semantics (identity nodes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AstKind {
    ContractDefinition,
    FunctionDefinition,
    VariableDeclaration,
    VariableDeclarationStatement,
    Assignment,
    BinaryOperation,
    UnaryOperation,
    Conditional,
    Identifier,
    Literal,
    MemberAccess,
    FunctionCall,
    IfStatement,
    WhileStatement,
    ExpressionStatement,
    Return,
    Throw,
    StructDefinition,
    EnumDefinition,
    #[serde(other)]
    Unknown,
}

impl Default for AstKind {
    fn default() -> Self {
        AstKind::Unknown
    }
}

/// A node in the compiled AST.
///
/// Kind-specific children are carried as named optional slots rather than a
/// single untyped child list, mirroring how a real Solidity-style compiler
/// JSON dump shapes each node type (`condition`/`trueBody`/`falseBody` on an
/// `IfStatement`, `leftHandSide`/`rightHandSide` on an `Assignment`, etc). A
/// node missing a child its kind requires is a `MalformedAst` at CFG-build
/// time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AstNode {
    pub id: u64,
    #[serde(rename = "nodeType")]
    pub kind: AstKind,

    /// Identifier/declaration name, function name, struct/enum name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Literal text value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Binary/unary/assignment operator text (`+`, `-`, `&&`, `=`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// `true` on a `VariableDeclaration` that is contract-level (state variable).
    #[serde(skip_serializing_if = "Option::is_none", rename = "stateVariable")]
    pub state_variable: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Box<AstNode>>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "trueBody")]
    pub true_body: Option<Box<AstNode>>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "falseBody")]
    pub false_body: Option<Box<AstNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Box<AstNode>>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "leftHandSide")]
    pub left: Option<Box<AstNode>>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "rightHandSide")]
    pub right: Option<Box<AstNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand: Option<Box<AstNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<Box<AstNode>>,
    /// Receiver of a `MemberAccess` (e.g. the `x` in `x.call`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<Box<AstNode>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<AstNode>,
    /// Contract-level declarations, or a block's statement list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AstNode>,
}

impl AstNode {
    pub fn new(id: u64, kind: AstKind) -> Self {
        Self {
            id,
            kind,
            ..Default::default()
        }
    }
}

/// Fetch a required child, producing the `MalformedAst` error spec §4.1 calls
/// a fatal failure when a mandatory child is missing.
pub fn require<'a>(
    child: Option<&'a AstNode>,
    context: &str,
    what: &str,
) -> Result<&'a AstNode, crate::error::AnalyzerError> {
    child.ok_or_else(|| crate::error::AnalyzerError::MalformedAst {
        context: context.to_string(),
        message: format!("missing required child: {what}"),
    })
}
