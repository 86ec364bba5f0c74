//! Control flow graph types (spec §3 "CFG node", "CFG metadata table").

use crate::ast::{AstKind, AstNode};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A CFG node kind: every recognized AST kind, plus the synthetic kinds
/// introduced during CFG construction, plus a generic fallback for AST kinds
/// the builder does not recognize (treated as identity nodes downstream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CfgKind {
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
    SourceEntry,
    SourceExit,
    FunctionEntry,
    FunctionExit,
    IfConditionJoin,
    WhileJoin,
    /// An AST kind with no recognized semantics (spec §4.1 failure semantics).
    Generic,
}

impl From<AstKind> for CfgKind {
    fn from(kind: AstKind) -> Self {
        match kind {
            AstKind::ContractDefinition => CfgKind::ContractDefinition,
            AstKind::FunctionDefinition => CfgKind::FunctionDefinition,
            AstKind::VariableDeclaration => CfgKind::VariableDeclaration,
            AstKind::VariableDeclarationStatement => CfgKind::VariableDeclarationStatement,
            AstKind::Assignment => CfgKind::Assignment,
            AstKind::BinaryOperation => CfgKind::BinaryOperation,
            AstKind::UnaryOperation => CfgKind::UnaryOperation,
            AstKind::Conditional => CfgKind::Conditional,
            AstKind::Identifier => CfgKind::Identifier,
            AstKind::Literal => CfgKind::Literal,
            AstKind::MemberAccess => CfgKind::MemberAccess,
            AstKind::FunctionCall => CfgKind::FunctionCall,
            AstKind::IfStatement => CfgKind::IfStatement,
            AstKind::WhileStatement => CfgKind::WhileStatement,
            AstKind::ExpressionStatement => CfgKind::ExpressionStatement,
            AstKind::Return => CfgKind::Return,
            AstKind::Throw => CfgKind::Throw,
            AstKind::StructDefinition => CfgKind::StructDefinition,
            AstKind::EnumDefinition => CfgKind::EnumDefinition,
            AstKind::Unknown => CfgKind::Generic,
        }
    }
}

impl fmt::Display for CfgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Stable identifier of the form `<kind>_<counter>` (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CfgId(pub String);

impl fmt::Display for CfgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl CfgId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A node in the control flow graph.
#[derive(Debug, Clone)]
pub struct CfgNode {
    pub id: CfgId,
    pub kind: CfgKind,
    /// The originating AST node id, when this CFG node corresponds to one
    /// (synthetic nodes have none).
    pub ast_id: Option<u64>,
    /// Owned kind-specific subtree, used by the semantics engines; does not
    /// participate in CFG edges.
    pub expr: Option<AstNode>,
    pub prev_nodes: HashSet<CfgId>,
    pub next_nodes: HashSet<CfgId>,
    /// cfg_ids acting as exit leaves for this node's subtree.
    pub leaves: HashSet<CfgId>,
    /// The enclosing function's name, `None` for contract-level nodes.
    pub function: Option<String>,
    /// For `IfStatement`/`WhileStatement` condition nodes: the node reached
    /// on the true branch and the node reached on the false branch. Recorded
    /// explicitly because both may collapse onto the same join node (spec
    /// §4.1: "or to the synthetic join if absent"), which would otherwise
    /// make the two branches indistinguishable from the edge set alone.
    pub branch_targets: Option<(CfgId, CfgId)>,
    /// For the same condition nodes: the node both branches reconverge at
    /// (the `IfConditionJoin` or, for a loop, the `WhileJoin` header itself).
    /// Used to bound control-dependence walks (spec §4.2 "control
    /// dependence").
    pub join_target: Option<CfgId>,
}

impl CfgNode {
    pub fn new(id: CfgId, kind: CfgKind) -> Self {
        let leaves = HashSet::from([id.clone()]);
        Self {
            id,
            kind,
            ast_id: None,
            expr: None,
            prev_nodes: HashSet::new(),
            next_nodes: HashSet::new(),
            leaves,
            function: None,
            branch_targets: None,
            join_target: None,
        }
    }
}

/// Maps `cfg_id -> node` and supports reverse lookup by AST id (spec §3 "CFG
/// metadata table"). Node-type counters live here rather than behind a
/// process-wide singleton, per the spec's Design Notes.
#[derive(Debug, Default)]
pub struct CfgMetadata {
    nodes: HashMap<CfgId, CfgNode>,
    by_ast_id: HashMap<u64, CfgId>,
    counters: HashMap<CfgKind, usize>,
    insertion_order: Vec<CfgId>,
}

impl CfgMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next stable id for `kind` (`<kind>_<counter>`).
    pub fn fresh_id(&mut self, kind: CfgKind) -> CfgId {
        let counter = self.counters.entry(kind).or_insert(0);
        let id = CfgId(format!("{kind}_{counter}"));
        *counter += 1;
        id
    }

    pub fn insert(&mut self, node: CfgNode) {
        if let Some(ast_id) = node.ast_id {
            self.by_ast_id.insert(ast_id, node.id.clone());
        }
        self.insertion_order.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn get_node(&self, id: &CfgId) -> Option<&CfgNode> {
        self.nodes.get(id)
    }

    pub fn get_node_mut(&mut self, id: &CfgId) -> Option<&mut CfgNode> {
        self.nodes.get_mut(id)
    }

    pub fn get_node_by_ast_id(&self, ast_id: u64) -> Option<&CfgNode> {
        self.by_ast_id.get(&ast_id).and_then(|id| self.nodes.get(id))
    }

    pub fn contains(&self, id: &CfgId) -> bool {
        self.nodes.contains_key(id)
    }

    /// All node ids in the order they were created (deterministic DFS seed
    /// order for the fixed-point engines, spec §5 "Ordering is fully
    /// determined by CFG DFS order from the designated start node").
    pub fn ids_in_order(&self) -> &[CfgId] {
        &self.insertion_order
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
