//! CFG construction from a contract's AST (spec §4.1).

use super::types::{CfgId, CfgKind, CfgMetadata, CfgNode};
use crate::ast::{require, AstKind, AstNode};
use crate::error::AnalyzerError;
use std::collections::HashSet;

/// The complete control flow graph for one contract: edges live on the nodes
/// themselves (`prev_nodes`/`next_nodes`), `metadata` is the lookup table.
#[derive(Debug)]
pub struct ControlFlowGraph {
    pub entry: CfgId,
    metadata: CfgMetadata,
}

impl ControlFlowGraph {
    pub fn metadata(&self) -> &CfgMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut CfgMetadata {
        &mut self.metadata
    }

    /// Build a CFG from a single contract's AST root.
    pub fn build(ast_root: &AstNode) -> Result<Self, AnalyzerError> {
        if ast_root.kind != AstKind::ContractDefinition {
            return Err(AnalyzerError::MalformedAst {
                context: "ControlFlowGraph::build".to_string(),
                message: "expected a ContractDefinition root".to_string(),
            });
        }

        let mut builder = CfgBuilder::new();
        builder.build_contract(ast_root)
    }

    /// Splice a manual edge, redirecting `from`'s successors to also include
    /// `to` (spec §4.1 "A post-processing pass may splice in manual edges").
    /// Idempotent: re-applying the same redirection is a no-op.
    pub fn splice_edge(&mut self, from: &CfgId, to: &CfgId) -> Result<(), AnalyzerError> {
        if !self.metadata.contains(from) || !self.metadata.contains(to) {
            return Err(AnalyzerError::MalformedAst {
                context: "splice_edge".to_string(),
                message: format!("unknown cfg id in splice({from}, {to})"),
            });
        }
        if let Some(node) = self.metadata.get_node_mut(from) {
            node.next_nodes.insert(to.clone());
        }
        if let Some(node) = self.metadata.get_node_mut(to) {
            node.prev_nodes.insert(from.clone());
        }
        Ok(())
    }

    /// Emit DOT for a forward (entry-to-exit) traversal.
    pub fn generate_dot(&self) -> String {
        self.generate_dot_with(|node| node.next_nodes.iter())
    }

    /// Emit DOT for a reverse (exit-to-entry) traversal.
    pub fn generate_dot_bottom_up(&self) -> String {
        self.generate_dot_with(|node| node.prev_nodes.iter())
    }

    fn generate_dot_with<'a, F, I>(&'a self, edges_of: F) -> String
    where
        F: Fn(&'a CfgNode) -> I,
        I: Iterator<Item = &'a CfgId>,
    {
        let mut out = String::from("digraph cfg {\n");
        for id in self.metadata.ids_in_order() {
            let node = self.metadata.get_node(id).expect("id came from metadata");
            out.push_str(&format!("  \"{}\" [label=\"{}\"];\n", node.id, node.kind));
            for succ in edges_of(node) {
                out.push_str(&format!("  \"{}\" -> \"{}\";\n", node.id, succ));
            }
        }
        out.push_str("}\n");
        out
    }
}

pub(crate) struct CfgBuilder {
    metadata: CfgMetadata,
}

impl CfgBuilder {
    pub(crate) fn new() -> Self {
        Self {
            metadata: CfgMetadata::new(),
        }
    }

    fn new_node(&mut self, kind: CfgKind, ast: Option<&AstNode>, function: Option<&str>) -> CfgId {
        let id = self.metadata.fresh_id(kind);
        let mut node = CfgNode::new(id.clone(), kind);
        node.ast_id = ast.map(|a| a.id);
        node.expr = ast.cloned();
        node.function = function.map(str::to_string);
        self.metadata.insert(node);
        id
    }

    fn link(&mut self, from: &[CfgId], to: &CfgId) {
        for f in from {
            if let Some(node) = self.metadata.get_node_mut(f) {
                node.next_nodes.insert(to.clone());
            }
            if let Some(node) = self.metadata.get_node_mut(to) {
                node.prev_nodes.insert(f.clone());
            }
        }
    }

    fn build_contract(&mut self, contract: &AstNode) -> Result<ControlFlowGraph, AnalyzerError> {
        let source_entry = self.new_node(CfgKind::SourceEntry, None, None);
        let source_exit = self.new_node(CfgKind::SourceExit, None, None);

        let declarations: Vec<&AstNode> = contract
            .children
            .iter()
            .filter(|c| c.kind != AstKind::FunctionDefinition)
            .collect();
        let functions: Vec<&AstNode> = contract
            .children
            .iter()
            .filter(|c| c.kind == AstKind::FunctionDefinition)
            .collect();

        let mut tail = vec![source_entry.clone()];
        for decl in &declarations {
            let id = self.new_node(CfgKind::from(decl.kind), Some(decl), None);
            self.link(&tail, &id);
            tail = vec![id];
        }
        self.link(&tail, &source_exit);
        tail = vec![source_exit.clone()];

        for function in &functions {
            let name = function.name.clone().unwrap_or_default();
            let fn_def_id = self.new_node(CfgKind::FunctionDefinition, Some(function), Some(&name));
            self.link(&tail, &fn_def_id);

            let fn_entry = self.new_node(CfgKind::FunctionEntry, None, Some(&name));
            self.link(&[fn_def_id], &fn_entry);
            let fn_exit = self.new_node(CfgKind::FunctionExit, None, Some(&name));

            let body = function
                .body
                .as_deref()
                .map(|b| b.children.as_slice())
                .unwrap_or(&[]);
            let (_, leaves) = self.process_block(body, vec![fn_entry.clone()], &fn_exit, &name)?;
            self.link(&leaves, &fn_exit);

            tail = vec![fn_exit];
        }

        self.finalize_while_branch_targets();

        Ok(ControlFlowGraph {
            entry: source_entry,
            metadata: std::mem::take(&mut self.metadata),
        })
    }

    /// `process_while` cannot know a loop's false-exit target until whatever
    /// follows the loop has been linked in by the enclosing block. Once the
    /// whole contract is built, every `WhileStatement` node's real successors
    /// are known, so resolve the placeholder recorded at construction time.
    fn finalize_while_branch_targets(&mut self) {
        let while_ids: Vec<CfgId> = self
            .metadata
            .ids_in_order()
            .iter()
            .filter(|id| {
                self.metadata
                    .get_node(id)
                    .is_some_and(|n| n.kind == CfgKind::WhileStatement)
            })
            .cloned()
            .collect();

        for id in while_ids {
            let node = self.metadata.get_node(&id).expect("id came from metadata");
            let Some((true_target, _placeholder)) = node.branch_targets.clone() else {
                continue;
            };
            let false_target = node
                .next_nodes
                .iter()
                .find(|n| **n != true_target)
                .cloned()
                .unwrap_or_else(|| true_target.clone());
            if let Some(node) = self.metadata.get_node_mut(&id) {
                node.branch_targets = Some((true_target, false_target));
            }
        }
    }

    /// Process a statement list, threading the "current frontier" (leaves)
    /// through each statement. Returns the first node created (if any, used
    /// by the enclosing `IfStatement`/`WhileStatement` to record its branch
    /// target) and the new frontier.
    fn process_block(
        &mut self,
        stmts: &[AstNode],
        tail: Vec<CfgId>,
        fn_exit: &CfgId,
        function: &str,
    ) -> Result<(Option<CfgId>, Vec<CfgId>), AnalyzerError> {
        let mut leaves = tail;
        let mut first = None;
        for stmt in stmts {
            let (stmt_first, new_leaves) = self.process_stmt(stmt, leaves, fn_exit, function)?;
            if first.is_none() {
                first = stmt_first;
            }
            leaves = new_leaves;
        }
        Ok((first, leaves))
    }

    fn process_stmt(
        &mut self,
        stmt: &AstNode,
        tail: Vec<CfgId>,
        fn_exit: &CfgId,
        function: &str,
    ) -> Result<(Option<CfgId>, Vec<CfgId>), AnalyzerError> {
        match stmt.kind {
            AstKind::IfStatement => {
                let (cond_id, join_id) = self.process_if(stmt, tail, fn_exit, function)?;
                Ok((Some(cond_id), vec![join_id]))
            }
            AstKind::WhileStatement => {
                let (join_id, false_exit) = self.process_while(stmt, tail, fn_exit, function)?;
                Ok((Some(join_id), vec![false_exit]))
            }
            AstKind::Return => {
                let id = self.new_node(CfgKind::Return, Some(stmt), Some(function));
                self.link(&tail, &id);
                self.link(&[id.clone()], fn_exit);
                Ok((Some(id), vec![]))
            }
            AstKind::Throw => {
                let id = self.new_node(CfgKind::Throw, Some(stmt), Some(function));
                self.link(&tail, &id);
                // No successor inside the function (spec §4.1): bottom-propagating.
                Ok((Some(id), vec![]))
            }
            _ => {
                let id = self.new_node(CfgKind::from(stmt.kind), Some(stmt), Some(function));
                self.link(&tail, &id);
                Ok((Some(id.clone()), vec![id]))
            }
        }
    }

    /// Returns the condition node's id and the `IfConditionJoin` id.
    fn process_if(
        &mut self,
        stmt: &AstNode,
        tail: Vec<CfgId>,
        fn_exit: &CfgId,
        function: &str,
    ) -> Result<(CfgId, CfgId), AnalyzerError> {
        let condition = require(stmt.condition.as_deref(), "IfStatement", "condition")?;
        let cond_id = self.new_node(CfgKind::IfStatement, Some(condition), Some(function));
        self.link(&tail, &cond_id);

        let true_stmts = stmt.true_body.as_deref().map(|b| b.children.as_slice()).unwrap_or(&[]);
        let (true_first, true_leaves) =
            self.process_block(true_stmts, vec![cond_id.clone()], fn_exit, function)?;

        let (false_first, false_leaves) = if let Some(false_body) = stmt.false_body.as_deref() {
            self.process_block(false_body.children.as_slice(), vec![cond_id.clone()], fn_exit, function)?
        } else {
            (None, vec![cond_id.clone()])
        };

        let join_id = self.new_node(CfgKind::IfConditionJoin, None, Some(function));
        let mut incoming = true_leaves;
        incoming.extend(false_leaves);
        self.link(&incoming, &join_id);

        let true_target = true_first.unwrap_or_else(|| join_id.clone());
        let false_target = false_first.unwrap_or_else(|| join_id.clone());
        if let Some(node) = self.metadata.get_node_mut(&cond_id) {
            node.branch_targets = Some((true_target, false_target));
            node.join_target = Some(join_id.clone());
        }

        Ok((cond_id, join_id))
    }

    /// Returns the `WhileJoin` id and the condition node's id (the loop's
    /// false-exit, which the caller threads on as the new frontier).
    fn process_while(
        &mut self,
        stmt: &AstNode,
        tail: Vec<CfgId>,
        fn_exit: &CfgId,
        function: &str,
    ) -> Result<(CfgId, CfgId), AnalyzerError> {
        let join_id = self.new_node(CfgKind::WhileJoin, None, Some(function));
        self.link(&tail, &join_id);

        let condition = require(stmt.condition.as_deref(), "WhileStatement", "condition")?;
        let cond_id = self.new_node(CfgKind::WhileStatement, Some(condition), Some(function));
        self.link(&[join_id.clone()], &cond_id);

        let body_stmts = stmt.body.as_deref().map(|b| b.children.as_slice()).unwrap_or(&[]);
        let (body_first, body_leaves) =
            self.process_block(body_stmts, vec![cond_id.clone()], fn_exit, function)?;
        // Loop back: the true-exit of the body returns to the join.
        self.link(&body_leaves, &join_id);

        // The false-exit target (whatever statement follows the loop) is not
        // known yet: the caller keeps threading `cond_id` as the frontier and
        // links it in once the following statement (or the function exit)
        // exists. Recorded as a placeholder here and corrected by
        // `finalize_while_branch_targets` once the whole contract is built.
        let true_target = body_first.unwrap_or_else(|| join_id.clone());
        if let Some(node) = self.metadata.get_node_mut(&cond_id) {
            node.branch_targets = Some((true_target, cond_id.clone()));
            node.join_target = Some(join_id.clone());
        }

        // The false-exit of the condition leaves to the following statement.
        Ok((join_id, cond_id))
    }
}
