//! Dependency chain rendering (spec §4.2 "Dependency chains per variable,
//! rooted at a non-redef definition, rendered depth-first").
//!
//! Built on `petgraph`, the way `iepathos-debtmap`'s taint module builds a
//! graph over data-flow nodes for reachability queries rather than
//! hand-rolling traversal (`src/data_flow/graph.rs`).

use crate::cfg::CfgId;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::{HashMap, HashSet};

/// A def→use graph for a single variable's dependency chain. Edges point
/// from a definition to each node that uses it; a node that is itself a
/// definition (the variable was reassigned based on its own value) becomes
/// both the target of one edge and the source of the next, so a DFS walk
/// naturally threads through successive reassignments.
pub struct DependencyGraph {
    graph: DiGraph<CfgId, ()>,
    index_of: HashMap<CfgId, NodeIndex>,
}

impl DependencyGraph {
    fn from_pairs(pairs: &HashSet<(CfgId, CfgId)>) -> Self {
        let mut graph = DiGraph::new();
        let mut index_of = HashMap::new();

        let mut node_index = |graph: &mut DiGraph<CfgId, ()>, index_of: &mut HashMap<CfgId, NodeIndex>, id: &CfgId| {
            *index_of
                .entry(id.clone())
                .or_insert_with(|| graph.add_node(id.clone()))
        };

        for (use_id, def_id) in pairs {
            let d = node_index(&mut graph, &mut index_of, def_id);
            let u = node_index(&mut graph, &mut index_of, use_id);
            graph.update_edge(d, u, ());
        }

        Self { graph, index_of }
    }

    /// Roots: definitions that never appear as the target of a use→def edge
    /// for this variable — i.e. a "non-redef definition" (spec §4.2).
    fn roots(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&n| self.graph.neighbors_directed(n, petgraph::Direction::Incoming).next().is_none())
            .collect()
    }

    /// Depth-first visitation order starting from every root, in increasing
    /// node-index order for determinism (spec §5 "fully determined... no
    /// locking is required" implies reproducible output).
    fn dfs_order(&self) -> Vec<CfgId> {
        let mut visited_global = HashSet::new();
        let mut out = Vec::new();
        let mut roots = self.roots();
        roots.sort();
        for root in roots {
            let mut dfs = Dfs::new(&self.graph, root);
            while let Some(n) = dfs.next(&self.graph) {
                if visited_global.insert(n) {
                    out.push(self.graph[n].clone());
                }
            }
        }
        out
    }

    pub fn contains(&self, id: &CfgId) -> bool {
        self.index_of.contains_key(id)
    }
}

/// Renders the depth-first dependency chain for every variable in
/// `variable_dependencies` (spec §4.2's report output).
pub fn render_chains(variable_dependencies: &HashMap<String, HashSet<(CfgId, CfgId)>>) -> HashMap<String, Vec<CfgId>> {
    variable_dependencies
        .iter()
        .map(|(var, pairs)| (var.clone(), DependencyGraph::from_pairs(pairs).dfs_order()))
        .collect()
}
