//! Finished compute graphs and dependency traversal powered by petgraph.
//!
//! A [`ComputeGraph`] is the immutable output of
//! [`ComputeGraphBuilder`](crate::builder::ComputeGraphBuilder): the ordered node
//! list plus the feature name snapshot. Dependency edges are derived on demand
//! from the node payloads into a petgraph `DiGraph` whose node index `i` is node
//! id `i`, with edges pointing from a dependency to its consumer.
//!
//! # Key Features
//!
//! - **Cycle detection**: Kosaraju SCCs plus self-loops, O(V + E)
//! - **Lineage**: BFS upstream (what a node reads) and downstream (what reads it)
//! - **Ordering**: topological order for consumers that walk the graph inputs first

use crate::node::{AnyNode, FeatureDefinition, NodeId};
use petgraph::algo::{kosaraju_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};

/// An assembled feature computation graph.
///
/// Every feature definition of a graph produced by the builder points at an
/// existing node. Node-internal references are only guaranteed to resolve once
/// the graph has passed validation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputeGraph {
    nodes: Vec<AnyNode>,
    #[serde(default)]
    feature_names: BTreeMap<String, FeatureDefinition>,
}

impl ComputeGraph {
    pub(crate) fn from_parts(
        nodes: Vec<AnyNode>,
        feature_names: BTreeMap<String, FeatureDefinition>,
    ) -> Self {
        Self {
            nodes,
            feature_names,
        }
    }

    pub fn nodes(&self) -> &[AnyNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&AnyNode> {
        self.nodes.get(id as usize)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn feature_names(&self) -> &BTreeMap<String, FeatureDefinition> {
        &self.feature_names
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureDefinition> {
        self.feature_names.get(name)
    }

    /// The node computing the named feature.
    pub fn resolve(&self, name: &str) -> Option<&AnyNode> {
        self.feature(name).and_then(|def| self.node(def.node_id))
    }

    pub fn into_parts(self) -> (Vec<AnyNode>, BTreeMap<String, FeatureDefinition>) {
        (self.nodes, self.feature_names)
    }

    /// Build the data-flow graph: one petgraph node per graph node, one edge per
    /// dependency, pointing from the dependency to its consumer.
    ///
    /// References to ids outside the graph are skipped.
    pub fn dependency_graph(&self) -> DiGraph<NodeId, ()> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.nodes.len());
        for position in 0..self.nodes.len() {
            graph.add_node(position as NodeId);
        }

        for (position, node) in self.nodes.iter().enumerate() {
            for dep in node.dependencies() {
                if (dep as usize) < self.nodes.len() {
                    graph.add_edge(NodeIndex::new(dep as usize), NodeIndex::new(position), ());
                }
            }
        }

        graph
    }

    /// Find every dependency cycle.
    ///
    /// Each cycle is a strongly connected component with more than one node, or
    /// a single node depending on itself. Members are sorted ascending and
    /// cycles are ordered by their smallest member.
    pub fn find_cycles(&self) -> Vec<Vec<NodeId>> {
        let graph = self.dependency_graph();

        let mut cycles: Vec<Vec<NodeId>> = kosaraju_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut ids: Vec<NodeId> = scc.into_iter().map(|idx| graph[idx]).collect();
                ids.sort_unstable();
                ids
            })
            .collect();

        cycles.sort();
        cycles
    }

    /// Node ids ordered so every node comes after its dependencies, or `None`
    /// if the graph has a cycle.
    pub fn topological_order(&self) -> Option<Vec<NodeId>> {
        let graph = self.dependency_graph();
        toposort(&graph, None)
            .ok()
            .map(|order| order.into_iter().map(|idx| graph[idx]).collect())
    }

    /// All nodes `id` transitively depends on, nearest first.
    pub fn upstream(&self, id: NodeId) -> Vec<NodeId> {
        self.traverse_bfs(id, Direction::Incoming)
    }

    /// All nodes that transitively depend on `id`, nearest first.
    pub fn downstream(&self, id: NodeId) -> Vec<NodeId> {
        self.traverse_bfs(id, Direction::Outgoing)
    }

    fn traverse_bfs(&self, id: NodeId, direction: Direction) -> Vec<NodeId> {
        if (id as usize) >= self.nodes.len() {
            return vec![];
        }

        let graph = self.dependency_graph();
        let start = NodeIndex::new(id as usize);

        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut result = Vec::new();
        let mut queue = VecDeque::new();

        visited.insert(start);
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            for neighbor in graph.neighbors_directed(current, direction) {
                if visited.insert(neighbor) {
                    result.push(graph[neighbor]);
                    queue.push_back(neighbor);
                }
            }
        }

        result
    }
}
