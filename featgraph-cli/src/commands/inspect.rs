//! Inspect command - List the nodes of a compute graph
//!
//! Shows each node's kind, the feature names bound to it and its direct
//! dependencies. With `--feature`, only the feature's node and everything it
//! transitively depends on are listed.

use super::load_graph;
use crate::output::{Output, OutputConfig, OutputFormat, TableDisplay, TableOutput};
use anyhow::{bail, Context, Result};
use featgraph_core::{ComputeGraph, NodeId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// One node, for display.
#[derive(Debug, Serialize)]
pub struct NodeRow {
    pub id: NodeId,
    pub kind: String,
    /// Feature names bound to this node, or the name an external node stands in for.
    pub features: Vec<String>,
    pub dependencies: Vec<NodeId>,
}

#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub nodes: Vec<NodeRow>,
    /// Whether the listed graph is free of dependency cycles.
    pub acyclic: bool,
}

impl InspectReport {
    fn new(graph: &ComputeGraph, feature: Option<&str>) -> Result<Self> {
        let ids: Vec<NodeId> = match feature {
            Some(name) => {
                let def = graph
                    .feature(name)
                    .with_context(|| format!("Feature '{}' is not defined in this graph", name))?;
                if graph.node(def.node_id).is_none() {
                    bail!(
                        "Feature '{}' points at node {}, which does not exist ({} nodes)",
                        name,
                        def.node_id,
                        graph.node_count()
                    );
                }
                let mut ids = graph.upstream(def.node_id);
                ids.push(def.node_id);
                ids.sort_unstable();
                ids
            }
            None => (0..graph.node_count() as NodeId).collect(),
        };

        let mut names: BTreeMap<NodeId, Vec<String>> = BTreeMap::new();
        for (name, def) in graph.feature_names() {
            names.entry(def.node_id).or_default().push(name.clone());
        }

        let nodes = ids
            .into_iter()
            .filter_map(|id| graph.node(id))
            .map(|node| {
                let features = match names.remove(&node.id()) {
                    Some(bound) => bound,
                    None => node.feature_name().map(str::to_string).into_iter().collect(),
                };
                NodeRow {
                    id: node.id(),
                    kind: node.kind().to_string(),
                    features,
                    dependencies: node.dependencies(),
                }
            })
            .collect();

        Ok(Self {
            nodes,
            acyclic: graph.find_cycles().is_empty(),
        })
    }
}

impl TableDisplay for InspectReport {
    fn to_table(&self, config: &OutputConfig) -> String {
        let join = |ids: &[NodeId]| {
            ids.iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };

        let rows: Vec<Vec<String>> = self
            .nodes
            .iter()
            .map(|node| {
                vec![
                    node.id.to_string(),
                    node.kind.clone(),
                    node.features.join(", "),
                    join(&node.dependencies),
                ]
            })
            .collect();

        let headers = ["id", "kind", "features", "depends on"];
        let mut out = TableOutput::from_rows(&headers, &rows, config);
        if !self.acyclic {
            use colored::Colorize;
            out.push_str(&format!("\n{}", "Graph contains dependency cycles".red()));
        }
        out
    }
}

pub fn run(path: &Path, feature: Option<&str>, format: OutputFormat) -> Result<()> {
    let graph = load_graph(path)?;
    let report = InspectReport::new(&graph, feature)
        .with_context(|| format!("Failed to inspect {}", path.display()))?;
    Output::new(report, format).render()
}
