//! Command implementations for the featgraph CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod build;
pub mod inspect;
pub mod merge;
pub mod validate;

use anyhow::{Context, Result};
use featgraph_core::{ComputeGraph, NodeId};
use serde::Serialize;
use std::path::Path;

/// Read a serialized compute graph. The graph is not validated.
pub fn load_graph(path: &Path) -> Result<ComputeGraph> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read graph: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse graph: {}", path.display()))
}

/// Write a graph as pretty-printed JSON.
pub fn write_graph(path: &Path, graph: &ComputeGraph) -> Result<()> {
    let json = serde_json::to_string_pretty(graph).context("Failed to serialize graph")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write graph: {}", path.display()))?;
    tracing::info!("Wrote {} nodes to {}", graph.node_count(), path.display());
    Ok(())
}

/// One feature name binding, for display.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureRow {
    pub name: String,
    pub node_id: NodeId,
    pub kind: Option<String>,
}

/// Feature bindings of `graph`, sorted by name.
pub fn feature_rows(graph: &ComputeGraph) -> Vec<FeatureRow> {
    graph
        .feature_names()
        .iter()
        .map(|(name, def)| FeatureRow {
            name: name.clone(),
            node_id: def.node_id,
            kind: graph.node(def.node_id).map(|n| n.kind().to_string()),
        })
        .collect()
}

pub fn feature_table_rows(features: &[FeatureRow]) -> Vec<Vec<String>> {
    features
        .iter()
        .map(|f| {
            vec![
                f.name.clone(),
                f.node_id.to_string(),
                f.kind.clone().unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect()
}
