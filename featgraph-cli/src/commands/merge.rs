//! Merge command - Combine graphs built separately
//!
//! Concatenates the input graphs, points every external reference to a feature
//! defined by one of the inputs at the node computing it, and validates the
//! result.

use super::{feature_rows, feature_table_rows, load_graph, write_graph, FeatureRow};
use crate::output::{Output, OutputConfig, OutputFormat, TableDisplay, TableOutput};
use anyhow::{Context, Result};
use colored::Colorize;
use featgraph_core::{merge_graphs, AnyNode, ComputeGraph, StructuralValidator};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Result of a successful merge.
#[derive(Debug, Serialize)]
pub struct MergeSummary {
    pub inputs: usize,
    pub input_nodes: usize,
    pub nodes: usize,
    pub features: Vec<FeatureRow>,
    /// Names of external features no input defines.
    pub unresolved_externals: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl MergeSummary {
    fn new(inputs: &[ComputeGraph], merged: &ComputeGraph, output: Option<&Path>) -> Self {
        let unresolved_externals = merged
            .nodes()
            .iter()
            .filter_map(|node| match node {
                AnyNode::External(external) => Some(external.name.clone()),
                _ => None,
            })
            .collect();

        Self {
            inputs: inputs.len(),
            input_nodes: inputs.iter().map(ComputeGraph::node_count).sum(),
            nodes: merged.node_count(),
            features: feature_rows(merged),
            unresolved_externals,
            output: output.map(|p| p.display().to_string()),
        }
    }
}

impl TableDisplay for MergeSummary {
    fn to_table(&self, config: &OutputConfig) -> String {
        let mut pairs = vec![
            ("inputs", self.inputs.to_string()),
            ("nodes", format!("{} -> {}", self.input_nodes, self.nodes)),
            ("features", self.features.len().to_string()),
        ];
        if let Some(output) = &self.output {
            pairs.push(("written to", output.clone()));
        }

        let mut out = TableOutput::format_key_value(&pairs);

        if !self.features.is_empty() {
            out.push_str(&format!("\n\n{}\n", "Features".bold()));
            out.push_str(&TableOutput::from_rows(
                &["feature", "node", "kind"],
                &feature_table_rows(&self.features),
                config,
            ));
        }

        if !self.unresolved_externals.is_empty() {
            out.push_str(&format!(
                "\n\n{} {}",
                "Unresolved externals:".yellow().bold(),
                self.unresolved_externals.join(", ")
            ));
        }

        out
    }
}

pub fn run(paths: &[PathBuf], output: Option<&Path>, format: OutputFormat) -> Result<()> {
    let graphs = paths
        .iter()
        .map(|path| load_graph(path))
        .collect::<Result<Vec<_>>>()?;

    let merged = merge_graphs(&graphs, StructuralValidator)
        .with_context(|| format!("Failed to merge {} graphs", graphs.len()))?;

    if let Some(path) = output {
        write_graph(path, &merged)?;
    }

    Output::new(MergeSummary::new(&graphs, &merged, output), format).render()
}
