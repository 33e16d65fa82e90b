//! Validate command - Check a serialized compute graph
//!
//! Runs the structural validator over a graph file and exits non-zero if it
//! finds a defect.

use super::load_graph;
use crate::output::{Output, OutputConfig, OutputFormat, TableDisplay, TableOutput};
use anyhow::Result;
use colored::Colorize;
use featgraph_core::ComputeGraph;
use serde::Serialize;
use std::path::Path;

/// Outcome of validating one graph file.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub path: String,
    pub valid: bool,
    pub nodes: usize,
    pub features: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationReport {
    fn new(path: &Path, graph: &ComputeGraph, error: Option<String>) -> Self {
        Self {
            path: path.display().to_string(),
            valid: error.is_none(),
            nodes: graph.node_count(),
            features: graph.feature_names().len(),
            error,
        }
    }
}

impl TableDisplay for ValidationReport {
    fn to_table(&self, _config: &OutputConfig) -> String {
        let verdict = match &self.error {
            None => "VALID".green().bold().to_string(),
            Some(_) => "INVALID".red().bold().to_string(),
        };
        let mut pairs = vec![
            ("graph", self.path.clone()),
            ("result", verdict),
            ("nodes", self.nodes.to_string()),
            ("features", self.features.to_string()),
        ];
        if let Some(error) = &self.error {
            pairs.push(("error", error.clone()));
        }
        TableOutput::format_key_value(&pairs)
    }
}

pub fn run(path: &Path, format: OutputFormat) -> Result<()> {
    let graph = load_graph(path)?;
    let result = featgraph_core::validate(&graph);

    let error = result.as_ref().err().map(|e| e.to_string());
    let report = ValidationReport::new(path, &graph, error);
    Output::new(report, format).render()?;

    result.map_err(|e| {
        anyhow::Error::new(e).context(format!("{} is not a valid compute graph", path.display()))
    })
}
