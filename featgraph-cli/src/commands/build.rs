//! Build command - Assemble a compute graph from a plan
//!
//! Replays the plan's nodes, feature names and data source windows into a
//! builder, builds (and by default validates) the graph, and optionally writes
//! it out as JSON.

use super::{feature_rows, feature_table_rows, write_graph, FeatureRow};
use crate::output::{Output, OutputConfig, OutputFormat, TableDisplay, TableOutput};
use crate::plan::{DataSourceWindow, GraphPlan};
use anyhow::{Context, Result};
use colored::Colorize;
use featgraph_core::{ComputeGraph, DataSourceIndex};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Result of a successful build.
#[derive(Debug, Serialize)]
pub struct BuildSummary {
    pub nodes: usize,
    pub validated: bool,
    pub features: Vec<FeatureRow>,
    pub data_sources: Vec<DataSourceWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl BuildSummary {
    fn new(
        graph: &ComputeGraph,
        data_sources: &DataSourceIndex,
        validated: bool,
        output: Option<&Path>,
    ) -> Self {
        Self {
            nodes: graph.node_count(),
            validated,
            features: feature_rows(graph),
            data_sources: data_sources
                .iter()
                .map(|(path, window)| DataSourceWindow {
                    path: path.to_string(),
                    window_secs: window.as_secs(),
                })
                .collect(),
            output: output.map(|p| p.display().to_string()),
        }
    }
}

impl TableDisplay for BuildSummary {
    fn to_table(&self, config: &OutputConfig) -> String {
        let mut out = String::new();

        let status = if self.validated {
            "validated".green().to_string()
        } else {
            "not validated".yellow().to_string()
        };
        let mut pairs = vec![
            ("nodes", self.nodes.to_string()),
            ("features", self.features.len().to_string()),
            ("status", status),
        ];
        if let Some(output) = &self.output {
            pairs.push(("written to", output.clone()));
        }
        out.push_str(&TableOutput::format_key_value(&pairs));

        if !self.features.is_empty() {
            out.push_str(&format!("\n\n{}\n", "Features".bold()));
            out.push_str(&TableOutput::from_rows(
                &["feature", "node", "kind"],
                &feature_table_rows(&self.features),
                config,
            ));
        }

        if !self.data_sources.is_empty() {
            let rows: Vec<Vec<String>> = self
                .data_sources
                .iter()
                .map(|ds| vec![ds.path.clone(), format!("{}s", ds.window_secs)])
                .collect();
            out.push_str(&format!("\n\n{}\n", "Data sources".bold()));
            out.push_str(&TableOutput::from_rows(&["path", "window"], &rows, config));
        }

        out
    }
}

pub fn run(
    plan_path: &Path,
    validate: bool,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let plan = GraphPlan::load(plan_path)?;
    let builder = plan
        .into_builder()
        .with_context(|| format!("Failed to assemble plan: {}", plan_path.display()))?;
    debug!("{}", builder);

    let graph = builder
        .build_with_validation(validate)
        .with_context(|| format!("Failed to build graph from {}", plan_path.display()))?;

    if let Some(path) = output {
        write_graph(path, &graph)?;
    }

    let summary = BuildSummary::new(&graph, builder.data_sources(), validate, output);
    Output::new(summary, format).render()
}
