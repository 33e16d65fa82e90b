//! Graph plans: declarative input for `featgraph build`.
//!
//! A plan lists nodes in insertion order, the feature names bound to them and
//! the data source windows to request. Plans are JSON, or TOML when the file
//! ends in `.toml`.
//!
//! ```json
//! {
//!   "nodes": [
//!     { "kind": "data_source", "external_source_ref": "/data/members" },
//!     { "kind": "transformation", "inputs": [{ "id": 0 }], "function": { "operator": "age" } }
//!   ],
//!   "features": { "member_age": { "node_id": 1 } },
//!   "data_sources": [{ "path": "/data/members", "window_secs": 86400 }]
//! }
//! ```

use anyhow::{Context, Result};
use featgraph_core::{AnyNode, ComputeGraphBuilder, FeatureDefinition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Look-back window requested for one data source path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceWindow {
    pub path: String,
    pub window_secs: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct GraphPlan {
    /// Nodes in insertion order. Any `id` given here is overwritten by position.
    #[serde(default)]
    pub nodes: Vec<AnyNode>,
    #[serde(default)]
    pub features: BTreeMap<String, FeatureDefinition>,
    #[serde(default)]
    pub data_sources: Vec<DataSourceWindow>,
}

impl GraphPlan {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan: {}", path.display()))?;

        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        if is_toml {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML plan: {}", path.display()))
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON plan: {}", path.display()))
        }
    }

    /// Replay the plan into a fresh builder.
    pub fn into_builder(self) -> featgraph_core::Result<ComputeGraphBuilder> {
        let mut builder = ComputeGraphBuilder::new();
        for node in self.nodes {
            builder.add_node(node);
        }
        builder.add_feature_names(self.features)?;
        for window in self.data_sources {
            builder.add_data_source(window.path, Duration::from_secs(window.window_secs));
        }
        Ok(builder)
    }
}
