//! Incremental compute graph assembly.
//!
//! [`ComputeGraphBuilder`] owns three tables:
//!
//! - [`NodeTable`]: append-only node list and the only place node ids are assigned
//! - [`FeatureNameIndex`]: feature name to [`FeatureDefinition`], checked eagerly
//!   against the nodes added so far
//! - [`DataSourceIndex`]: data source path to the longest look-back window requested
//!
//! Nodes must be added before the feature names that point at them. `build`
//! snapshots the node table and the feature index into a [`ComputeGraph`]; the
//! builder stays usable afterwards.
//!
//! # Example
//!
//! ```
//! use featgraph_core::{ComputeGraphBuilder, FeatureDefinition, NodeReference};
//! use std::time::Duration;
//!
//! let mut builder = ComputeGraphBuilder::new();
//! let source = builder.add_new_data_source();
//! source.external_source_ref = "/data/members".to_string();
//! let source_id = source.id();
//!
//! let transformation = builder.add_new_transformation();
//! transformation.inputs.push(NodeReference::new(source_id));
//! let feature_id = transformation.id();
//!
//! builder.add_feature_name("member_age", FeatureDefinition::new(feature_id))?;
//! builder.add_data_source("/data/members", Duration::from_secs(86_400));
//!
//! let graph = builder.build()?;
//! assert_eq!(graph.node_count(), 2);
//! # Ok::<(), featgraph_core::GraphError>(())
//! ```

use crate::error::{GraphError, Result};
use crate::graph::ComputeGraph;
use crate::node::{
    Aggregation, AnyNode, DataSource, External, FeatureDefinition, Lookup, NodeId, NodePayload,
    Transformation,
};
use crate::validate::{StructuralValidator, Validator};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Append-only node list. Assigns each node its position as id.
#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    nodes: Vec<AnyNode>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the node's id with the next free one and append it.
    ///
    /// Only the node's own id is written. References inside the payload are
    /// kept as they are, even when they pointed into another graph.
    pub fn add_node(&mut self, mut node: AnyNode) -> NodeId {
        let id = self.peek_next_node_id();
        node.set_id(id);
        self.nodes.push(node);
        id
    }

    /// Insert an empty node of kind `T` and return it for in-place population.
    pub fn add_new<T: NodePayload>(&mut self) -> &mut T {
        let id = self.add_node(T::default().into());
        match T::from_any_mut(&mut self.nodes[id as usize]) {
            Some(node) => node,
            None => unreachable!("node {id} changed kind on insertion"),
        }
    }

    /// The id the next inserted node will get.
    pub fn peek_next_node_id(&self) -> NodeId {
        self.nodes.len() as NodeId
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn as_slice(&self) -> &[AnyNode] {
        &self.nodes
    }
}

/// Feature name bindings of the graph being built.
///
/// Names are bound through [`ComputeGraphBuilder::add_feature_name`], which
/// checks them against the builder's own node table:
///
/// ```compile_fail
/// use featgraph_core::{FeatureDefinition, FeatureNameIndex};
///
/// let mut index = FeatureNameIndex::new();
/// index.insert("f".to_string(), FeatureDefinition::new(7), 100);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FeatureNameIndex {
    features: BTreeMap<String, FeatureDefinition>,
}

impl FeatureNameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `def`, given the number of nodes that currently exist.
    ///
    /// Fails without touching the index when the node does not exist yet or the
    /// name is already bound.
    pub(crate) fn insert(
        &mut self,
        name: String,
        def: FeatureDefinition,
        node_count: NodeId,
    ) -> Result<()> {
        if def.node_id >= node_count {
            return Err(GraphError::InvalidReference {
                node_id: def.node_id,
                node_count,
            });
        }
        match self.features.entry(name) {
            Entry::Occupied(entry) => Err(GraphError::DuplicateFeature {
                name: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(def);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FeatureDefinition> {
        self.features.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, FeatureDefinition> {
        &self.features
    }
}

/// Longest look-back window requested per data source path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSourceIndex {
    windows: BTreeMap<String, Duration>,
}

impl DataSourceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a window for `path`. The stored window only ever grows.
    ///
    /// Returns the window now stored for the path.
    pub fn insert(&mut self, path: String, duration: Duration) -> Duration {
        let stored = self.windows.entry(path).or_insert(duration);
        *stored = (*stored).max(duration);
        *stored
    }

    pub fn get(&self, path: &str) -> Option<Duration> {
        self.windows.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.windows.iter().map(|(path, d)| (path.as_str(), *d))
    }
}

/// Assembles a [`ComputeGraph`] node by node.
///
/// `V` is the validator run by [`build`](Self::build); it defaults to the
/// [`StructuralValidator`].
#[derive(Debug, Clone, Default)]
pub struct ComputeGraphBuilder<V = StructuralValidator> {
    nodes: NodeTable,
    feature_names: FeatureNameIndex,
    data_sources: DataSourceIndex,
    validator: V,
}

impl ComputeGraphBuilder {
    /// A builder validating with the [`StructuralValidator`].
    pub fn new() -> Self {
        Self::with_validator(StructuralValidator)
    }
}

impl<V: Validator> ComputeGraphBuilder<V> {
    pub fn with_validator(validator: V) -> Self {
        Self {
            nodes: NodeTable::new(),
            feature_names: FeatureNameIndex::new(),
            data_sources: DataSourceIndex::new(),
            validator,
        }
    }

    pub fn validator(&self) -> &V {
        &self.validator
    }

    /// Assign `node` the next id and add it to the graph being built.
    ///
    /// Whatever id the node carried before is overwritten. Its dependency
    /// references are NOT rewritten: a node copied from another graph must have
    /// them remapped by the caller, see [`AnyNode::remap_references`].
    pub fn add_node(&mut self, node: AnyNode) -> NodeId {
        let kind = node.kind();
        let id = self.nodes.add_node(node);
        debug!(id, %kind, "added node");
        id
    }

    pub fn add_new_data_source(&mut self) -> &mut DataSource {
        self.add_new()
    }

    pub fn add_new_transformation(&mut self) -> &mut Transformation {
        self.add_new()
    }

    /// Add an empty aggregation. Its `input` must be set before building.
    pub fn add_new_aggregation(&mut self) -> &mut Aggregation {
        self.add_new()
    }

    /// Add an empty lookup. Its `lookup_node` must be set before building.
    pub fn add_new_lookup(&mut self) -> &mut Lookup {
        self.add_new()
    }

    pub fn add_new_external(&mut self) -> &mut External {
        self.add_new()
    }

    fn add_new<T: NodePayload>(&mut self) -> &mut T {
        let kind = T::KIND;
        let node = self.nodes.add_new::<T>();
        debug!(id = node.id(), %kind, "added node");
        node
    }

    /// The id the next added node will get.
    pub fn peek_next_node_id(&self) -> NodeId {
        self.nodes.peek_next_node_id()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[AnyNode] {
        self.nodes.as_slice()
    }

    /// Bind a feature name to an existing node.
    ///
    /// Fails with [`GraphError::InvalidReference`] if the node has not been
    /// added yet and with [`GraphError::DuplicateFeature`] if the name is taken.
    /// On failure the index is unchanged.
    pub fn add_feature_name(
        &mut self,
        name: impl Into<String>,
        def: FeatureDefinition,
    ) -> Result<()> {
        let name = name.into();
        let node_id = def.node_id;
        self.feature_names
            .insert(name.clone(), def, self.nodes.peek_next_node_id())?;
        debug!(feature = %name, node_id, "registered feature name");
        Ok(())
    }

    /// Bind several feature names, in iteration order.
    ///
    /// Stops at the first failing entry. Entries before it stay registered.
    pub fn add_feature_names<I, S>(&mut self, features: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, FeatureDefinition)>,
        S: Into<String>,
    {
        for (name, def) in features {
            self.add_feature_name(name, def)?;
        }
        Ok(())
    }

    pub fn feature_names(&self) -> &FeatureNameIndex {
        &self.feature_names
    }

    /// Request `duration` of look-back for the data source at `path`.
    ///
    /// Repeated requests for a path keep the longest window.
    pub fn add_data_source(&mut self, path: impl Into<String>, duration: Duration) {
        let path = path.into();
        let stored = self.data_sources.insert(path.clone(), duration);
        debug!(path = %path, requested = ?duration, stored = ?stored, "registered data source");
    }

    pub fn data_source_window(&self, path: &str) -> Option<Duration> {
        self.data_sources.get(path)
    }

    pub fn data_sources(&self) -> &DataSourceIndex {
        &self.data_sources
    }

    /// Snapshot the graph and validate it.
    pub fn build(&self) -> Result<ComputeGraph> {
        self.build_with_validation(true)
    }

    /// Snapshot the graph, validating only if `validate` is set.
    ///
    /// Skipping validation is meant for assembling intermediate graphs, such as
    /// the concatenation of several graphs before their external references are
    /// resolved (see [`merge_graphs`](crate::merge::merge_graphs)). Be careful:
    /// an unvalidated graph may carry dangling references or cycles.
    pub fn build_with_validation(&self, validate: bool) -> Result<ComputeGraph> {
        let graph = ComputeGraph::from_parts(
            self.nodes.as_slice().to_vec(),
            self.feature_names.as_map().clone(),
        );
        if validate {
            self.validator.validate(&graph)?;
        }
        debug!(
            nodes = graph.node_count(),
            features = graph.feature_names().len(),
            validated = validate,
            "built compute graph"
        );
        Ok(graph)
    }

    /// Like [`build`](Self::build), but overwrites `reuse` instead of allocating
    /// a new graph value.
    ///
    /// `reuse` is left untouched if validation fails.
    pub fn build_into(&self, reuse: &mut ComputeGraph) -> Result<()> {
        *reuse = self.build()?;
        Ok(())
    }
}

impl<V> fmt::Display for ComputeGraphBuilder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComputeGraphBuilder {{ nodes: {}, features: {{", self.nodes.len())?;
        for (i, (name, def)) in self.feature_names.as_map().iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}: {}", name, def.node_id)?;
        }
        if !self.feature_names.is_empty() {
            write!(f, " ")?;
        }
        write!(f, "}} }}")
    }
}
