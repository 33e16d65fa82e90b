//! Node model for compute graphs.
//!
//! A compute graph is a flat, ordered list of [`AnyNode`]s. Dependency edges are
//! not stored separately: they live inside the node payloads as plain
//! [`NodeId`]s (see [`NodeReference`]). Those ids carry no ownership and only
//! mean something relative to the graph the node currently sits in, so copying
//! a node into another graph requires an explicit [`AnyNode::remap_references`].
//!
//! Node ids are written by the builder on insertion. Payload structs keep the
//! id field crate-private: callers can read it through `id()` but can never
//! assign one themselves.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Position of a node inside its graph.
pub type NodeId = u32;

/// Points at one of the keys of the referencing node, by position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyReference {
    pub position: u32,
}

/// A dependency edge: the referenced node plus the keys it is joined on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReference {
    pub id: NodeId,
    #[serde(default)]
    pub key_references: Vec<KeyReference>,
}

impl NodeReference {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            key_references: Vec::new(),
        }
    }

    /// Reference `id`, joining on the given key positions of the referencing node.
    pub fn with_keys(id: NodeId, positions: impl IntoIterator<Item = u32>) -> Self {
        Self {
            id,
            key_references: positions
                .into_iter()
                .map(|position| KeyReference { position })
                .collect(),
        }
    }
}

/// The nodes producing the key columns of a node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcreteKey {
    pub key: Vec<NodeId>,
}

/// How rows of a data source relate to time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceType {
    /// Snapshot table, latest row per key wins
    #[default]
    Update,
    /// Append-only event log
    Event,
    /// Values supplied by the observation data at request time
    Context,
}

/// Language of a data source's key expression.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyExpressionType {
    #[default]
    Mvel,
    Sql,
    UserDefinedFunction,
}

/// Where the event time of a data source row comes from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampColumn {
    pub definition: String,
    pub format: String,
}

/// Opaque metadata attached to a produced feature.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVersion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
}

/// Binds a feature name to the node computing it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureDefinition {
    pub node_id: NodeId,
    #[serde(default)]
    pub feature_version: FeatureVersion,
}

impl FeatureDefinition {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            feature_version: FeatureVersion::default(),
        }
    }

    pub fn with_version(node_id: NodeId, feature_version: FeatureVersion) -> Self {
        Self {
            node_id,
            feature_version,
        }
    }
}

/// A raw input table or stream.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    #[serde(default)]
    pub(crate) id: NodeId,
    #[serde(default)]
    pub source_type: DataSourceType,
    /// Path or name of the physical source.
    #[serde(default)]
    pub external_source_ref: String,
    #[serde(default)]
    pub key_expression: String,
    #[serde(default)]
    pub key_expression_type: KeyExpressionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename_timestamp_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_column: Option<TimestampColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concrete_key: Option<ConcreteKey>,
}

/// Operator applied to a transformation's inputs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationFunction {
    pub operator: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// Row-level computation over one or more inputs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    #[serde(default)]
    pub(crate) id: NodeId,
    #[serde(default)]
    pub inputs: Vec<NodeReference>,
    #[serde(default)]
    pub function: TransformationFunction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_version: Option<FeatureVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concrete_key: Option<ConcreteKey>,
}

/// Windowed aggregation operator, e.g. `sliding_window_sum` with a `window` parameter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationFunction {
    pub operator: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// Aggregation of a single input over time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    #[serde(default)]
    pub(crate) id: NodeId,
    /// Node being aggregated. Must be set before the graph is built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<NodeReference>,
    #[serde(default)]
    pub function: AggregationFunction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_version: Option<FeatureVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concrete_key: Option<ConcreteKey>,
}

/// One component of a lookup key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKey {
    /// Key computed by another node
    Node(NodeReference),
    /// Key taken directly from the lookup's own keys
    Key(KeyReference),
}

/// Uses the values of some nodes as the key into another node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Lookup {
    #[serde(default)]
    pub(crate) id: NodeId,
    #[serde(default)]
    pub lookup_key: Vec<LookupKey>,
    /// Node whose values are looked up. Must be set before the graph is built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_node: Option<NodeId>,
    /// Aggregation applied when a key maps to several values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_version: Option<FeatureVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concrete_key: Option<ConcreteKey>,
}

/// Placeholder for a feature defined in some other graph, by name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct External {
    #[serde(default)]
    pub(crate) id: NodeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concrete_key: Option<ConcreteKey>,
}

/// Kind tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    DataSource,
    Transformation,
    Aggregation,
    Lookup,
    External,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::DataSource => "data_source",
            NodeKind::Transformation => "transformation",
            NodeKind::Aggregation => "aggregation",
            NodeKind::Lookup => "lookup",
            NodeKind::External => "external",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Any node of a compute graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnyNode {
    DataSource(DataSource),
    Transformation(Transformation),
    Aggregation(Aggregation),
    Lookup(Lookup),
    External(External),
}

/// A typed node payload that can be wrapped into [`AnyNode`].
///
/// Implemented for every node kind; lets the builder hand back the concrete
/// payload after inserting it.
pub trait NodePayload: Default + Into<AnyNode> {
    const KIND: NodeKind;

    fn id(&self) -> NodeId;

    /// Borrow the payload back out of its wrapper, if the kinds match.
    fn from_any_mut(node: &mut AnyNode) -> Option<&mut Self>;
}

macro_rules! node_payload {
    ($($kind:ident),* $(,)?) => {
        $(
            impl $kind {
                /// Id assigned by the builder that inserted this node.
                pub fn id(&self) -> NodeId {
                    self.id
                }
            }

            impl From<$kind> for AnyNode {
                fn from(node: $kind) -> Self {
                    AnyNode::$kind(node)
                }
            }

            impl NodePayload for $kind {
                const KIND: NodeKind = NodeKind::$kind;

                fn id(&self) -> NodeId {
                    self.id
                }

                fn from_any_mut(node: &mut AnyNode) -> Option<&mut Self> {
                    match node {
                        AnyNode::$kind(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

node_payload!(DataSource, Transformation, Aggregation, Lookup, External);

impl AnyNode {
    pub fn id(&self) -> NodeId {
        match self {
            AnyNode::DataSource(n) => n.id,
            AnyNode::Transformation(n) => n.id,
            AnyNode::Aggregation(n) => n.id,
            AnyNode::Lookup(n) => n.id,
            AnyNode::External(n) => n.id,
        }
    }

    /// Identity is only ever written on insertion into a graph.
    pub(crate) fn set_id(&mut self, id: NodeId) {
        match self {
            AnyNode::DataSource(n) => n.id = id,
            AnyNode::Transformation(n) => n.id = id,
            AnyNode::Aggregation(n) => n.id = id,
            AnyNode::Lookup(n) => n.id = id,
            AnyNode::External(n) => n.id = id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            AnyNode::DataSource(_) => NodeKind::DataSource,
            AnyNode::Transformation(_) => NodeKind::Transformation,
            AnyNode::Aggregation(_) => NodeKind::Aggregation,
            AnyNode::Lookup(_) => NodeKind::Lookup,
            AnyNode::External(_) => NodeKind::External,
        }
    }

    /// Feature name recorded on the node itself, if any.
    ///
    /// For external nodes this is the name of the feature they stand in for.
    pub fn feature_name(&self) -> Option<&str> {
        match self {
            AnyNode::DataSource(_) => None,
            AnyNode::Transformation(n) => n.feature_name.as_deref(),
            AnyNode::Aggregation(n) => n.feature_name.as_deref(),
            AnyNode::Lookup(n) => n.feature_name.as_deref(),
            AnyNode::External(n) => Some(&n.name),
        }
    }

    fn concrete_key(&self) -> Option<&ConcreteKey> {
        match self {
            AnyNode::DataSource(n) => n.concrete_key.as_ref(),
            AnyNode::Transformation(n) => n.concrete_key.as_ref(),
            AnyNode::Aggregation(n) => n.concrete_key.as_ref(),
            AnyNode::Lookup(n) => n.concrete_key.as_ref(),
            AnyNode::External(n) => n.concrete_key.as_ref(),
        }
    }

    /// Nodes whose output this node consumes, in payload order.
    ///
    /// May contain duplicates and ids that do not exist in the graph; the
    /// validator is what rejects those.
    pub fn dependencies(&self) -> Vec<NodeId> {
        match self {
            AnyNode::DataSource(_) | AnyNode::External(_) => Vec::new(),
            AnyNode::Transformation(n) => n.inputs.iter().map(|r| r.id).collect(),
            AnyNode::Aggregation(n) => n.input.iter().map(|r| r.id).collect(),
            AnyNode::Lookup(n) => n
                .lookup_key
                .iter()
                .filter_map(|key| match key {
                    LookupKey::Node(r) => Some(r.id),
                    LookupKey::Key(_) => None,
                })
                .chain(n.lookup_node)
                .collect(),
        }
    }

    /// Name of a required reference field the payload leaves unset.
    pub fn missing_input(&self) -> Option<&'static str> {
        match self {
            AnyNode::Aggregation(n) if n.input.is_none() => Some("input"),
            AnyNode::Lookup(n) if n.lookup_node.is_none() => Some("lookup_node"),
            _ => None,
        }
    }

    /// Every node id mentioned by the payload: dependencies plus concrete key nodes.
    pub fn references(&self) -> Vec<NodeId> {
        let mut refs = self.dependencies();
        if let Some(key) = self.concrete_key() {
            refs.extend(key.key.iter().copied());
        }
        refs
    }

    /// Rewrite every node id mentioned by the payload. The node's own id is untouched.
    pub fn remap_references(&mut self, mut f: impl FnMut(NodeId) -> NodeId) {
        let concrete_key = match self {
            AnyNode::DataSource(n) => &mut n.concrete_key,
            AnyNode::Transformation(n) => {
                for input in &mut n.inputs {
                    input.id = f(input.id);
                }
                &mut n.concrete_key
            }
            AnyNode::Aggregation(n) => {
                if let Some(input) = &mut n.input {
                    input.id = f(input.id);
                }
                &mut n.concrete_key
            }
            AnyNode::Lookup(n) => {
                for key in &mut n.lookup_key {
                    if let LookupKey::Node(r) = key {
                        r.id = f(r.id);
                    }
                }
                if let Some(lookup_node) = &mut n.lookup_node {
                    *lookup_node = f(*lookup_node);
                }
                &mut n.concrete_key
            }
            AnyNode::External(n) => &mut n.concrete_key,
        };
        if let Some(key) = concrete_key {
            for id in &mut key.key {
                *id = f(*id);
            }
        }
    }
}
