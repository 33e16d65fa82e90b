//! Error types for featgraph-core.

use crate::node::{NodeId, NodeKind};
use thiserror::Error;

/// Result type alias for graph building operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors raised while assembling a compute graph.
#[derive(Error, Debug)]
pub enum GraphError {
    /// A feature definition points at a node that has not been added yet.
    #[error("Node id {node_id} is not defined in the graph being built ({node_count} nodes)")]
    InvalidReference {
        /// The referenced node id.
        node_id: NodeId,
        /// Number of nodes in the builder at the time of the call.
        node_count: NodeId,
    },

    /// The feature name is already bound in this builder.
    #[error("Feature '{name}' is already defined in the graph being built")]
    DuplicateFeature {
        /// The feature name that was registered twice.
        name: String,
    },

    /// The validator rejected the finished graph.
    #[error("Graph validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Structural defects reported by a [`Validator`](crate::validate::Validator).
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A node's id does not match its position in the node list.
    #[error("Node at position {position} carries id {id}")]
    IdMismatch { position: NodeId, id: NodeId },

    /// A feature name resolves to a node outside the graph.
    #[error("Feature '{name}' points at node {node_id}, but the graph has {node_count} nodes")]
    FeatureOutOfRange {
        name: String,
        node_id: NodeId,
        node_count: NodeId,
    },

    /// A node payload leaves a required reference unset.
    #[error("{kind} node {node_id} has no {field} set")]
    MissingInput {
        node_id: NodeId,
        kind: NodeKind,
        field: &'static str,
    },

    /// A node payload references a node outside the graph.
    #[error("Node {node_id} references node {target}, but the graph has {node_count} nodes")]
    DanglingReference {
        node_id: NodeId,
        target: NodeId,
        node_count: NodeId,
    },

    /// The dependency edges form a cycle.
    #[error("Dependency cycle through nodes {nodes:?}")]
    Cycle {
        /// Members of the cycle, ascending.
        nodes: Vec<NodeId>,
    },

    /// An external node stands in for a feature the graph defines itself.
    #[error("External node {node_id} refers to feature '{name}' defined in the same graph")]
    ExternalReferenceToSelf { node_id: NodeId, name: String },

    /// Failure reported by a third-party validator.
    #[error("{0}")]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl ValidationError {
    /// Wrap an arbitrary validator failure.
    pub fn custom(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        ValidationError::Custom(err.into())
    }
}
