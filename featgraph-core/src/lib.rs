//! featgraph core - building feature computation graphs.
//!
//! A compute graph describes how features are derived: raw data sources feed
//! transformations, aggregations and lookups, and features defined in other
//! graphs are pulled in through external nodes. This crate assembles such
//! graphs; it never executes them.
//!
//! # Features
//!
//! - **Stable node identity**: ids are dense, assigned in insertion order and never change
//! - **Eager name checks**: feature names must point at nodes that already exist
//! - **Data source windows**: the longest look-back requested per path is kept
//! - **Pluggable validation**: any [`Validator`] can vet a finished graph
//! - **Merging**: combine independently built graphs and resolve their external references
//!
//! # Usage
//!
//! ```
//! use featgraph_core::{ComputeGraphBuilder, FeatureDefinition, NodeReference};
//!
//! let mut builder = ComputeGraphBuilder::new();
//! let source_id = builder.add_new_data_source().id();
//! let sum = builder.add_new_aggregation();
//! sum.input = Some(NodeReference::new(source_id));
//! sum.function.operator = "sliding_window_sum".to_string();
//! let sum_id = sum.id();
//! builder.add_feature_name("clicks_7d", FeatureDefinition::new(sum_id))?;
//!
//! let graph = builder.build()?;
//! assert_eq!(graph.feature("clicks_7d").map(|d| d.node_id), Some(1));
//! # Ok::<(), featgraph_core::GraphError>(())
//! ```

pub mod builder;
pub mod error;
pub mod graph;
pub mod merge;
pub mod node;
pub mod validate;

pub use builder::{ComputeGraphBuilder, DataSourceIndex, FeatureNameIndex, NodeTable};
pub use error::{GraphError, Result, ValidationError};
pub use graph::ComputeGraph;
pub use merge::merge_graphs;
pub use node::{
    Aggregation, AggregationFunction, AnyNode, ConcreteKey, DataSource, DataSourceType, External,
    FeatureDefinition, FeatureVersion, KeyExpressionType, KeyReference, Lookup, LookupKey, NodeId,
    NodeKind, NodePayload, NodeReference, TimestampColumn, Transformation,
    TransformationFunction,
};
pub use validate::{validate, StructuralValidator, Validator};
