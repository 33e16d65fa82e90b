//! Merging independently built compute graphs.
//!
//! Graphs built separately refer to each other's features through
//! [`External`](crate::node::External) nodes. Merging happens in two phases:
//!
//! 1. Concatenate: copy every graph's nodes into one builder, shifting each
//!    node's internal references by the id its graph starts at, and re-register
//!    the feature names. The result is built without validation because it may
//!    still hold external nodes pointing at features it now defines itself.
//! 2. Resolve: redirect every reference to such an external node to the node
//!    computing the feature, drop the external nodes and compact the ids. The
//!    final graph is validated.
//!
//! External nodes naming features that none of the inputs define are kept.

use crate::builder::ComputeGraphBuilder;
use crate::error::Result;
use crate::graph::ComputeGraph;
use crate::node::{AnyNode, FeatureDefinition, NodeId};
use crate::validate::Validator;
use tracing::debug;

/// Merge `graphs` into a single validated graph.
///
/// Feature names defined by more than one input fail with
/// [`GraphError::DuplicateFeature`](crate::error::GraphError::DuplicateFeature).
pub fn merge_graphs<'a, V, I>(graphs: I, validator: V) -> Result<ComputeGraph>
where
    V: Validator,
    I: IntoIterator<Item = &'a ComputeGraph>,
{
    let concatenated = concatenate(graphs, &validator)?;
    resolve_externals(&concatenated, validator)
}

fn concatenate<'a, V, I>(graphs: I, validator: &V) -> Result<ComputeGraph>
where
    V: Validator,
    I: IntoIterator<Item = &'a ComputeGraph>,
{
    let mut builder = ComputeGraphBuilder::with_validator(validator);

    for graph in graphs {
        let base = builder.peek_next_node_id();
        for node in graph.nodes() {
            let mut node = node.clone();
            node.remap_references(|id| offset(id, base));
            builder.add_node(node);
        }
        builder.add_feature_names(graph.feature_names().iter().map(|(name, def)| {
            let mut def = def.clone();
            def.node_id = offset(def.node_id, base);
            (name.clone(), def)
        }))?;
        debug!(base, nodes = graph.node_count(), "appended graph");
    }

    builder.build_with_validation(false)
}

fn resolve_externals<V: Validator>(graph: &ComputeGraph, validator: V) -> Result<ComputeGraph> {
    let node_count = graph.node_count();

    // Where each node's consumers should point after resolution, in the
    // concatenated id space.
    let mut redirect: Vec<NodeId> = (0..node_count as NodeId).collect();
    for node in graph.nodes() {
        if let AnyNode::External(external) = node {
            if let Some(def) = graph.feature(&external.name) {
                redirect[external.id() as usize] = def.node_id;
            }
        }
    }

    let target: Vec<NodeId> = (0..node_count as NodeId)
        .map(|id| follow(&redirect, id))
        .collect();

    // A node survives when nothing redirects it elsewhere.
    let mut new_ids: Vec<Option<NodeId>> = vec![None; node_count];
    let mut kept: NodeId = 0;
    for (old, &resolved) in target.iter().enumerate() {
        if resolved as usize == old {
            new_ids[old] = Some(kept);
            kept += 1;
        }
    }

    let remap = |id: NodeId| -> NodeId {
        match target.get(id as usize) {
            Some(&resolved) => new_ids[resolved as usize].unwrap_or(resolved),
            // Keep dangling references dangling so validation still reports them
            None => id - node_count as NodeId + kept,
        }
    };

    let mut builder = ComputeGraphBuilder::with_validator(validator);
    for (old, node) in graph.nodes().iter().enumerate() {
        if new_ids[old].is_none() {
            continue;
        }
        let mut node = node.clone();
        node.remap_references(remap);
        builder.add_node(node);
    }
    builder.add_feature_names(graph.feature_names().iter().map(|(name, def)| {
        (
            name.clone(),
            FeatureDefinition::with_version(remap(def.node_id), def.feature_version.clone()),
        )
    }))?;

    debug!(
        before = node_count,
        after = builder.node_count(),
        "resolved internal external references"
    );
    builder.build()
}

/// Shift `id` into the concatenated id space.
///
/// Saturates so that out-of-range ids stay out of range instead of wrapping
/// onto real nodes.
fn offset(id: NodeId, base: NodeId) -> NodeId {
    id.saturating_add(base)
}

/// Follow redirects from `id` until reaching a node that points at itself.
///
/// Redirect loops (externals resolving to each other) leave `id` in place.
fn follow(redirect: &[NodeId], id: NodeId) -> NodeId {
    let mut current = id;
    for _ in 0..redirect.len() {
        let next = redirect[current as usize];
        if next == current {
            return current;
        }
        current = next;
    }
    id
}
