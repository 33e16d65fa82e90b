//! Graph validation.
//!
//! The builder only depends on the [`Validator`] contract: a pure,
//! deterministic check of a finished [`ComputeGraph`]. [`StructuralValidator`]
//! is the implementation used by default.

use crate::error::ValidationError;
use crate::graph::ComputeGraph;
use crate::node::{AnyNode, NodeId};
use tracing::trace;

/// Accepts a finished graph or reports what is structurally wrong with it.
///
/// Implementations must not depend on anything but the graph passed in.
pub trait Validator {
    fn validate(&self, graph: &ComputeGraph) -> Result<(), ValidationError>;
}

impl<V: Validator + ?Sized> Validator for &V {
    fn validate(&self, graph: &ComputeGraph) -> Result<(), ValidationError> {
        (**self).validate(graph)
    }
}

impl<V: Validator + ?Sized> Validator for Box<V> {
    fn validate(&self, graph: &ComputeGraph) -> Result<(), ValidationError> {
        (**self).validate(graph)
    }
}

/// Checks graph identity and reference invariants.
///
/// In order, stopping at the first defect:
/// 1. node ids are sequential and match their positions
/// 2. every feature name resolves to a node of the graph
/// 3. aggregations and lookups have their input set
/// 4. every node-internal reference resolves to a node of the graph
/// 5. dependencies are acyclic
/// 6. no external node stands in for a feature the graph defines itself
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl StructuralValidator {
    fn check_ids(graph: &ComputeGraph) -> Result<(), ValidationError> {
        for (position, node) in graph.nodes().iter().enumerate() {
            let position = position as NodeId;
            if node.id() != position {
                return Err(ValidationError::IdMismatch {
                    position,
                    id: node.id(),
                });
            }
        }
        Ok(())
    }

    fn check_feature_names(graph: &ComputeGraph) -> Result<(), ValidationError> {
        let node_count = graph.node_count() as NodeId;
        for (name, def) in graph.feature_names() {
            if def.node_id >= node_count {
                return Err(ValidationError::FeatureOutOfRange {
                    name: name.clone(),
                    node_id: def.node_id,
                    node_count,
                });
            }
        }
        Ok(())
    }

    fn check_inputs(graph: &ComputeGraph) -> Result<(), ValidationError> {
        for node in graph.nodes() {
            if let Some(field) = node.missing_input() {
                return Err(ValidationError::MissingInput {
                    node_id: node.id(),
                    kind: node.kind(),
                    field,
                });
            }
        }
        Ok(())
    }

    fn check_references(graph: &ComputeGraph) -> Result<(), ValidationError> {
        let node_count = graph.node_count() as NodeId;
        for node in graph.nodes() {
            if let Some(target) = node.references().into_iter().find(|&r| r >= node_count) {
                return Err(ValidationError::DanglingReference {
                    node_id: node.id(),
                    target,
                    node_count,
                });
            }
        }
        Ok(())
    }

    fn check_acyclic(graph: &ComputeGraph) -> Result<(), ValidationError> {
        match graph.find_cycles().into_iter().next() {
            Some(nodes) => Err(ValidationError::Cycle { nodes }),
            None => Ok(()),
        }
    }

    fn check_externals(graph: &ComputeGraph) -> Result<(), ValidationError> {
        for node in graph.nodes() {
            if let AnyNode::External(external) = node {
                if graph.feature(&external.name).is_some() {
                    return Err(ValidationError::ExternalReferenceToSelf {
                        node_id: external.id(),
                        name: external.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Validator for StructuralValidator {
    fn validate(&self, graph: &ComputeGraph) -> Result<(), ValidationError> {
        trace!(
            nodes = graph.node_count(),
            features = graph.feature_names().len(),
            "validating compute graph"
        );
        Self::check_ids(graph)?;
        Self::check_feature_names(graph)?;
        Self::check_inputs(graph)?;
        Self::check_references(graph)?;
        Self::check_acyclic(graph)?;
        Self::check_externals(graph)
    }
}

/// Validate `graph` with the [`StructuralValidator`].
pub fn validate(graph: &ComputeGraph) -> Result<(), ValidationError> {
    StructuralValidator.validate(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{
        Aggregation, ConcreteKey, DataSource, External, FeatureDefinition, Lookup, NodeKind,
        NodeReference, Transformation,
    };
    use std::collections::BTreeMap;

    fn graph_of(nodes: Vec<AnyNode>, features: &[(&str, NodeId)]) -> ComputeGraph {
        let nodes = nodes
            .into_iter()
            .enumerate()
            .map(|(i, mut n)| {
                n.set_id(i as NodeId);
                n
            })
            .collect();
        let features = features
            .iter()
            .map(|(name, id)| (name.to_string(), FeatureDefinition::new(*id)))
            .collect::<BTreeMap<_, _>>();
        ComputeGraph::from_parts(nodes, features)
    }

    fn source() -> AnyNode {
        AnyNode::from(DataSource::default())
    }

    fn transformation(inputs: &[NodeId]) -> AnyNode {
        AnyNode::from(Transformation {
            inputs: inputs.iter().copied().map(NodeReference::new).collect(),
            ..Transformation::default()
        })
    }

    #[test]
    fn test_valid_graph() {
        let graph = graph_of(vec![source(), transformation(&[0])], &[("f1", 1)]);
        assert!(validate(&graph).is_ok());
    }

    #[test]
    fn test_empty_graph_is_valid() {
        assert!(validate(&ComputeGraph::default()).is_ok());
    }

    #[test]
    fn test_id_mismatch_reports_position() {
        let mut nodes = vec![source(), source()];
        nodes[1].set_id(5);
        let graph = ComputeGraph::from_parts(nodes, BTreeMap::new());

        assert!(matches!(
            validate(&graph),
            Err(ValidationError::IdMismatch { position: 1, id: 5 })
        ));
    }

    #[test]
    fn test_feature_out_of_range() {
        let graph = graph_of(vec![source()], &[("ghost", 1)]);
        assert!(matches!(
            validate(&graph),
            Err(ValidationError::FeatureOutOfRange { node_id: 1, node_count: 1, .. })
        ));
    }

    #[test]
    fn test_dangling_reference() {
        let graph = graph_of(vec![source(), transformation(&[0, 7])], &[]);
        assert!(matches!(
            validate(&graph),
            Err(ValidationError::DanglingReference { node_id: 1, target: 7, node_count: 2 })
        ));
    }

    #[test]
    fn test_dangling_concrete_key() {
        let node = AnyNode::from(DataSource {
            concrete_key: Some(ConcreteKey { key: vec![3] }),
            ..DataSource::default()
        });
        let graph = graph_of(vec![node], &[]);
        assert!(matches!(
            validate(&graph),
            Err(ValidationError::DanglingReference { target: 3, .. })
        ));
    }

    #[test]
    fn test_unset_aggregation_input() {
        // Node 0 must not be mistaken for the input
        let graph = graph_of(vec![AnyNode::from(Aggregation::default())], &[]);
        assert!(matches!(
            validate(&graph),
            Err(ValidationError::MissingInput {
                node_id: 0,
                kind: NodeKind::Aggregation,
                field: "input",
            })
        ));
    }

    #[test]
    fn test_unset_lookup_node() {
        let graph = graph_of(vec![source(), AnyNode::from(Lookup::default())], &[]);
        assert!(matches!(
            validate(&graph),
            Err(ValidationError::MissingInput { node_id: 1, field: "lookup_node", .. })
        ));
    }

    #[test]
    fn test_cycle() {
        let agg = AnyNode::from(Aggregation {
            input: Some(NodeReference::new(2)),
            ..Aggregation::default()
        });
        let graph = graph_of(vec![source(), agg, transformation(&[0, 1])], &[]);

        match validate(&graph) {
            Err(ValidationError::Cycle { nodes }) => assert_eq!(nodes, vec![1, 2]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_loop() {
        let graph = graph_of(vec![transformation(&[0])], &[]);
        assert!(matches!(
            validate(&graph),
            Err(ValidationError::Cycle { nodes }) if nodes == vec![0]
        ));
    }

    #[test]
    fn test_external_reference_to_self() {
        let external = AnyNode::from(External {
            name: "f1".to_string(),
            ..External::default()
        });
        let graph = graph_of(
            vec![source(), transformation(&[0]), external, transformation(&[2])],
            &[("f1", 1)],
        );
        assert!(matches!(
            validate(&graph),
            Err(ValidationError::ExternalReferenceToSelf { node_id: 2, .. })
        ));
    }

    #[test]
    fn test_unresolved_external_is_allowed() {
        let external = AnyNode::from(External {
            name: "elsewhere".to_string(),
            ..External::default()
        });
        let graph = graph_of(vec![external, transformation(&[0])], &[("f1", 1)]);
        assert!(validate(&graph).is_ok());
    }

    #[test]
    fn test_validator_through_reference_and_box() {
        let graph = graph_of(vec![source()], &[]);
        let boxed: Box<dyn Validator> = Box::new(StructuralValidator);
        assert!(boxed.validate(&graph).is_ok());
        assert!((&StructuralValidator).validate(&graph).is_ok());
    }
}
