//! Schema-bound fluent query builder.

use std::sync::Arc;

use vigil_core::{Result, VigilError};
use vigil_schema::{Schema, SchemaRegistry};

use crate::node::{EdgeFilter, QueryNode, TraversalDirection};
use crate::predicate::{IntCmp, Operator, Predicate, StrCmp};

/// A generic query builder bound to one registered node type.
///
/// Every `with_*` call validates the referenced property or edge against the
/// bound schema and fails fast with `InvalidPredicate` on a mismatch.
/// Construction is pure; `compile()` freezes the accumulated tree.
#[derive(Clone)]
pub struct QueryBuilder {
    registry: Arc<SchemaRegistry>,
    schema: Schema,
    node: QueryNode,
}

impl QueryBuilder {
    /// Bind a builder to `type_name`. Fails with `UnknownType` if the type
    /// was never registered.
    pub fn new(registry: &Arc<SchemaRegistry>, type_name: &str) -> Result<Self> {
        let schema = registry.lookup(type_name)?;
        Ok(Self {
            registry: Arc::clone(registry),
            node: QueryNode::empty(type_name),
            schema,
        })
    }

    pub fn root_type(&self) -> &str {
        &self.node.root_type
    }

    /// Add string predicates on `property`, all conjunctive.
    pub fn with_str_prop(
        self,
        property: &str,
        cmps: impl IntoIterator<Item = StrCmp>,
    ) -> Result<Self> {
        self.push_predicates(property, cmps.into_iter().map(Operator::Str), false)
    }

    /// Add negated string predicates on `property`.
    pub fn with_negated_str_prop(
        self,
        property: &str,
        cmps: impl IntoIterator<Item = StrCmp>,
    ) -> Result<Self> {
        self.push_predicates(property, cmps.into_iter().map(Operator::Str), true)
    }

    /// Add integer predicates on `property`, all conjunctive.
    pub fn with_int_prop(
        self,
        property: &str,
        cmps: impl IntoIterator<Item = IntCmp>,
    ) -> Result<Self> {
        self.push_predicates(property, cmps.into_iter().map(Operator::Int), false)
    }

    /// Add negated integer predicates on `property`.
    pub fn with_negated_int_prop(
        self,
        property: &str,
        cmps: impl IntoIterator<Item = IntCmp>,
    ) -> Result<Self> {
        self.push_predicates(property, cmps.into_iter().map(Operator::Int), true)
    }

    fn push_predicates(
        mut self,
        property: &str,
        ops: impl Iterator<Item = Operator>,
        negated: bool,
    ) -> Result<Self> {
        let declared = match self.schema.property(property) {
            Some(prop) => *prop,
            None => {
                let reason = if self.schema.edge(property).is_some() {
                    "is an edge, not a property".to_string()
                } else {
                    "unknown property".to_string()
                };
                return Err(self.invalid(property, reason));
            }
        };
        for op in ops {
            if op.primitive() != declared.primitive {
                return Err(self.invalid(
                    property,
                    format!(
                        "operator expects {:?} but property is {:?}",
                        op.primitive(),
                        declared.primitive
                    ),
                ));
            }
            let mut predicate = Predicate::new(property, op);
            predicate.negated = negated;
            self.node.predicates.insert(predicate);
        }
        Ok(self)
    }

    /// Attach child filters under `edge_name`. Each child must be rooted at
    /// the edge's peer type; zero children means "any neighbor".
    ///
    /// Traversal direction is taken from the edge declaration: derived
    /// (mirrored) edges compile to reverse traversals carrying the peer's
    /// forward name, everything the executor needs to walk the declared edge
    /// backwards and record results under this side's name.
    pub fn with_to_neighbor(
        self,
        edge_name: &str,
        children: impl IntoIterator<Item = QueryBuilder>,
    ) -> Result<Self> {
        self.with_neighbor_nodes(edge_name, children.into_iter().map(QueryBuilder::compile))
    }

    /// Like [`QueryBuilder::with_to_neighbor`], for already-compiled child
    /// trees.
    pub fn with_neighbor_nodes(
        mut self,
        edge_name: &str,
        nodes: impl IntoIterator<Item = QueryNode>,
    ) -> Result<Self> {
        let decl = match self.schema.edge(edge_name) {
            Some(decl) => decl.clone(),
            None => {
                let reason = if self.schema.property(edge_name).is_some() {
                    "is a property, not an edge".to_string()
                } else {
                    "unknown edge".to_string()
                };
                return Err(self.invalid(edge_name, reason));
            }
        };

        let mut accepted = Vec::new();
        for node in nodes {
            if node.root_type != decl.edge.dest_type {
                return Err(self.invalid(
                    edge_name,
                    format!(
                        "edge targets {} but filter is rooted at {}",
                        decl.edge.dest_type, node.root_type
                    ),
                ));
            }
            accepted.push(node);
        }

        let direction = if decl.derived {
            TraversalDirection::Reverse
        } else {
            TraversalDirection::Forward
        };
        let entry = self
            .node
            .children
            .entry(edge_name.to_string())
            .or_insert_with(|| EdgeFilter {
                direction,
                peer_name: decl.reverse_name.clone(),
                nodes: Vec::new(),
            });
        entry.nodes.extend(accepted);
        Ok(self)
    }

    /// Restrict the fields the executor returns for matched root nodes.
    /// Every name must be a declared property or edge.
    pub fn with_projection(
        mut self,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self> {
        for field in fields {
            let field = field.into();
            if !self.schema.declares(&field) {
                return Err(self.invalid(&field, "unknown property or edge".to_string()));
            }
            self.node.projection.insert(field);
        }
        Ok(self)
    }

    /// Stop after `n` root matches are confirmed.
    pub fn with_first(mut self, n: u64) -> Self {
        self.node.first = Some(n);
        self
    }

    /// Freeze the accumulated tree. Pure; performs no I/O.
    pub fn compile(self) -> QueryNode {
        self.node
    }

    /// The registry this builder validates against.
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    fn invalid(&self, property: &str, reason: String) -> VigilError {
        VigilError::InvalidPredicate {
            type_name: self.node.root_type.clone(),
            property: property.to_string(),
            reason,
        }
    }
}

// Manual impl; the registry handle has no Debug and is not interesting here.
impl std::fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use vigil_core::{EdgeCardinality, PropType};

    use super::*;

    fn registry() -> Arc<SchemaRegistry> {
        let registry = SchemaRegistry::new();
        registry
            .register_all([
                Schema::new("Process")
                    .with_property("process_name", PropType::string())
                    .with_property("process_id", PropType::int())
                    .with_property("terminated", PropType::boolean())
                    .with_edge("children", "Process", EdgeCardinality::OneToMany, "parent")
                    .with_edge("spawned_from", "File", EdgeCardinality::ManyToOne, "bin_file"),
                Schema::new("File").with_property("file_path", PropType::string()),
            ])
            .unwrap();
        registry.derive_reverse_edges().unwrap();
        Arc::new(registry)
    }

    #[test]
    fn builder_debug_shows_the_accumulated_node() {
        let builder = QueryBuilder::new(&registry(), "Process").unwrap();
        let rendered = format!("{builder:?}");
        assert!(rendered.contains("QueryBuilder"));
        assert!(rendered.contains("Process"));
    }

    #[test]
    fn unknown_type_fails_at_bind() {
        let err = QueryBuilder::new(&registry(), "Asset").unwrap_err();
        assert!(matches!(err, VigilError::UnknownType(t) if t == "Asset"));
    }

    #[test]
    fn unknown_property_is_invalid_predicate() {
        let err = QueryBuilder::new(&registry(), "Process")
            .unwrap()
            .with_str_prop("image_name", [StrCmp::Eq("x".into())])
            .unwrap_err();
        assert!(matches!(err, VigilError::InvalidPredicate { .. }));
    }

    #[test]
    fn primitive_mismatch_is_invalid_predicate() {
        let err = QueryBuilder::new(&registry(), "Process")
            .unwrap()
            .with_int_prop("process_name", [IntCmp::Eq(4)])
            .unwrap_err();
        assert!(matches!(
            err,
            VigilError::InvalidPredicate { ref property, .. } if property == "process_name"
        ));
    }

    #[test]
    fn bool_properties_accept_no_operators() {
        let err = QueryBuilder::new(&registry(), "Process")
            .unwrap()
            .with_str_prop("terminated", [StrCmp::Eq("true".into())])
            .unwrap_err();
        assert!(matches!(err, VigilError::InvalidPredicate { .. }));
    }

    #[test]
    fn builder_order_never_changes_predicate_set() {
        let registry = registry();
        let a = QueryBuilder::new(&registry, "Process")
            .unwrap()
            .with_str_prop("process_name", [StrCmp::Eq("chrome.exe".into())])
            .unwrap()
            .with_int_prop("process_id", [IntCmp::Gt(1000), IntCmp::Le(4000)])
            .unwrap()
            .compile();
        let b = QueryBuilder::new(&registry, "Process")
            .unwrap()
            .with_int_prop("process_id", [IntCmp::Le(4000)])
            .unwrap()
            .with_str_prop("process_name", [StrCmp::Eq("chrome.exe".into())])
            .unwrap()
            .with_int_prop("process_id", [IntCmp::Gt(1000)])
            .unwrap()
            .compile();
        assert_eq!(a.predicates, b.predicates);
    }

    #[test]
    fn duplicate_predicates_are_conjunctive_not_overriding() {
        let node = QueryBuilder::new(&registry(), "Process")
            .unwrap()
            .with_str_prop(
                "process_name",
                [
                    StrCmp::StartsWith("chrome".into()),
                    StrCmp::StartsWith("chrome".into()),
                    StrCmp::EndsWith(".exe".into()),
                ],
            )
            .unwrap()
            .compile();
        assert_eq!(node.predicates.len(), 2);
    }

    #[test]
    fn forward_traversal_records_reverse_peer_name() {
        let registry = registry();
        let file_filter = QueryBuilder::new(&registry, "File")
            .unwrap()
            .with_str_prop("file_path", [StrCmp::Eq("/bin/chrome".into())])
            .unwrap();
        let node = QueryBuilder::new(&registry, "Process")
            .unwrap()
            .with_to_neighbor("spawned_from", [file_filter])
            .unwrap()
            .compile();

        let child = &node.children["spawned_from"];
        assert_eq!(child.direction, TraversalDirection::Forward);
        assert_eq!(child.peer_name, "bin_file");
        assert_eq!(child.nodes.len(), 1);
        assert_eq!(child.nodes[0].root_type, "File");
    }

    #[test]
    fn derived_edge_compiles_to_reverse_traversal() {
        let registry = registry();
        let process_filter = QueryBuilder::new(&registry, "Process").unwrap();
        let node = QueryBuilder::new(&registry, "File")
            .unwrap()
            .with_to_neighbor("bin_file", [process_filter])
            .unwrap()
            .compile();

        let child = &node.children["bin_file"];
        assert_eq!(child.direction, TraversalDirection::Reverse);
        // The executor walks the declared edge backwards.
        assert_eq!(child.peer_name, "spawned_from");
    }

    #[test]
    fn traversal_rejects_mismatched_child_type() {
        let registry = registry();
        let wrong = QueryBuilder::new(&registry, "Process").unwrap();
        let err = QueryBuilder::new(&registry, "Process")
            .unwrap()
            .with_to_neighbor("spawned_from", [wrong])
            .unwrap_err();
        assert!(matches!(err, VigilError::InvalidPredicate { .. }));
    }

    #[test]
    fn repeated_traversals_merge_under_one_edge() {
        let registry = registry();
        let a = QueryBuilder::new(&registry, "Process").unwrap();
        let b = QueryBuilder::new(&registry, "Process").unwrap();
        let node = QueryBuilder::new(&registry, "Process")
            .unwrap()
            .with_to_neighbor("children", [a])
            .unwrap()
            .with_to_neighbor("children", [b])
            .unwrap()
            .compile();
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.children["children"].nodes.len(), 2);
    }

    #[test]
    fn projection_validates_names() {
        let registry = registry();
        let node = QueryBuilder::new(&registry, "Process")
            .unwrap()
            .with_projection(["process_name", "children"])
            .unwrap()
            .with_first(1)
            .compile();
        assert!(node.projection.contains("process_name"));
        assert_eq!(node.first, Some(1));

        let err = QueryBuilder::new(&registry, "Process")
            .unwrap()
            .with_projection(["image_name"])
            .unwrap_err();
        assert!(matches!(err, VigilError::InvalidPredicate { .. }));
    }
}
