//! The Process node module.

use std::sync::Arc;

use vigil_core::{EdgeCardinality, PropType, Result};
use vigil_query::{IntCmp, QueryBuilder, QueryNode, StrCmp};
use vigil_schema::{Schema, SchemaRegistry};

use crate::view::EntityView;

/// The base Process type: one node per observed process execution, with a
/// self-referential parent/child lineage edge.
pub fn process_schema() -> Schema {
    Schema::new("Process")
        .with_property("process_name", PropType::string())
        .with_property("arguments", PropType::string())
        .with_property("process_id", PropType::int())
        .with_property("created_timestamp", PropType::int())
        .with_edge("children", "Process", EdgeCardinality::OneToMany, "parent")
        .with_display_property("process_name")
}

/// Typed query wrapper for Process. Thin layer over [`QueryBuilder`];
/// every method validates against the registered schema.
pub struct ProcessQuery {
    builder: QueryBuilder,
}

impl ProcessQuery {
    pub fn new(registry: &Arc<SchemaRegistry>) -> Result<Self> {
        Ok(Self {
            builder: QueryBuilder::new(registry, "Process")?,
        })
    }

    pub fn with_process_name(self, cmps: impl IntoIterator<Item = StrCmp>) -> Result<Self> {
        Ok(Self {
            builder: self.builder.with_str_prop("process_name", cmps)?,
        })
    }

    pub fn with_arguments(self, cmps: impl IntoIterator<Item = StrCmp>) -> Result<Self> {
        Ok(Self {
            builder: self.builder.with_str_prop("arguments", cmps)?,
        })
    }

    pub fn with_process_id(self, cmps: impl IntoIterator<Item = IntCmp>) -> Result<Self> {
        Ok(Self {
            builder: self.builder.with_int_prop("process_id", cmps)?,
        })
    }

    pub fn with_created_timestamp(self, cmps: impl IntoIterator<Item = IntCmp>) -> Result<Self> {
        Ok(Self {
            builder: self.builder.with_int_prop("created_timestamp", cmps)?,
        })
    }

    /// Require matching child processes.
    pub fn with_children(self, children: impl IntoIterator<Item = ProcessQuery>) -> Result<Self> {
        Ok(Self {
            builder: self
                .builder
                .with_neighbor_nodes("children", children.into_iter().map(ProcessQuery::compile))?,
        })
    }

    /// Require a matching parent process (reverse lineage traversal).
    pub fn with_parent(self, parents: impl IntoIterator<Item = ProcessQuery>) -> Result<Self> {
        Ok(Self {
            builder: self
                .builder
                .with_neighbor_nodes("parent", parents.into_iter().map(ProcessQuery::compile))?,
        })
    }

    pub fn compile(self) -> QueryNode {
        self.builder.compile()
    }

    /// Escape hatch to the untyped builder for predicates and traversals
    /// this wrapper has no method for, such as extension edges.
    pub fn into_builder(self) -> QueryBuilder {
        self.builder
    }
}

impl From<QueryBuilder> for ProcessQuery {
    fn from(builder: QueryBuilder) -> Self {
        Self { builder }
    }
}

impl std::fmt::Debug for ProcessQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ProcessQuery").field(&self.builder).finish()
    }
}

/// Typed accessors over an [`EntityView`] tagged as a Process.
pub trait ProcessViewExt {
    fn get_process_name(&self, cached: bool) -> Result<Option<String>>;
    fn get_arguments(&self, cached: bool) -> Result<Option<String>>;
    fn get_process_id(&self, cached: bool) -> Result<Option<i64>>;
    fn get_created_timestamp(&self, cached: bool) -> Result<Option<i64>>;
    fn get_children(&self, cached: bool) -> Result<Vec<Arc<EntityView>>>;
    fn get_parent(&self, cached: bool) -> Result<Option<Arc<EntityView>>>;
}

impl ProcessViewExt for EntityView {
    fn get_process_name(&self, cached: bool) -> Result<Option<String>> {
        self.get_str("process_name", cached)
    }

    fn get_arguments(&self, cached: bool) -> Result<Option<String>> {
        self.get_str("arguments", cached)
    }

    fn get_process_id(&self, cached: bool) -> Result<Option<i64>> {
        self.get_int("process_id", cached)
    }

    fn get_created_timestamp(&self, cached: bool) -> Result<Option<i64>> {
        self.get_int("created_timestamp", cached)
    }

    fn get_children(&self, cached: bool) -> Result<Vec<Arc<EntityView>>> {
        self.get_neighbors("children", Vec::new(), cached)
    }

    fn get_parent(&self, cached: bool) -> Result<Option<Arc<EntityView>>> {
        self.get_neighbor("parent", Vec::new(), cached)
    }
}

#[cfg(test)]
mod tests {
    use vigil_query::TraversalDirection;

    use super::*;

    fn registry() -> Arc<SchemaRegistry> {
        let registry = SchemaRegistry::new();
        registry.register(process_schema()).unwrap();
        registry.derive_reverse_edges().unwrap();
        Arc::new(registry)
    }

    #[test]
    fn lineage_traversals_compile_with_directions() {
        let registry = registry();
        let query = ProcessQuery::new(&registry)
            .unwrap()
            .with_process_name([StrCmp::Eq("svchost.exe".to_string())])
            .unwrap()
            .with_children([ProcessQuery::new(&registry).unwrap()])
            .unwrap()
            .with_parent([ProcessQuery::new(&registry).unwrap()])
            .unwrap()
            .compile();

        assert_eq!(
            query.children["children"].direction,
            TraversalDirection::Forward
        );
        let parent = &query.children["parent"];
        assert_eq!(parent.direction, TraversalDirection::Reverse);
        assert_eq!(parent.peer_name, "children");
    }

    #[test]
    fn predicates_are_type_checked() {
        let registry = registry();
        let err = ProcessQuery::new(&registry)
            .unwrap()
            .with_process_id([IntCmp::Eq(4)])
            .unwrap()
            .into_builder()
            .with_str_prop("process_id", [StrCmp::Eq("4".to_string())])
            .unwrap_err();
        assert!(matches!(
            err,
            vigil_core::VigilError::InvalidPredicate { .. }
        ));
    }
}
