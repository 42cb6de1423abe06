//! Schema declarations: a node type's properties and edges.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use vigil_core::{EdgeCardinality, EdgeT, PropType};

/// An edge entry on a schema: the typed edge plus the name the mirrored
/// edge carries on the peer schema.
///
/// `derived` marks entries installed by reverse-edge derivation rather than
/// declared by hand. Traversing a derived edge is a reverse traversal on the
/// wire; `reverse_name` then holds the peer's forward name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeDecl {
    pub edge: EdgeT,
    pub reverse_name: String,
    pub derived: bool,
}

/// Declaration of a node type: its property types and edges.
///
/// One schema instance exists per declared node type. Every schema carries
/// the implicit `node_key` string property used for identity lookups.
/// Fragments created with [`Schema::fragment`] omit it, since they merge
/// into a base that already has one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schema {
    type_name: String,
    properties: BTreeMap<String, PropType>,
    edges: BTreeMap<String, EdgeDecl>,
    display_property: Option<String>,
}

impl Schema {
    /// A new schema for `type_name`, seeded with the implicit `node_key`
    /// property.
    pub fn new(type_name: impl Into<String>) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert("node_key".to_string(), PropType::string());
        Self {
            type_name: type_name.into(),
            properties,
            edges: BTreeMap::new(),
            display_property: None,
        }
    }

    /// An extension fragment targeting `base_type`. Starts empty; merged
    /// into the registered base schema by `SchemaRegistry::extend`.
    pub fn fragment(base_type: impl Into<String>) -> Self {
        Self {
            type_name: base_type.into(),
            properties: BTreeMap::new(),
            edges: BTreeMap::new(),
            display_property: None,
        }
    }

    /// Declare a property. Later declarations of the same name override
    /// earlier ones within this (not yet registered) declaration.
    pub fn with_property(mut self, name: impl Into<String>, prop: PropType) -> Self {
        self.properties.insert(name.into(), prop);
        self
    }

    /// Declare an edge from this type to `dest_type`. The mirrored edge is
    /// installed on the destination schema under `reverse_name` when the
    /// registry derives reverse edges.
    pub fn with_edge(
        mut self,
        name: impl Into<String>,
        dest_type: impl Into<String>,
        cardinality: EdgeCardinality,
        reverse_name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        self.edges.insert(
            name,
            EdgeDecl {
                edge: EdgeT::new(self.type_name.clone(), dest_type, cardinality),
                reverse_name: reverse_name.into(),
                derived: false,
            },
        );
        self
    }

    /// The property shown when a node of this type is displayed.
    pub fn with_display_property(mut self, name: impl Into<String>) -> Self {
        self.display_property = Some(name.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn properties(&self) -> &BTreeMap<String, PropType> {
        &self.properties
    }

    pub fn edges(&self) -> &BTreeMap<String, EdgeDecl> {
        &self.edges
    }

    pub fn property(&self, name: &str) -> Option<&PropType> {
        self.properties.get(name)
    }

    pub fn edge(&self, name: &str) -> Option<&EdgeDecl> {
        self.edges.get(name)
    }

    pub fn display_property(&self) -> &str {
        self.display_property.as_deref().unwrap_or("node_key")
    }

    /// Whether `name` is taken by either a property or an edge. The merged
    /// property/edge namespace of a type is shared.
    pub fn declares(&self, name: &str) -> bool {
        self.properties.contains_key(name) || self.edges.contains_key(name)
    }

    /// A name declared as both a property and an edge, if any. Checked at
    /// registration and extension time; the builders themselves stay
    /// infallible.
    pub(crate) fn self_collision(&self) -> Option<&String> {
        self.properties
            .keys()
            .find(|name| self.edges.contains_key(*name))
    }

    pub(crate) fn install_edge(&mut self, name: String, decl: EdgeDecl) {
        self.edges.insert(name, decl);
    }

    pub(crate) fn install_property(&mut self, name: String, prop: PropType) {
        self.properties.insert(name, prop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_schema_has_implicit_node_key() {
        let schema = Schema::new("Process");
        assert_eq!(schema.property("node_key"), Some(&PropType::string()));
    }

    #[test]
    fn fragment_does_not_redeclare_node_key() {
        let fragment = Schema::fragment("Process");
        assert!(fragment.property("node_key").is_none());
    }

    #[test]
    fn declared_edge_sources_from_owner() {
        let schema = Schema::new("Process").with_edge(
            "children",
            "Process",
            EdgeCardinality::OneToMany,
            "parent",
        );
        let decl = schema.edge("children").unwrap();
        assert_eq!(decl.edge.source_type, "Process");
        assert_eq!(decl.edge.dest_type, "Process");
        assert_eq!(decl.reverse_name, "parent");
        assert!(!decl.derived);
    }

    #[test]
    fn display_property_defaults_to_node_key() {
        assert_eq!(Schema::new("File").display_property(), "node_key");
        assert_eq!(
            Schema::new("File")
                .with_display_property("file_path")
                .display_property(),
            "file_path"
        );
    }

    #[test]
    fn namespace_spans_properties_and_edges() {
        let schema = Schema::new("Process")
            .with_property("process_name", PropType::string())
            .with_edge("children", "Process", EdgeCardinality::OneToMany, "parent");
        assert!(schema.declares("process_name"));
        assert!(schema.declares("children"));
        assert!(!schema.declares("parent"));
    }
}
