//! Serializable schema description for store-side provisioning.
//!
//! The provisioning routine pushes this description to the backing store
//! (bulk schema creation) and to auxiliary metadata tables. Ordering is
//! deterministic so repeated exports of the same registry are byte-equal.

use serde::Serialize;

use vigil_core::{EdgeCardinality, PropPrimitive, Result};

use crate::registry::SchemaRegistry;

#[derive(Debug, Serialize)]
pub struct SchemaDescription {
    pub types: Vec<TypeDescription>,
}

#[derive(Debug, Serialize)]
pub struct TypeDescription {
    pub type_name: String,
    pub display_property: String,
    pub properties: Vec<PropertyDescription>,
    pub edges: Vec<EdgeDescription>,
}

#[derive(Debug, Serialize)]
pub struct PropertyDescription {
    pub name: String,
    pub primitive: PropPrimitive,
    pub is_list: bool,
}

#[derive(Debug, Serialize)]
pub struct EdgeDescription {
    pub name: String,
    pub dest_type: String,
    pub cardinality: EdgeCardinality,
    pub reverse_name: String,
    pub derived: bool,
}

impl SchemaRegistry {
    /// Build the description of every registered type, including derived
    /// reverse edges and merged extension fragments.
    pub fn describe(&self) -> Result<SchemaDescription> {
        let mut types = Vec::new();
        for type_name in self.type_names() {
            let schema = self.lookup(&type_name)?;
            types.push(TypeDescription {
                type_name,
                display_property: schema.display_property().to_string(),
                properties: schema
                    .properties()
                    .iter()
                    .map(|(name, prop)| PropertyDescription {
                        name: name.clone(),
                        primitive: prop.primitive,
                        is_list: prop.is_list,
                    })
                    .collect(),
                edges: schema
                    .edges()
                    .iter()
                    .map(|(name, decl)| EdgeDescription {
                        name: name.clone(),
                        dest_type: decl.edge.dest_type.clone(),
                        cardinality: decl.edge.cardinality,
                        reverse_name: decl.reverse_name.clone(),
                        derived: decl.derived,
                    })
                    .collect(),
            });
        }
        Ok(SchemaDescription { types })
    }

    /// JSON rendering of [`SchemaRegistry::describe`], for handing to the
    /// external provisioning routine.
    pub fn export_description(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.describe()?)?)
    }
}
