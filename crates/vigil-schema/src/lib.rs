//! vigil-schema: node schemas and the process-wide schema registry.
//!
//! Schemas declare a node type's properties and typed, cardinality-aware
//! edges. They are registered into a [`SchemaRegistry`] during provisioning,
//! which derives the mirrored reverse edge for every declared edge and merges
//! extension fragments declared by other modules. Once any query has
//! executed, the registry is sealed and further registration or extension is
//! rejected.

pub mod export;
pub mod registry;
pub mod schema;

pub use export::{EdgeDescription, PropertyDescription, SchemaDescription, TypeDescription};
pub use registry::{ExtensionRecord, SchemaRegistry};
pub use schema::{EdgeDecl, Schema};
