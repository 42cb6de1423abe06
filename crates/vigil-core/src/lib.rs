//! vigil-core: Shared value types, configuration, and error handling for Vigil.
//!
//! This crate provides the foundational types used across all Vigil components:
//! - Node identity (`Uid`, `NodeKey`) for the entity graph
//! - Property primitives and edge cardinalities for schema declarations
//! - Result-row values (`PropValue`) returned by graph executors
//! - Configuration management
//! - The common error type

pub mod config;
pub mod error;
pub mod types;

pub use config::VigilConfig;
pub use error::{Result, VigilError};
pub use types::{
    EdgeCardinality, EdgeT, NodeKey, PropPrimitive, PropType, PropValue, Seen, Uid,
};
