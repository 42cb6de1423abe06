//! vigil-query: fluent construction of executable query descriptions.
//!
//! A [`QueryBuilder`] is bound to a registered schema and validates every
//! predicate and traversal against it as the chain is built. `compile()`
//! freezes the chain into an immutable [`QueryNode`] tree, which an external
//! executor translates to the store's query language. Compilation is pure
//! tree construction; no I/O happens in this crate.

pub mod builder;
pub mod node;
pub mod predicate;

pub use builder::QueryBuilder;
pub use node::{EdgeFilter, QueryNode, TraversalDirection};
pub use predicate::{IntCmp, Operator, Predicate, StrCmp};
