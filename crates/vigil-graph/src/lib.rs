//! vigil-graph: entity views over a remote graph store.
//!
//! This crate is the read path of the framework. A [`GraphClient`] wraps an
//! opaque [`GraphExecutor`] (the transport, implemented elsewhere) and turns
//! result rows into identity-stable, lazily-cached [`EntityView`] objects.
//! Counting caches and the built-in node modules (Process, File) sit on top.
//!
//! The framework is synchronous from the caller's perspective: any field or
//! edge access that misses cache blocks on the executor before returning.

pub mod client;
pub mod counters;
pub mod executor;
pub mod nodes;
pub mod view;

pub use client::GraphClient;
pub use counters::{
    CountCache, GrandParentGrandChildCounter, MemoryCountCache, ParentChildCounter,
    SubgraphCounter,
};
pub use executor::{GraphExecutor, ResultRow, ScriptedExecutor};
pub use view::{CacheEntry, EntityView};
