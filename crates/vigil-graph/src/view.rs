//! Identity-stable, lazily-cached views of graph nodes.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use vigil_core::{NodeKey, PropValue, Result, Uid, VigilError};
use vigil_query::QueryNode;

use crate::client::GraphClient;

/// Publicly visible state of one cached field.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    Uncached,
    Value(PropValue),
    Neighbors(Vec<Arc<EntityView>>),
}

/// Internal slot: `Fetching` marks an in-flight executor call for this
/// field. At most one fetch is in flight per (view, field); late arrivals
/// wait on the condvar for its result instead of re-issuing it.
enum Slot {
    Fetching,
    Value(PropValue),
    Neighbors(Vec<Arc<EntityView>>),
}

struct ViewState {
    node_types: BTreeSet<String>,
    cache: BTreeMap<String, Slot>,
}

/// A materialized node. One `EntityView` exists per `(uid, node_key)`
/// identity within a client; re-materialization from later result rows
/// updates the same object in place.
///
/// Field and neighbor accessors consult the per-field cache first and only
/// go through the executor on a miss (or when `cached` is false, which
/// always re-executes and overwrites the entry). A failed fetch leaves the
/// field uncached; absence is never cached as a placeholder value.
///
/// Neighbor entries hold strong references. Caching both directions of the
/// same relation (a parent's `children` and that child's `parent`) forms a
/// reference cycle that keeps both views alive past their last external
/// handle; the client's identity map holds only weak entries and does not
/// break such cycles.
pub struct EntityView {
    uid: Uid,
    node_key: NodeKey,
    client: GraphClient,
    state: Mutex<ViewState>,
    fetch_done: Condvar,
}

impl EntityView {
    pub(crate) fn new(
        client: GraphClient,
        uid: Uid,
        node_key: NodeKey,
        node_types: BTreeSet<String>,
    ) -> Self {
        Self {
            uid,
            node_key,
            client,
            state: Mutex::new(ViewState {
                node_types,
                cache: BTreeMap::new(),
            }),
            fetch_done: Condvar::new(),
        }
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn node_key(&self) -> &NodeKey {
        &self.node_key
    }

    /// The type tags this node carries. May grow as extension-tagged rows
    /// for the same identity are materialized; never shrinks.
    pub fn node_types(&self) -> BTreeSet<String> {
        self.state.lock().node_types.clone()
    }

    /// Inspect a cache entry without fetching. An in-flight fetch reports
    /// as `Uncached` until it completes.
    pub fn cache_entry(&self, field: &str) -> CacheEntry {
        match self.state.lock().cache.get(field) {
            None | Some(Slot::Fetching) => CacheEntry::Uncached,
            Some(Slot::Value(v)) => CacheEntry::Value(v.clone()),
            Some(Slot::Neighbors(views)) => CacheEntry::Neighbors(views.clone()),
        }
    }

    // ── Property Accessors ───────────────────────────────────────

    /// Get a property value, fetching through the executor on a cache miss.
    /// `cached = false` forces a re-fetch and overwrites the cache entry.
    /// Returns `None` if the store has no value for this field, in which
    /// case the field stays uncached.
    pub fn get_prop(&self, field: &str, cached: bool) -> Result<Option<PropValue>> {
        {
            let mut state = self.state.lock();
            loop {
                match state.cache.get(field) {
                    Some(Slot::Fetching) => {
                        self.fetch_done.wait(&mut state);
                    }
                    Some(Slot::Value(v)) if cached => return Ok(Some(v.clone())),
                    Some(Slot::Neighbors(_)) => {
                        return Err(Self::not_a_property(&state.node_types, field));
                    }
                    // Uncached, or cached value with a forced re-fetch.
                    _ => break,
                }
            }
            state.cache.insert(field.to_string(), Slot::Fetching);
        }

        let fetched = self.client.fetch_field(self, field);

        let mut state = self.state.lock();
        let result = match fetched {
            Ok(Some(value)) => {
                tracing::debug!(uid = %self.uid, field, "Field fetched and cached");
                state.cache.insert(field.to_string(), Slot::Value(value.clone()));
                Ok(Some(value))
            }
            Ok(None) => {
                // No value in the store; the field stays uncached rather
                // than caching a null placeholder.
                state.cache.remove(field);
                Ok(None)
            }
            Err(e) => {
                state.cache.remove(field);
                Err(e)
            }
        };
        drop(state);
        self.fetch_done.notify_all();
        result
    }

    pub fn get_str(&self, field: &str, cached: bool) -> Result<Option<String>> {
        Ok(self
            .get_prop(field, cached)?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    pub fn get_int(&self, field: &str, cached: bool) -> Result<Option<i64>> {
        Ok(self.get_prop(field, cached)?.and_then(|v| v.as_int()))
    }

    pub fn get_bool(&self, field: &str, cached: bool) -> Result<Option<bool>> {
        Ok(self.get_prop(field, cached)?.and_then(|v| v.as_bool()))
    }

    // ── Neighbor Accessors ───────────────────────────────────────

    /// Get the neighbors across `edge`, recursively materialized. `filters`
    /// restrict which neighbors match (each must be rooted at the edge's
    /// peer type); an empty list matches any neighbor.
    pub fn get_neighbors(
        &self,
        edge: &str,
        filters: Vec<QueryNode>,
        cached: bool,
    ) -> Result<Vec<Arc<EntityView>>> {
        {
            let mut state = self.state.lock();
            loop {
                match state.cache.get(edge) {
                    Some(Slot::Fetching) => {
                        self.fetch_done.wait(&mut state);
                    }
                    Some(Slot::Neighbors(views)) if cached => return Ok(views.clone()),
                    Some(Slot::Value(_)) => {
                        return Err(Self::not_an_edge(&state.node_types, edge));
                    }
                    _ => break,
                }
            }
            state.cache.insert(edge.to_string(), Slot::Fetching);
        }

        let fetched = self.client.fetch_neighbors(self, edge, filters);

        let mut state = self.state.lock();
        let result = match fetched {
            Ok(views) => {
                tracing::debug!(
                    uid = %self.uid,
                    edge,
                    count = views.len(),
                    "Neighbors fetched and cached"
                );
                state
                    .cache
                    .insert(edge.to_string(), Slot::Neighbors(views.clone()));
                Ok(views)
            }
            Err(e) => {
                state.cache.remove(edge);
                Err(e)
            }
        };
        drop(state);
        self.fetch_done.notify_all();
        result
    }

    /// Get the single neighbor across a to-one edge (`OneToOne` or
    /// `ManyToOne`). Fails with `InvalidPredicate` on a to-many edge.
    pub fn get_neighbor(
        &self,
        edge: &str,
        filters: Vec<QueryNode>,
        cached: bool,
    ) -> Result<Option<Arc<EntityView>>> {
        let decl = self.client.edge_decl(self, edge)?;
        if decl.edge.cardinality.is_to_many() {
            return Err(VigilError::InvalidPredicate {
                type_name: decl.edge.source_type,
                property: edge.to_string(),
                reason: "edge is to-many; use get_neighbors".to_string(),
            });
        }
        let mut views = self.get_neighbors(edge, filters, cached)?;
        if views.len() > 1 {
            tracing::warn!(
                uid = %self.uid,
                edge,
                count = views.len(),
                "To-one edge returned multiple neighbors; taking the first"
            );
        }
        Ok(if views.is_empty() {
            None
        } else {
            Some(views.swap_remove(0))
        })
    }

    // ── Materializer Hooks ───────────────────────────────────────

    /// Merge freshly fetched row fields into the cache. Fields with an
    /// in-flight fetch are left to that fetch to complete.
    pub(crate) fn merge_fields(
        &self,
        fields: impl IntoIterator<Item = (String, PropValue)>,
        node_types: &BTreeSet<String>,
    ) {
        let mut state = self.state.lock();
        state.node_types.extend(node_types.iter().cloned());
        for (name, value) in fields {
            match state.cache.get(&name) {
                Some(Slot::Fetching) => {}
                _ => {
                    state.cache.insert(name, Slot::Value(value));
                }
            }
        }
    }

    /// Merge freshly materialized neighbors into the cache, same rules as
    /// [`EntityView::merge_fields`].
    pub(crate) fn merge_neighbors(&self, edge: &str, views: Vec<Arc<EntityView>>) {
        let mut state = self.state.lock();
        match state.cache.get(edge) {
            Some(Slot::Fetching) => {}
            _ => {
                state.cache.insert(edge.to_string(), Slot::Neighbors(views));
            }
        }
    }

    // Built from state the caller already holds locked; must not touch
    // `self.state` themselves.
    fn not_a_property(node_types: &BTreeSet<String>, field: &str) -> VigilError {
        VigilError::InvalidPredicate {
            type_name: node_types.iter().next().cloned().unwrap_or_default(),
            property: field.to_string(),
            reason: "cached as an edge, not a property".to_string(),
        }
    }

    fn not_an_edge(node_types: &BTreeSet<String>, field: &str) -> VigilError {
        VigilError::InvalidPredicate {
            type_name: node_types.iter().next().cloned().unwrap_or_default(),
            property: field.to_string(),
            reason: "cached as a property, not an edge".to_string(),
        }
    }
}

impl std::fmt::Debug for EntityView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityView")
            .field("uid", &self.uid)
            .field("node_key", &self.node_key)
            .field("node_types", &self.state.lock().node_types)
            .finish()
    }
}
