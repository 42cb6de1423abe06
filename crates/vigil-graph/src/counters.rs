//! Bounded subgraph counting with a monotonic lower-bound cache.
//!
//! Counting "how many times has this shape been seen" only ever needs an
//! answer up to a small threshold, so counts are computed with a bounded
//! query and cached as lower bounds: a cached value is never replaced by a
//! smaller fresh one, and a cached value at or above the requested bound
//! answers without touching the store at all.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use vigil_core::{Result, Seen};
use vigil_query::{QueryNode, StrCmp};

use crate::client::GraphClient;
use crate::nodes::ProcessQuery;

/// Storage backend for count lower bounds. Keys are opaque digests.
pub trait CountCache: Send + Sync {
    fn get(&self, key: &str) -> Option<u64>;
    fn set(&self, key: &str, count: u64);
}

/// In-process cache backed by a hash map.
#[derive(Default)]
pub struct MemoryCountCache {
    entries: Mutex<HashMap<String, u64>>,
}

impl MemoryCountCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CountCache for MemoryCountCache {
    fn get(&self, key: &str) -> Option<u64> {
        self.entries.lock().get(key).copied()
    }

    fn set(&self, key: &str, count: u64) {
        self.entries.lock().insert(key.to_string(), count);
    }
}

/// Digest of a counting request. The query tree's canonical ordering makes
/// equal requests hash identically regardless of build order.
fn descriptor_key(kind: &str, query: &QueryNode) -> Result<String> {
    #[derive(Serialize)]
    struct Descriptor<'a> {
        kind: &'a str,
        query: &'a QueryNode,
    }
    let bytes = serde_json::to_vec(&Descriptor { kind, query })?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Counts distinct root matches of an arbitrary compiled query.
pub struct SubgraphCounter {
    client: GraphClient,
    cache: Arc<dyn CountCache>,
}

impl SubgraphCounter {
    pub fn new(client: GraphClient, cache: Arc<dyn CountCache>) -> Self {
        Self { client, cache }
    }

    /// Count root matches, stopping at `max_count` (the configured
    /// `count_limit` when `None`). Returns the best known lower bound, which
    /// may exceed a fresh result when a larger count was cached earlier.
    pub fn count_for(&self, query: &QueryNode, max_count: Option<u64>) -> Result<u64> {
        let limit = max_count.unwrap_or(self.client.config().count_limit);
        let caching = self.client.config().cache_counts;
        let key = descriptor_key("subgraph", query)?;

        let cached = if caching { self.cache.get(&key) } else { None };
        if let Some(count) = cached {
            if count >= limit {
                tracing::debug!(key = %key, count, limit, "Count answered from cache");
                return Ok(count);
            }
        }

        let mut bounded = query.clone();
        bounded.first = Some(limit);
        let rows = self.client.execute(&bounded)?;
        let fresh = rows
            .iter()
            .map(|row| row.uid)
            .collect::<BTreeSet<_>>()
            .len() as u64;

        let best = cached.map_or(fresh, |count| count.max(fresh));
        if caching && cached.map_or(true, |count| fresh > count) {
            self.cache.set(&key, fresh);
        }
        Ok(best)
    }

    /// Bucket a count the way detection logic consumes it.
    pub fn seen_for(&self, query: &QueryNode, max_count: Option<u64>) -> Result<Seen> {
        Ok(Seen::from_count(self.count_for(query, max_count)?))
    }
}

/// Counts how often a parent process with a given name has spawned a child,
/// optionally restricted to one child name.
pub struct ParentChildCounter {
    counter: SubgraphCounter,
    client: GraphClient,
}

impl ParentChildCounter {
    pub fn new(client: GraphClient, cache: Arc<dyn CountCache>) -> Self {
        Self {
            counter: SubgraphCounter::new(client.clone(), cache),
            client,
        }
    }

    pub fn count_for(
        &self,
        parent_name: &str,
        child_name: Option<&str>,
        max_count: Option<u64>,
    ) -> Result<u64> {
        let registry = self.client.registry();
        let mut child = ProcessQuery::new(registry)?;
        if let Some(name) = child_name {
            child = child.with_process_name([StrCmp::Eq(name.to_string())])?;
        }
        let query = ProcessQuery::new(registry)?
            .with_process_name([StrCmp::Eq(parent_name.to_string())])?
            .with_children([child])?
            .compile();
        self.counter.count_for(&query, max_count)
    }
}

/// Counts how often a process with a given name has a grandchild with
/// another, two lineage hops apart.
pub struct GrandParentGrandChildCounter {
    counter: SubgraphCounter,
    client: GraphClient,
}

impl GrandParentGrandChildCounter {
    pub fn new(client: GraphClient, cache: Arc<dyn CountCache>) -> Self {
        Self {
            counter: SubgraphCounter::new(client.clone(), cache),
            client,
        }
    }

    pub fn count_for(
        &self,
        grandparent_name: &str,
        grandchild_name: &str,
        max_count: Option<u64>,
    ) -> Result<u64> {
        let registry = self.client.registry();
        let grandchild = ProcessQuery::new(registry)?
            .with_process_name([StrCmp::Eq(grandchild_name.to_string())])?;
        let middle = ProcessQuery::new(registry)?.with_children([grandchild])?;
        let query = ProcessQuery::new(registry)?
            .with_process_name([StrCmp::Eq(grandparent_name.to_string())])?
            .with_children([middle])?
            .compile();
        self.counter.count_for(&query, max_count)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use vigil_schema::SchemaRegistry;

    use crate::executor::{ResultRow, ScriptedExecutor};
    use crate::nodes::register_defaults;

    use super::*;

    fn client_returning(n: u64) -> (GraphClient, Arc<ScriptedExecutor>) {
        let registry = SchemaRegistry::new();
        register_defaults(&registry).unwrap();
        let executor = Arc::new(ScriptedExecutor::new(move |query| {
            let limit = query.first.unwrap_or(u64::MAX);
            Ok((0..n.min(limit))
                .map(|i| ResultRow::new(i as i64 + 1, format!("key-{i}"), "Process"))
                .collect())
        }));
        (
            GraphClient::new(executor.clone(), Arc::new(registry)),
            executor,
        )
    }

    #[test]
    fn count_is_bounded_by_the_limit() {
        let (client, executor) = client_returning(100);
        let counter = SubgraphCounter::new(client.clone(), Arc::new(MemoryCountCache::new()));
        let query = ProcessQuery::new(client.registry()).unwrap().compile();

        assert_eq!(counter.count_for(&query, Some(4)).unwrap(), 4);
        assert_eq!(executor.calls()[0].first, Some(4));
    }

    #[test]
    fn default_limit_comes_from_config() {
        let (client, executor) = client_returning(100);
        let counter = SubgraphCounter::new(client.clone(), Arc::new(MemoryCountCache::new()));
        let query = ProcessQuery::new(client.registry()).unwrap().compile();

        counter.count_for(&query, None).unwrap();
        assert_eq!(executor.calls()[0].first, Some(client.config().count_limit));
    }

    #[test]
    fn cached_count_at_or_above_limit_skips_the_store() {
        let (client, executor) = client_returning(100);
        let counter = SubgraphCounter::new(client.clone(), Arc::new(MemoryCountCache::new()));
        let query = ProcessQuery::new(client.registry()).unwrap().compile();

        assert_eq!(counter.count_for(&query, Some(3)).unwrap(), 3);
        assert_eq!(executor.call_count(), 1);
        // Second ask at the same bound is fully served by the cache.
        assert_eq!(counter.count_for(&query, Some(3)).unwrap(), 3);
        assert_eq!(executor.call_count(), 1);
        // A higher bound goes back to the store.
        assert_eq!(counter.count_for(&query, Some(5)).unwrap(), 5);
        assert_eq!(executor.call_count(), 2);
    }

    #[test]
    fn cache_only_grows() {
        let registry = SchemaRegistry::new();
        register_defaults(&registry).unwrap();
        let fresh = Arc::new(AtomicU64::new(0));
        let fresh_in_executor = Arc::clone(&fresh);
        let executor = Arc::new(ScriptedExecutor::new(move |_| {
            let n = fresh_in_executor.load(Ordering::SeqCst);
            Ok((0..n)
                .map(|i| ResultRow::new(i as i64 + 1, format!("key-{i}"), "Process"))
                .collect())
        }));
        let client = GraphClient::new(executor, Arc::new(registry));
        let counter = SubgraphCounter::new(client.clone(), Arc::new(MemoryCountCache::new()));
        let query = ProcessQuery::new(client.registry()).unwrap().compile();

        fresh.store(3, Ordering::SeqCst);
        assert_eq!(counter.count_for(&query, Some(4)).unwrap(), 3);
        // A smaller fresh result never regresses the lower bound.
        fresh.store(2, Ordering::SeqCst);
        assert_eq!(counter.count_for(&query, Some(4)).unwrap(), 3);
        // A larger one advances it.
        fresh.store(5, Ordering::SeqCst);
        assert_eq!(counter.count_for(&query, Some(6)).unwrap(), 5);
        assert_eq!(counter.count_for(&query, Some(5)).unwrap(), 5);
    }

    #[test]
    fn caching_can_be_disabled() {
        let registry = SchemaRegistry::new();
        register_defaults(&registry).unwrap();
        let executor = Arc::new(ScriptedExecutor::new(|_| {
            Ok(vec![ResultRow::new(1, "key-1", "Process")])
        }));
        let config = vigil_core::VigilConfig {
            cache_counts: false,
            ..vigil_core::VigilConfig::default()
        };
        let client = GraphClient::with_config(executor.clone(), Arc::new(registry), config);
        let counter = SubgraphCounter::new(client.clone(), Arc::new(MemoryCountCache::new()));
        let query = ProcessQuery::new(client.registry()).unwrap().compile();

        counter.count_for(&query, Some(1)).unwrap();
        counter.count_for(&query, Some(1)).unwrap();
        assert_eq!(executor.call_count(), 2);
    }

    #[test]
    fn parent_child_counter_builds_the_two_level_query() {
        let (client, executor) = client_returning(2);
        let counter = ParentChildCounter::new(client, Arc::new(MemoryCountCache::new()));

        let count = counter
            .count_for("svchost.exe", Some("cmd.exe"), Some(4))
            .unwrap();
        assert_eq!(count, 2);

        let issued = &executor.calls()[0];
        assert_eq!(issued.root_type, "Process");
        let filter = issued.children.get("children").unwrap();
        assert_eq!(filter.nodes.len(), 1);
        assert_eq!(filter.nodes[0].root_type, "Process");
    }

    #[test]
    fn grandparent_counter_builds_the_three_level_query() {
        let (client, executor) = client_returning(1);
        let counter = GrandParentGrandChildCounter::new(client, Arc::new(MemoryCountCache::new()));

        let count = counter
            .count_for("explorer.exe", "powershell.exe", Some(4))
            .unwrap();
        assert_eq!(count, 1);

        let issued = &executor.calls()[0];
        assert_eq!(issued.root_type, "Process");
        let middle = &issued.children["children"].nodes[0];
        assert!(middle.predicates.is_empty());
        let grandchild = &middle.children["children"].nodes[0];
        assert_eq!(grandchild.root_type, "Process");
        assert!(!grandchild.predicates.is_empty());
    }

    #[test]
    fn different_shapes_count_separately() {
        let (client, executor) = client_returning(2);
        let counter = ParentChildCounter::new(client, Arc::new(MemoryCountCache::new()));

        counter.count_for("svchost.exe", None, Some(4)).unwrap();
        counter
            .count_for("svchost.exe", Some("cmd.exe"), Some(4))
            .unwrap();
        assert_eq!(executor.call_count(), 2);
    }
}
