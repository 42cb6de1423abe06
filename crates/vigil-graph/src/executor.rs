//! The executor contract: how the framework talks to the graph store.
//!
//! Vigil makes no assumption about the wire encoding used to reach the
//! store. A transport crate implements [`GraphExecutor`] by translating the
//! compiled [`QueryNode`] tree into the store's query language and mapping
//! responses back into [`ResultRow`]s.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use vigil_core::{NodeKey, PropValue, Result, Uid};
use vigil_query::QueryNode;

/// One matched node returned by an executor, with the fields the query
/// projected and any traversed neighbors keyed by edge name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultRow {
    pub uid: Uid,
    pub node_key: NodeKey,
    pub node_types: BTreeSet<String>,
    pub fields: BTreeMap<String, PropValue>,
    pub neighbors: BTreeMap<String, Vec<ResultRow>>,
}

impl ResultRow {
    pub fn new(uid: i64, node_key: impl Into<NodeKey>, node_type: impl Into<String>) -> Self {
        let mut node_types = BTreeSet::new();
        node_types.insert(node_type.into());
        Self {
            uid: Uid(uid),
            node_key: node_key.into(),
            node_types,
            fields: BTreeMap::new(),
            neighbors: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_neighbors(mut self, edge: impl Into<String>, rows: Vec<ResultRow>) -> Self {
        self.neighbors.insert(edge.into(), rows);
        self
    }
}

/// Blocking executor contract consumed by [`crate::GraphClient`].
///
/// Failures surface as `VigilError::Executor` carrying the backend error
/// verbatim; the framework performs no retries of its own. Concurrency, if
/// any, belongs entirely to the implementation.
pub trait GraphExecutor: Send + Sync {
    fn execute(&self, query: &QueryNode) -> Result<Vec<ResultRow>>;
}

type Handler = dyn Fn(&QueryNode) -> Result<Vec<ResultRow>> + Send + Sync;

/// In-memory executor answering from a scripted handler, with a call log.
///
/// This is the test double used throughout the workspace; it also serves as
/// a reference for what transport implementations receive.
pub struct ScriptedExecutor {
    handler: Box<Handler>,
    calls: Mutex<Vec<QueryNode>>,
}

impl ScriptedExecutor {
    pub fn new(
        handler: impl Fn(&QueryNode) -> Result<Vec<ResultRow>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// An executor that answers every query with no rows.
    pub fn empty() -> Self {
        Self::new(|_| Ok(Vec::new()))
    }

    /// Every query executed so far, in order.
    pub fn calls(&self) -> Vec<QueryNode> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl GraphExecutor for ScriptedExecutor {
    fn execute(&self, query: &QueryNode) -> Result<Vec<ResultRow>> {
        self.calls.lock().push(query.clone());
        (self.handler)(query)
    }
}

#[cfg(test)]
mod tests {
    use vigil_core::VigilError;

    use super::*;

    #[test]
    fn scripted_executor_logs_calls() {
        let executor = ScriptedExecutor::new(|query| {
            Ok(vec![ResultRow::new(1, "key-1", query.root_type.clone())
                .with_field("process_name", "chrome.exe")])
        });

        let query = QueryNode {
            root_type: "Process".to_string(),
            predicates: Default::default(),
            children: Default::default(),
            projection: Default::default(),
            first: None,
        };
        let rows = executor.execute(&query).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].uid, Uid(1));
        assert_eq!(executor.call_count(), 1);
        assert_eq!(executor.calls()[0].root_type, "Process");
    }

    #[test]
    fn executor_errors_pass_through() {
        let executor = ScriptedExecutor::new(|_| Err(VigilError::executor(anyhow::anyhow!("boom"))));
        let query = QueryNode {
            root_type: "Process".to_string(),
            predicates: Default::default(),
            children: Default::default(),
            projection: Default::default(),
            first: None,
        };
        let err = executor.execute(&query).unwrap_err();
        assert!(matches!(err, VigilError::Executor { .. }));
    }
}
