//! The compiled query tree handed to an executor.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::predicate::Predicate;

/// Which way an edge is walked on the wire.
///
/// Traversals through derived (mirrored) edges are reverse traversals: the
/// store only knows the declared forward edge, so the executor must walk it
/// backwards and record the result under this side's edge name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TraversalDirection {
    Forward,
    Reverse,
}

/// Child filters attached under one edge name.
///
/// `peer_name` is the edge's name on the peer schema (the reverse name for
/// forward traversals, the declared forward name for reverse traversals).
/// An empty `nodes` list means "any neighbor"; multiple nodes are
/// alternative branches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeFilter {
    pub direction: TraversalDirection,
    pub peer_name: String,
    pub nodes: Vec<QueryNode>,
}

/// An immutable, executable description of filters and traversals rooted at
/// one node type. Produced by `QueryBuilder::compile`; never performs I/O
/// itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryNode {
    pub root_type: String,
    /// Conjunctive predicate set; order-independent by construction.
    pub predicates: BTreeSet<Predicate>,
    pub children: BTreeMap<String, EdgeFilter>,
    /// Property/edge names to return. Empty means executor default.
    pub projection: BTreeSet<String>,
    /// Stop after this many root matches are confirmed.
    pub first: Option<u64>,
}

impl QueryNode {
    pub(crate) fn empty(root_type: impl Into<String>) -> Self {
        Self {
            root_type: root_type.into(),
            predicates: BTreeSet::new(),
            children: BTreeMap::new(),
            projection: BTreeSet::new(),
            first: None,
        }
    }
}
