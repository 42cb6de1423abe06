//! Core value types for the Vigil entity graph.
//!
//! These types describe node identity, property primitives, and edge
//! cardinalities. Schemas reference peer types by name (`EdgeT` holds type
//! names, not type references) so mutually-referencing schemas can be
//! declared in any order and resolved against the registry later.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Identity ──────────────────────────────────────────────────────

/// Opaque graph-store id for a node. Assigned by the backing store and
/// stable for the lifetime of the node.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct Uid(pub i64);

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client-assigned identifier for a node, stable across refetches.
///
/// Together with [`Uid`] this forms a node's identity; neither half ever
/// changes once a view of the node has been materialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub String);

impl NodeKey {
    /// Generate a fresh random node key.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── Property Types ────────────────────────────────────────────────

/// Primitive type of a node property.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PropPrimitive {
    Str,
    Int,
    Bool,
}

/// Declared type of a node property: a primitive, optionally list-valued.
/// Immutable after registration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropType {
    pub primitive: PropPrimitive,
    pub is_list: bool,
}

impl PropType {
    pub fn string() -> Self {
        Self {
            primitive: PropPrimitive::Str,
            is_list: false,
        }
    }

    pub fn int() -> Self {
        Self {
            primitive: PropPrimitive::Int,
            is_list: false,
        }
    }

    pub fn boolean() -> Self {
        Self {
            primitive: PropPrimitive::Bool,
            is_list: false,
        }
    }

    /// List-valued variant of this property type.
    pub fn list(mut self) -> Self {
        self.is_list = true;
        self
    }
}

// ── Edge Types ────────────────────────────────────────────────────

/// Multiplicity constraint of an edge between two node types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeCardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl EdgeCardinality {
    /// Cardinality of the mirrored (reverse) edge.
    ///
    /// `OneToMany` and `ManyToOne` swap; `OneToOne` and `ManyToMany` are
    /// their own mirrors.
    pub fn reversed(self) -> Self {
        match self {
            Self::OneToOne => Self::OneToOne,
            Self::OneToMany => Self::ManyToOne,
            Self::ManyToOne => Self::OneToMany,
            Self::ManyToMany => Self::ManyToMany,
        }
    }

    /// Whether a single source node can have more than one destination.
    pub fn is_to_many(self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }
}

/// A typed edge declaration between two node types.
///
/// Peer types are referenced by name so that schemas defined in separate
/// modules can point at each other without a compile-time cycle; the names
/// are resolved against the schema registry when reverse edges are derived.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeT {
    pub source_type: String,
    pub dest_type: String,
    pub cardinality: EdgeCardinality,
}

impl EdgeT {
    pub fn new(
        source_type: impl Into<String>,
        dest_type: impl Into<String>,
        cardinality: EdgeCardinality,
    ) -> Self {
        Self {
            source_type: source_type.into(),
            dest_type: dest_type.into(),
            cardinality,
        }
    }

    /// The mirrored edge: swapped endpoints, reversed cardinality.
    pub fn reversed(&self) -> Self {
        Self {
            source_type: self.dest_type.clone(),
            dest_type: self.source_type.clone(),
            cardinality: self.cardinality.reversed(),
        }
    }
}

// ── Result-Row Values ─────────────────────────────────────────────

/// A property value delivered by a graph executor result row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PropValue {
    Str(String),
    Int(i64),
    Bool(bool),
    StrList(Vec<String>),
    IntList(Vec<i64>),
}

impl PropValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str_list(&self) -> Option<&[String]> {
        match self {
            Self::StrList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int_list(&self) -> Option<&[i64]> {
        match self {
            Self::IntList(v) => Some(v),
            _ => None,
        }
    }

    /// The primitive this value carries (element primitive for lists).
    pub fn primitive(&self) -> PropPrimitive {
        match self {
            Self::Str(_) | Self::StrList(_) => PropPrimitive::Str,
            Self::Int(_) | Self::IntList(_) => PropPrimitive::Int,
            Self::Bool(_) => PropPrimitive::Bool,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::StrList(_) | Self::IntList(_))
    }

    /// Whether this value conforms to the declared property type.
    pub fn matches(&self, prop: &PropType) -> bool {
        self.primitive() == prop.primitive && self.is_list() == prop.is_list
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for PropValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<String>> for PropValue {
    fn from(v: Vec<String>) -> Self {
        Self::StrList(v)
    }
}

impl From<Vec<i64>> for PropValue {
    fn from(v: Vec<i64>) -> Self {
        Self::IntList(v)
    }
}

// ── Count Classification ──────────────────────────────────────────

/// How often a pattern has been observed. A plain totally-ordered enum;
/// compare with `<` / `>=` directly.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Seen {
    Never,
    Once,
    Many,
}

impl Seen {
    pub fn from_count(count: u64) -> Self {
        match count {
            0 => Self::Never,
            1 => Self::Once,
            _ => Self::Many,
        }
    }
}
