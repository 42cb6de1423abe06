//! Typed filter predicates over node properties.

use serde::{Deserialize, Serialize};

use vigil_core::PropPrimitive;

/// String comparison operators. `Contains` and `Regexp` accept one or many
/// operands, matching if any operand matches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StrCmp {
    Eq(String),
    Contains(Vec<String>),
    StartsWith(String),
    EndsWith(String),
    Regexp(Vec<String>),
    DistanceLt { pattern: String, max_distance: u32 },
}

/// Integer comparison operators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum IntCmp {
    Eq(i64),
    Gt(i64),
    Ge(i64),
    Lt(i64),
    Le(i64),
}

/// A comparison operator with its operand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Str(StrCmp),
    Int(IntCmp),
}

impl Operator {
    /// The property primitive this operator applies to.
    pub fn primitive(&self) -> PropPrimitive {
        match self {
            Self::Str(_) => PropPrimitive::Str,
            Self::Int(_) => PropPrimitive::Int,
        }
    }
}

impl From<StrCmp> for Operator {
    fn from(cmp: StrCmp) -> Self {
        Self::Str(cmp)
    }
}

impl From<IntCmp> for Operator {
    fn from(cmp: IntCmp) -> Self {
        Self::Int(cmp)
    }
}

/// One filter predicate on one property.
///
/// Predicates on a query node form a set with conjunctive semantics:
/// insertion order is irrelevant and duplicate predicates on the same
/// property are conjunctive, not overriding. The derived `Ord` exists so the
/// set can be a `BTreeSet`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Predicate {
    pub property: String,
    pub op: Operator,
    pub negated: bool,
}

impl Predicate {
    pub fn new(property: impl Into<String>, op: impl Into<Operator>) -> Self {
        Self {
            property: property.into(),
            op: op.into(),
            negated: false,
        }
    }

    /// This predicate, negated.
    pub fn negated(mut self) -> Self {
        self.negated = true;
        self
    }
}
