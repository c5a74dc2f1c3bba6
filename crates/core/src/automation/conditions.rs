//! Condition trees: a combinator over field / operator / value predicates.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// Maximum number of predicates in a single condition tree.
pub const MAX_PREDICATES: usize = 50;

// ---------------------------------------------------------------------------
// Combinator
// ---------------------------------------------------------------------------

/// How predicate results are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combinator {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

// ---------------------------------------------------------------------------
// Operator
// ---------------------------------------------------------------------------

/// Comparison applied by a predicate.
///
/// Unrecognised operator names are kept as [`Operator::Unknown`] so a stored
/// rule round-trips unchanged; the evaluator treats them as non-matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    NotContains,
    Unknown(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<String> for Operator {
    fn from(s: String) -> Self {
        match s.as_str() {
            "equals" => Self::Equals,
            "not_equals" => Self::NotEquals,
            "greater_than" => Self::GreaterThan,
            "less_than" => Self::LessThan,
            "contains" => Self::Contains,
            "not_contains" => Self::NotContains,
            _ => Self::Unknown(s),
        }
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Unknown(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Predicate
// ---------------------------------------------------------------------------

/// A single `field operator value` test against the trigger data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    /// Dot-separated path into the trigger data, e.g. `"order.amount"`.
    pub field: String,
    pub operator: Operator,
    /// `None` when the key is absent; `Some(Value::Null)` for an explicit null.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
}

/// Keeps an explicit `null` distinct from a missing key.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Predicate {
    pub fn new(field: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value: Some(value),
        }
    }
}

// ---------------------------------------------------------------------------
// ConditionTree
// ---------------------------------------------------------------------------

/// A combinator over a flat list of predicates. An empty list always matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionTree {
    #[serde(default)]
    pub combinator: Combinator,
    #[serde(default)]
    pub predicates: Vec<Predicate>,
}

impl ConditionTree {
    pub fn all(predicates: Vec<Predicate>) -> Self {
        Self {
            combinator: Combinator::And,
            predicates,
        }
    }

    pub fn any(predicates: Vec<Predicate>) -> Self {
        Self {
            combinator: Combinator::Or,
            predicates,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Structural checks applied when a rule is saved.
    ///
    /// Unknown operators are deliberately not rejected here so that rules
    /// written by newer clients still load; they simply never match.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.predicates.len() > MAX_PREDICATES {
            return Err(CoreError::Validation(format!(
                "conditions may contain at most {MAX_PREDICATES} predicates"
            )));
        }
        for (idx, predicate) in self.predicates.iter().enumerate() {
            if predicate.field.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "predicate {idx} must name a field"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
