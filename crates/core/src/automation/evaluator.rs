//! Condition evaluator. Pure logic, no database access.
//!
//! A field lookup that misses resolves to `None`, which is distinct from an
//! explicit JSON `null`.

use serde_json::Value;

use super::conditions::{Combinator, ConditionTree, Operator, Predicate};

/// Evaluate a condition tree against trigger data.
///
/// An empty predicate list is vacuously true for both combinators.
pub fn evaluate(tree: &ConditionTree, context: &Value) -> bool {
    if tree.predicates.is_empty() {
        return true;
    }
    match tree.combinator {
        Combinator::And => tree.predicates.iter().all(|p| evaluate_predicate(p, context)),
        Combinator::Or => tree.predicates.iter().any(|p| evaluate_predicate(p, context)),
    }
}

/// Evaluate a single predicate. Unknown operators never match.
pub fn evaluate_predicate(predicate: &Predicate, context: &Value) -> bool {
    let actual = resolve_path(context, &predicate.field);
    let expected = predicate.value.as_ref();

    match &predicate.operator {
        Operator::Equals => strict_equals(actual, expected),
        Operator::NotEquals => !strict_equals(actual, expected),
        Operator::GreaterThan => to_number(actual) > to_number(expected),
        Operator::LessThan => to_number(actual) < to_number(expected),
        Operator::Contains => to_display_string(actual).contains(&to_display_string(expected)),
        Operator::NotContains => !to_display_string(actual).contains(&to_display_string(expected)),
        Operator::Unknown(_) => false,
    }
}

/// Walk a dot-separated path through objects and arrays.
///
/// Array segments are numeric indices (`"items.0.sku"`). An empty path
/// resolves to the context itself.
pub fn resolve_path<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(context);
    }
    path.split('.').try_fold(context, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn strict_equals(actual: Option<&Value>, expected: Option<&Value>) -> bool {
    match (actual, expected) {
        (None, None) => true,
        (Some(Value::Number(a)), Some(Value::Number(b))) => a.as_f64() == b.as_f64(),
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Numeric coercion: numbers as-is, trimmed numeric strings parsed (empty
/// string is zero), booleans 1/0, null 0, everything else NaN.
pub fn to_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Some(Value::Null) => 0.0,
        Some(Value::Array(_)) | Some(Value::Object(_)) | None => f64::NAN,
    }
}

/// String coercion used by `contains` and template rendering.
///
/// A missing value is the empty string; objects render as compact JSON.
pub fn to_display_string(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 => format!("{f:.0}"),
            _ => n.to_string(),
        },
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_display_string(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(object @ Value::Object(_)) => object.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
