// Condition evaluation - operator semantics for field-based triggers

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Operators available to `field_changed` triggers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    IsEmpty,
    NotEmpty,
    /// Matches whenever before != after. The matcher establishes the change
    /// itself, so evaluation ignores the configured value entirely.
    Changed,
}

/// Evaluate one operator against the field's current value and the
/// configured comparison value. Pure; callers resolve field lookups.
pub fn evaluate(op: ConditionOperator, actual: Option<&JsonValue>, expected: Option<&str>) -> bool {
    match op {
        ConditionOperator::Changed => true,
        ConditionOperator::IsEmpty => is_blank(actual),
        ConditionOperator::NotEmpty => !is_blank(actual),
        ConditionOperator::Equals => values_equal(actual, expected),
        ConditionOperator::NotEquals => !values_equal(actual, expected),
        ConditionOperator::Contains => {
            let haystack = as_text(actual).to_lowercase();
            let needle = expected.unwrap_or_default().to_lowercase();
            haystack.contains(&needle)
        }
    }
}

fn is_blank(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => true,
        Some(JsonValue::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn as_text(value: Option<&JsonValue>) -> String {
    match value {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Numeric comparison when both sides parse as numbers, case-sensitive
/// string equality otherwise.
fn values_equal(actual: Option<&JsonValue>, expected: Option<&str>) -> bool {
    let actual = as_text(actual);
    let expected = expected.unwrap_or_default();
    if let (Ok(a), Ok(e)) = (actual.parse::<f64>(), expected.parse::<f64>()) {
        return a == e;
    }
    actual == expected
}
