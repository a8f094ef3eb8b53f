//! Condition evaluation against event data
//!
//! Conditions never fail: a missing field or a value that cannot be coerced
//! to the declared type makes the condition evaluate to `false` for every
//! operator except `not_exists`.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;
use tracing::{debug, trace};

use crate::types::{Condition, ConditionOperator, ValueType};

/// Evaluates rule conditions against event data
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Whether every condition holds for `data`
    ///
    /// An empty list matches everything.
    pub fn matches(conditions: &[Condition], data: &Value) -> bool {
        conditions.iter().all(|condition| Self::evaluate(condition, data))
    }

    /// Evaluate a single condition against event data
    pub fn evaluate(condition: &Condition, data: &Value) -> bool {
        let field = lookup_path(data, &condition.field);

        let result = match condition.operator {
            ConditionOperator::Exists => field.is_some(),
            ConditionOperator::NotExists => field.is_none(),
            ConditionOperator::Unknown => false,
            operator => {
                let left = Coerced::from_field(field.as_ref(), condition.value_type);
                Self::compare(operator, &left, &condition.value, condition.value_type)
            }
        };

        trace!(
            field = %condition.field,
            operator = ?condition.operator,
            result = result,
            "Evaluated condition"
        );

        result
    }

    fn compare(
        operator: ConditionOperator,
        left: &Coerced,
        literal: &Value,
        value_type: ValueType,
    ) -> bool {
        if !left.is_usable() {
            return false;
        }

        match operator {
            ConditionOperator::In | ConditionOperator::NotIn => {
                let Value::Array(items) = literal else {
                    debug!(operator = ?operator, "Membership literal is not an array");
                    return false;
                };
                let candidates: Vec<Coerced> = items
                    .iter()
                    .map(|item| Coerced::from_field(Some(item), value_type))
                    .filter(Coerced::is_usable)
                    .collect();
                let found = candidates.iter().any(|candidate| left.equals(candidate));
                if operator == ConditionOperator::In {
                    found
                } else {
                    !found
                }
            }
            _ => {
                let right = Coerced::from_field(Some(literal), value_type);
                if !right.is_usable() {
                    return false;
                }
                match operator {
                    ConditionOperator::Eq => left.equals(&right),
                    ConditionOperator::Ne => !left.equals(&right),
                    ConditionOperator::Gt => left.order(&right) == Some(Ordering::Greater),
                    ConditionOperator::Lt => left.order(&right) == Some(Ordering::Less),
                    ConditionOperator::Gte => matches!(
                        left.order(&right),
                        Some(Ordering::Greater | Ordering::Equal)
                    ),
                    ConditionOperator::Lte => matches!(
                        left.order(&right),
                        Some(Ordering::Less | Ordering::Equal)
                    ),
                    ConditionOperator::Contains => left.text().contains(&right.text()),
                    ConditionOperator::NotContains => !left.text().contains(&right.text()),
                    _ => false,
                }
            }
        }
    }
}

/// Walk a dot-separated path through `data`
///
/// Objects are indexed by key and arrays by position. `length` on a string
/// or array yields its length. `null` counts as absent.
pub fn lookup_path(data: &Value, path: &str) -> Option<Value> {
    let mut current = data;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let last = segments.peek().is_none();
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) if segment == "length" && last => {
                return Some(Value::from(items.len()));
            }
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            Value::String(s) if segment == "length" && last => {
                return Some(Value::from(s.chars().count()));
            }
            _ => return None,
        };
    }

    if current.is_null() {
        None
    } else {
        Some(current.clone())
    }
}

/// An operand after coercion to the declared type
#[derive(Debug, Clone, PartialEq)]
enum Coerced {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(DateTime<Utc>),
    List(Vec<Coerced>),
    /// The field path resolved to nothing
    Missing,
    /// The value could not be interpreted as the declared type
    Invalid,
}

impl Coerced {
    fn from_field(value: Option<&Value>, value_type: ValueType) -> Self {
        match value {
            None | Some(Value::Null) => Coerced::Missing,
            Some(value) => Self::coerce(value, value_type),
        }
    }

    fn coerce(value: &Value, value_type: ValueType) -> Self {
        match value_type {
            ValueType::String => Coerced::Text(display(value)),
            ValueType::Number => match value {
                Value::Number(n) => n.as_f64().map_or(Coerced::Invalid, Coerced::Number),
                Value::String(s) => match s.trim().parse::<f64>() {
                    Ok(n) if n.is_finite() => Coerced::Number(n),
                    _ => Coerced::Invalid,
                },
                Value::Bool(b) => Coerced::Number(if *b { 1.0 } else { 0.0 }),
                _ => Coerced::Invalid,
            },
            ValueType::Boolean => match value {
                Value::Bool(b) => Coerced::Bool(*b),
                Value::Number(n) => n
                    .as_f64()
                    .map_or(Coerced::Invalid, |n| Coerced::Bool(n != 0.0)),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Coerced::Bool(true),
                    "false" | "0" => Coerced::Bool(false),
                    _ => Coerced::Invalid,
                },
                _ => Coerced::Invalid,
            },
            ValueType::Date => match value {
                Value::String(s) => parse_date(s.trim()).map_or(Coerced::Invalid, Coerced::Date),
                Value::Number(n) => n
                    .as_i64()
                    .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
                    .map_or(Coerced::Invalid, Coerced::Date),
                _ => Coerced::Invalid,
            },
            ValueType::Array => match value {
                Value::Array(items) => Coerced::List(
                    items
                        .iter()
                        .map(|item| Coerced::Text(display(item)))
                        .collect(),
                ),
                scalar => Coerced::List(vec![Coerced::Text(display(scalar))]),
            },
        }
    }

    fn is_usable(&self) -> bool {
        !matches!(self, Coerced::Missing | Coerced::Invalid)
    }

    fn equals(&self, other: &Coerced) -> bool {
        match (self, other) {
            (Coerced::Number(a), Coerced::Number(b)) => a == b,
            (Coerced::Text(a), Coerced::Text(b)) => a == b,
            (Coerced::Bool(a), Coerced::Bool(b)) => a == b,
            (Coerced::Date(a), Coerced::Date(b)) => a == b,
            (Coerced::List(a), Coerced::List(b)) => a == b,
            _ => false,
        }
    }

    fn order(&self, other: &Coerced) -> Option<Ordering> {
        match (self, other) {
            (Coerced::Number(a), Coerced::Number(b)) => a.partial_cmp(b),
            (Coerced::Text(a), Coerced::Text(b)) => Some(a.cmp(b)),
            (Coerced::Bool(a), Coerced::Bool(b)) => Some(a.cmp(b)),
            (Coerced::Date(a), Coerced::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    fn text(&self) -> String {
        match self {
            Coerced::Text(s) => s.clone(),
            Coerced::Number(n) => format_number(*n),
            Coerced::Bool(b) => b.to_string(),
            Coerced::Date(d) => d.to_rfc3339(),
            Coerced::List(items) => items
                .iter()
                .map(Coerced::text)
                .collect::<Vec<_>>()
                .join(","),
            Coerced::Missing | Coerced::Invalid => String::new(),
        }
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn cond(field: &str, operator: ConditionOperator, value: Value, value_type: ValueType) -> Condition {
        Condition::new(field, operator, value, value_type)
    }

    #[test]
    fn test_empty_conditions_match() {
        assert!(ConditionEvaluator::matches(&[], &json!({})));
    }

    #[test]
    fn test_string_length_path() {
        let data = json!({"content": "x".repeat(150)});
        let conditions = vec![
            cond("content", ConditionOperator::Exists, Value::Null, ValueType::String),
            cond("content.length", ConditionOperator::Gt, json!(100), ValueType::Number),
        ];
        assert!(ConditionEvaluator::matches(&conditions, &data));

        let short = json!({"content": "short"});
        assert!(!ConditionEvaluator::matches(&conditions, &short));
    }

    #[test]
    fn test_nested_and_indexed_paths() {
        let data = json!({"post": {"tags": ["rust", "async"], "author": {"id": 7}}});
        assert_eq!(lookup_path(&data, "post.author.id"), Some(json!(7)));
        assert_eq!(lookup_path(&data, "post.tags.1"), Some(json!("async")));
        assert_eq!(lookup_path(&data, "post.tags.length"), Some(json!(2)));
        assert_eq!(lookup_path(&data, "post.tags.9"), None);
        assert_eq!(lookup_path(&data, "post.missing.id"), None);
    }

    #[test]
    fn test_missing_field_fails_closed() {
        let data = json!({"other": 1});
        let exists = cond("absent", ConditionOperator::Exists, Value::Null, ValueType::String);
        let not_exists = cond("absent", ConditionOperator::NotExists, Value::Null, ValueType::String);
        let ne = cond("absent", ConditionOperator::Ne, json!("x"), ValueType::String);
        let not_contains = cond("absent", ConditionOperator::NotContains, json!("x"), ValueType::String);

        assert!(!ConditionEvaluator::evaluate(&exists, &data));
        assert!(ConditionEvaluator::evaluate(&not_exists, &data));
        assert!(!ConditionEvaluator::evaluate(&ne, &data));
        assert!(!ConditionEvaluator::evaluate(&not_contains, &data));
    }

    #[test]
    fn test_null_counts_as_absent() {
        let data = json!({"title": null});
        let exists = cond("title", ConditionOperator::Exists, Value::Null, ValueType::String);
        assert!(!ConditionEvaluator::evaluate(&exists, &data));
    }

    #[test]
    fn test_number_coercion_failure_fails_every_operator() {
        let data = json!({"count": "abc"});
        for operator in [
            ConditionOperator::Eq,
            ConditionOperator::Ne,
            ConditionOperator::Gt,
            ConditionOperator::Lt,
            ConditionOperator::Gte,
            ConditionOperator::Lte,
        ] {
            let condition = cond("count", operator, json!(5), ValueType::Number);
            assert!(
                !ConditionEvaluator::evaluate(&condition, &data),
                "{:?} should fail closed",
                operator
            );
        }
    }

    #[test]
    fn test_numeric_strings_compare_numerically() {
        let data = json!({"views": "1000"});
        let gt = cond("views", ConditionOperator::Gt, json!("999"), ValueType::Number);
        assert!(ConditionEvaluator::evaluate(&gt, &data));

        let lexicographic = cond("views", ConditionOperator::Gt, json!("999"), ValueType::String);
        assert!(!ConditionEvaluator::evaluate(&lexicographic, &data));
    }

    #[test]
    fn test_contains_on_string_representation() {
        let data = json!({"title": "Async Rust in practice", "tags": ["rust", "tokio"]});
        let contains = cond("title", ConditionOperator::Contains, json!("Rust"), ValueType::String);
        let not_contains = cond("title", ConditionOperator::NotContains, json!("Go"), ValueType::String);
        let list_contains = cond("tags", ConditionOperator::Contains, json!("tokio"), ValueType::Array);

        assert!(ConditionEvaluator::evaluate(&contains, &data));
        assert!(ConditionEvaluator::evaluate(&not_contains, &data));
        assert!(ConditionEvaluator::evaluate(&list_contains, &data));
    }

    #[test]
    fn test_in_requires_array_literal() {
        let data = json!({"status": "draft"});
        let in_list = cond("status", ConditionOperator::In, json!(["draft", "review"]), ValueType::String);
        let not_in_list = cond("status", ConditionOperator::NotIn, json!(["published"]), ValueType::String);
        let in_scalar = cond("status", ConditionOperator::In, json!("draft"), ValueType::String);
        let not_in_scalar = cond("status", ConditionOperator::NotIn, json!("other"), ValueType::String);

        assert!(ConditionEvaluator::evaluate(&in_list, &data));
        assert!(ConditionEvaluator::evaluate(&not_in_list, &data));
        assert!(!ConditionEvaluator::evaluate(&in_scalar, &data));
        assert!(!ConditionEvaluator::evaluate(&not_in_scalar, &data));
    }

    #[test]
    fn test_in_with_numbers() {
        let data = json!({"code": "404"});
        let condition = cond("code", ConditionOperator::In, json!([404, 500]), ValueType::Number);
        assert!(ConditionEvaluator::evaluate(&condition, &data));
    }

    #[test]
    fn test_boolean_coercion() {
        let data = json!({"featured": "TRUE", "draft": 0});
        let featured = cond("featured", ConditionOperator::Eq, json!(true), ValueType::Boolean);
        let draft = cond("draft", ConditionOperator::Eq, json!(false), ValueType::Boolean);
        let garbage = cond("featured", ConditionOperator::Eq, json!("maybe"), ValueType::Boolean);

        assert!(ConditionEvaluator::evaluate(&featured, &data));
        assert!(ConditionEvaluator::evaluate(&draft, &data));
        assert!(!ConditionEvaluator::evaluate(&garbage, &data));
    }

    #[test]
    fn test_date_comparison() {
        let data = json!({"published_at": "2024-06-01T12:00:00Z"});
        let after = cond("published_at", ConditionOperator::Gt, json!("2024-01-01"), ValueType::Date);
        let before = cond("published_at", ConditionOperator::Lt, json!("2024-01-01"), ValueType::Date);
        let invalid = cond("published_at", ConditionOperator::Gt, json!("yesterday"), ValueType::Date);

        assert!(ConditionEvaluator::evaluate(&after, &data));
        assert!(!ConditionEvaluator::evaluate(&before, &data));
        assert!(!ConditionEvaluator::evaluate(&invalid, &data));
    }

    #[test]
    fn test_unknown_operator_never_matches() {
        let data = json!({"a": 1});
        let condition = cond("a", ConditionOperator::Unknown, json!(1), ValueType::Number);
        assert!(!ConditionEvaluator::evaluate(&condition, &data));
    }

    #[test]
    fn test_all_conditions_must_hold() {
        let data = json!({"a": 1, "b": 2});
        let conditions = vec![
            cond("a", ConditionOperator::Eq, json!(1), ValueType::Number),
            cond("b", ConditionOperator::Eq, json!(3), ValueType::Number),
        ];
        assert!(!ConditionEvaluator::matches(&conditions, &data));
    }
}
