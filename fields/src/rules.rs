//! Validation rules.
//!
//! Rules are plain data derived from field configuration. Evaluation lives
//! in the validator; the pure checks here never touch storage.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use keel_core::Value;
use regex_lite::Regex;

/// A single validation constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Value must be present and not blank.
    Required,
    /// Null is accepted and skips the remaining rules.
    Nullable,
    String,
    Integer,
    Numeric,
    Boolean,
    Date,
    Email,
    /// Lower bound: numeric value, string length or item count.
    Min(f64),
    /// Upper bound: numeric value, string length or item count.
    Max(f64),
    Between(f64, f64),
    /// Value must equal one of the options.
    In(Vec<Value>),
    /// Regular expression the string form must match.
    Pattern(String),
    Array,
    /// List items must be unique.
    Distinct,
    /// An entity of the type with this identifier must exist.
    Exists { entity_type: String },
    /// Every identifier in the list must exist.
    EachExists { entity_type: String },
    /// Value must be the morph alias of one of the types.
    MorphType { types: Vec<String> },
}

impl Rule {
    /// Rules that need storage or the registry to evaluate.
    pub fn needs_lookup(&self) -> bool {
        matches!(
            self,
            Rule::Exists { .. } | Rule::EachExists { .. } | Rule::MorphType { .. }
        )
    }

    /// Evaluate a rule that needs no lookup.
    ///
    /// `numeric` is true when a sibling rule makes the value a number, which
    /// switches the size rules from length to magnitude. Returns `None` for
    /// rules that need a lookup.
    pub fn passes(&self, value: &Value, numeric: bool) -> Option<bool> {
        let passed = match self {
            Rule::Required => !value.is_blank(),
            Rule::Nullable => true,
            Rule::String => value.is_string(),
            Rule::Integer => is_integer(value),
            Rule::Numeric => as_number(value).is_some(),
            Rule::Boolean => as_boolean(value).is_some(),
            Rule::Date => is_date(value),
            Rule::Email => value.as_str().map_or(false, is_email),
            Rule::Min(min) => size(value, numeric).map_or(false, |size| size >= *min),
            Rule::Max(max) => size(value, numeric).map_or(false, |size| size <= *max),
            Rule::Between(min, max) => {
                size(value, numeric).map_or(false, |size| size >= *min && size <= *max)
            }
            Rule::In(options) => options.iter().any(|option| option.loose_eq(value)),
            Rule::Pattern(pattern) => match Regex::new(pattern) {
                Ok(regex) => regex.is_match(&value.to_text()),
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "invalid validation pattern");
                    false
                }
            },
            Rule::Array => value.is_list(),
            Rule::Distinct => match value.as_list() {
                Some(items) => items
                    .iter()
                    .enumerate()
                    .all(|(i, item)| !items[..i].iter().any(|seen| seen.loose_eq(item))),
                None => true,
            },
            Rule::Exists { .. } | Rule::EachExists { .. } | Rule::MorphType { .. } => {
                return None
            }
        };
        Some(passed)
    }

    /// Failure message for the attribute, in the `The {attribute} field ...` style.
    pub fn message(&self, key: &str, value: &Value, numeric: bool) -> String {
        let attribute = attribute_label(key);
        let unit = size_unit(value, numeric);
        match self {
            Rule::Required => format!("The {} field is required.", attribute),
            Rule::Nullable => format!("The {} field may be null.", attribute),
            Rule::String => format!("The {} field must be a string.", attribute),
            Rule::Integer => format!("The {} field must be an integer.", attribute),
            Rule::Numeric => format!("The {} field must be a number.", attribute),
            Rule::Boolean => format!("The {} field must be true or false.", attribute),
            Rule::Date => format!("The {} field must be a valid date.", attribute),
            Rule::Email => format!("The {} field must be a valid email address.", attribute),
            Rule::Min(min) => match unit {
                SizeUnit::Magnitude => {
                    format!("The {} field must be at least {}.", attribute, number(*min))
                }
                SizeUnit::Characters => format!(
                    "The {} field must be at least {} characters.",
                    attribute,
                    number(*min)
                ),
                SizeUnit::Items => format!(
                    "The {} field must have at least {} items.",
                    attribute,
                    number(*min)
                ),
            },
            Rule::Max(max) => match unit {
                SizeUnit::Magnitude => format!(
                    "The {} field must not be greater than {}.",
                    attribute,
                    number(*max)
                ),
                SizeUnit::Characters => format!(
                    "The {} field must not be greater than {} characters.",
                    attribute,
                    number(*max)
                ),
                SizeUnit::Items => format!(
                    "The {} field must not have more than {} items.",
                    attribute,
                    number(*max)
                ),
            },
            Rule::Between(min, max) => format!(
                "The {} field must be between {} and {}.",
                attribute,
                number(*min),
                number(*max)
            ),
            Rule::In(_)
            | Rule::Exists { .. }
            | Rule::EachExists { .. }
            | Rule::MorphType { .. } => {
                format!("The selected {} is invalid.", attribute)
            }
            Rule::Pattern(_) => format!("The {} field format is invalid.", attribute),
            Rule::Array => format!("The {} field must be an array.", attribute),
            Rule::Distinct => format!("The {} field has a duplicate value.", attribute),
        }
    }
}

/// Human form of an input key: `display_name` becomes `display name`.
pub fn attribute_label(key: &str) -> String {
    key.replace('_', " ")
}

/// Interpret loose input as a number.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Int(_) | Value::Float(_) => value.as_float(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Interpret loose input as a boolean: `true/false`, `1/0` and their string forms.
pub fn as_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Int(0) => Some(false),
        Value::Int(1) => Some(true),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Some(true),
            "0" | "false" | "off" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Int(_) => true,
        Value::Float(f) => f.fract() == 0.0,
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_date(value: &Value) -> bool {
    let Some(text) = value.as_str() else {
        return false;
    };
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").is_ok()
        || DateTime::parse_from_rfc3339(text).is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SizeUnit {
    Magnitude,
    Characters,
    Items,
}

fn size_unit(value: &Value, numeric: bool) -> SizeUnit {
    match value {
        Value::List(_) => SizeUnit::Items,
        Value::Int(_) | Value::Float(_) => SizeUnit::Magnitude,
        _ if numeric => SizeUnit::Magnitude,
        _ => SizeUnit::Characters,
    }
}

fn size(value: &Value, numeric: bool) -> Option<f64> {
    match size_unit(value, numeric) {
        SizeUnit::Magnitude => as_number(value),
        SizeUnit::Characters => value.as_str().map(|s| s.chars().count() as f64),
        SizeUnit::Items => value.as_list().map(|items| items.len() as f64),
    }
}

fn number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn is_email(text: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| {
            Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").ok()
        })
        .as_ref()
        .map_or(false, |regex| regex.is_match(text))
}
