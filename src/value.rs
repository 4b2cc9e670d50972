//! Raw values produced by expression evaluation
//!
//! `RawValue` is what an expression hands back before stringification.
//! Sequences and records are shared handles (`Rc<dyn ..>`) so an observer
//! locator can recognise the same collection across evaluations and subscribe
//! to its in-place mutations.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

/// Keyed object readable by expressions
pub trait Record: fmt::Debug {
    /// Read a property (None when absent)
    fn get(&self, key: &str) -> Option<RawValue>;

    /// Whether the property exists at all
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn as_any(&self) -> &dyn Any;
}

/// Ordered collection readable by expressions
pub trait Sequence: fmt::Debug {
    /// Snapshot of the current items
    fn items(&self) -> Vec<RawValue>;

    fn as_any(&self) -> &dyn Any;
}

/// Result of evaluating an expression
#[derive(Debug, Clone, Default)]
pub enum RawValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Sequence(Rc<dyn Sequence>),
    Record(Rc<dyn Record>),
}

impl RawValue {
    /// True for null and undefined
    pub fn is_nullish(&self) -> bool {
        matches!(self, RawValue::Undefined | RawValue::Null)
    }

    pub fn as_record(&self) -> Option<&Rc<dyn Record>> {
        match self {
            RawValue::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Rc<dyn Sequence>> {
        match self {
            RawValue::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    /// Display form written into targets; null and undefined become `""`
    pub fn to_display_string(&self) -> String {
        match self {
            RawValue::Undefined | RawValue::Null => String::new(),
            RawValue::Bool(b) => b.to_string(),
            RawValue::Number(n) => format_number(*n),
            RawValue::Text(s) => s.clone(),
            RawValue::Sequence(seq) => seq
                .items()
                .iter()
                .map(RawValue::to_display_string)
                .collect::<Vec<_>>()
                .join(","),
            RawValue::Record(_) => "[object Object]".to_string(),
        }
    }

    /// Short type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Undefined => "undefined",
            RawValue::Null => "null",
            RawValue::Bool(_) => "boolean",
            RawValue::Number(_) => "number",
            RawValue::Text(_) => "string",
            RawValue::Sequence(_) => "sequence",
            RawValue::Record(_) => "record",
        }
    }
}

/// Scalars compare by value (NaN equals NaN), collections by identity.
impl PartialEq for RawValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RawValue::Undefined, RawValue::Undefined) | (RawValue::Null, RawValue::Null) => true,
            (RawValue::Bool(a), RawValue::Bool(b)) => a == b,
            (RawValue::Number(a), RawValue::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (RawValue::Text(a), RawValue::Text(b)) => a == b,
            (RawValue::Sequence(a), RawValue::Sequence(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            (RawValue::Record(a), RawValue::Record(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            _ => false,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        return text.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    // `{:e}` yields the shortest round-trip digits, e.g. `1.2345e20`
    let exponential = format!("{:e}", n.abs());
    let (mantissa, exponent) = exponential.split_once('e').unwrap_or((&exponential, "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let point = exponent + 1;

    let body = if k <= point && point <= 21 {
        format!("{}{}", digits, "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{}.{}", int, frac)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", first, sign, exponent.abs())
        } else {
            format!("{}.{}e{}{}", first, rest, sign, exponent.abs())
        }
    };
    if n < 0.0 {
        format!("-{}", body)
    } else {
        body
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<i32> for RawValue {
    fn from(n: i32) -> Self {
        RawValue::Number(n as f64)
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Number(n as f64)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(RawValue::Null, Into::into)
    }
}

/// Plain JSON becomes non-observable records and sequences
impl From<serde_json::Value> for RawValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Bool(b),
            Value::Number(n) => RawValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => RawValue::Text(s),
            Value::Array(items) => RawValue::Sequence(Rc::new(PlainSequence(
                items.into_iter().map(RawValue::from).collect(),
            ))),
            Value::Object(map) => RawValue::Record(Rc::new(PlainRecord(
                map.into_iter().map(|(k, v)| (k, RawValue::from(v))).collect(),
            ))),
        }
    }
}

/// Immutable record with no change notification
#[derive(Debug, Default)]
pub struct PlainRecord(pub FxHashMap<String, RawValue>);

impl Record for PlainRecord {
    fn get(&self, key: &str) -> Option<RawValue> {
        self.0.get(key).cloned()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Immutable sequence with no change notification
#[derive(Debug, Default)]
pub struct PlainSequence(pub Vec<RawValue>);

impl Sequence for PlainSequence {
    fn items(&self) -> Vec<RawValue> {
        self.0.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
