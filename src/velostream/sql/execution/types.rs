//! Core streaming SQL data types.
//!
//! This module contains the fundamental data types used by the projection stage:
//! - [`FieldValue`] - The structured value type flowing through expressions
//! - [`StreamRecord`] - A single event: origin, named fields and metadata
//! - [`reserved_keys`] - Output keys owned by the engine, not by user queries

use crate::velostream::sql::error::SqlError;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A value in a SQL record field
///
/// This enum represents all value shapes the projection stage can see: scalars,
/// plus arbitrarily nested sequences and mappings navigated with `->` and `[]`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Boolean value (true/false)
    Boolean(bool),
    /// SQL NULL value
    Null,
    /// Timestamp type (YYYY-MM-DD HH:MM:SS[.nnn])
    Timestamp(NaiveDateTime),
    /// Decimal type for precise arithmetic
    Decimal(Decimal),
    /// Ordered sequence of values
    Array(Vec<FieldValue>),
    /// Map of key-value pairs - keys must be strings
    Map(HashMap<String, FieldValue>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "NULL"),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Timestamp(t) => write!(f, "{}", t),
            FieldValue::Decimal(d) => write!(f, "{}", d),
            FieldValue::Array(arr) => {
                write!(f, "[")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            FieldValue::Map(map) => {
                // Sorted so that rendering is deterministic
                let sorted: BTreeMap<&String, &FieldValue> = map.iter().collect();
                write!(f, "{{")?;
                for (i, (k, v)) in sorted.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Custom Serialize implementation for FieldValue
///
/// Maps are emitted with sorted keys so that two projections of the same input
/// serialize byte-for-byte identically.
impl Serialize for FieldValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FieldValue::Integer(i) => serializer.serialize_i64(*i),
            FieldValue::Float(f) => serializer.serialize_f64(*f),
            FieldValue::String(s) => serializer.serialize_str(s),
            FieldValue::Boolean(b) => serializer.serialize_bool(*b),
            FieldValue::Null => serializer.serialize_none(),
            FieldValue::Timestamp(ts) => {
                serializer.serialize_str(&ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
            }
            FieldValue::Decimal(dec) => serializer.serialize_str(&dec.to_string()),
            FieldValue::Array(arr) => {
                let mut seq = serializer.serialize_seq(Some(arr.len()))?;
                for elem in arr {
                    seq.serialize_element(elem)?;
                }
                seq.end()
            }
            FieldValue::Map(map) => {
                let sorted: BTreeMap<&String, &FieldValue> = map.iter().collect();
                let mut m = serializer.serialize_map(Some(sorted.len()))?;
                for (k, v) in sorted {
                    m.serialize_entry(k, v)?;
                }
                m.end()
            }
        }
    }
}

/// Keys the engine writes into output records on its own behalf.
///
/// These are process-wide constants; queries cannot rename them.
pub mod reserved_keys {
    /// Output key carrying the source record's metadata when propagation is on
    pub const METADATA: &str = "__meta";

    /// Prefix for unnamed expression fields, followed by a zero-based ordinal
    pub const PLACEHOLDER_FIELD_PREFIX: &str = "kuiper_field_";

    /// Output name for the `n`-th unnamed expression field of a query
    pub fn placeholder_field_name(ordinal: usize) -> String {
        format!("{}{}", PLACEHOLDER_FIELD_PREFIX, ordinal)
    }
}

impl FieldValue {
    /// Get the type name for error messages and debugging
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Integer(_) => "INTEGER",
            FieldValue::Float(_) => "FLOAT",
            FieldValue::String(_) => "STRING",
            FieldValue::Boolean(_) => "BOOLEAN",
            FieldValue::Null => "NULL",
            FieldValue::Timestamp(_) => "TIMESTAMP",
            FieldValue::Decimal(_) => "DECIMAL",
            FieldValue::Array(_) => "ARRAY",
            FieldValue::Map(_) => "MAP",
        }
    }

    /// Check if this value represents a numeric type
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldValue::Integer(_) | FieldValue::Float(_) | FieldValue::Decimal(_)
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Numeric value widened to f64, if this is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Convert this value to a string representation for display
    ///
    /// Unlike Debug formatting this gives clean, SQL-like output and is what
    /// string functions such as CONCAT operate on.
    pub fn to_display_string(&self) -> String {
        match self {
            FieldValue::Null => "NULL".to_string(),
            FieldValue::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            other => other.to_string(),
        }
    }

    /// Truthiness used by logical operators and CASE conditions.
    pub fn to_bool(&self) -> Result<bool, SqlError> {
        match self {
            FieldValue::Boolean(b) => Ok(*b),
            FieldValue::Null => Ok(false),
            other => Err(SqlError::type_error(
                "BOOLEAN",
                other.type_name(),
                Some(&other.to_display_string()),
            )),
        }
    }

    /// Add two FieldValue instances with proper type coercion
    ///
    /// Integer op Integer stays integral; any Float operand widens to Float;
    /// Decimal combines with Integer and Decimal exactly.
    pub fn add(&self, other: &FieldValue) -> Result<FieldValue, SqlError> {
        self.arithmetic(other, "+")
    }

    pub fn subtract(&self, other: &FieldValue) -> Result<FieldValue, SqlError> {
        self.arithmetic(other, "-")
    }

    pub fn multiply(&self, other: &FieldValue) -> Result<FieldValue, SqlError> {
        self.arithmetic(other, "*")
    }

    /// Divide, returning an execution error on division by zero
    pub fn divide(&self, other: &FieldValue) -> Result<FieldValue, SqlError> {
        self.arithmetic(other, "/")
    }

    pub fn modulo(&self, other: &FieldValue) -> Result<FieldValue, SqlError> {
        self.arithmetic(other, "%")
    }

    fn arithmetic(&self, other: &FieldValue, op: &str) -> Result<FieldValue, SqlError> {
        match (self, other) {
            (FieldValue::Null, _) | (_, FieldValue::Null) => Ok(FieldValue::Null),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => integer_op(*a, *b, op),
            (FieldValue::Decimal(a), FieldValue::Decimal(b)) => decimal_op(*a, *b, op),
            (FieldValue::Decimal(a), FieldValue::Integer(b)) => decimal_op(*a, Decimal::from(*b), op),
            (FieldValue::Integer(a), FieldValue::Decimal(b)) => decimal_op(Decimal::from(*a), *b, op),
            (l, r) if l.is_numeric() && r.is_numeric() => {
                // Checked above that both sides convert
                let (a, b) = (l.as_f64().unwrap_or_default(), r.as_f64().unwrap_or_default());
                float_op(a, b, op)
            }
            (l, r) => Err(SqlError::ExecutionError {
                message: format!(
                    "invalid operation {}({}) {} {}({})",
                    l.type_name(),
                    l.to_display_string(),
                    op,
                    r.type_name(),
                    r.to_display_string()
                ),
                query: None,
            }),
        }
    }

    /// SQL-style comparison. Returns `None` when the values are not comparable.
    pub fn compare(&self, other: &FieldValue) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (FieldValue::String(a), FieldValue::String(b)) => Some(a.cmp(b)),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => Some(a.cmp(b)),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => Some(a.cmp(b)),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
            (FieldValue::Decimal(a), FieldValue::Decimal(b)) => Some(a.cmp(b)),
            (l, r) if l.is_numeric() && r.is_numeric() => l.as_f64()?.partial_cmp(&r.as_f64()?),
            _ => None,
        }
    }

    /// Convert to a `serde_json::Value` (maps become JSON objects with sorted keys)
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn integer_op(a: i64, b: i64, op: &str) -> Result<FieldValue, SqlError> {
    let result = match op {
        "+" => a.checked_add(b),
        "-" => a.checked_sub(b),
        "*" => a.checked_mul(b),
        "/" | "%" if b == 0 => return Err(SqlError::execution_error("Division by zero")),
        "/" => a.checked_div(b),
        "%" => a.checked_rem(b),
        _ => None,
    };
    result
        .map(FieldValue::Integer)
        .ok_or_else(|| SqlError::execution_error(format!("Integer overflow in {} {} {}", a, op, b)))
}

fn float_op(a: f64, b: f64, op: &str) -> Result<FieldValue, SqlError> {
    match op {
        "+" => Ok(FieldValue::Float(a + b)),
        "-" => Ok(FieldValue::Float(a - b)),
        "*" => Ok(FieldValue::Float(a * b)),
        "/" | "%" if b == 0.0 => Err(SqlError::execution_error("Division by zero")),
        "/" => Ok(FieldValue::Float(a / b)),
        "%" => Ok(FieldValue::Float(a % b)),
        _ => Err(SqlError::execution_error(format!("Unknown operator {}", op))),
    }
}

fn decimal_op(a: Decimal, b: Decimal, op: &str) -> Result<FieldValue, SqlError> {
    let result = match op {
        "+" => a.checked_add(b),
        "-" => a.checked_sub(b),
        "*" => a.checked_mul(b),
        "/" | "%" if b.is_zero() => return Err(SqlError::execution_error("Division by zero")),
        "/" => a.checked_div(b),
        "%" => a.checked_rem(b),
        _ => None,
    };
    result
        .map(FieldValue::Decimal)
        .ok_or_else(|| SqlError::execution_error(format!("Decimal overflow in {} {} {}", a, op, b)))
}

/// A single event in a streaming data source
///
/// Holds the origin stream (emitter), the named field data, and out-of-band
/// metadata that is not part of the field set.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRecord {
    /// Name of the stream this record originated from
    pub emitter: String,
    /// Field name to value. Keys are unique and case-sensitive.
    pub fields: HashMap<String, FieldValue>,
    /// Out-of-band key/value pairs (e.g. device, topic) not in the field set
    pub metadata: HashMap<String, FieldValue>,
    /// Processing time in milliseconds since Unix epoch
    pub timestamp: i64,
}

impl Default for StreamRecord {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

impl StreamRecord {
    /// Create a new StreamRecord with the given fields and no origin or metadata
    pub fn new(fields: HashMap<String, FieldValue>) -> Self {
        Self {
            emitter: String::new(),
            fields,
            metadata: HashMap::new(),
            timestamp: 0,
        }
    }

    /// Create a record originating from the named stream
    pub fn from_emitter(emitter: impl Into<String>, fields: HashMap<String, FieldValue>) -> Self {
        Self {
            emitter: emitter.into(),
            ..Self::new(fields)
        }
    }

    /// Attach metadata (fluent API)
    pub fn with_metadata(mut self, metadata: HashMap<String, FieldValue>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the processing timestamp (fluent API)
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Processing time as a UTC instant
    pub fn processing_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Get a field value by name
    ///
    /// Tries an exact match first and falls back to a case-insensitive match,
    /// so `A` finds a field stored as `a`.
    pub fn get_field(&self, name: &str) -> Option<&FieldValue> {
        lookup_case_insensitive(&self.fields, name)
    }

    /// Get a metadata value by key, with the same matching rules as fields
    pub fn get_metadata(&self, key: &str) -> Option<&FieldValue> {
        lookup_case_insensitive(&self.metadata, key)
    }

    /// Check if a field exists in this record (including NULL-valued fields)
    pub fn has_field(&self, name: &str) -> bool {
        self.get_field(name).is_some()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// The record's fields as a JSON object with sorted keys
    pub fn to_json(&self) -> serde_json::Value {
        FieldValue::Map(self.fields.clone()).to_json()
    }
}

pub(crate) fn lookup_case_insensitive<'a>(
    map: &'a HashMap<String, FieldValue>,
    name: &str,
) -> Option<&'a FieldValue> {
    map.get(name).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    })
}

impl fmt::Display for StreamRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", FieldValue::Map(self.fields.clone()))
    }
}
