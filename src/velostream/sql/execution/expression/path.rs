//! Path navigation over structured values: `->key`, `[index]` and `[start:end]`.
//!
//! Null propagates through every operator, so a path rooted at an absent
//! field evaluates to null. Navigating into a value of the wrong shape is a
//! typed failure; only a `->` into a non-mapping counts as missing data.

use super::super::types::FieldValue;
use crate::velostream::sql::error::SqlError;

/// `value->key`
///
/// A mapping without the key yields null, as does a null base.
pub fn access_key(value: &FieldValue, key: &str) -> Result<FieldValue, SqlError> {
    match value {
        FieldValue::Map(map) => Ok(map.get(key).cloned().unwrap_or(FieldValue::Null)),
        FieldValue::Null => Ok(FieldValue::Null),
        other => Err(SqlError::NavigationError {
            key: key.to_string(),
            actual: other.type_name().to_string(),
        }),
    }
}

/// `value[index]`, negative indexes counting back from the end
pub fn index(value: &FieldValue, index: i64) -> Result<FieldValue, SqlError> {
    match value {
        FieldValue::Array(items) => {
            let position = resolve_index(index, items.len()).ok_or(SqlError::IndexOutOfRange {
                index,
                len: items.len(),
            })?;
            Ok(items[position].clone())
        }
        FieldValue::Null => Ok(FieldValue::Null),
        other => Err(SqlError::type_error(
            "ARRAY",
            other.type_name(),
            Some(&other.to_display_string()),
        )),
    }
}

/// `value[start:end]`, half-open.
///
/// Missing bounds default to the ends of the sequence; bounds beyond the
/// sequence are clamped and an inverted range yields an empty sequence. The
/// elements are returned unchanged, so a sequence of mappings stays one.
pub fn slice(
    value: &FieldValue,
    start: Option<i64>,
    end: Option<i64>,
) -> Result<FieldValue, SqlError> {
    match value {
        FieldValue::Array(items) => {
            let len = items.len();
            let from = clamp_bound(start.unwrap_or(0), len);
            let to = clamp_bound(end.unwrap_or(len as i64), len);
            if from >= to {
                return Ok(FieldValue::Array(Vec::new()));
            }
            Ok(FieldValue::Array(items[from..to].to_vec()))
        }
        FieldValue::Null => Ok(FieldValue::Null),
        other => Err(SqlError::type_error(
            "ARRAY",
            other.type_name(),
            Some(&other.to_display_string()),
        )),
    }
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let position = if index < 0 { len + index } else { index };
    (0..len).contains(&position).then_some(position as usize)
}

fn clamp_bound(bound: i64, len: usize) -> usize {
    let len = len as i64;
    let resolved = if bound < 0 { len + bound } else { bound };
    resolved.clamp(0, len) as usize
}
