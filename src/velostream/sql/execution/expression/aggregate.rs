//! Aggregate function computation over a whole collection or group.
//!
//! The evaluator evaluates the aggregate's argument once per row and hands the
//! resulting column of values to [`AggregateFunctions::apply`]. For `count(*)`
//! and `collect(*)` each value is the row's full field map, so it is never null.
//! `deduplicate` works on whole rows and has its own entry point.

use super::super::types::FieldValue;
use crate::velostream::sql::error::SqlError;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Utilities for aggregate function computation
pub struct AggregateFunctions;

impl AggregateFunctions {
    /// Apply the named aggregate to one value per row
    pub fn apply(name: &str, values: Vec<FieldValue>) -> Result<FieldValue, SqlError> {
        match name.to_uppercase().as_str() {
            "COUNT" => Ok(FieldValue::Integer(
                values.iter().filter(|v| !v.is_null()).count() as i64,
            )),
            "SUM" => Self::compute_sum(name, &values),
            "AVG" => Self::compute_avg(name, &values),
            "MIN" => Self::compute_extreme(name, &values, Ordering::Less),
            "MAX" => Self::compute_extreme(name, &values, Ordering::Greater),
            "COLLECT" => Ok(FieldValue::Array(values)),
            _ => Err(SqlError::UnknownFunction {
                name: name.to_string(),
            }),
        }
    }

    /// Integer inputs sum to an integer; any float widens the result
    fn compute_sum(name: &str, values: &[FieldValue]) -> Result<FieldValue, SqlError> {
        let mut total: Option<FieldValue> = None;
        for value in values.iter().filter(|v| !v.is_null()) {
            require_numeric(name, value)?;
            total = Some(match total {
                None => value.clone(),
                Some(acc) => acc
                    .add(value)
                    .map_err(|e| SqlError::aggregate_error(name, e.to_string()))?,
            });
        }
        Ok(total.unwrap_or(FieldValue::Null))
    }

    /// Average keeps the input's numeric kind: integers average to an
    /// integer (truncated), floats to a float
    fn compute_avg(name: &str, values: &[FieldValue]) -> Result<FieldValue, SqlError> {
        let count = values.iter().filter(|v| !v.is_null()).count();
        if count == 0 {
            return Ok(FieldValue::Null);
        }
        let total = Self::compute_sum(name, values)?;
        total
            .divide(&FieldValue::Integer(count as i64))
            .map_err(|e| SqlError::aggregate_error(name, e.to_string()))
    }

    fn compute_extreme(
        name: &str,
        values: &[FieldValue],
        keep: Ordering,
    ) -> Result<FieldValue, SqlError> {
        let mut best: Option<&FieldValue> = None;
        for value in values.iter().filter(|v| !v.is_null()) {
            best = match best {
                None => Some(value),
                Some(current) => match value.compare(current) {
                    Some(ordering) if ordering == keep => Some(value),
                    Some(_) => Some(current),
                    None => {
                        return Err(SqlError::aggregate_error(
                            name,
                            format!(
                                "cannot compare {} and {}",
                                current.type_name().to_lowercase(),
                                value.type_name().to_lowercase()
                            ),
                        ));
                    }
                },
            };
        }
        Ok(best.cloned().unwrap_or(FieldValue::Null))
    }

    /// `deduplicate(key, all)` over rows given as (key, fields) pairs.
    ///
    /// With `all`, returns the fields of every row whose non-null key was not
    /// seen earlier. Otherwise returns only the latest row's fields, and null
    /// when its key already occurred in an earlier row.
    pub fn deduplicate(rows: Vec<(FieldValue, HashMap<String, FieldValue>)>, all: bool) -> FieldValue {
        if !all {
            let Some(((latest, fields), earlier)) = rows.split_last() else {
                return FieldValue::Null;
            };
            if latest.is_null() || earlier.iter().any(|(key, _)| key == latest) {
                return FieldValue::Null;
            }
            return FieldValue::Map(fields.clone());
        }

        let mut seen: Vec<FieldValue> = Vec::new();
        let mut distinct = Vec::new();
        for (key, fields) in rows {
            if key.is_null() || seen.contains(&key) {
                continue;
            }
            seen.push(key);
            distinct.push(FieldValue::Map(fields));
        }
        FieldValue::Array(distinct)
    }
}

fn require_numeric(name: &str, value: &FieldValue) -> Result<(), SqlError> {
    if value.is_numeric() {
        Ok(())
    } else {
        Err(SqlError::aggregate_error(
            name,
            format!(
                "requires number but found {}({})",
                value.type_name().to_lowercase(),
                value.to_display_string()
            ),
        ))
    }
}
