//! Built-in scalar SQL function implementations.
//!
//! - **Math Functions** (ABS, ROUND, CEIL, FLOOR)
//! - **String Functions** (CONCAT, UPPER, LOWER, LENGTH)
//! - **Conditional Functions** (COALESCE)
//!
//! Arguments arrive already evaluated. Functions that need the evaluation
//! context rather than values (META, WINDOW_START, WINDOW_END) are resolved by
//! the evaluator itself; aggregates live in [`super::aggregate`].

use super::super::types::FieldValue;
use crate::velostream::sql::error::SqlError;

/// Provides built-in scalar SQL function implementations
pub struct BuiltinFunctions;

impl BuiltinFunctions {
    /// Invoke a scalar function by name (case-insensitive)
    pub fn call(name: &str, args: Vec<FieldValue>) -> Result<FieldValue, SqlError> {
        match name.to_uppercase().as_str() {
            "ABS" => Self::abs_function(args),
            "ROUND" => Self::round_function(args),
            "CEIL" => Self::ceil_function(args),
            "FLOOR" => Self::floor_function(args),
            "CONCAT" => Self::concat_function(args),
            "UPPER" => Self::upper_function(args),
            "LOWER" => Self::lower_function(args),
            "LENGTH" => Self::length_function(args),
            "COALESCE" => Self::coalesce_function(args),
            _ => Err(SqlError::UnknownFunction {
                name: name.to_string(),
            }),
        }
    }

    fn abs_function(args: Vec<FieldValue>) -> Result<FieldValue, SqlError> {
        let value = single_argument("ABS", args)?;
        match value {
            FieldValue::Integer(i) => Ok(FieldValue::Integer(i.abs())),
            FieldValue::Float(f) => Ok(FieldValue::Float(f.abs())),
            FieldValue::Decimal(d) => Ok(FieldValue::Decimal(d.abs())),
            FieldValue::Null => Ok(FieldValue::Null),
            other => Err(numeric_type_error(&other)),
        }
    }

    /// ROUND(number[, precision]); halves round away from zero
    fn round_function(args: Vec<FieldValue>) -> Result<FieldValue, SqlError> {
        if args.is_empty() || args.len() > 2 {
            return Err(SqlError::ExecutionError {
                message: "ROUND requires 1 or 2 arguments: ROUND(number[, precision])".to_string(),
                query: None,
            });
        }
        let mut args = args.into_iter();
        let value = args.next().unwrap_or(FieldValue::Null);
        let precision = match args.next() {
            None => 0,
            Some(FieldValue::Integer(p)) => p as i32,
            Some(FieldValue::Null) => return Ok(FieldValue::Null),
            Some(_) => {
                return Err(SqlError::ExecutionError {
                    message: "ROUND precision must be an integer".to_string(),
                    query: None,
                });
            }
        };

        match value {
            FieldValue::Float(f) => {
                let multiplier = 10_f64.powi(precision);
                Ok(FieldValue::Float((f * multiplier).round() / multiplier))
            }
            FieldValue::Decimal(d) => Ok(FieldValue::Decimal(
                d.round_dp_with_strategy(
                    precision.max(0) as u32,
                    rust_decimal::RoundingStrategy::MidpointAwayFromZero,
                ),
            )),
            FieldValue::Integer(i) => Ok(FieldValue::Integer(i)), // Integers don't need rounding
            FieldValue::Null => Ok(FieldValue::Null),
            other => Err(numeric_type_error(&other)),
        }
    }

    fn ceil_function(args: Vec<FieldValue>) -> Result<FieldValue, SqlError> {
        match single_argument("CEIL", args)? {
            FieldValue::Float(f) => Ok(FieldValue::Integer(f.ceil() as i64)),
            FieldValue::Decimal(d) => Ok(FieldValue::Decimal(d.ceil())),
            FieldValue::Integer(i) => Ok(FieldValue::Integer(i)),
            FieldValue::Null => Ok(FieldValue::Null),
            other => Err(numeric_type_error(&other)),
        }
    }

    fn floor_function(args: Vec<FieldValue>) -> Result<FieldValue, SqlError> {
        match single_argument("FLOOR", args)? {
            FieldValue::Float(f) => Ok(FieldValue::Integer(f.floor() as i64)),
            FieldValue::Decimal(d) => Ok(FieldValue::Decimal(d.floor())),
            FieldValue::Integer(i) => Ok(FieldValue::Integer(i)),
            FieldValue::Null => Ok(FieldValue::Null),
            other => Err(numeric_type_error(&other)),
        }
    }

    fn concat_function(args: Vec<FieldValue>) -> Result<FieldValue, SqlError> {
        let mut result = String::new();
        for value in args {
            match value {
                FieldValue::String(s) => result.push_str(&s),
                FieldValue::Null => {} // NULL values are ignored in CONCAT
                other => result.push_str(&other.to_display_string()),
            }
        }
        Ok(FieldValue::String(result))
    }

    fn upper_function(args: Vec<FieldValue>) -> Result<FieldValue, SqlError> {
        match single_argument("UPPER", args)? {
            FieldValue::String(s) => Ok(FieldValue::String(s.to_uppercase())),
            FieldValue::Null => Ok(FieldValue::Null),
            other => Err(string_type_error(&other)),
        }
    }

    fn lower_function(args: Vec<FieldValue>) -> Result<FieldValue, SqlError> {
        match single_argument("LOWER", args)? {
            FieldValue::String(s) => Ok(FieldValue::String(s.to_lowercase())),
            FieldValue::Null => Ok(FieldValue::Null),
            other => Err(string_type_error(&other)),
        }
    }

    /// Character count of a string, element count of an array or map
    fn length_function(args: Vec<FieldValue>) -> Result<FieldValue, SqlError> {
        match single_argument("LENGTH", args)? {
            FieldValue::String(s) => Ok(FieldValue::Integer(s.chars().count() as i64)),
            FieldValue::Array(items) => Ok(FieldValue::Integer(items.len() as i64)),
            FieldValue::Map(map) => Ok(FieldValue::Integer(map.len() as i64)),
            FieldValue::Null => Ok(FieldValue::Null),
            other => Err(string_type_error(&other)),
        }
    }

    fn coalesce_function(args: Vec<FieldValue>) -> Result<FieldValue, SqlError> {
        if args.is_empty() {
            return Err(SqlError::ExecutionError {
                message: "COALESCE function requires at least one argument".to_string(),
                query: Some("COALESCE()".to_string()),
            });
        }
        Ok(args
            .into_iter()
            .find(|v| !v.is_null())
            .unwrap_or(FieldValue::Null))
    }
}

fn single_argument(function: &str, args: Vec<FieldValue>) -> Result<FieldValue, SqlError> {
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(value), None) => Ok(value),
        _ => Err(SqlError::ExecutionError {
            message: format!("{} requires exactly one argument", function),
            query: None,
        }),
    }
}

fn numeric_type_error(value: &FieldValue) -> SqlError {
    SqlError::type_error("NUMBER", value.type_name(), Some(&value.to_display_string()))
}

fn string_type_error(value: &FieldValue) -> SqlError {
    SqlError::type_error("STRING", value.type_name(), Some(&value.to_display_string()))
}
