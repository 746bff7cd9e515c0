//! Expression evaluation module for the projection stage.
//!
//! This module contains the resolution bridge between the projection engine
//! and whatever evaluates expressions:
//! - [`RowValuer`] resolves an expression against a single row
//! - [`AggregateValuer`] resolves an expression against a whole collection or group
//! - [`ExpressionEvaluator`] is the built-in implementation of both
//!
//! The evaluation system supports:
//! - Column references (source-qualified or not) and literals
//! - Alias references to fields computed earlier in the same SELECT
//! - Binary operations (arithmetic, comparison, logical, concatenation)
//! - Path navigation (`->`, `[i]`, `[a:b]`)
//! - Scalar and aggregate function calls
//! - NULL handling according to SQL semantics

pub mod aggregate;
pub mod evaluator;
pub mod functions;
pub mod path;

// Re-export the main API
pub use aggregate::AggregateFunctions;
pub use evaluator::{ExpressionEvaluator, SelectAliasContext};
pub use functions::BuiltinFunctions;

use super::row::{Row, WindowRange};
use super::types::FieldValue;
use crate::velostream::sql::ast::Expr;
use crate::velostream::sql::error::SqlError;

/// Per-evaluation context shared by every field of one projected row
#[derive(Debug, Clone, Copy)]
pub struct EvalScope<'a> {
    /// Values of aliases already computed for the current output row
    pub aliases: &'a SelectAliasContext,
    /// Window of the enclosing collection, if any
    pub window: Option<&'a WindowRange>,
}

impl<'a> EvalScope<'a> {
    pub fn new(aliases: &'a SelectAliasContext, window: Option<&'a WindowRange>) -> Self {
        Self { aliases, window }
    }
}

/// Row-scoped resolution: evaluate `expr` against one row.
///
/// A reference to a field the row does not carry yields `FieldValue::Null`.
pub trait RowValuer: Send + Sync {
    fn evaluate_row(
        &self,
        expr: &Expr,
        row: &Row,
        scope: &EvalScope<'_>,
    ) -> Result<FieldValue, SqlError>;
}

/// Collection-scoped resolution: evaluate `expr` against a whole collection
/// or group, with aggregate calls spanning every row
pub trait AggregateValuer: Send + Sync {
    fn evaluate_group(
        &self,
        expr: &Expr,
        rows: &[Row],
        scope: &EvalScope<'_>,
    ) -> Result<FieldValue, SqlError>;
}
