//! Expression evaluator for projection fields.
//!
//! This module implements the default resolution bridge. One recursive walk
//! serves both evaluation modes:
//! - **Row mode** resolves every reference against a single row.
//! - **Aggregate mode** evaluates aggregate calls over every row of the
//!   collection and resolves all other references against its first row.
//!
//! Resolving non-aggregate references against the first row of a group is
//! deliberate: `SELECT count(*) AS c, a ... GROUP BY w` reports `a` as seen in
//! the group's first row.

use super::aggregate::AggregateFunctions;
use super::functions::BuiltinFunctions;
use super::path;
use super::{AggregateValuer, EvalScope, RowValuer};
use crate::velostream::sql::ast::{BinaryOperator, ColumnRef, Expr, LiteralValue, UnaryOperator};
use crate::velostream::sql::error::SqlError;
use crate::velostream::sql::execution::row::Row;
use crate::velostream::sql::execution::types::FieldValue;
use crate::velostream::sql::validation::function_registry::{FUNCTION_REGISTRY, FunctionKind};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Context for SELECT clause alias resolution
///
/// Stores computed alias values in field order as each SELECT field is
/// evaluated, so later fields in the same SELECT can reference them:
/// ```sql
/// SELECT
///     x + 1 AS computed_value,
///     computed_value * 2 AS result  -- Can reference the alias
/// ```
#[derive(Debug, Clone)]
pub struct SelectAliasContext {
    /// Map of alias name → computed FieldValue for current record
    pub aliases: HashMap<String, FieldValue>,
}

impl SelectAliasContext {
    /// Creates a new empty alias context
    pub fn new() -> Self {
        Self {
            aliases: HashMap::new(),
        }
    }

    /// Adds an alias with its computed value to the context
    pub fn add_alias(&mut self, name: String, value: FieldValue) {
        self.aliases.insert(name, value);
    }

    /// Retrieves an alias value if it exists
    pub fn get_alias(&self, name: &str) -> Option<&FieldValue> {
        self.aliases.get(name)
    }
}

impl Default for SelectAliasContext {
    fn default() -> Self {
        Self::new()
    }
}

/// What an expression is being evaluated against
#[derive(Clone, Copy)]
enum Target<'a> {
    Row(&'a Row),
    Group(&'a [Row]),
}

impl<'a> Target<'a> {
    fn first_row(self) -> Option<&'a Row> {
        match self {
            Target::Row(row) => Some(row),
            Target::Group(rows) => rows.first(),
        }
    }

    /// Rows an aggregate runs over; a single row is a one-row collection
    fn rows(self) -> &'a [Row] {
        match self {
            Target::Row(row) => std::slice::from_ref(row),
            Target::Group(rows) => rows,
        }
    }
}

/// Main expression evaluator that handles all SQL expression types
pub struct ExpressionEvaluator;

impl Default for ExpressionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionEvaluator {
    pub fn new() -> Self {
        ExpressionEvaluator
    }

    fn evaluate(
        &self,
        expr: &Expr,
        target: Target<'_>,
        scope: &EvalScope<'_>,
    ) -> Result<FieldValue, SqlError> {
        match expr {
            Expr::Column(col) => Ok(Self::resolve_column(col, target)),
            Expr::AliasRef { alias, expr } => match scope.aliases.get_alias(alias) {
                Some(value) => Ok(value.clone()),
                None => self.evaluate(expr, target, scope),
            },
            Expr::Literal(literal) => Self::literal_value(literal),
            Expr::BinaryOp { left, op, right } => self.evaluate_binary(left, *op, right, target, scope),
            Expr::UnaryOp { op, expr } => {
                let value = self.evaluate(expr, target, scope)?;
                Self::evaluate_unary(*op, value)
            }
            Expr::Function { name, args } => self.evaluate_function(name, args, target, scope),
            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                let operand = match operand {
                    Some(o) => Some(self.evaluate(o, target, scope)?),
                    None => None,
                };
                for (condition, result) in when_clauses {
                    let value = self.evaluate(condition, target, scope)?;
                    let matched = match &operand {
                        Some(o) => values_equal(o, &value),
                        None => value.to_bool()?,
                    };
                    if matched {
                        return self.evaluate(result, target, scope);
                    }
                }
                match else_clause {
                    Some(e) => self.evaluate(e, target, scope),
                    None => Ok(FieldValue::Null),
                }
            }
            Expr::FieldAccess { expr, key } => {
                path::access_key(&self.evaluate(expr, target, scope)?, key)
            }
            Expr::Index { expr, index } => path::index(&self.evaluate(expr, target, scope)?, *index),
            Expr::Slice { expr, start, end } => {
                path::slice(&self.evaluate(expr, target, scope)?, *start, *end)
            }
            Expr::Wildcard { except, replace } => {
                let mut fields = target.first_row().map(Row::all_fields).unwrap_or_default();
                fields.retain(|name, _| !except.contains(name));
                for (expr, name) in replace {
                    let value = self.evaluate(expr, target, scope)?;
                    fields.insert(name.clone(), value);
                }
                Ok(FieldValue::Map(fields))
            }
        }
    }

    /// Missing fields resolve to NULL; absence is not an error
    fn resolve_column(col: &ColumnRef, target: Target<'_>) -> FieldValue {
        target
            .first_row()
            .and_then(|row| row.get_field(col.source.as_deref(), &col.name))
            .cloned()
            .unwrap_or(FieldValue::Null)
    }

    fn literal_value(literal: &LiteralValue) -> Result<FieldValue, SqlError> {
        Ok(match literal {
            LiteralValue::String(s) => FieldValue::String(s.clone()),
            LiteralValue::Integer(i) => FieldValue::Integer(*i),
            LiteralValue::Float(f) => FieldValue::Float(*f),
            LiteralValue::Boolean(b) => FieldValue::Boolean(*b),
            LiteralValue::Null => FieldValue::Null,
            LiteralValue::Decimal(s) => FieldValue::Decimal(s.parse::<Decimal>().map_err(|e| {
                SqlError::execution_error(format!("Invalid decimal literal '{}': {}", s, e))
            })?),
        })
    }

    fn evaluate_function(
        &self,
        name: &str,
        args: &[Expr],
        target: Target<'_>,
        scope: &EvalScope<'_>,
    ) -> Result<FieldValue, SqlError> {
        let kind = FUNCTION_REGISTRY
            .kind(name)
            .ok_or_else(|| SqlError::UnknownFunction {
                name: name.to_string(),
            })?;

        match kind {
            FunctionKind::Aggregate if name.eq_ignore_ascii_case("deduplicate") => {
                self.evaluate_deduplicate(args, target, scope)
            }
            FunctionKind::Aggregate => {
                let [arg] = args else {
                    return Err(SqlError::aggregate_error(
                        name,
                        format!("expects exactly one argument but found {}", args.len()),
                    ));
                };
                let values = target
                    .rows()
                    .iter()
                    .map(|row| self.evaluate(arg, Target::Row(row), scope))
                    .collect::<Result<Vec<_>, _>>()?;
                AggregateFunctions::apply(name, values)
            }
            FunctionKind::WindowBoundary => {
                let Some(window) = scope.window else {
                    return Ok(FieldValue::Null);
                };
                if name.eq_ignore_ascii_case("window_start") {
                    Ok(FieldValue::Integer(window.start_millis()))
                } else {
                    Ok(FieldValue::Integer(window.end_millis()))
                }
            }
            FunctionKind::Metadata => Self::evaluate_meta(args, target),
            FunctionKind::Scalar => {
                let values = args
                    .iter()
                    .map(|arg| self.evaluate(arg, target, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                BuiltinFunctions::call(name, values)
            }
        }
    }

    /// deduplicate(key, all): pairs each row's key with the row's fields
    fn evaluate_deduplicate(
        &self,
        args: &[Expr],
        target: Target<'_>,
        scope: &EvalScope<'_>,
    ) -> Result<FieldValue, SqlError> {
        let [key, all] = args else {
            return Err(SqlError::aggregate_error(
                "deduplicate",
                format!("expects two arguments but found {}", args.len()),
            ));
        };
        let all = match self.evaluate(all, target, scope)? {
            FieldValue::Boolean(b) => b,
            other => {
                return Err(SqlError::aggregate_error(
                    "deduplicate",
                    format!(
                        "second argument must be bool but found {}({})",
                        other.type_name().to_lowercase(),
                        other.to_display_string()
                    ),
                ));
            }
        };
        let keyed = target
            .rows()
            .iter()
            .map(|row| Ok((self.evaluate(key, Target::Row(row), scope)?, row.all_fields())))
            .collect::<Result<Vec<_>, SqlError>>()?;
        Ok(AggregateFunctions::deduplicate(keyed, all))
    }

    /// META(key), META(source.key) or META(*)
    fn evaluate_meta(args: &[Expr], target: Target<'_>) -> Result<FieldValue, SqlError> {
        let row = target.first_row();
        match args {
            [Expr::Column(col)] => Ok(row
                .and_then(|r| r.get_metadata(col.source.as_deref(), &col.name))
                .cloned()
                .unwrap_or(FieldValue::Null)),
            [Expr::Wildcard { .. }] => Ok(FieldValue::Map(
                row.and_then(Row::metadata).cloned().unwrap_or_default(),
            )),
            _ => Err(SqlError::execution_error(
                "META requires a single metadata key or *",
            )),
        }
    }

    fn evaluate_binary(
        &self,
        left: &Expr,
        op: BinaryOperator,
        right: &Expr,
        target: Target<'_>,
        scope: &EvalScope<'_>,
    ) -> Result<FieldValue, SqlError> {
        // Logical operators short-circuit
        match op {
            BinaryOperator::And => {
                if !self.evaluate(left, target, scope)?.to_bool()? {
                    return Ok(FieldValue::Boolean(false));
                }
                return Ok(FieldValue::Boolean(
                    self.evaluate(right, target, scope)?.to_bool()?,
                ));
            }
            BinaryOperator::Or => {
                if self.evaluate(left, target, scope)?.to_bool()? {
                    return Ok(FieldValue::Boolean(true));
                }
                return Ok(FieldValue::Boolean(
                    self.evaluate(right, target, scope)?.to_bool()?,
                ));
            }
            _ => {}
        }

        let l = self.evaluate(left, target, scope)?;
        let r = self.evaluate(right, target, scope)?;
        match op {
            BinaryOperator::Add => l.add(&r),
            BinaryOperator::Subtract => l.subtract(&r),
            BinaryOperator::Multiply => l.multiply(&r),
            BinaryOperator::Divide => l.divide(&r),
            BinaryOperator::Modulo => l.modulo(&r),
            BinaryOperator::Concat => match (&l, &r) {
                (FieldValue::Null, _) | (_, FieldValue::Null) => Ok(FieldValue::Null),
                _ => Ok(FieldValue::String(format!(
                    "{}{}",
                    l.to_display_string(),
                    r.to_display_string()
                ))),
            },
            _ if l.is_null() || r.is_null() => Ok(FieldValue::Null),
            BinaryOperator::Equal => Ok(FieldValue::Boolean(values_equal(&l, &r))),
            BinaryOperator::NotEqual => Ok(FieldValue::Boolean(!values_equal(&l, &r))),
            _ => {
                let ordering = l.compare(&r).ok_or_else(|| {
                    SqlError::execution_error(format!(
                        "invalid operation {}({}) {} {}({})",
                        l.type_name(),
                        l.to_display_string(),
                        op,
                        r.type_name(),
                        r.to_display_string()
                    ))
                })?;
                let result = match op {
                    BinaryOperator::LessThan => ordering == Ordering::Less,
                    BinaryOperator::LessThanOrEqual => ordering != Ordering::Greater,
                    BinaryOperator::GreaterThan => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                };
                Ok(FieldValue::Boolean(result))
            }
        }
    }

    fn evaluate_unary(op: UnaryOperator, value: FieldValue) -> Result<FieldValue, SqlError> {
        match op {
            UnaryOperator::IsNull => Ok(FieldValue::Boolean(value.is_null())),
            UnaryOperator::IsNotNull => Ok(FieldValue::Boolean(!value.is_null())),
            UnaryOperator::Not => match value {
                FieldValue::Null => Ok(FieldValue::Null),
                other => Ok(FieldValue::Boolean(!other.to_bool()?)),
            },
            UnaryOperator::Minus => match value {
                FieldValue::Integer(i) => i
                    .checked_neg()
                    .map(FieldValue::Integer)
                    .ok_or_else(|| SqlError::execution_error("Integer overflow in negation")),
                FieldValue::Float(f) => Ok(FieldValue::Float(-f)),
                FieldValue::Decimal(d) => Ok(FieldValue::Decimal(-d)),
                FieldValue::Null => Ok(FieldValue::Null),
                other => Err(SqlError::type_error(
                    "NUMBER",
                    other.type_name(),
                    Some(&other.to_display_string()),
                )),
            },
        }
    }
}

/// Equality that treats numerically equal values of different kinds as equal
fn values_equal(left: &FieldValue, right: &FieldValue) -> bool {
    match left.compare(right) {
        Some(ordering) => ordering == Ordering::Equal,
        None => left == right,
    }
}

impl RowValuer for ExpressionEvaluator {
    fn evaluate_row(
        &self,
        expr: &Expr,
        row: &Row,
        scope: &EvalScope<'_>,
    ) -> Result<FieldValue, SqlError> {
        self.evaluate(expr, Target::Row(row), scope)
    }
}

impl AggregateValuer for ExpressionEvaluator {
    fn evaluate_group(
        &self,
        expr: &Expr,
        rows: &[Row],
        scope: &EvalScope<'_>,
    ) -> Result<FieldValue, SqlError> {
        self.evaluate(expr, Target::Group(rows), scope)
    }
}
