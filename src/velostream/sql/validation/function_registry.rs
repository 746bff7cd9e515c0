//! Function Registry
//!
//! Classifies every SQL function the projection stage can call. The field plan
//! compiler asks it whether a query aggregates; the evaluator dispatches on the
//! [`FunctionKind`] it returns.

use crate::velostream::sql::ast::Expr;
use std::collections::HashMap;
use std::sync::LazyLock;

/// How a function is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Evaluated once per row from its arguments
    Scalar,
    /// Spans every row of the enclosing collection or group
    Aggregate,
    /// Reads the start or end of the enclosing window
    WindowBoundary,
    /// Reads row metadata instead of fields
    Metadata,
}

const AGGREGATES: [&str; 7] = ["COUNT", "SUM", "AVG", "MIN", "MAX", "COLLECT", "DEDUPLICATE"];
const SCALARS: [&str; 9] = [
    "ABS", "ROUND", "CEIL", "FLOOR", "CONCAT", "UPPER", "LOWER", "LENGTH", "COALESCE",
];
const WINDOW_BOUNDARIES: [&str; 2] = ["WINDOW_START", "WINDOW_END"];

/// Name-to-kind table; lookups are case-insensitive
pub struct FunctionRegistry {
    functions: HashMap<&'static str, FunctionKind>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        let mut functions = HashMap::new();
        functions.extend(AGGREGATES.map(|name| (name, FunctionKind::Aggregate)));
        functions.extend(SCALARS.map(|name| (name, FunctionKind::Scalar)));
        functions.extend(WINDOW_BOUNDARIES.map(|name| (name, FunctionKind::WindowBoundary)));
        functions.insert("META", FunctionKind::Metadata);
        Self { functions }
    }

    pub fn kind(&self, name: &str) -> Option<FunctionKind> {
        self.functions.get(name.to_uppercase().as_str()).copied()
    }

    pub fn is_function_supported(&self, name: &str) -> bool {
        self.kind(name).is_some()
    }

    pub fn is_aggregate_function(&self, name: &str) -> bool {
        self.kind(name) == Some(FunctionKind::Aggregate)
    }

    /// Whether any function call inside `expr` is an aggregate
    pub fn contains_aggregate(&self, expr: &Expr) -> bool {
        expr.get_function_names()
            .iter()
            .any(|name| self.is_aggregate_function(name))
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub static FUNCTION_REGISTRY: LazyLock<FunctionRegistry> = LazyLock::new(FunctionRegistry::new);
