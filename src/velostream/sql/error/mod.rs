/*!
# SQL Error Handling

Errors surfaced by the projection stage. Every failure is local to one call and
returned synchronously; nothing is retried or recovered inside the engine.

## Error Categories

- **Upstream**: an error object that arrived in place of data. The projection
  returns it unchanged and evaluates nothing.
- **Unsupported input**: the input cannot be projected by this plan (for example
  a columnar row narrower than the compiled layout).
- **Field evaluation**: a field's expression failed. The inner error is wrapped
  with the field's alias (or a rendering of the bare expression) so callers can
  report exactly which output field failed.
- **Resolution errors**: type mismatches, navigation into non-navigable values,
  out-of-range indexes, unknown functions and aggregate precondition failures.

## Missing data is not an error

A referenced field that is simply absent resolves to `FieldValue::Null` and is
handled by the absence policy. The only error the omit policy may swallow is
[`SqlError::NavigationError`]; see [`SqlError::is_missing_data`].

```rust
use velostream::velostream::sql::error::SqlError;

let inner = SqlError::type_error("NUMBER", "STRING", Some("val_a"));
let err = SqlError::field_evaluation(Some("r"), "round(a)", inner);
assert_eq!(
    err.to_string(),
    "run Select error: alias: r expr: round(a) meet error, err: Type error: expected NUMBER, got STRING for value 'val_a'"
);
```
*/

use thiserror::Error;

/// Error taxonomy for projection and expression resolution.
///
/// `Clone + PartialEq` so that an upstream error can be passed through the
/// engine unchanged and compared as-is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SqlError {
    /// Generic runtime failure while executing an expression.
    #[error("{}", render_execution(.message, .query))]
    ExecutionError {
        /// Description of the failure
        message: String,
        /// Rendering of the expression being executed, if known
        query: Option<String>,
    },

    /// Value of the wrong type for an operator or function.
    #[error("{}", render_type(.expected, .actual, .value))]
    TypeError {
        /// Expected data type
        expected: String,
        /// Actual data type encountered
        actual: String,
        /// The offending value, if it can be rendered
        value: Option<String>,
    },

    /// `->` descent into a value that is neither a mapping nor null.
    #[error("cannot access key '{key}' on {actual} value")]
    NavigationError { key: String, actual: String },

    /// `[index]` outside the bounds of a sequence.
    #[error("out of index: {index} of {len}")]
    IndexOutOfRange { index: i64, len: usize },

    /// Function name not known to the evaluator.
    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    /// Aggregate function precondition violated (wrong argument count or type).
    #[error("call func {function} error: {message}")]
    AggregateError { function: String, message: String },

    /// A single output field failed; wraps the underlying resolution error.
    #[error("{}", render_field(.alias, .expr, .source))]
    FieldEvaluation {
        /// Output alias, when the field was declared with one
        alias: Option<String>,
        /// Rendering of the field's expression
        expr: String,
        /// Underlying resolution failure
        source: Box<SqlError>,
    },

    /// Input shape this plan cannot project.
    #[error("run Select error: invalid input {shape}: {reason}")]
    UnsupportedInput { shape: String, reason: String },

    /// Error produced by an earlier pipeline stage, passed through unchanged.
    #[error("{message}")]
    Upstream { message: String },

    /// Invalid projection configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

fn render_execution(message: &str, query: &Option<String>) -> String {
    match query {
        Some(q) => format!("Query execution error in '{}': {}", q, message),
        None => format!("Query execution error: {}", message),
    }
}

fn render_type(expected: &str, actual: &str, value: &Option<String>) -> String {
    match value {
        Some(v) => format!(
            "Type error: expected {}, got {} for value '{}'",
            expected, actual, v
        ),
        None => format!("Type error: expected {}, got {}", expected, actual),
    }
}

fn render_field(alias: &Option<String>, expr: &str, source: &SqlError) -> String {
    match alias {
        Some(a) => format!(
            "run Select error: alias: {} expr: {} meet error, err: {}",
            a, expr, source
        ),
        None => format!("run Select error: expr: {} meet error, err: {}", expr, source),
    }
}

impl SqlError {
    /// Create an execution error without expression context.
    pub fn execution_error(message: impl Into<String>) -> Self {
        SqlError::ExecutionError {
            message: message.into(),
            query: None,
        }
    }

    /// Create a type error.
    pub fn type_error(expected: &str, actual: &str, value: Option<&str>) -> Self {
        SqlError::TypeError {
            expected: expected.to_string(),
            actual: actual.to_string(),
            value: value.map(|v| v.to_string()),
        }
    }

    /// Create an aggregate precondition error.
    pub fn aggregate_error(function: &str, message: impl Into<String>) -> Self {
        SqlError::AggregateError {
            function: function.to_lowercase(),
            message: message.into(),
        }
    }

    /// Wrap a resolution failure with the output field responsible for it.
    pub fn field_evaluation(alias: Option<&str>, expr: impl Into<String>, source: SqlError) -> Self {
        SqlError::FieldEvaluation {
            alias: alias.map(|a| a.to_string()),
            expr: expr.into(),
            source: Box::new(source),
        }
    }

    /// Create an upstream error.
    pub fn upstream(message: impl Into<String>) -> Self {
        SqlError::Upstream {
            message: message.into(),
        }
    }

    /// Whether this failure means "the data is not there" rather than "the data
    /// is wrong". Only these failures may be swallowed by the omit policy.
    pub fn is_missing_data(&self) -> bool {
        match self {
            SqlError::NavigationError { .. } => true,
            SqlError::FieldEvaluation { source, .. } => source.is_missing_data(),
            _ => false,
        }
    }
}
