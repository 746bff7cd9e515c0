// Streaming SQL module for velostream
// Provides the projection stage of continuous SELECT queries

pub mod ast;
pub mod error;
pub mod execution;
pub mod validation;

// Re-export main API
pub use ast::{Expr, FieldDecl, SelectField};
pub use error::SqlError;
pub use execution::{FieldPlan, FieldValue, ProjectionProcessor};
