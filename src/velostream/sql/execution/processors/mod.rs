//! Processors for SQL query execution
//!
//! - Projection processing over every input shape
//! - Columnar fast path for plans laid out over a positional schema

pub mod columnar;
pub mod projection;

pub use projection::ProjectionProcessor;
