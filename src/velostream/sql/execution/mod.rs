//! Streaming SQL execution for the projection stage.
//!
//! - [`types`] - value model and single-event records
//! - [`row`] - row-family shapes (collections, joins, groups, columnar rows)
//! - [`plan`] - compiled field plans
//! - [`expression`] - resolution bridge and built-in evaluator
//! - [`processors`] - the projection processor and its columnar fast path

pub mod expression;
pub mod plan;
pub mod processors;
pub mod row;
pub mod types;

// Re-export main API
pub use expression::{AggregateValuer, EvalScope, ExpressionEvaluator, RowValuer};
pub use plan::FieldPlan;
pub use processors::ProjectionProcessor;
pub use row::{
    ColumnarRecord, GroupedCollectionSet, JoinedRecord, RecordCollection, Row, StreamData,
    WindowRange,
};
pub use types::{FieldValue, StreamRecord};
