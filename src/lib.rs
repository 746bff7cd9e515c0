//! # velostream-projection
//!
//! The projection stage of the velostream streaming SQL engine: given a
//! query's compiled SELECT list and one unit of streaming data, produce the
//! projected output record(s).
//!
//! ## Features
//!
//! - **Every input shape**: single events, windowed collections, joined rows,
//!   grouped collections and positional (columnar) rows
//! - **Wildcard algebra**: `*`, `source.*`, `EXCEPT` and `REPLACE`
//! - **Aggregate-aware**: aggregate fields span the whole collection or group
//! - **Output policy**: metadata propagation and omit-vs-null for absent fields
//!
//! ## Quick Start
//!
//! ```rust
//! use std::collections::HashMap;
//! use velostream::velostream::config::ProjectionConfig;
//! use velostream::velostream::sql::ast::{ColumnRef, Expr, FieldDecl, SelectField};
//! use velostream::velostream::sql::execution::{
//!     ExpressionEvaluator, FieldPlan, FieldValue, ProjectionProcessor, Row, StreamData,
//!     StreamRecord,
//! };
//!
//! let plan = FieldPlan::compile(&[
//!     FieldDecl::visible(SelectField::Column(ColumnRef::new("a"))),
//!     FieldDecl::visible(SelectField::aliased(
//!         Expr::function("upper", vec![Expr::column("b")]),
//!         "ub",
//!     )),
//! ])
//! .unwrap();
//! let processor = ProjectionProcessor::new(plan, ProjectionConfig::default());
//!
//! let mut fields = HashMap::new();
//! fields.insert("a".to_string(), FieldValue::Integer(1));
//! fields.insert("b".to_string(), FieldValue::String("x".to_string()));
//! let input = StreamData::from(StreamRecord::new(fields));
//!
//! let evaluator = ExpressionEvaluator::new();
//! let output = processor.project(input, &evaluator, &evaluator).unwrap();
//! let StreamData::Row(Row::Record(record)) = output else {
//!     panic!("expected a single record");
//! };
//! assert_eq!(record.fields.get("ub"), Some(&FieldValue::String("X".to_string())));
//! ```

pub mod velostream;
