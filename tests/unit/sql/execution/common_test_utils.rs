/*!
# Common Test Utilities

Shared builders for projection tests: records, SELECT-list declarations and a
one-call `project` helper wired to the built-in expression evaluator.
*/

use std::collections::HashMap;
use std::sync::Arc;
use velostream::velostream::config::ProjectionConfig;
use velostream::velostream::sql::ast::{ColumnRef, Expr, FieldDecl, SelectField};
use velostream::velostream::sql::error::SqlError;
use velostream::velostream::sql::execution::{
    ColumnarRecord, ExpressionEvaluator, FieldPlan, FieldValue, ProjectionProcessor, Row,
    StreamData, StreamRecord,
};

pub fn s(value: &str) -> FieldValue {
    FieldValue::String(value.to_string())
}

pub fn fields(pairs: &[(&str, FieldValue)]) -> HashMap<String, FieldValue> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn record(emitter: &str, pairs: &[(&str, FieldValue)]) -> StreamRecord {
    StreamRecord::from_emitter(emitter, fields(pairs))
}

pub fn map(pairs: &[(&str, FieldValue)]) -> FieldValue {
    FieldValue::Map(fields(pairs))
}

pub fn columnar(schema: &[&str], values: Vec<FieldValue>) -> ColumnarRecord {
    ColumnarRecord::new(
        Arc::new(schema.iter().map(|c| c.to_string()).collect()),
        values,
    )
    .with_emitter("test")
}

pub fn col(name: &str) -> FieldDecl {
    FieldDecl::visible(SelectField::Column(ColumnRef::new(name)))
}

pub fn qcol(source: &str, name: &str) -> FieldDecl {
    FieldDecl::visible(SelectField::Column(ColumnRef::qualified(source, name)))
}

pub fn aliased(expr: Expr, alias: &str) -> FieldDecl {
    FieldDecl::visible(SelectField::aliased(expr, alias))
}

pub fn bare(expr: Expr) -> FieldDecl {
    FieldDecl::visible(SelectField::unaliased(expr))
}

pub fn wildcard() -> FieldDecl {
    FieldDecl::visible(SelectField::wildcard())
}

pub fn processor(decls: Vec<FieldDecl>, config: ProjectionConfig) -> ProjectionProcessor {
    let plan = FieldPlan::compile(&decls).expect("SELECT list should compile");
    ProjectionProcessor::new(plan, config)
}

pub fn project(
    processor: &ProjectionProcessor,
    input: impl Into<StreamData>,
) -> Result<StreamData, SqlError> {
    let evaluator = ExpressionEvaluator::new();
    processor.project(input.into(), &evaluator, &evaluator)
}

/// Project with default config and unwrap the single output record
pub fn project_one(decls: Vec<FieldDecl>, input: impl Into<StreamData>) -> StreamRecord {
    let processor = processor(decls, ProjectionConfig::default());
    single(project(&processor, input).expect("projection should succeed"))
}

pub fn single(data: StreamData) -> StreamRecord {
    match data {
        StreamData::Row(Row::Record(record)) => record,
        other => panic!("Expected a single record, got {:?}", other),
    }
}

pub fn records(data: StreamData) -> Vec<StreamRecord> {
    match data {
        StreamData::Collection(collection) => collection
            .rows
            .into_iter()
            .map(|row| match row {
                Row::Record(record) => record,
                other => panic!("Expected a record row, got {:?}", other),
            })
            .collect(),
        other => panic!("Expected a collection, got {:?}", other),
    }
}
