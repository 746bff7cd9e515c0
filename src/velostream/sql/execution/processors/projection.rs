//! Projection Processor
//!
//! Produces the output record(s) for a compiled SELECT list. The processor
//! dispatches on the input shape:
//!
//! | Input                    | Non-aggregate plan                  | Aggregate plan                 |
//! |--------------------------|-------------------------------------|--------------------------------|
//! | single row               | one projected row                   | one row, aggregated over it    |
//! | collection               | collection, one row per input row   | one row for the whole window   |
//! | grouped set              | collection, first row of each group | collection, one row per group  |
//! | upstream error           | returned unchanged                  | returned unchanged             |
//!
//! In aggregate mode non-aggregate fields read the first row of their
//! collection or group. This is intended behavior, not a fallback.
//!
//! A failing field aborts the whole call: no partial row or collection is
//! ever returned.

use super::columnar;
use crate::velostream::config::ProjectionConfig;
use crate::velostream::sql::ast::Expr;
use crate::velostream::sql::error::SqlError;
use crate::velostream::sql::execution::expression::{
    AggregateValuer, EvalScope, RowValuer, SelectAliasContext,
};
use crate::velostream::sql::execution::plan::{FieldKind, FieldPlan, PlannedField};
use crate::velostream::sql::execution::row::{
    GroupedCollectionSet, RecordCollection, Row, StreamData, WindowRange,
};
use crate::velostream::sql::execution::types::{FieldValue, StreamRecord, reserved_keys};
use std::collections::HashMap;

/// Projection stage processor
///
/// Holds nothing but the compiled plan and the output policy, so a single
/// instance may be shared across threads and every call is independent.
#[derive(Debug, Clone)]
pub struct ProjectionProcessor {
    plan: FieldPlan,
    config: ProjectionConfig,
}

impl ProjectionProcessor {
    pub fn new(plan: FieldPlan, config: ProjectionConfig) -> Self {
        Self { plan, config }
    }

    pub fn plan(&self) -> &FieldPlan {
        &self.plan
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Project one unit of streaming data
    pub fn project(
        &self,
        input: StreamData,
        row_valuer: &dyn RowValuer,
        aggregate_valuer: &dyn AggregateValuer,
    ) -> Result<StreamData, SqlError> {
        match input {
            StreamData::Error(err) => {
                log::debug!("Passing upstream error through projection: {}", err);
                Err(err)
            }
            StreamData::Row(row) => {
                if self.plan.is_aggregate {
                    let record = self.project_group(
                        std::slice::from_ref(&row),
                        None,
                        aggregate_valuer,
                    )?;
                    Ok(StreamData::Row(Row::Record(record)))
                } else {
                    Ok(StreamData::Row(self.project_row(&row, None, row_valuer)?))
                }
            }
            StreamData::Collection(collection) => {
                self.project_collection(collection, row_valuer, aggregate_valuer)
            }
            StreamData::Grouped(grouped) => {
                self.project_grouped(grouped, row_valuer, aggregate_valuer)
            }
        }
    }

    fn project_collection(
        &self,
        collection: RecordCollection,
        row_valuer: &dyn RowValuer,
        aggregate_valuer: &dyn AggregateValuer,
    ) -> Result<StreamData, SqlError> {
        let window = collection.window;
        if self.plan.is_aggregate {
            let record = self.project_group(&collection.rows, window.as_ref(), aggregate_valuer)?;
            return Ok(StreamData::Row(Row::Record(record)));
        }

        let rows = collection
            .rows
            .iter()
            .map(|row| self.project_row(row, window.as_ref(), row_valuer))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StreamData::Collection(RecordCollection { rows, window }))
    }

    fn project_grouped(
        &self,
        grouped: GroupedCollectionSet,
        row_valuer: &dyn RowValuer,
        aggregate_valuer: &dyn AggregateValuer,
    ) -> Result<StreamData, SqlError> {
        let mut rows = Vec::with_capacity(grouped.groups.len());
        for group in &grouped.groups {
            let window = group.window.as_ref();
            let row = if self.plan.is_aggregate {
                Row::Record(self.project_group(&group.rows, window, aggregate_valuer)?)
            } else {
                match group.first() {
                    Some(first) => self.project_row(first, window, row_valuer)?,
                    None => Row::Record(StreamRecord::default()),
                }
            };
            rows.push(row);
        }
        Ok(StreamData::Collection(RecordCollection::new(rows)))
    }

    /// Single-row procedure; columnar input takes the fast path when the plan
    /// was laid out for it
    fn project_row(
        &self,
        row: &Row,
        window: Option<&WindowRange>,
        valuer: &dyn RowValuer,
    ) -> Result<Row, SqlError> {
        if let (Row::Columnar(input), Some(layout)) = (row, &self.plan.columnar) {
            let output = columnar::project_columnar(layout, input, row, window, valuer, &self.config)?;
            return Ok(Row::Columnar(output));
        }

        let record = self.assemble(Some(row), window, |expr, scope| {
            valuer.evaluate_row(expr, row, scope)
        })?;
        Ok(Row::Record(record))
    }

    /// Aggregate procedure: one output row for the whole set of rows
    fn project_group(
        &self,
        rows: &[Row],
        window: Option<&WindowRange>,
        valuer: &dyn AggregateValuer,
    ) -> Result<StreamRecord, SqlError> {
        self.assemble(rows.first(), window, |expr, scope| {
            valuer.evaluate_group(expr, rows, scope)
        })
    }

    /// Build one output record. `first` supplies wildcard fields, plain
    /// columns and metadata; `evaluate` computes every expression field.
    fn assemble<F>(
        &self,
        first: Option<&Row>,
        window: Option<&WindowRange>,
        evaluate: F,
    ) -> Result<StreamRecord, SqlError>
    where
        F: Fn(&Expr, &EvalScope<'_>) -> Result<FieldValue, SqlError>,
    {
        let mut output: HashMap<String, FieldValue> = HashMap::new();
        let mut aliases = SelectAliasContext::new();

        // All-sources wildcard, then its REPLACE entries
        if let Some(wildcard) = &self.plan.wildcard {
            if let Some(row) = first {
                output.extend(
                    row.all_fields()
                        .into_iter()
                        .filter(|(name, _)| !wildcard.except.contains(name)),
                );
            }
            for replacement in &wildcard.replace {
                let scope = EvalScope::new(&aliases, window);
                if let Some(value) = self.resolve(
                    evaluate(&replacement.expr, &scope),
                    Some(&replacement.name),
                    &replacement.expr,
                )? {
                    self.emit(&mut output, &replacement.name, value);
                }
            }
        }

        if let Some(row) = first {
            for source in &self.plan.source_wildcards {
                output.extend(row.source_fields(source));
            }
        }

        for field in self.plan.fields.iter().filter(|f| !f.invisible) {
            if let FieldKind::Column(col) = &field.kind {
                let value = first
                    .and_then(|row| row.get_field(col.source.as_deref(), &col.name))
                    .cloned()
                    .unwrap_or(FieldValue::Null);
                self.emit(&mut output, &col.name, value);
            }
        }

        for field in &self.plan.fields {
            let Some(expr) = field.expr() else {
                continue;
            };
            // Only an alias can be referenced later; other invisible fields are dead
            if field.invisible && field.alias().is_none() {
                continue;
            }
            let scope = EvalScope::new(&aliases, window);
            let Some(value) = self.resolve(evaluate(expr, &scope), field.alias(), expr)? else {
                continue;
            };
            if let Some(alias) = field.alias() {
                aliases.add_alias(alias.to_string(), value.clone());
            }
            if !field.invisible {
                self.emit(&mut output, field.output_name(), value);
            }
        }

        self.drop_invisible(&mut output);

        let metadata = first.and_then(Row::metadata).cloned().unwrap_or_default();
        if self.config.send_meta
            && !metadata.is_empty()
            && !output.contains_key(reserved_keys::METADATA)
        {
            output.insert(
                reserved_keys::METADATA.to_string(),
                FieldValue::Map(metadata.clone()),
            );
        }

        Ok(StreamRecord {
            emitter: first.map(|r| r.emitter().to_string()).unwrap_or_default(),
            fields: output,
            metadata,
            timestamp: first.map(Row::timestamp).unwrap_or(0),
        })
    }

    /// Apply the absence policy to an evaluation result.
    ///
    /// `Ok(None)` means the field is left unset. Missing-data failures are
    /// swallowed only when absent fields are omitted; anything else is wrapped
    /// with the field that failed and returned.
    fn resolve(
        &self,
        result: Result<FieldValue, SqlError>,
        alias: Option<&str>,
        expr: &Expr,
    ) -> Result<Option<FieldValue>, SqlError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_missing_data() && !self.config.send_nil => {
                log::debug!("Omitting field {}: {}", alias.unwrap_or("<expr>"), err);
                Ok(None)
            }
            Err(err) => {
                let wrapped = SqlError::field_evaluation(alias, expr.to_string(), err);
                log::debug!("{}", wrapped);
                Err(wrapped)
            }
        }
    }

    /// Write a value under `name`, honoring the omit-vs-null policy. A later
    /// field with the same name overwrites an earlier one.
    fn emit(&self, output: &mut HashMap<String, FieldValue>, name: &str, value: FieldValue) {
        if value.is_null() && !self.config.send_nil {
            output.remove(name);
        } else {
            output.insert(name.to_string(), value);
        }
    }

    /// Invisible fields never reach the output, whichever step produced their key
    fn drop_invisible(&self, output: &mut HashMap<String, FieldValue>) {
        for name in self.plan.invisible_names() {
            let shadowed_by_visible = self
                .plan
                .fields
                .iter()
                .any(|f: &PlannedField| !f.invisible && f.output_name() == name);
            if !shadowed_by_visible {
                output.remove(name);
            }
        }
    }
}
