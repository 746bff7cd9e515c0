//! Columnar fast path
//!
//! Projects positional rows through a [`ColumnarLayout`] computed when the
//! plan was compiled. Plain references are copied by position without any
//! name lookup; aliased expressions are evaluated once per row against the
//! input.
//!
//! A columnar row has a fixed shape, so a field without a value is written as
//! null under either absence policy.

use crate::velostream::config::ProjectionConfig;
use crate::velostream::sql::error::SqlError;
use crate::velostream::sql::execution::expression::{EvalScope, RowValuer, SelectAliasContext};
use crate::velostream::sql::execution::plan::{ColumnarLayout, ReadPosition, SlotSource};
use crate::velostream::sql::execution::row::{ColumnarRecord, Row, WindowRange};
use crate::velostream::sql::execution::types::FieldValue;

/// Project one columnar row. `row` is `input` viewed as a [`Row`] for
/// expression evaluation.
pub(crate) fn project_columnar(
    layout: &ColumnarLayout,
    input: &ColumnarRecord,
    row: &Row,
    window: Option<&WindowRange>,
    valuer: &dyn RowValuer,
    config: &ProjectionConfig,
) -> Result<ColumnarRecord, SqlError> {
    if input.width() != layout.input_width {
        return Err(SqlError::UnsupportedInput {
            shape: row.shape_name().to_string(),
            reason: format!(
                "expected {} columns but found {}",
                layout.input_width,
                input.width()
            ),
        });
    }

    let mut values = vec![FieldValue::Null; layout.output_schema.len()];
    let mut aliases = SelectAliasContext::new();

    for slot in &layout.slots {
        let value = match &slot.source {
            SlotSource::Read(ReadPosition::At(position)) => input.get(*position).cloned(),
            SlotSource::Read(ReadPosition::Absent) => None,
            SlotSource::Evaluate(expr) => {
                let scope = EvalScope::new(&aliases, window);
                match valuer.evaluate_row(expr, row, &scope) {
                    Ok(value) => Some(value),
                    Err(err) if err.is_missing_data() && !config.send_nil => {
                        log::debug!("Omitting field {}: {}", slot.name, err);
                        None
                    }
                    Err(err) => {
                        let wrapped =
                            SqlError::field_evaluation(slot.alias.as_deref(), expr.to_string(), err);
                        log::debug!("{}", wrapped);
                        return Err(wrapped);
                    }
                }
            }
        };

        let Some(value) = value else {
            continue;
        };
        if let Some(alias) = &slot.alias {
            aliases.add_alias(alias.clone(), value.clone());
        }
        if let Some(write) = slot.write {
            values[write] = value;
        }
    }

    Ok(ColumnarRecord {
        emitter: input.emitter.clone(),
        schema: layout.output_schema.clone(),
        values,
    })
}
