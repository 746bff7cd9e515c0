//! Row-family data shapes consumed and produced by the projection stage.
//!
//! Every unit of streaming data handed to a projection is a [`StreamData`]:
//! a single [`Row`], an ordered [`RecordCollection`] sharing a window scope,
//! a [`GroupedCollectionSet`] produced by GROUP BY, or an upstream error.
//! Windowing, joining and grouping happen upstream; these types only carry
//! their results.

use super::types::{FieldValue, StreamRecord};
use crate::velostream::sql::error::SqlError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Window boundaries attached to a windowed collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Instant at which the window fired
    pub emit: DateTime<Utc>,
}

impl WindowRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, emit: DateTime<Utc>) -> Self {
        Self { start, end, emit }
    }

    /// Build a range from epoch milliseconds; out-of-range instants clamp to the epoch
    pub fn from_millis(start: i64, end: i64) -> Self {
        let at = |ms: i64| DateTime::from_timestamp_millis(ms).unwrap_or_default();
        Self {
            start: at(start),
            end: at(end),
            emit: at(end),
        }
    }

    pub fn start_millis(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_millis(&self) -> i64 {
        self.end.timestamp_millis()
    }
}

/// A row produced by a join: one constituent record per joined source,
/// in source declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRecord {
    pub records: Vec<StreamRecord>,
}

impl JoinedRecord {
    pub fn new(records: Vec<StreamRecord>) -> Self {
        Self { records }
    }

    /// Find the constituent record emitted by the named source
    pub fn source(&self, emitter: &str) -> Option<&StreamRecord> {
        self.records
            .iter()
            .find(|r| r.emitter.eq_ignore_ascii_case(emitter))
    }

    /// Resolve a field. A qualified reference reads only the named source and
    /// is absent when that source did not take part in the join; an
    /// unqualified one reads the first constituent carrying the name.
    pub fn get_field(&self, source: Option<&str>, name: &str) -> Option<&FieldValue> {
        match source {
            Some(src) => self.source(src)?.get_field(name),
            None => self.records.iter().find_map(|r| r.get_field(name)),
        }
    }

    /// Union of all constituents' fields; earlier sources win on collisions
    pub fn merged_fields(&self) -> HashMap<String, FieldValue> {
        let mut merged = HashMap::new();
        for record in &self.records {
            for (k, v) in &record.fields {
                merged.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
        merged
    }

    /// First constituent; its emitter names the joined row
    pub fn primary(&self) -> Option<&StreamRecord> {
        self.records.first()
    }
}

/// A positionally-addressed row. `schema[i]` names `values[i]`.
///
/// The schema is shared by every row of a stream, so cloning a row never
/// copies the column names.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnarRecord {
    pub emitter: String,
    pub schema: Arc<Vec<String>>,
    pub values: Vec<FieldValue>,
}

impl ColumnarRecord {
    pub fn new(schema: Arc<Vec<String>>, values: Vec<FieldValue>) -> Self {
        Self {
            emitter: String::new(),
            schema,
            values,
        }
    }

    pub fn with_emitter(mut self, emitter: impl Into<String>) -> Self {
        self.emitter = emitter.into();
        self
    }

    pub fn width(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, position: usize) -> Option<&FieldValue> {
        self.values.get(position)
    }

    /// Look a value up by column name (exact, then case-insensitive)
    pub fn get_field(&self, name: &str) -> Option<&FieldValue> {
        let position = self
            .schema
            .iter()
            .position(|c| c == name)
            .or_else(|| self.schema.iter().position(|c| c.eq_ignore_ascii_case(name)))?;
        self.values.get(position)
    }

    /// Name-keyed view of this row
    pub fn to_record(&self) -> StreamRecord {
        let fields = self
            .schema
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect();
        StreamRecord::from_emitter(self.emitter.clone(), fields)
    }
}

/// One unit of row-shaped data
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// Single event with named fields
    Record(StreamRecord),
    /// Multi-source row produced by a join
    Joined(JoinedRecord),
    /// Positional row for plans compiled with a columnar layout
    Columnar(ColumnarRecord),
}

impl Row {
    pub fn emitter(&self) -> &str {
        match self {
            Row::Record(r) => &r.emitter,
            Row::Joined(j) => j.primary().map(|r| r.emitter.as_str()).unwrap_or(""),
            Row::Columnar(c) => &c.emitter,
        }
    }

    /// Processing time in epoch milliseconds; 0 for columnar rows
    pub fn timestamp(&self) -> i64 {
        match self {
            Row::Record(r) => r.timestamp,
            Row::Joined(j) => j.primary().map(|r| r.timestamp).unwrap_or(0),
            Row::Columnar(_) => 0,
        }
    }

    /// Resolve a (possibly source-qualified) field reference
    ///
    /// A qualifier on a single-source row is ignored: the field is looked up
    /// by name.
    pub fn get_field(&self, source: Option<&str>, name: &str) -> Option<&FieldValue> {
        match self {
            Row::Record(r) => r.get_field(name),
            Row::Joined(j) => j.get_field(source, name),
            Row::Columnar(c) => c.get_field(name),
        }
    }

    /// Metadata of the row, or of the named source for joined rows
    pub fn get_metadata(&self, source: Option<&str>, key: &str) -> Option<&FieldValue> {
        match self {
            Row::Record(r) => r.get_metadata(key),
            Row::Joined(j) => match source {
                Some(src) => j.source(src)?.get_metadata(key),
                None => j.records.iter().find_map(|r| r.get_metadata(key)),
            },
            Row::Columnar(_) => None,
        }
    }

    /// All metadata carried by this row. A joined row reports the first
    /// constituent that has any.
    pub fn metadata(&self) -> Option<&HashMap<String, FieldValue>> {
        match self {
            Row::Record(r) => Some(&r.metadata),
            Row::Joined(j) => j
                .records
                .iter()
                .find(|r| !r.metadata.is_empty())
                .map(|r| &r.metadata),
            Row::Columnar(_) => None,
        }
    }

    /// Every field visible to an all-sources wildcard
    pub fn all_fields(&self) -> HashMap<String, FieldValue> {
        match self {
            Row::Record(r) => r.fields.clone(),
            Row::Joined(j) => j.merged_fields(),
            Row::Columnar(c) => c.to_record().fields,
        }
    }

    /// Fields originating from one source, for `source.*`
    pub fn source_fields(&self, source: &str) -> HashMap<String, FieldValue> {
        match self {
            Row::Joined(j) => j.source(source).map(|r| r.fields.clone()).unwrap_or_default(),
            other if other.emitter().eq_ignore_ascii_case(source) => other.all_fields(),
            _ => HashMap::new(),
        }
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            Row::Record(_) => "record",
            Row::Joined(_) => "joined record",
            Row::Columnar(_) => "columnar record",
        }
    }
}

impl From<StreamRecord> for Row {
    fn from(record: StreamRecord) -> Self {
        Row::Record(record)
    }
}

impl From<JoinedRecord> for Row {
    fn from(joined: JoinedRecord) -> Self {
        Row::Joined(joined)
    }
}

impl From<ColumnarRecord> for Row {
    fn from(columnar: ColumnarRecord) -> Self {
        Row::Columnar(columnar)
    }
}

/// An ordered sequence of rows sharing one window scope
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordCollection {
    pub rows: Vec<Row>,
    pub window: Option<WindowRange>,
}

impl RecordCollection {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows, window: None }
    }

    pub fn with_window(mut self, window: WindowRange) -> Self {
        self.window = Some(window);
        self
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Output of GROUP BY: one collection per group, in group order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupedCollectionSet {
    pub groups: Vec<RecordCollection>,
}

impl GroupedCollectionSet {
    pub fn new(groups: Vec<RecordCollection>) -> Self {
        Self { groups }
    }
}

/// A unit of data arriving at (or leaving) the projection stage
#[derive(Debug, Clone, PartialEq)]
pub enum StreamData {
    Row(Row),
    Collection(RecordCollection),
    Grouped(GroupedCollectionSet),
    /// An error produced upstream in place of data
    Error(SqlError),
}

impl From<StreamRecord> for StreamData {
    fn from(record: StreamRecord) -> Self {
        StreamData::Row(Row::Record(record))
    }
}

impl From<Row> for StreamData {
    fn from(row: Row) -> Self {
        StreamData::Row(row)
    }
}

impl From<RecordCollection> for StreamData {
    fn from(collection: RecordCollection) -> Self {
        StreamData::Collection(collection)
    }
}

impl From<GroupedCollectionSet> for StreamData {
    fn from(grouped: GroupedCollectionSet) -> Self {
        StreamData::Grouped(grouped)
    }
}
