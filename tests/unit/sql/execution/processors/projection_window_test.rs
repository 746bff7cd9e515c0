/*!
# Windowed Collection Projection Tests

## Test Scenarios

- Non-aggregate SELECT over a window keeps one row per input row and the window
- Aggregate SELECT over a window collapses to one row
- Window boundary functions
- Non-aggregate fields read the first row in aggregate mode
- `deduplicate` over whole rows, keeping all or only the latest
*/

use super::super::common_test_utils::*;
use velostream::velostream::config::ProjectionConfig;
use velostream::velostream::sql::ast::{BinaryOperator, Expr};
use velostream::velostream::sql::execution::{
    FieldValue, RecordCollection, Row, StreamData, WindowRange,
};

const WINDOW_START: i64 = 1_541_152_486_013;
const WINDOW_END: i64 = 1_541_152_487_013;

fn create_window() -> RecordCollection {
    let rows = [(1, "v1", 65), (2, "v2", 12), (3, "v1", 43)]
        .into_iter()
        .map(|(id, a, b)| {
            Row::Record(record(
                "test",
                &[
                    ("id", FieldValue::Integer(id)),
                    ("a", s(a)),
                    ("b", FieldValue::Integer(b)),
                ],
            ))
        })
        .collect();
    RecordCollection::new(rows).with_window(WindowRange::from_millis(WINDOW_START, WINDOW_END))
}

#[test]
fn test_non_aggregate_projects_each_row() {
    let processor = processor(vec![col("a")], ProjectionConfig::default());
    let output = project(&processor, create_window()).unwrap();

    let StreamData::Collection(collection) = &output else {
        panic!("Expected a collection, got {:?}", output);
    };
    assert_eq!(
        collection.window,
        Some(WindowRange::from_millis(WINDOW_START, WINDOW_END))
    );

    let values: Vec<_> = records(output)
        .into_iter()
        .map(|r| r.fields.get("a").cloned())
        .collect();
    assert_eq!(values, vec![Some(s("v1")), Some(s("v2")), Some(s("v1"))]);
}

#[test]
fn test_aggregate_collapses_window() {
    let processor = processor(
        vec![
            aliased(Expr::function("count", vec![Expr::wildcard()]), "c"),
            aliased(Expr::function("sum", vec![Expr::column("b")]), "total"),
            aliased(Expr::function("avg", vec![Expr::column("b")]), "mean"),
        ],
        ProjectionConfig::default(),
    );
    let output = single(project(&processor, create_window()).unwrap());
    assert_eq!(
        output.fields,
        fields(&[
            ("c", FieldValue::Integer(3)),
            ("total", FieldValue::Integer(120)),
            ("mean", FieldValue::Integer(40)),
        ])
    );
}

#[test]
fn test_window_boundaries() {
    let processor = processor(
        vec![
            bare(Expr::function("window_start", vec![])),
            bare(Expr::function("window_end", vec![])),
            aliased(Expr::function("count", vec![Expr::wildcard()]), "c"),
        ],
        ProjectionConfig::default(),
    );
    let output = single(project(&processor, create_window()).unwrap());
    assert_eq!(
        output.fields,
        fields(&[
            ("window_start", FieldValue::Integer(WINDOW_START)),
            ("window_end", FieldValue::Integer(WINDOW_END)),
            ("c", FieldValue::Integer(3)),
        ])
    );
}

#[test]
fn test_window_boundaries_per_row() {
    let processor = processor(
        vec![col("id"), aliased(Expr::function("window_end", vec![]), "we")],
        ProjectionConfig::default(),
    );
    let rows = records(project(&processor, create_window()).unwrap());
    assert_eq!(rows.len(), 3);
    assert!(
        rows.iter()
            .all(|r| r.fields.get("we") == Some(&FieldValue::Integer(WINDOW_END)))
    );
}

#[test]
fn test_aggregate_reads_first_row_for_plain_fields() {
    let processor = processor(
        vec![
            col("id"),
            col("a"),
            aliased(
                Expr::binary(Expr::column("b"), BinaryOperator::Add, Expr::integer(1)),
                "b1",
            ),
            aliased(Expr::function("max", vec![Expr::column("b")]), "top"),
        ],
        ProjectionConfig::default(),
    );
    let output = single(project(&processor, create_window()).unwrap());
    assert_eq!(
        output.fields,
        fields(&[
            ("id", FieldValue::Integer(1)),
            ("a", s("v1")),
            ("b1", FieldValue::Integer(66)),
            ("top", FieldValue::Integer(65)),
        ])
    );
}

fn dedup(all: bool) -> Expr {
    Expr::function("deduplicate", vec![Expr::column("a"), Expr::boolean(all)])
}

fn window_of(values: &[i64]) -> RecordCollection {
    let rows = values
        .iter()
        .map(|a| Row::Record(record("src1", &[("a", FieldValue::Integer(*a))])))
        .collect();
    RecordCollection::new(rows).with_window(WindowRange::from_millis(WINDOW_START, WINDOW_END))
}

#[test]
fn test_collect_and_deduplicate_all() {
    let processor = processor(
        vec![
            aliased(Expr::function("collect", vec![Expr::column("a")]), "all"),
            aliased(dedup(true), "distinct"),
        ],
        ProjectionConfig::default(),
    );
    let output = single(project(&processor, create_window()).unwrap());
    assert_eq!(
        output.fields.get("all"),
        Some(&FieldValue::Array(vec![s("v1"), s("v2"), s("v1")]))
    );
    assert_eq!(
        output.fields.get("distinct"),
        Some(&FieldValue::Array(vec![
            map(&[("id", FieldValue::Integer(1)), ("a", s("v1")), ("b", FieldValue::Integer(65))]),
            map(&[("id", FieldValue::Integer(2)), ("a", s("v2")), ("b", FieldValue::Integer(12))]),
        ]))
    );
}

#[test]
fn test_deduplicate_latest_new_row() {
    let output = project_one(
        vec![aliased(dedup(false).arrow("a"), "c1")],
        window_of(&[53, 27, 123123]),
    );
    assert_eq!(output.fields, fields(&[("c1", FieldValue::Integer(123123))]));
}

#[test]
fn test_deduplicate_latest_repeated_row_is_omitted() {
    let output = project_one(vec![aliased(dedup(false), "c1")], window_of(&[53, 27, 53]));
    assert!(output.fields.is_empty());

    let processor = processor(vec![aliased(dedup(false), "c1")], ProjectionConfig::new(false, true));
    let output = single(project(&processor, window_of(&[53, 27, 53])).unwrap());
    assert_eq!(output.fields, fields(&[("c1", FieldValue::Null)]));
}

#[test]
fn test_deduplicate_requires_two_arguments() {
    let processor = processor(
        vec![aliased(
            Expr::function("deduplicate", vec![Expr::column("a")]),
            "c1",
        )],
        ProjectionConfig::default(),
    );
    let err = project(&processor, window_of(&[1])).unwrap_err();
    assert!(err.to_string().contains("expects two arguments but found 1"));
}

#[test]
fn test_empty_window_aggregate() {
    let processor = processor(
        vec![
            aliased(Expr::function("count", vec![Expr::wildcard()]), "c"),
            aliased(Expr::function("sum", vec![Expr::column("b")]), "total"),
        ],
        ProjectionConfig::new(false, true),
    );
    let empty = RecordCollection::new(vec![]);
    let output = single(project(&processor, empty).unwrap());
    assert_eq!(output.fields.get("c"), Some(&FieldValue::Integer(0)));
    assert_eq!(output.fields.get("total"), Some(&FieldValue::Null));
}
