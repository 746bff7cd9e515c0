/*!
# Joined Row Projection Tests

Rows produced by a join carry one constituent record per source.

## Test Scenarios

- Unqualified references resolve to the earliest source holding the name
- Qualified references and `source.*`
- Wildcard merge precedence
- Per-source metadata
- Aggregates over a collection of joined rows
- Outer joins: a qualified reference to a source missing from the row is absent
- `count(* EXCEPT(...))` alongside invisible fields
- `deduplicate(key, true)` returns merged joined rows
*/

use super::super::common_test_utils::*;
use velostream::velostream::config::ProjectionConfig;
use velostream::velostream::sql::ast::{ColumnRef, Expr, FieldDecl, SelectField};
use velostream::velostream::sql::execution::{
    FieldValue, GroupedCollectionSet, JoinedRecord, RecordCollection, Row, StreamRecord,
};

fn create_joined_row(id: i64, b: i64) -> Row {
    Row::Joined(JoinedRecord::new(vec![
        record(
            "test",
            &[("id", FieldValue::Integer(id)), ("a", FieldValue::Float(65.55))],
        )
        .with_metadata(fields(&[("topic", s("t1"))])),
        record(
            "test1",
            &[
                ("id", FieldValue::Integer(id + 1)),
                ("b", FieldValue::Integer(b)),
                ("c", s("x")),
            ],
        )
        .with_metadata(fields(&[("device", s("d2"))])),
    ]))
}

/// A joined row built from whichever sources took part in the join
fn create_partial_row(records: Vec<StreamRecord>) -> Row {
    Row::Joined(JoinedRecord::new(records))
}

fn create_inner_join_collection() -> RecordCollection {
    let rows = [1, 1, 5]
        .into_iter()
        .map(|id| {
            create_partial_row(vec![
                record(
                    "test",
                    &[("id", FieldValue::Integer(id)), ("a", s("a")), ("b", s("b"))],
                ),
                record("src2", &[("id", FieldValue::Integer(id)), ("color", s("w2"))]),
            ])
        })
        .collect();
    RecordCollection::new(rows)
}

fn source_wildcard(source: &str) -> FieldDecl {
    FieldDecl::visible(SelectField::QualifiedWildcard {
        source: source.to_string(),
    })
}

#[test]
fn test_unqualified_reference_prefers_earlier_source() {
    let output = project_one(vec![col("id"), col("a"), col("b")], create_joined_row(1, 12));
    assert_eq!(
        output.fields,
        fields(&[
            ("id", FieldValue::Integer(1)),
            ("a", FieldValue::Float(65.55)),
            ("b", FieldValue::Integer(12)),
        ])
    );
    assert_eq!(output.emitter, "test");
}

#[test]
fn test_qualified_reference() {
    let output = project_one(
        vec![
            aliased(Expr::qualified("test1", "id"), "id2"),
            qcol("test1", "b"),
        ],
        create_joined_row(1, 12),
    );
    assert_eq!(
        output.fields,
        fields(&[("id2", FieldValue::Integer(2)), ("b", FieldValue::Integer(12))])
    );
}

#[test]
fn test_wildcard_merges_sources_earlier_first() {
    let output = project_one(vec![wildcard()], create_joined_row(1, 12));
    assert_eq!(
        output.fields,
        fields(&[
            ("id", FieldValue::Integer(1)),
            ("a", FieldValue::Float(65.55)),
            ("b", FieldValue::Integer(12)),
            ("c", s("x")),
        ])
    );
}

#[test]
fn test_source_wildcard() {
    let output = project_one(vec![source_wildcard("test1")], create_joined_row(1, 12));
    assert_eq!(
        output.fields,
        fields(&[
            ("id", FieldValue::Integer(2)),
            ("b", FieldValue::Integer(12)),
            ("c", s("x")),
        ])
    );
}

#[test]
fn test_source_wildcard_with_extra_field() {
    let output = project_one(
        vec![source_wildcard("test"), qcol("test1", "c")],
        create_joined_row(1, 12),
    );
    assert_eq!(
        output.fields,
        fields(&[
            ("id", FieldValue::Integer(1)),
            ("a", FieldValue::Float(65.55)),
            ("c", s("x")),
        ])
    );
}

#[test]
fn test_concat_across_sources() {
    let output = project_one(
        vec![aliased(
            Expr::function(
                "concat",
                vec![
                    Expr::qualified("test", "id"),
                    Expr::qualified("test", "a"),
                    Expr::qualified("test1", "b"),
                ],
            ),
            "c",
        )],
        create_joined_row(1, 12),
    );
    assert_eq!(output.fields, fields(&[("c", s("165.5512"))]));
}

#[test]
fn test_meta_per_source() {
    let output = project_one(
        vec![
            aliased(
                Expr::function("meta", vec![Expr::qualified("test1", "device")]),
                "qualified",
            ),
            aliased(
                Expr::function("meta", vec![Expr::column("device")]),
                "unqualified",
            ),
            aliased(Expr::function("meta", vec![Expr::column("topic")]), "topic"),
            aliased(
                Expr::function("meta", vec![Expr::qualified("test", "device")]),
                "absent",
            ),
        ],
        create_joined_row(1, 12),
    );
    assert_eq!(
        output.fields,
        fields(&[
            ("qualified", s("d2")),
            ("unqualified", s("d2")),
            ("topic", s("t1")),
        ])
    );
}

#[test]
fn test_send_meta_uses_first_source_with_metadata() {
    let processor = processor(vec![col("id")], ProjectionConfig::new(true, false));
    let output = single(project(&processor, create_joined_row(1, 12)).unwrap());
    assert_eq!(output.fields.get("__meta"), Some(&map(&[("topic", s("t1"))])));
}

#[test]
fn test_aggregate_over_joined_collection() {
    let rows = vec![
        create_joined_row(1, 12),
        create_joined_row(3, 30),
    ];
    let processor = processor(
        vec![
            aliased(Expr::function("count", vec![Expr::wildcard()]), "c"),
            aliased(
                Expr::function("sum", vec![Expr::qualified("test1", "b")]),
                "total",
            ),
            col("id"),
        ],
        ProjectionConfig::default(),
    );
    let output = single(project(&processor, RecordCollection::new(rows)).unwrap());
    assert_eq!(
        output.fields,
        fields(&[
            ("c", FieldValue::Integer(2)),
            ("total", FieldValue::Integer(42)),
            ("id", FieldValue::Integer(1)),
        ])
    );
}

#[test]
fn test_qualified_reference_to_missing_source_is_absent() {
    let groups = GroupedCollectionSet::new(vec![
        RecordCollection::new(vec![create_partial_row(vec![
            record("src1", &[("id1", FieldValue::Integer(1)), ("f1", s("v1"))]),
            record("src2", &[("id2", FieldValue::Integer(2)), ("f2", s("w2"))]),
        ])]),
        RecordCollection::new(vec![create_partial_row(vec![
            record("src1", &[("id1", FieldValue::Integer(2)), ("f1", s("v2"))]),
            record("src2", &[("id2", FieldValue::Integer(4)), ("f2", s("w3"))]),
        ])]),
        RecordCollection::new(vec![create_partial_row(vec![record(
            "src1",
            &[("id1", FieldValue::Integer(3)), ("f1", s("v1"))],
        )])]),
    ]);
    let processor = processor(vec![qcol("src2", "id2")], ProjectionConfig::default());
    let rows = records(project(&processor, groups).unwrap());
    assert_eq!(
        rows.iter().map(|r| r.fields.clone()).collect::<Vec<_>>(),
        vec![
            fields(&[("id2", FieldValue::Integer(2))]),
            fields(&[("id2", FieldValue::Integer(4))]),
            fields(&[]),
        ]
    );
}

#[test]
fn test_qualified_field_not_borrowed_from_another_source() {
    let row = create_partial_row(vec![record(
        "src1",
        &[("id1", FieldValue::Integer(3)), ("f2", s("w9"))],
    )]);
    let output = project_one(
        vec![aliased(Expr::qualified("src2", "f2"), "right"), col("f2")],
        row,
    );
    // The unqualified reference may read any source
    assert_eq!(output.fields, fields(&[("f2", s("w9"))]));
}

#[test]
fn test_full_join_aggregates_read_only_their_source() {
    let group = RecordCollection::new(vec![
        create_partial_row(vec![record(
            "B",
            &[
                ("module", FieldValue::Integer(1)),
                ("topic", s("moduleB topic")),
                ("value", FieldValue::Integer(1)),
            ],
        )]),
        create_partial_row(vec![record(
            "C",
            &[
                ("module", FieldValue::Integer(1)),
                ("topic", s("moduleC topic")),
                ("value", FieldValue::Integer(100)),
            ],
        )]),
    ]);
    let processor = processor(
        vec![
            qcol("A", "module"),
            qcol("A", "topic"),
            aliased(Expr::function("max", vec![Expr::qualified("A", "value")]), "max1"),
            aliased(Expr::qualified("B", "topic"), "var2"),
            aliased(Expr::function("max", vec![Expr::qualified("B", "value")]), "max2"),
            aliased(Expr::qualified("C", "topic"), "var3"),
            aliased(Expr::function("max", vec![Expr::qualified("C", "value")]), "max3"),
        ],
        ProjectionConfig::default(),
    );
    let rows = records(project(&processor, GroupedCollectionSet::new(vec![group])).unwrap());
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].fields,
        fields(&[
            ("var2", s("moduleB topic")),
            ("max2", FieldValue::Integer(1)),
            ("max3", FieldValue::Integer(100)),
        ])
    );
}

#[test]
fn test_count_wildcard_except() {
    let output = project_one(
        vec![aliased(
            Expr::function("count", vec![Expr::wildcard_except(&["a", "b"])]),
            "all",
        )],
        create_inner_join_collection(),
    );
    assert_eq!(output.fields, fields(&[("all", FieldValue::Integer(3))]));
}

#[test]
fn test_count_wildcard_except_with_invisible_fields() {
    let output = project_one(
        vec![
            FieldDecl::invisible(SelectField::unaliased(Expr::function(
                "count",
                vec![Expr::wildcard_except(&["a", "b"])],
            ))),
            FieldDecl::invisible(SelectField::Column(ColumnRef::new("a"))),
            FieldDecl::invisible(SelectField::aliased(Expr::column("b"), "d")),
            col("b"),
        ],
        create_inner_join_collection(),
    );
    assert_eq!(output.fields, fields(&[("b", s("b"))]));
}

#[test]
fn test_deduplicate_all_over_joined_groups() {
    let joined = |id: i64, a: f64, color: &str| {
        create_partial_row(vec![
            record("test", &[("id", FieldValue::Integer(id)), ("a", FieldValue::Float(a))]),
            record("src2", &[("id", FieldValue::Integer(id)), ("color", s(color))]),
        ])
    };
    let groups = GroupedCollectionSet::new(vec![
        RecordCollection::new(vec![joined(1, 122.33, "w2"), joined(5, 177.51, "w2")]),
        RecordCollection::new(vec![joined(2, 89.03, "w1"), joined(4, 14.6, "w1")]),
    ]);
    let processor = processor(
        vec![aliased(
            Expr::function("deduplicate", vec![Expr::column("id"), Expr::boolean(true)]),
            "r1",
        )],
        ProjectionConfig::default(),
    );
    let rows = records(project(&processor, groups).unwrap());
    let merged = |id: i64, a: f64, color: &str| {
        map(&[
            ("id", FieldValue::Integer(id)),
            ("a", FieldValue::Float(a)),
            ("color", s(color)),
        ])
    };
    assert_eq!(
        rows.iter().map(|r| r.fields.clone()).collect::<Vec<_>>(),
        vec![
            fields(&[(
                "r1",
                FieldValue::Array(vec![merged(1, 122.33, "w2"), merged(5, 177.51, "w2")]),
            )]),
            fields(&[(
                "r1",
                FieldValue::Array(vec![merged(2, 89.03, "w1"), merged(4, 14.6, "w1")]),
            )]),
        ]
    );
}
