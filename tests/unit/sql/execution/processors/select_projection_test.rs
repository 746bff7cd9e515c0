/*!
# Single Record Projection Tests

Projection of one event through a SELECT list.

## Test Scenarios

- Plain columns, case-insensitive lookup and missing columns
- Omit vs explicit-null absence policy
- Wildcard with EXCEPT / REPLACE
- Invisible fields and alias reuse
- Output naming for bare function calls and unnamed expressions
- Metadata attachment
*/

use super::super::common_test_utils::*;
use std::collections::HashMap;
use velostream::velostream::config::ProjectionConfig;
use velostream::velostream::sql::ast::{BinaryOperator, ColumnRef, Expr, FieldDecl, SelectField};
use velostream::velostream::sql::execution::{FieldValue, StreamRecord};

fn create_test_record() -> StreamRecord {
    record("test", &[("a", s("val_a")), ("b", FieldValue::Integer(3))])
        .with_metadata(fields(&[("device", s("d1"))]))
        .with_timestamp(1_000)
}

#[test]
fn test_plain_column() {
    let output = project_one(vec![col("a")], create_test_record());
    assert_eq!(output.fields, fields(&[("a", s("val_a"))]));
}

#[test]
fn test_missing_column_is_omitted_by_default() {
    let output = project_one(vec![col("a"), col("zz")], create_test_record());
    assert_eq!(output.fields, fields(&[("a", s("val_a"))]));
    assert!(!output.fields.contains_key("zz"));
}

#[test]
fn test_missing_column_is_null_with_send_nil() {
    let processor = processor(vec![col("a"), col("zz")], ProjectionConfig::new(false, true));
    let output = single(project(&processor, create_test_record()).unwrap());
    assert_eq!(
        output.fields,
        fields(&[("a", s("val_a")), ("zz", FieldValue::Null)])
    );
}

#[test]
fn test_column_lookup_is_case_insensitive() {
    // The declared spelling names the output key
    let output = project_one(vec![col("A")], create_test_record());
    assert_eq!(output.fields, fields(&[("A", s("val_a"))]));
}

#[test]
fn test_null_input_value_follows_absence_policy() {
    let input = record("test", &[("a", FieldValue::Null), ("b", FieldValue::Integer(1))]);

    let omitted = project_one(vec![col("a"), col("b")], input.clone());
    assert_eq!(omitted.fields, fields(&[("b", FieldValue::Integer(1))]));

    let processor = processor(vec![col("a"), col("b")], ProjectionConfig::new(false, true));
    let kept = single(project(&processor, input).unwrap());
    assert_eq!(kept.fields.get("a"), Some(&FieldValue::Null));
}

#[test]
fn test_wildcard_copies_every_field() {
    let output = project_one(vec![wildcard()], create_test_record());
    assert_eq!(
        output.fields,
        fields(&[("a", s("val_a")), ("b", FieldValue::Integer(3))])
    );
}

#[test]
fn test_wildcard_except_and_replace() {
    let input = record(
        "test",
        &[
            ("a", FieldValue::Integer(1)),
            ("b", FieldValue::Integer(2)),
            ("c", FieldValue::Integer(3)),
        ],
    );
    let decl = FieldDecl::visible(SelectField::Wildcard {
        except: vec!["a".to_string(), "b".to_string()],
        replace: vec![(
            Expr::binary(Expr::column("c"), BinaryOperator::Multiply, Expr::integer(2)),
            "a".to_string(),
        )],
    });

    let output = project_one(vec![decl], input);
    assert_eq!(
        output.fields,
        fields(&[("a", FieldValue::Integer(6)), ("c", FieldValue::Integer(3))])
    );
}

#[test]
fn test_wildcard_with_extra_alias() {
    let output = project_one(
        vec![
            wildcard(),
            aliased(
                Expr::binary(Expr::column("b"), BinaryOperator::Add, Expr::integer(1)),
                "b_plus",
            ),
        ],
        create_test_record(),
    );
    assert_eq!(output.field_count(), 3);
    assert_eq!(output.fields.get("b_plus"), Some(&FieldValue::Integer(4)));
}

#[test]
fn test_invisible_alias_is_reusable_but_not_emitted() {
    let decls = vec![
        col("a"),
        FieldDecl::invisible(SelectField::aliased(
            Expr::binary(Expr::column("b"), BinaryOperator::Multiply, Expr::integer(2)),
            "d",
        )),
        aliased(
            Expr::binary(Expr::column("d"), BinaryOperator::Add, Expr::integer(1)),
            "e",
        ),
    ];

    let output = project_one(decls, create_test_record());
    assert_eq!(
        output.fields,
        fields(&[("a", s("val_a")), ("e", FieldValue::Integer(7))])
    );
}

#[test]
fn test_invisible_field_is_dropped_from_wildcard_output() {
    let decls = vec![
        wildcard(),
        FieldDecl::invisible(SelectField::Column(ColumnRef::new("b"))),
    ];
    let output = project_one(decls, create_test_record());
    assert_eq!(output.fields, fields(&[("a", s("val_a"))]));
}

#[test]
fn test_alias_chain() {
    let input = record(
        "test",
        &[("x", FieldValue::Integer(1)), ("y", FieldValue::Integer(2))],
    );
    let decls = vec![
        aliased(
            Expr::binary(Expr::column("x"), BinaryOperator::Add, Expr::column("y")),
            "s",
        ),
        aliased(
            Expr::binary(Expr::column("s"), BinaryOperator::Multiply, Expr::integer(10)),
            "t",
        ),
    ];

    let output = project_one(decls, input);
    assert_eq!(output.fields.get("s"), Some(&FieldValue::Integer(3)));
    assert_eq!(output.fields.get("t"), Some(&FieldValue::Integer(30)));
}

#[test]
fn test_bare_function_is_named_after_function() {
    let output = project_one(
        vec![bare(Expr::function("abs", vec![Expr::column("b")]))],
        create_test_record(),
    );
    assert_eq!(output.fields, fields(&[("abs", FieldValue::Integer(3))]));
}

#[test]
fn test_unnamed_expressions_get_placeholder_names() {
    let decls = vec![
        bare(Expr::integer(1)),
        bare(Expr::function("abs", vec![Expr::column("b")])),
        bare(Expr::binary(
            Expr::column("b"),
            BinaryOperator::Multiply,
            Expr::integer(2),
        )),
    ];

    let output = project_one(decls, create_test_record());
    assert_eq!(
        output.fields,
        fields(&[
            ("kuiper_field_0", FieldValue::Integer(1)),
            ("abs", FieldValue::Integer(3)),
            ("kuiper_field_1", FieldValue::Integer(6)),
        ])
    );
}

#[test]
fn test_later_field_overwrites_same_name() {
    let output = project_one(
        vec![col("a"), aliased(Expr::column("b"), "a")],
        create_test_record(),
    );
    assert_eq!(output.fields, fields(&[("a", FieldValue::Integer(3))]));
}

#[test]
fn test_send_meta_attaches_metadata() {
    let processor = processor(vec![col("a")], ProjectionConfig::new(true, false));
    let output = single(project(&processor, create_test_record()).unwrap());
    assert_eq!(output.fields.get("a"), Some(&s("val_a")));
    assert_eq!(
        output.fields.get("__meta"),
        Some(&map(&[("device", s("d1"))]))
    );
}

#[test]
fn test_send_meta_without_metadata_adds_nothing() {
    let processor = processor(vec![col("a")], ProjectionConfig::new(true, false));
    let input = record("test", &[("a", s("val_a"))]);
    let output = single(project(&processor, input).unwrap());
    assert!(!output.fields.contains_key("__meta"));
}

#[test]
fn test_send_meta_keeps_existing_meta_field() {
    let processor = processor(
        vec![aliased(Expr::string("mine"), "__meta")],
        ProjectionConfig::new(true, false),
    );
    let output = single(project(&processor, create_test_record()).unwrap());
    assert_eq!(output.fields.get("__meta"), Some(&s("mine")));
}

#[test]
fn test_meta_function_reads_metadata() {
    let output = project_one(
        vec![aliased(
            Expr::function("meta", vec![Expr::column("device")]),
            "dev",
        )],
        create_test_record(),
    );
    assert_eq!(output.fields.get("dev"), Some(&s("d1")));
    // Metadata is never a field without send_meta
    assert!(!output.fields.contains_key("__meta"));
}

#[test]
fn test_output_keeps_emitter_metadata_and_timestamp() {
    let output = project_one(vec![col("a")], create_test_record());
    assert_eq!(output.emitter, "test");
    assert_eq!(output.timestamp, 1_000);
    assert_eq!(output.metadata, fields(&[("device", s("d1"))]));
}

#[test]
fn test_aggregate_over_single_event() {
    let output = project_one(
        vec![aliased(
            Expr::function("count", vec![Expr::column("a")]),
            "c",
        )],
        create_test_record(),
    );
    assert_eq!(output.fields, fields(&[("c", FieldValue::Integer(1))]));
}

#[test]
fn test_input_is_not_mutated() {
    let input = create_test_record();
    let snapshot: HashMap<String, FieldValue> = input.fields.clone();
    let processor = processor(vec![col("a")], ProjectionConfig::default());
    let _ = project(&processor, input.clone()).unwrap();
    assert_eq!(input.fields, snapshot);
}
