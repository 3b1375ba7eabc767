//! Property tests for the structured-response extractor
//!
//! Any array or object rendered into surrounding prose, optionally inside a
//! fenced block, must come back out unchanged.

use casegen_extract::{extract, repair_escapes, ExtractionError, StructuredValue};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 _.{}\\[\\]\"\\\\-]{0,12}".prop_map(Value::String),
        Just(Value::Null),
    ]
}

fn json_value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

fn structured() -> impl Strategy<Value = Value> {
    json_value().prop_filter("top level must be array or object", |v| {
        v.is_array() || v.is_object()
    })
}

/// Prose with no brackets, braces, quotes, or backticks
fn noise() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,.:!?\n]{0,40}"
}

proptest! {
    #[test]
    fn prop_extraction_is_idempotent_in_noise(
        value in structured(),
        prefix in noise(),
        suffix in noise(),
        fenced in any::<bool>(),
        pretty in any::<bool>(),
    ) {
        let rendered = if pretty {
            serde_json::to_string_pretty(&value).unwrap()
        } else {
            serde_json::to_string(&value).unwrap()
        };
        let text = if fenced {
            format!("{prefix}\n```json\n{rendered}\n```\n{suffix}")
        } else {
            format!("{prefix} {rendered} {suffix}")
        };

        let extracted = extract(&text).unwrap();
        prop_assert_eq!(extracted.into_value(), value);
    }

    #[test]
    fn prop_repair_only_inserts_backslashes(body in "[a-z\\\\qxz0-9]{0,24}") {
        let candidate = format!("[\"{body}\"]");
        let repaired = repair_escapes(&candidate);
        let stripped: String = repaired.chars().filter(|c| *c != '\\').collect();
        let original: String = candidate.chars().filter(|c| *c != '\\').collect();
        prop_assert_eq!(stripped, original);
        prop_assert!(repaired.len() >= candidate.len());
    }

    #[test]
    fn prop_prose_without_brackets_has_no_structure(text in noise()) {
        let is_no_structure = matches!(
            extract(&text),
            Err(ExtractionError::NoStructureFound { .. })
        );
        prop_assert!(is_no_structure);
    }
}

#[test]
fn lone_backslash_fails_strict_then_repairs() {
    let candidate = r#"["a\qb"]"#;
    assert!(serde_json::from_str::<Value>(candidate).is_err());

    let repaired = repair_escapes(candidate);
    assert_eq!(repaired, r#"["a\\qb"]"#);
    assert_eq!(
        serde_json::from_str::<Value>(&repaired).unwrap(),
        json!(["a\\qb"])
    );

    let value = extract(&format!("output: {candidate}")).unwrap();
    assert_eq!(value, StructuredValue::Array(vec![json!("a\\qb")]));
}
