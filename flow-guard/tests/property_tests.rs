//! Property-based tests for flow-guard.
//!
//! ## Properties
//!
//! - Records that satisfy every rule validate to `true` with no errors
//! - Validation is idempotent: sanitized records validate the same way twice
//! - Every wildcard error key names an index that exists in the input
//! - Collect-all never reports fewer errors than fail-fast

use flow_guard::prelude::*;
use proptest::prelude::*;
use serde_json::{json, Value};

fn tag_validator() -> Validator {
    Validator::new(
        Schema::new()
            .path("name", ["isExists", "isString", "trim", "toLowerCase"])
            .path("tags", ["isArray"])
            .path("tags.[]", ["isString:tag must be text"])
            .path("count", vec![Rule::from("isInteger"), Rule::default_value(0)]),
    )
    .unwrap()
}

fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z ]{0,8}".prop_map(Value::String),
    ]
}

proptest! {
    #[test]
    fn test_valid_records_pass(
        name in "[A-Za-z ]{1,12}",
        tags in prop::collection::vec("[a-z]{0,6}", 0..6),
        count in prop::option::of(any::<i64>()),
    ) {
        let mut record = json!({"name": name, "tags": tags});
        if let Some(count) = count {
            record["count"] = json!(count);
        }

        let v = tag_validator();
        prop_assert!(v.validate(&mut record).unwrap());
        prop_assert!(v.get_errors().is_empty());

        let sanitized = record["name"].as_str().unwrap();
        prop_assert_eq!(sanitized, name.trim().to_lowercase());
        prop_assert_eq!(&record["count"], &json!(count.unwrap_or(0)));
    }

    #[test]
    fn test_validation_is_idempotent(
        name in "[A-Za-z ]{0,12}",
        tags in prop::collection::vec(json_leaf(), 0..6),
    ) {
        let v = tag_validator().try_all(true);
        let mut record = json!({"name": name, "tags": tags});

        let first = v.validate(&mut record).unwrap();
        let first_errors = v.get_errors();
        let sanitized = record.clone();

        let second = v.validate(&mut record).unwrap();
        prop_assert_eq!(first, second);
        prop_assert_eq!(first_errors, v.get_errors());
        prop_assert_eq!(sanitized, record);
    }

    #[test]
    fn test_wildcard_errors_name_existing_indexes(
        tags in prop::collection::vec(json_leaf(), 0..10),
    ) {
        let v = tag_validator().try_all(true);
        let mut record = json!({"name": "n", "tags": tags.clone()});
        v.validate(&mut record).unwrap();

        let expected: Vec<String> = tags
            .iter()
            .enumerate()
            .filter(|(_, tag)| !tag.is_string())
            .map(|(index, _)| format!("tags.{index}"))
            .collect();
        let reported: Vec<String> = v.get_errors().iter().map(|(key, _)| key.to_string()).collect();
        prop_assert_eq!(reported, expected);
    }

    #[test]
    fn test_collect_all_reports_at_least_fail_fast(
        tags in prop::collection::vec(json_leaf(), 0..10),
        name in json_leaf(),
    ) {
        let record = json!({"name": name, "tags": tags});

        let fail_fast = tag_validator();
        let fail_fast_valid = fail_fast.validate(&mut record.clone()).unwrap();
        let collect_all = tag_validator().try_all(true);
        let collect_all_valid = collect_all.validate(&mut record.clone()).unwrap();

        prop_assert_eq!(fail_fast_valid, collect_all_valid);
        prop_assert!(fail_fast.get_errors().len() <= 1);
        prop_assert!(collect_all.get_errors().len() >= fail_fast.get_errors().len());
        if let Some(first) = fail_fast.get_next_error() {
            prop_assert!(collect_all.get_errors().contains(&first.field));
        }
    }
}
