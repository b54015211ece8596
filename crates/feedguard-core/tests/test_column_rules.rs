mod common;

use common::{feed, feed_in_batches, floats, ints, run, strings};
use feedguard_core::{
    rules::{
        ChecksumCheck, ColumnValidator, CountCheck, DuplicateCheck, EnumerationCheck,
        MandatoryCheck, PatternCheck, RangeCheck, TypeCheck, UniqueCheck,
    },
    ChecksumAlgorithm, RangeScope, RangeSpec, RuleError, ScalarValue, ValueType,
};
use regex::Regex;

fn age_range() -> RangeSpec {
    RangeSpec {
        bottom: 0.0,
        top: 120.0,
        scope: RangeScope::Inclusive,
    }
}

#[test]
fn test_range_bounds_are_inclusive() {
    let table = feed(
        "customers",
        vec![("age", ints(vec![Some(0), Some(120), Some(-1), Some(121), None]))],
    );
    let outcome = run(&RangeCheck::new("age".to_string(), age_range()), &table);
    // -1 and 121 fail, null is skipped
    assert_eq!(outcome.failed, 2);
    assert_eq!(outcome.checked, 4);
    assert!(outcome.samples[0].contains("-1"));
}

#[test]
fn test_range_exclusive_and_non_numeric() {
    let range = RangeSpec {
        scope: RangeScope::Exclusive,
        ..age_range()
    };
    let table = feed(
        "customers",
        vec![("age", strings(vec![Some("0"), Some("60"), Some("abc")]))],
    );
    let outcome = run(&RangeCheck::new("age".to_string(), range), &table);
    assert_eq!(outcome.failed, 2);
    assert_eq!(outcome.details["non_numeric"], 1);
    assert_eq!(outcome.details["out_of_range"], 1);
}

#[test]
fn test_mandatory_counts_null_and_empty() {
    let table = feed(
        "customers",
        vec![("name", strings(vec![Some("a"), Some(""), Some("b"), None]))],
    );
    let outcome = run(&MandatoryCheck::new("name".to_string()), &table);
    assert_eq!(outcome.failed, 2);
    assert_eq!(outcome.checked, 4);
    assert_eq!(
        outcome.samples,
        vec!["row 1: empty value".to_string(), "row 3: null value".to_string()]
    );
}

#[test]
fn test_enumeration_reports_unknown_member() {
    let table = feed(
        "customers",
        vec![("country", strings(vec![Some("USA"), Some("FRA")]))],
    );
    let check = EnumerationCheck::new(
        "country".to_string(),
        "country_codes".to_string(),
        ["USA", "UK", "IND", "CHN", "LKA"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    let outcome = run(&check, &table);
    assert_eq!(outcome.failed, 1);
    assert!(outcome.samples[0].contains("FRA"));
}

#[test]
fn test_pattern_respects_optional_columns() {
    let table = feed(
        "customers",
        vec![(
            "email",
            strings(vec![Some("a@b.com"), Some("nope"), None]),
        )],
    );
    let regex = Regex::new(r"^(?:[^@\s]+@[^@\s]+\.[a-z]+)$").unwrap();
    let required = PatternCheck::new("email".to_string(), "email".to_string(), regex.clone(), false);
    let optional = PatternCheck::new("email".to_string(), "email".to_string(), regex, true);
    assert_eq!(run(&required, &table).failed, 2);
    assert_eq!(run(&optional, &table).failed, 1);
}

#[test]
fn test_type_check_integer_column() {
    let table = feed(
        "customers",
        vec![(
            "age",
            strings(vec![Some("42"), Some("4.0"), Some("4.5"), Some("x"), None]),
        )],
    );
    let outcome = run(&TypeCheck::new("age".to_string(), ValueType::Integer), &table);
    assert_eq!(outcome.failed, 2);
    assert_eq!(outcome.details["expected_type"], "integer");
}

#[test]
fn test_unique_spans_batches() {
    let table = feed_in_batches(
        "customers",
        vec![
            vec![("id", ints(vec![Some(1), Some(2)]))],
            vec![("id", ints(vec![Some(3), Some(1)]))],
        ],
    );
    let outcome = run(&UniqueCheck::new("id".to_string()), &table);
    // Every occurrence of a repeated value fails.
    assert_eq!(outcome.failed, 2);
    assert_eq!(outcome.checked, 4);
}

#[test]
fn test_duplicate_fails_later_occurrences() {
    let table = feed(
        "orders",
        vec![
            ("order_id", ints(vec![Some(1), Some(1), Some(2), Some(1)])),
            ("line", ints(vec![Some(1), Some(1), Some(1), Some(2)])),
        ],
    );
    let by_key = DuplicateCheck::new(Some(vec!["order_id".to_string(), "line".to_string()]));
    let outcome = run(&by_key, &table);
    assert_eq!(outcome.failed, 1);
    assert!(outcome.samples[0].starts_with("row 1: duplicate of row 0"));

    let whole_row = DuplicateCheck::new(None);
    assert_eq!(run(&whole_row, &table).failed, 1);
}

#[test]
fn test_count_difference() {
    let table = feed("orders", vec![("id", ints(vec![Some(1), Some(2), Some(3)]))]);
    let outcome = run(&CountCheck::new(5), &table);
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.details["difference"], -2);
    assert_eq!(run(&CountCheck::new(3), &table).failed, 0);
}

#[test]
fn test_checksum_sum() {
    let table = feed(
        "orders",
        vec![("amount", floats(vec![Some(10.5), Some(20.0), None]))],
    );
    let matching = ChecksumCheck::new(
        "amount".to_string(),
        ChecksumAlgorithm::Sum,
        Some(ScalarValue::Float(30.5)),
    );
    assert_eq!(run(&matching, &table).failed, 0);

    let wrong = ChecksumCheck::new(
        "amount".to_string(),
        ChecksumAlgorithm::Sum,
        Some(ScalarValue::Int(31)),
    );
    let outcome = run(&wrong, &table);
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.checked, 1);
}

#[test]
fn test_missing_column_is_an_error() {
    let table = feed("orders", vec![("id", ints(vec![Some(1)]))]);
    let err = MandatoryCheck::new("amount".to_string())
        .validate(&table, &common::ctx())
        .unwrap_err();
    assert!(matches!(err, RuleError::ColumnNotFound { .. }));
}
