use super::*;
use crate::{
    config::{DimensionValue, ScalarValue},
    tables::fixtures::{feed, ints, strings},
    utils::deadline::Deadline,
};

fn ctx() -> RuleContext {
    RuleContext::new(10, Deadline::unbounded())
}

fn rule(dimensions: &[&str], values: Vec<DimensionValue>) -> ReconciliationRule {
    ReconciliationRule {
        rec_id: "REC1".to_string(),
        source_feed: "source".to_string(),
        target_feed: "target".to_string(),
        dimensions: dimensions.iter().map(|s| s.to_string()).collect(),
        dimension_values: values,
        measure_field: "amount".to_string(),
        tolerance: None,
    }
}

fn country_filter() -> Vec<DimensionValue> {
    vec![DimensionValue::One(ScalarValue::Str("('IND','CHN')".into()))]
}

fn catalog(source: Vec<(&str, i64)>, target: Vec<(&str, i64)>) -> FeedCatalog {
    let table = |name: &str, rows: Vec<(&str, i64)>| {
        feed(
            name,
            vec![
                (
                    "country",
                    strings(rows.iter().map(|(c, _)| Some(*c)).collect()),
                ),
                ("amount", ints(rows.iter().map(|(_, a)| Some(*a)).collect())),
            ],
        )
    };
    FeedCatalog::new()
        .with_table(table("source", source))
        .with_table(table("target", target))
}

#[test]
fn test_matching_sums_complete() {
    let rec = CompiledReconciliation::compile(rule(&["country"], country_filter())).unwrap();
    let catalog = catalog(
        vec![("IND", 60), ("IND", 40), ("USA", 7)],
        vec![("IND", 100), ("USA", 1)],
    );
    let outcome = rec.evaluate(&catalog, &ctx()).unwrap();
    assert_eq!(outcome.checked, 1);
    assert_eq!(outcome.failed, 0);
    assert_eq!(outcome.details["source_total"], 100.0);
}

#[test]
fn test_mismatch_reports_values() {
    let rec = CompiledReconciliation::compile(rule(&["country"], country_filter())).unwrap();
    let catalog = catalog(vec![("IND", 100)], vec![("IND", 95)]);
    let outcome = rec.evaluate(&catalog, &ctx()).unwrap();
    assert_eq!(outcome.failed, 1);
    assert_eq!(
        outcome.samples,
        vec!["key (country=IND): source_value=100, target_value=95, difference=5"]
    );
}

#[test]
fn test_tolerance_absorbs_small_differences() {
    let mut with_tolerance = rule(&["country"], country_filter());
    with_tolerance.tolerance = Some(5.0);
    let rec = CompiledReconciliation::compile(with_tolerance).unwrap();
    let catalog = catalog(vec![("IND", 100)], vec![("IND", 95)]);
    assert_eq!(rec.evaluate(&catalog, &ctx()).unwrap().failed, 0);

}

#[test]
fn test_run_tolerance_applies_when_rule_sets_none() {
    let catalog = catalog(vec![("IND", 100)], vec![("IND", 95)]);
    let rec = CompiledReconciliation::compile(rule(&["country"], country_filter())).unwrap();
    let lenient = ctx().with_tolerance(10.0);
    assert_eq!(rec.tolerance(&lenient), 10.0);
    let outcome = rec.evaluate(&catalog, &lenient).unwrap();
    assert_eq!(outcome.failed, 0);
    assert_eq!(outcome.details["tolerance"], 10.0);

    let mut strict = rule(&["country"], country_filter());
    strict.tolerance = Some(1.0);
    let rec = CompiledReconciliation::compile(strict).unwrap();
    assert_eq!(rec.tolerance(&lenient), 1.0);
    assert_eq!(rec.evaluate(&catalog, &lenient).unwrap().failed, 1);
}

#[test]
fn test_one_sided_keys_fail() {
    let rec = CompiledReconciliation::compile(rule(&["country"], country_filter())).unwrap();
    let catalog = catalog(vec![("IND", 10), ("CHN", 3)], vec![("IND", 10)]);
    let outcome = rec.evaluate(&catalog, &ctx()).unwrap();
    assert_eq!(outcome.checked, 2);
    assert_eq!(outcome.failed, 1);
    assert_eq!(
        outcome.samples,
        vec!["key (country=CHN): target feed has no matching key (source_value=3)"]
    );
}

#[test]
fn test_without_dimensions_compares_totals() {
    let rec = CompiledReconciliation::compile(rule(&[], vec![])).unwrap();
    let catalog = catalog(vec![("IND", 100)], vec![("USA", 95)]);
    let outcome = rec.evaluate(&catalog, &ctx()).unwrap();
    assert_eq!(outcome.checked, 1);
    assert_eq!(
        outcome.samples,
        vec!["key (total): source_value=100, target_value=95, difference=5"]
    );
}

#[test]
fn test_null_dimension_never_matches_null_text() {
    let null_filter = vec![DimensionValue::One(ScalarValue::Str("null".into()))];
    let rec = CompiledReconciliation::compile(rule(&["country"], null_filter)).unwrap();
    let table = |name: &str, amounts: Vec<Option<i64>>| {
        feed(
            name,
            vec![
                ("country", strings(vec![None, Some("null")])),
                ("amount", ints(amounts)),
            ],
        )
    };
    let catalog = FeedCatalog::new()
        .with_table(table("source", vec![Some(50), Some(7)]))
        .with_table(table("target", vec![Some(1), Some(7)]));
    let outcome = rec.evaluate(&catalog, &ctx()).unwrap();
    assert_eq!(outcome.failed, 0);
    assert_eq!(outcome.details["source_rows"], 1);
    assert_eq!(outcome.details["source_total"], 7.0);
}

#[test]
fn test_missing_feed_is_a_failure() {
    let rec = CompiledReconciliation::compile(rule(&["country"], country_filter())).unwrap();
    let catalog = FeedCatalog::new().with_table(feed(
        "source",
        vec![("country", strings(vec![Some("IND")])), ("amount", ints(vec![Some(1)]))],
    ));
    let outcome = rec.evaluate(&catalog, &ctx()).unwrap();
    assert_eq!(outcome.failed, 1);
    assert_eq!(
        outcome.samples,
        vec!["feed 'target' is not available for reconciliation"]
    );
}

#[test]
fn test_missing_measure_column_errors() {
    let mut bad = rule(&["country"], country_filter());
    bad.measure_field = "total".to_string();
    let rec = CompiledReconciliation::compile(bad).unwrap();
    let catalog = catalog(vec![("IND", 1)], vec![("IND", 1)]);
    assert!(matches!(
        rec.evaluate(&catalog, &ctx()),
        Err(RuleError::ColumnNotFound { .. })
    ));
}

#[test]
fn test_compile_checks_dimension_lengths() {
    let err = CompiledReconciliation::compile(rule(&["country", "month"], country_filter()))
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::DimensionMismatch {
            dimensions: 2,
            values: 1,
            ..
        }
    ));

    let mut negative = rule(&[], vec![]);
    negative.tolerance = Some(-1.0);
    assert!(CompiledReconciliation::compile(negative).is_err());
}
