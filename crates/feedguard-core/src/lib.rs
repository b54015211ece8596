//! Rule evaluation engine for feed-level data quality checks.
//!
//! A YAML rule document is loaded into an immutable [`RuleSet`] by the rule
//! registry, then executed by the [`ValidationEngine`] against the feeds of a
//! [`FeedCatalog`]. Every rule produces one [`ValidationResult`]; the
//! [`ResultSet`] bundles them with their [`ValidationSummary`].

pub mod business;
pub mod config;
pub mod engine;
pub mod errors;
pub mod expr;
pub mod reconciliation;
pub mod registry;
pub mod results;
pub mod rules;
pub mod tables;
pub mod types;
pub mod utils;

pub use config::{
    BusinessRule, ChecksumAlgorithm, ColumnTemplate, DimensionValue, EngineConfig, RangeScope,
    RangeSpec, ReconciliationRule, RuleConfig, RuleDefinition, RuleType, ScalarValue, ValueType,
};
pub use engine::ValidationEngine;
pub use errors::{ConfigError, RuleError};
pub use registry::RuleSet;
pub use results::{
    aggregate, ResultSet, RuleOutcome, ValidationResult, ValidationStatus, ValidationSummary,
};
pub use tables::{ArrowTable, Cell, FeedCatalog, Table};
