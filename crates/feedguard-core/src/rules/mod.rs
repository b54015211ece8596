//! Column-level validators.
//!
//! Each rule type of the `validations` section maps to one validator. The
//! registry resolves the type once at load into a [`ColumnCheck`], so the
//! engine never branches on rule-type strings while scanning rows.
use crate::{
    errors::RuleError, results::RuleOutcome, tables::Table, utils::deadline::Deadline,
};

mod accumulator;
pub mod generic;
pub mod numeric;
pub mod string;
pub mod table;

pub(crate) use accumulator::{scan_rows, try_scan_rows, FailureAccumulator};
pub use generic::{DuplicateCheck, MandatoryCheck, TypeCheck, UniqueCheck};
pub use numeric::{ChecksumCheck, RangeCheck};
pub use string::{EnumerationCheck, PatternCheck};
pub use table::CountCheck;

/// Per-run settings handed to every rule evaluation.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext {
    pub sample_size: usize,
    pub deadline: Deadline,
    /// Reconciliation tolerance for rules that set none.
    pub tolerance: f64,
}

impl RuleContext {
    pub fn new(sample_size: usize, deadline: Deadline) -> Self {
        Self {
            sample_size,
            deadline,
            tolerance: 0.0,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

pub trait ColumnValidator: Send + Sync {
    /// Returns the name of the rule.
    fn name(&self) -> String;
    /// Name reported as the result's `validation_type`.
    fn validation_type(&self) -> &'static str;
    /// Validates the rule's columns of `table`. Bad data never errors; only
    /// missing columns, cast failures and timeouts do.
    fn validate(&self, table: &dyn Table, ctx: &RuleContext) -> Result<RuleOutcome, RuleError>;
}

/// Validators of the closed set of column rule types.
#[derive(Debug, Clone)]
pub enum ColumnCheck {
    Mandatory(MandatoryCheck),
    Range(RangeCheck),
    Pattern(PatternCheck),
    Enumeration(EnumerationCheck),
    Type(TypeCheck),
    Unique(UniqueCheck),
    Count(CountCheck),
    Checksum(ChecksumCheck),
    Duplicate(DuplicateCheck),
}

impl ColumnCheck {
    fn validator(&self) -> &dyn ColumnValidator {
        match self {
            ColumnCheck::Mandatory(c) => c,
            ColumnCheck::Range(c) => c,
            ColumnCheck::Pattern(c) => c,
            ColumnCheck::Enumeration(c) => c,
            ColumnCheck::Type(c) => c,
            ColumnCheck::Unique(c) => c,
            ColumnCheck::Count(c) => c,
            ColumnCheck::Checksum(c) => c,
            ColumnCheck::Duplicate(c) => c,
        }
    }
}

impl ColumnValidator for ColumnCheck {
    fn name(&self) -> String {
        self.validator().name()
    }

    fn validation_type(&self) -> &'static str {
        self.validator().validation_type()
    }

    fn validate(&self, table: &dyn Table, ctx: &RuleContext) -> Result<RuleOutcome, RuleError> {
        self.validator().validate(table, ctx)
    }
}
