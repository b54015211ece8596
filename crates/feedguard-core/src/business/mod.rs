//! Cross-column business rules.
//!
//! A rule holds an optional `condition` selecting the rows it applies to and
//! a `validation` every selected row must satisfy. With `group_by`, the
//! validation runs once per group over aggregated values instead.
use crate::{
    config::BusinessRule,
    errors::{ConfigError, RuleError},
    expr::{self, EvalError, Expr},
    results::RuleOutcome,
    rules::RuleContext,
    tables::Table,
};

mod evaluator;
mod grouping;


pub const VALIDATION_TYPE: &str = "business_rule";

/// A business rule with its expressions parsed.
#[derive(Debug, Clone)]
pub struct CompiledBusinessRule {
    rule: BusinessRule,
    condition: Option<Expr>,
    validation: Expr,
}

impl CompiledBusinessRule {
    pub fn compile(rule: BusinessRule) -> Result<Self, ConfigError> {
        let parse = |input: &str| {
            expr::parse(input).map_err(|source| ConfigError::Expression {
                rule_id: rule.rule_id.clone(),
                source,
            })
        };
        let condition = match rule.condition.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => Some(parse(c)?),
            _ => None,
        };
        let validation = parse(&rule.validation)?;
        Ok(Self {
            rule,
            condition,
            validation,
        })
    }

    pub fn rule_id(&self) -> &str {
        &self.rule.rule_id
    }

    pub fn rule(&self) -> &BusinessRule {
        &self.rule
    }

    /// Feed named by the rule, if any.
    pub fn feed(&self) -> Option<&str> {
        self.rule.template_name.as_deref()
    }

    pub fn is_grouped(&self) -> bool {
        !self.rule.group_by.is_empty()
    }

    /// Every column the rule reads: group keys first, then expression
    /// identifiers in order of appearance.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        let referenced = self
            .condition
            .iter()
            .flat_map(|c| c.columns())
            .chain(self.validation.columns());
        for name in self.rule.group_by.iter().chain(referenced) {
            if !columns.contains(&name.as_str()) {
                columns.push(name);
            }
        }
        columns
    }

    pub fn evaluate(&self, table: &dyn Table, ctx: &RuleContext) -> Result<RuleOutcome, RuleError> {
        let columns = self.columns();
        let bind = |e: &Expr| -> Result<Expr<usize>, EvalError> {
            e.bind(&mut |name: &String| {
                columns
                    .iter()
                    .position(|c| *c == name.as_str())
                    .ok_or_else(|| EvalError::UnknownColumn(name.clone()))
            })
        };
        let condition = self.condition.as_ref().map(|c| bind(c)).transpose()?;
        let validation = bind(&self.validation)?;

        let outcome = if self.is_grouped() {
            grouping::evaluate_groups(self, table, &columns, condition.as_ref(), &validation, ctx)?
        } else {
            evaluator::evaluate_rows(table, &columns, condition.as_ref(), &validation, ctx)?
        };

        let mut outcome = outcome.with_detail("validation", self.rule.validation.as_str());
        if let Some(condition) = &self.rule.condition {
            outcome = outcome.with_detail("condition", condition.as_str());
        }
        if !self.rule.description.is_empty() {
            outcome = outcome.with_detail("description", self.rule.description.as_str());
        }
        Ok(outcome)
    }
}
