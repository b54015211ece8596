//! Compiles document entries into validators, resolving every reference.
use std::collections::{BTreeMap, HashMap};

use regex::Regex;

use crate::{
    business::CompiledBusinessRule,
    config::{BusinessRule, ColumnTemplate, RuleDefinition, RuleType, ScalarValue},
    errors::ConfigError,
    expr::{self, Value},
    rules::{
        ChecksumCheck, ColumnCheck, CountCheck, DuplicateCheck, EnumerationCheck,
        MandatoryCheck, PatternCheck, RangeCheck, TypeCheck, UniqueCheck,
    },
};

pub(super) type TemplateIndex = HashMap<(String, String), ColumnTemplate>;

pub(super) fn compile_enumerations(
    enumerations: BTreeMap<String, Vec<ScalarValue>>,
) -> HashMap<String, Vec<String>> {
    enumerations
        .into_iter()
        .map(|(key, values)| (key, values.iter().map(|v| v.to_string()).collect()))
        .collect()
}

/// Patterns are anchored so that a value must match as a whole.
pub(super) fn compile_patterns(
    patterns: BTreeMap<String, String>,
) -> Result<HashMap<String, Regex>, ConfigError> {
    patterns
        .into_iter()
        .map(|(key, pattern)| match Regex::new(&format!("^(?:{})$", pattern)) {
            Ok(regex) => Ok((key, regex)),
            Err(source) => Err(ConfigError::InvalidPattern { key, source }),
        })
        .collect()
}

pub(super) fn index_templates(
    templates: Vec<ColumnTemplate>,
    enumerations: &HashMap<String, Vec<String>>,
) -> Result<TemplateIndex, ConfigError> {
    let mut index = TemplateIndex::with_capacity(templates.len());
    for template in templates {
        let invalid = |message: String| ConfigError::InvalidTemplate {
            feed_name: template.feed_name.clone(),
            column_name: template.column_name.clone(),
            message,
        };
        if let Some(range) = &template.range {
            if range.bottom.is_nan() || range.top.is_nan() || range.bottom > range.top {
                return Err(invalid(format!(
                    "range bottom {} is above top {}",
                    range.bottom, range.top
                )));
            }
        }
        if let Some(key) = &template.enumeration_key {
            if !enumerations.contains_key(key) {
                return Err(ConfigError::UnknownEnumeration {
                    owner: format!("{}.{}", template.feed_name, template.column_name),
                    key: key.clone(),
                });
            }
        }

        let id = (template.feed_name.clone(), template.column_name.clone());
        if index.contains_key(&id) {
            return Err(ConfigError::DuplicateTemplate {
                feed_name: id.0,
                column_name: id.1,
            });
        }
        index.insert(id, template);
    }
    Ok(index)
}

pub(super) struct Compiler<'a> {
    templates: &'a TemplateIndex,
    enumerations: &'a HashMap<String, Vec<String>>,
    patterns: &'a HashMap<String, Regex>,
}

impl<'a> Compiler<'a> {
    pub fn new(
        templates: &'a TemplateIndex,
        enumerations: &'a HashMap<String, Vec<String>>,
        patterns: &'a HashMap<String, Regex>,
    ) -> Self {
        Self {
            templates,
            enumerations,
            patterns,
        }
    }

    fn lookup_template(&self, feed: &str, column: &str) -> Option<&'a ColumnTemplate> {
        self.templates.get(&(feed.to_string(), column.to_string()))
    }

    pub fn compile_rule(&self, def: &RuleDefinition) -> Result<ColumnCheck, ConfigError> {
        let column = || {
            def.column_name
                .clone()
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingField {
                    rule_id: def.rule_id.clone(),
                    field: "column_name",
                })
        };
        let template = |column: &str| {
            self.lookup_template(&def.template_name, column)
                .ok_or_else(|| ConfigError::UnknownTemplate {
                    rule_id: def.rule_id.clone(),
                    template_name: def.template_name.clone(),
                    column_name: column.to_string(),
                })
        };

        let check = match def.rule_type {
            RuleType::Mandatory => ColumnCheck::Mandatory(MandatoryCheck::new(column()?)),
            RuleType::Unique => ColumnCheck::Unique(UniqueCheck::new(column()?)),
            RuleType::Range => {
                let column = column()?;
                let range = template(&column)?.range.ok_or_else(|| ConfigError::InvalidRule {
                    rule_id: def.rule_id.clone(),
                    message: format!(
                        "template column '{}.{}' declares no range",
                        def.template_name, column
                    ),
                })?;
                ColumnCheck::Range(RangeCheck::new(column, range))
            }
            RuleType::Type => {
                let column = column()?;
                let expected = template(&column)?.type_name;
                ColumnCheck::Type(TypeCheck::new(column, expected))
            }
            RuleType::Pattern => {
                let column = column()?;
                let key = def.pattern_key.clone().unwrap_or_else(|| column.clone());
                let regex = self.patterns.get(&key).cloned().ok_or_else(|| {
                    ConfigError::UnknownPattern {
                        rule_id: def.rule_id.clone(),
                        key: key.clone(),
                    }
                })?;
                let optional = self
                    .lookup_template(&def.template_name, &column)
                    .is_some_and(ColumnTemplate::is_explicitly_optional);
                ColumnCheck::Pattern(PatternCheck::new(column, key, regex, optional))
            }
            RuleType::Enumeration => {
                let column = column()?;
                let key = match &def.enumeration_key {
                    Some(key) => key.clone(),
                    None => template(&column)?
                        .enumeration_key
                        .clone()
                        .unwrap_or_else(|| column.clone()),
                };
                let members = self.enumerations.get(&key).cloned().ok_or_else(|| {
                    ConfigError::UnknownEnumeration {
                        owner: def.rule_id.clone(),
                        key: key.clone(),
                    }
                })?;
                ColumnCheck::Enumeration(EnumerationCheck::new(column, key, members))
            }
            RuleType::Count => ColumnCheck::Count(CountCheck::new(self.expected_count(def)?)),
            RuleType::Checksum => ColumnCheck::Checksum(ChecksumCheck::new(
                column()?,
                def.checksum_algorithm,
                def.expected_checksum.clone(),
            )),
            RuleType::Duplicate => {
                let key_columns = if !def.key_columns.is_empty() {
                    Some(def.key_columns.clone())
                } else {
                    column().ok().map(|c| vec![c])
                };
                ColumnCheck::Duplicate(DuplicateCheck::new(key_columns))
            }
        };
        Ok(check)
    }

    /// `expected_count`, or the value of the constant `expected_count_expr`.
    /// Counts above `i64::MAX` are rejected.
    fn expected_count(&self, def: &RuleDefinition) -> Result<u64, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidRule {
            rule_id: def.rule_id.clone(),
            message,
        };
        if let Some(count) = def.expected_count {
            if count > i64::MAX as u64 {
                return Err(invalid(format!("expected_count {} is out of range", count)));
            }
            return Ok(count);
        }
        let Some(input) = &def.expected_count_expr else {
            return Err(ConfigError::MissingField {
                rule_id: def.rule_id.clone(),
                field: "expected_count",
            });
        };
        let parsed = expr::parse(input).map_err(|source| ConfigError::Expression {
            rule_id: def.rule_id.clone(),
            source,
        })?;
        match parsed.eval_constant() {
            Ok(Value::Number(n)) if n >= 0.0 && n.fract() == 0.0 && n < i64::MAX as f64 => {
                Ok(n as u64)
            }
            Ok(other) => Err(invalid(format!(
                "expected_count_expr must yield a non-negative integer, got {}",
                other
            ))),
            Err(e) => Err(invalid(format!("expected_count_expr: {}", e))),
        }
    }

    /// Parses the rule and, when its feed has templates, checks that every
    /// identifier is a declared column.
    pub fn compile_business_rule(
        &self,
        rule: BusinessRule,
    ) -> Result<CompiledBusinessRule, ConfigError> {
        let compiled = CompiledBusinessRule::compile(rule)?;
        let Some(feed) = compiled.feed() else {
            return Ok(compiled);
        };
        let declared: Vec<&str> = self
            .templates
            .keys()
            .filter(|(f, _)| f == feed)
            .map(|(_, c)| c.as_str())
            .collect();
        if declared.is_empty() {
            return Ok(compiled);
        }
        if let Some(column) = compiled.columns().into_iter().find(|c| !declared.contains(c)) {
            return Err(ConfigError::UndeclaredColumn {
                rule_id: compiled.rule_id().to_string(),
                column: column.to_string(),
                template_name: feed.to_string(),
            });
        }
        Ok(compiled)
    }
}
