//! Rule registry.
//!
//! [`RuleSet::load`] checks every cross reference of a [`RuleConfig`] and
//! compiles it into an immutable, indexed rule set. Nothing here touches
//! feed data.
use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use regex::Regex;
use tracing::{info, instrument};

use crate::{
    business::CompiledBusinessRule,
    config::{ColumnTemplate, EngineConfig, RuleConfig, RuleDefinition, RuleType},
    errors::ConfigError,
    reconciliation::CompiledReconciliation,
    rules::ColumnCheck,
};

mod compiler;


/// A `validations` entry with its validator resolved.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    definition: RuleDefinition,
    check: ColumnCheck,
}

impl CompiledRule {
    pub fn rule_id(&self) -> &str {
        &self.definition.rule_id
    }

    pub fn rule_type(&self) -> RuleType {
        self.definition.rule_type
    }

    /// Feed the rule runs on.
    pub fn feed(&self) -> &str {
        &self.definition.template_name
    }

    pub fn definition(&self) -> &RuleDefinition {
        &self.definition
    }

    pub fn check(&self) -> &ColumnCheck {
        &self.check
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    column_rules: Vec<CompiledRule>,
    by_type: HashMap<RuleType, Vec<usize>>,
    templates: HashMap<(String, String), ColumnTemplate>,
    enumerations: HashMap<String, Vec<String>>,
    patterns: HashMap<String, Regex>,
    business_rules: Vec<CompiledBusinessRule>,
    reconciliations: Vec<CompiledReconciliation>,
    engine: EngineConfig,
}

impl RuleSet {
    /// Validates and compiles a rule document.
    pub fn load(config: RuleConfig) -> Result<Self, ConfigError> {
        let RuleConfig {
            validations,
            template,
            enumerations,
            pattern,
            business_rules,
            reconciliation,
            engine,
        } = config;
        engine.validate()?;

        let enumerations = compiler::compile_enumerations(enumerations);
        let patterns = compiler::compile_patterns(pattern)?;
        let templates = compiler::index_templates(template, &enumerations)?;
        let compiler = compiler::Compiler::new(&templates, &enumerations, &patterns);

        let mut seen: HashSet<String> = HashSet::new();
        let mut claim = |rule_id: &str| {
            if seen.insert(rule_id.to_string()) {
                Ok(())
            } else {
                Err(ConfigError::DuplicateRuleId(rule_id.to_string()))
            }
        };

        let mut column_rules = Vec::with_capacity(validations.len());
        let mut by_type: HashMap<RuleType, Vec<usize>> = HashMap::new();
        for definition in validations {
            claim(&definition.rule_id)?;
            let check = compiler.compile_rule(&definition)?;
            by_type
                .entry(definition.rule_type)
                .or_default()
                .push(column_rules.len());
            column_rules.push(CompiledRule { definition, check });
        }

        let business_rules = business_rules
            .into_iter()
            .map(|rule| {
                claim(&rule.rule_id)?;
                compiler.compile_business_rule(rule)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let reconciliations = reconciliation
            .into_iter()
            .map(|rule| {
                claim(&rule.rec_id)?;
                CompiledReconciliation::compile(rule)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rule_set = Self {
            column_rules,
            by_type,
            templates,
            enumerations,
            patterns,
            business_rules,
            reconciliations,
            engine,
        };
        info!(
            validations = rule_set.column_rules.len(),
            business_rules = rule_set.business_rules.len(),
            reconciliations = rule_set.reconciliations.len(),
            templates = rule_set.templates.len(),
            "Rule set loaded"
        );
        Ok(rule_set)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Self::load(RuleConfig::from_yaml_str(content)?)
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load(RuleConfig::from_path(path)?)
    }

    /// Column rules in configuration order.
    pub fn column_rules(&self) -> &[CompiledRule] {
        &self.column_rules
    }

    pub fn rules_of_type(&self, rule_type: RuleType) -> impl Iterator<Item = &CompiledRule> {
        self.by_type
            .get(&rule_type)
            .into_iter()
            .flatten()
            .map(|&i| &self.column_rules[i])
    }

    pub fn template(&self, feed_name: &str, column_name: &str) -> Option<&ColumnTemplate> {
        self.templates
            .get(&(feed_name.to_string(), column_name.to_string()))
    }

    /// Declared columns of a feed, sorted.
    pub fn template_columns(&self, feed_name: &str) -> Vec<&str> {
        let mut columns: Vec<&str> = self
            .templates
            .keys()
            .filter(|(feed, _)| feed == feed_name)
            .map(|(_, column)| column.as_str())
            .collect();
        columns.sort_unstable();
        columns
    }

    pub fn enumeration(&self, key: &str) -> Option<&[String]> {
        self.enumerations.get(key).map(Vec::as_slice)
    }

    pub fn pattern(&self, key: &str) -> Option<&Regex> {
        self.patterns.get(key)
    }

    pub fn business_rules(&self) -> &[CompiledBusinessRule] {
        &self.business_rules
    }

    pub fn reconciliations(&self) -> &[CompiledReconciliation] {
        &self.reconciliations
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.engine
    }

    /// Number of rules of every kind.
    pub fn len(&self) -> usize {
        self.column_rules.len() + self.business_rules.len() + self.reconciliations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
