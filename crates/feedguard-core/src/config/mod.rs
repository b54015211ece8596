//! Serde model of the YAML rule document.
//!
//! These types mirror the document as written. Cross references are only
//! checked when the registry compiles a [`RuleConfig`] into a `RuleSet`.
use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::ConfigError;

mod engine;
mod rules;
mod values;

pub use engine::{EngineConfig, DEFAULT_SAMPLE_SIZE};
pub use rules::{
    BusinessRule, ChecksumAlgorithm, ColumnTemplate, RangeScope, RangeSpec, ReconciliationRule,
    RuleDefinition, RuleType, ValueType,
};
pub use values::{DimensionValue, ScalarValue};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RuleConfig {
    pub validations: Vec<RuleDefinition>,
    pub template: Vec<ColumnTemplate>,
    pub enumerations: BTreeMap<String, Vec<ScalarValue>>,
    pub pattern: BTreeMap<String, String>,
    pub business_rules: Vec<BusinessRule>,
    pub reconciliation: Vec<ReconciliationRule>,
    pub engine: EngineConfig,
}

impl RuleConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml_str(&content)?;
        debug!(
            validations = config.validations.len(),
            templates = config.template.len(),
            "Parsed rule document"
        );
        Ok(config)
    }
}
