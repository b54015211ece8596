use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::values::{DimensionValue, ScalarValue};

/// Column-level rule types of the `validations` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum RuleType {
    Mandatory,
    Range,
    Pattern,
    Enumeration,
    Type,
    Unique,
    Count,
    Checksum,
    Duplicate,
}

impl RuleType {
    pub const ALL: [RuleType; 9] = [
        RuleType::Mandatory,
        RuleType::Range,
        RuleType::Pattern,
        RuleType::Enumeration,
        RuleType::Type,
        RuleType::Unique,
        RuleType::Count,
        RuleType::Checksum,
        RuleType::Duplicate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Mandatory => "Mandatory",
            RuleType::Range => "Range",
            RuleType::Pattern => "Pattern",
            RuleType::Enumeration => "Enumeration",
            RuleType::Type => "Type",
            RuleType::Unique => "Unique",
            RuleType::Count => "Count",
            RuleType::Checksum => "Checksum",
            RuleType::Duplicate => "Duplicate",
        }
    }

    /// Name reported in `ValidationResult::validation_type`.
    pub fn validation_type(&self) -> &'static str {
        match self {
            RuleType::Mandatory => "mandatory_check",
            RuleType::Range => "range_check",
            RuleType::Pattern => "pattern_check",
            RuleType::Enumeration => "enumeration_check",
            RuleType::Type => "type_check",
            RuleType::Unique => "unique_check",
            RuleType::Count => "count_check",
            RuleType::Checksum => "checksum_check",
            RuleType::Duplicate => "duplicate_check",
        }
    }

    /// Whether the rule needs a `column_name` to run.
    pub fn requires_column(&self) -> bool {
        !matches!(self, RuleType::Count | RuleType::Duplicate)
    }
}

impl TryFrom<String> for RuleType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let lowered = value.trim().to_ascii_lowercase();
        let name = lowered.strip_suffix("_check").unwrap_or(&lowered);
        RuleType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| format!("unknown rule_type '{}'", value))
    }
}

impl From<RuleType> for String {
    fn from(value: RuleType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    #[default]
    Sum,
    Xxh3,
}

/// One entry of the `validations` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RuleDefinition {
    pub rule_id: String,
    /// Feed the rule runs on, also the template group of its column.
    pub template_name: String,
    #[serde(default)]
    pub column_name: Option<String>,
    pub rule_type: RuleType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub pattern_key: Option<String>,
    #[serde(default)]
    pub enumeration_key: Option<String>,
    #[serde(default)]
    pub key_columns: Vec<String>,
    #[serde(default)]
    pub expected_count: Option<u64>,
    #[serde(default)]
    pub expected_count_expr: Option<String>,
    #[serde(default)]
    pub expected_checksum: Option<ScalarValue>,
    #[serde(default)]
    pub checksum_algorithm: ChecksumAlgorithm,
}

impl RuleDefinition {
    pub fn new(
        rule_id: impl Into<String>,
        template_name: impl Into<String>,
        column_name: Option<&str>,
        rule_type: RuleType,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            template_name: template_name.into(),
            column_name: column_name.map(str::to_string),
            rule_type,
            description: None,
            pattern_key: None,
            enumeration_key: None,
            key_columns: Vec::new(),
            expected_count: None,
            expected_count_expr: None,
            expected_checksum: None,
            checksum_algorithm: ChecksumAlgorithm::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    #[serde(alias = "str", alias = "text", alias = "varchar")]
    String,
    #[serde(alias = "int", alias = "bigint")]
    Integer,
    #[serde(alias = "double", alias = "decimal", alias = "numeric")]
    Float,
    #[serde(alias = "bool")]
    Boolean,
    Date,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Boolean => "boolean",
            ValueType::Date => "date",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeScope {
    #[default]
    Inclusive,
    Exclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RangeSpec {
    pub bottom: f64,
    pub top: f64,
    #[serde(default)]
    pub scope: RangeScope,
}

impl RangeSpec {
    pub fn contains(&self, value: f64) -> bool {
        match self.scope {
            RangeScope::Inclusive => self.bottom <= value && value <= self.top,
            RangeScope::Exclusive => self.bottom < value && value < self.top,
        }
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            RangeScope::Inclusive => write!(f, "[{}, {}]", self.bottom, self.top),
            RangeScope::Exclusive => write!(f, "({}, {})", self.bottom, self.top),
        }
    }
}

/// Column metadata of a feed, one entry of the `template` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ColumnTemplate {
    pub feed_name: String,
    pub column_name: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub type_name: ValueType,
    #[serde(default)]
    pub mandatory: Option<bool>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub range: Option<RangeSpec>,
    #[serde(default)]
    pub enumeration_key: Option<String>,
}

impl ColumnTemplate {
    pub fn is_mandatory(&self) -> bool {
        self.mandatory.unwrap_or(false)
    }

    /// The template states `mandatory: false`.
    pub fn is_explicitly_optional(&self) -> bool {
        self.mandatory == Some(false)
    }
}

/// One entry of the `business_rules` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BusinessRule {
    pub rule_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub condition: Option<String>,
    pub validation: String,
    #[serde(default)]
    pub group_by: Vec<String>,
    /// Feed the rule runs on; the catalog's default feed when absent.
    #[serde(default)]
    pub template_name: Option<String>,
}

/// One entry of the `reconciliation` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReconciliationRule {
    pub rec_id: String,
    pub source_feed: String,
    pub target_feed: String,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub dimension_values: Vec<DimensionValue>,
    pub measure_field: String,
    #[serde(default)]
    pub tolerance: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_type_spellings() {
        for raw in ["Range", "range", "RANGE", "range_check", "Range_Check"] {
            assert_eq!(RuleType::try_from(raw.to_string()).unwrap(), RuleType::Range);
        }
        assert!(RuleType::try_from("ranged".to_string()).is_err());
    }

    #[test]
    fn test_range_scope() {
        let inclusive = RangeSpec {
            bottom: 0.0,
            top: 120.0,
            scope: RangeScope::Inclusive,
        };
        assert!(inclusive.contains(0.0));
        assert!(inclusive.contains(120.0));
        assert!(!inclusive.contains(-1.0));

        let exclusive = RangeSpec {
            scope: RangeScope::Exclusive,
            ..inclusive
        };
        assert!(!exclusive.contains(0.0));
        assert!(exclusive.contains(60.0));
        assert_eq!(exclusive.to_string(), "(0, 120)");
    }

    #[test]
    fn test_template_optionality() {
        let yaml = "feed_name: f\ncolumn_name: c\ntype_name: int\nmandatory: false\n";
        let template: ColumnTemplate = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(template.type_name, ValueType::Integer);
        assert!(template.is_explicitly_optional());
        assert!(!template.is_mandatory());

        let yaml = "feed_name: f\ncolumn_name: c\n";
        let template: ColumnTemplate = serde_yaml::from_str(yaml).unwrap();
        assert!(!template.is_explicitly_optional());
        assert_eq!(template.type_name, ValueType::String);
    }
}
