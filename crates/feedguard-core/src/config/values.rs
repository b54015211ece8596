use std::{collections::BTreeSet, fmt};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static PAREN_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\((.*)\)\s*$").expect("static regex is valid"));

/// A literal value written in the rule document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ScalarValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Int(v) => Some(*v as f64),
            ScalarValue::Float(v) => Some(*v),
            ScalarValue::Str(s) => s.trim().parse().ok(),
            ScalarValue::Bool(_) => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(v) => write!(f, "{v}"),
            ScalarValue::Int(v) => write!(f, "{v}"),
            ScalarValue::Float(v) => write!(f, "{v}"),
            ScalarValue::Str(s) => f.write_str(s),
        }
    }
}

/// Allowed values for one reconciliation dimension.
///
/// A single literal, a YAML list, or a string such as `"('IND','CHN')"`
/// meaning any of the listed values.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DimensionValue {
    Many(Vec<ScalarValue>),
    One(ScalarValue),
}

impl DimensionValue {
    /// Rendered values a dimension cell must match.
    pub fn allowed(&self) -> BTreeSet<String> {
        match self {
            DimensionValue::Many(values) => values.iter().map(|v| v.to_string()).collect(),
            DimensionValue::One(ScalarValue::Str(s)) => match PAREN_LIST.captures(s) {
                Some(caps) => caps[1]
                    .split(',')
                    .map(|item| unquote(item.trim()).to_string())
                    .filter(|item| !item.is_empty())
                    .collect(),
                None => BTreeSet::from([s.clone()]),
            },
            DimensionValue::One(value) => BTreeSet::from([value.to_string()]),
        }
    }
}

fn unquote(item: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = item
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    item
}
