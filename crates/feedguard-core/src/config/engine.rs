use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

pub const DEFAULT_SAMPLE_SIZE: usize = 10;

/// Execution settings, read from the optional `engine` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads. `None` uses rayon's global pool.
    pub parallelism: Option<usize>,
    pub rule_timeout_ms: Option<u64>,
    pub sample_size: usize,
    /// Default reconciliation tolerance.
    pub tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallelism: None,
            rule_timeout_ms: None,
            sample_size: DEFAULT_SAMPLE_SIZE,
            tolerance: 0.0,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }

    pub fn with_rule_timeout(mut self, timeout: Duration) -> Self {
        self.rule_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn rule_timeout(&self) -> Option<Duration> {
        self.rule_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return Err(ConfigError::InvalidEngine(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .with_parallelism(2)
            .with_rule_timeout(Duration::from_millis(250))
            .with_sample_size(5)
            .with_tolerance(0.5);
        assert_eq!(config.parallelism, Some(2));
        assert_eq!(config.rule_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.sample_size, 5);
        assert_eq!(config.tolerance, 0.5);
    }

    #[test]
    fn test_validate() {
        assert!(EngineConfig::new().with_tolerance(2.5).validate().is_ok());
        assert!(matches!(
            EngineConfig::new().with_tolerance(-1.0).validate(),
            Err(ConfigError::InvalidEngine(_))
        ));
        assert!(EngineConfig::new().with_tolerance(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: EngineConfig = serde_yaml::from_str("rule_timeout_ms: 100").unwrap();
        assert_eq!(config.sample_size, DEFAULT_SAMPLE_SIZE);
        assert_eq!(config.rule_timeout(), Some(Duration::from_millis(100)));
        assert!(config.parallelism.is_none());
    }
}
