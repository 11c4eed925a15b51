//! Pipeline configuration
//!
//! Built once and handed to the pipeline constructor. Every option has a
//! default, so an empty TOML document is a valid configuration.

use crate::error::ConfigError;
use crate::stage_name::StageName;
use argus_stages::stages::DEFAULT_ANALYZERS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Executor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Minimum gate score for finalization
    pub gate_threshold: f64,
    /// Revision ceiling: feedback iterations allowed before a forced exit
    pub max_revisions: u32,
    /// Stages the run pauses before
    pub interrupt_before: Vec<StageName>,
    /// Maximum analyzers running at once
    pub analyzer_concurrency: usize,
    /// Analyzers run when the plan selects none
    pub default_analyzers: Vec<String>,
    /// Directory for file checkpoints; in-memory when unset
    pub checkpoint_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            gate_threshold: 0.75,
            max_revisions: 3,
            interrupt_before: vec![StageName::Finalize],
            analyzer_concurrency: 8,
            default_analyzers: DEFAULT_ANALYZERS.iter().map(|s| (*s).to_string()).collect(),
            checkpoint_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.gate_threshold) {
            return Err(ConfigError::InvalidThreshold(self.gate_threshold));
        }
        if self.analyzer_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }

    /// Whether the run pauses before `stage`
    #[inline]
    #[must_use]
    pub fn interrupts_before(&self, stage: StageName) -> bool {
        self.interrupt_before.contains(&stage)
    }

    /// Set the gate threshold
    #[must_use]
    pub fn with_gate_threshold(mut self, threshold: f64) -> Self {
        self.gate_threshold = threshold;
        self
    }

    /// Set the revision ceiling
    #[must_use]
    pub fn with_max_revisions(mut self, max_revisions: u32) -> Self {
        self.max_revisions = max_revisions;
        self
    }

    /// Replace the interrupt set
    #[must_use]
    pub fn with_interrupt_before(mut self, stages: impl IntoIterator<Item = StageName>) -> Self {
        self.interrupt_before = stages.into_iter().collect();
        self
    }

    /// Run straight through without pausing
    #[must_use]
    pub fn without_interrupts(mut self) -> Self {
        self.interrupt_before.clear();
        self
    }

    /// Set the analyzer concurrency limit
    #[must_use]
    pub fn with_analyzer_concurrency(mut self, concurrency: usize) -> Self {
        self.analyzer_concurrency = concurrency;
        self
    }

    /// Replace the fallback analyzers
    #[must_use]
    pub fn with_default_analyzers<I, S>(mut self, analyzers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_analyzers = analyzers.into_iter().map(Into::into).collect();
        self
    }

    /// Persist checkpoints as files under `dir`
    #[must_use]
    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_yields_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.gate_threshold, 0.75);
        assert_eq!(config.max_revisions, 3);
        assert!(config.interrupts_before(StageName::Finalize));
        assert_eq!(
            config.default_analyzers,
            vec!["transaction_fraud", "country_risk", "account_health"]
        );
        assert!(config.checkpoint_dir.is_none());
    }

    #[test]
    fn toml_overrides_selected_options() {
        let config = PipelineConfig::from_toml_str(
            r#"
            gate_threshold = 0.9
            max_revisions = 1
            interrupt_before = ["draft", "finalize"]
            checkpoint_dir = "/var/lib/argus"
            "#,
        )
        .unwrap();
        assert_eq!(config.gate_threshold, 0.9);
        assert_eq!(config.max_revisions, 1);
        assert_eq!(
            config.interrupt_before,
            vec![StageName::Draft, StageName::Finalize]
        );
        assert_eq!(config.analyzer_concurrency, 8);
        assert_eq!(config.checkpoint_dir, Some(PathBuf::from("/var/lib/argus")));
    }

    #[test]
    fn unknown_stage_and_keys_are_parse_errors() {
        let err = PipelineConfig::from_toml_str(r#"interrupt_before = ["publish"]"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let err = PipelineConfig::from_toml_str("retries = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn out_of_range_values_fail_validation() {
        let err = PipelineConfig::default()
            .with_gate_threshold(1.5)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold(t) if t == 1.5));

        let err = PipelineConfig::default()
            .with_analyzer_concurrency(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroConcurrency));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = PipelineConfig::from_file("/nonexistent/argus.toml").unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn builders_compose() {
        let config = PipelineConfig::default()
            .without_interrupts()
            .with_max_revisions(0)
            .with_default_analyzers(["geo_anomaly"])
            .with_checkpoint_dir("/tmp/runs");
        assert!(config.interrupt_before.is_empty());
        assert_eq!(config.max_revisions, 0);
        assert_eq!(config.default_analyzers, vec!["geo_anomaly"]);
        assert!(config.validate().is_ok());
    }
}
