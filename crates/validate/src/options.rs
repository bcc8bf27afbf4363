use crate::error::{Result, ValidateError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use wiring_graph::ForestOptions;

/// Knobs of the validation pass, usually read from a `wiring.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationOptions {
    /// Report mandatory warnings as errors
    pub strict_mode: bool,

    /// Encounter paths listed per diagnostic; the rest are counted
    pub max_issue_encounter_paths: usize,

    /// Sort lists by element dependencies unless `@DeclareList` says otherwise
    pub order_lists_by_default: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            strict_mode: false,
            max_issue_encounter_paths: 5,
            order_lists_by_default: true,
        }
    }
}

impl ValidationOptions {
    /// Load and validate options from a TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read validation options {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Failed to load validation options {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let options: Self = toml::from_str(text).context("Invalid TOML")?;
        options.validate()?;
        Ok(options)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_issue_encounter_paths == 0 {
            return Err(ValidateError::InvalidOptions(
                "max_issue_encounter_paths must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Options for the graph forest the pass runs on
    pub fn forest_options(&self) -> ForestOptions {
        ForestOptions {
            order_lists_by_default: self.order_lists_by_default,
        }
    }
}
