//! CLI configuration management
//!
//! One TOML file carries both the CLI preferences (`output_format`, `backend`,
//! `verbose`) and the [`SmcConfig`] sections shared with the libraries.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use smcfan_core::SmcConfig;
use std::path::Path;
use std::str::FromStr;

use crate::backend::Backend;

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CliConfig {
    /// Default output format
    pub output_format: String,

    /// Port access backend: `dev-port`, `raw` or `simulated`
    pub backend: String,

    /// Enable verbose logging by default
    pub verbose: bool,

    /// Protocol timing, fan, sensor and control-loop settings
    #[serde(flatten)]
    pub smc: SmcConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            output_format: "table".to_string(),
            backend: Backend::DevPort.as_str().to_string(),
            verbose: false,
            smc: SmcConfig::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parse and validate a configuration document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.smc.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize CLI config")
    }

    /// Selected backend
    pub fn backend(&self) -> Result<Backend> {
        Backend::from_str(&self.backend)
    }

    /// Create a new builder for constructing configuration
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for CLI configuration with validation and priority chain support
///
/// Priority chain (lowest to highest):
/// 1. Defaults
/// 2. Config file
/// 3. Environment variables
/// 4. CLI arguments
///
/// Setters are applied highest priority first in practice: a value that is
/// already set is never replaced by a lower layer.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    output_format: Option<String>,
    backend: Option<String>,
    verbose: Option<bool>,
    smc: Option<SmcConfig>,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set output format (with validation)
    pub fn with_output_format(mut self, format: impl Into<String>) -> Result<Self> {
        let format = format.into();
        Self::validate_output_format(&format)?;
        self.output_format = Some(format);
        Ok(self)
    }

    /// Set backend (with validation)
    pub fn with_backend(mut self, backend: impl Into<String>) -> Result<Self> {
        let backend = backend.into();
        Backend::from_str(&backend)?;
        self.backend = Some(backend);
        Ok(self)
    }

    /// Set verbose flag
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Load configuration from `path`
    ///
    /// A missing file is skipped unless `required` is set; a file that exists
    /// but does not parse is always an error.
    pub fn with_config_file(self, path: &Path, required: bool) -> Result<Self> {
        if !required && !path.exists() {
            return Ok(self);
        }

        let config = CliConfig::load(path)?;
        Self::validate_output_format(&config.output_format)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config
            .backend()
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        // Only use file values if they weren't already set (preserving priority)
        Ok(Self {
            output_format: self.output_format.or(Some(config.output_format)),
            backend: self.backend.or(Some(config.backend)),
            verbose: self.verbose.or(Some(config.verbose)),
            smc: self.smc.or(Some(config.smc)),
        })
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(mut self) -> Self {
        // Only apply env vars if values weren't already set (preserving priority)
        if self.output_format.is_none() {
            if let Ok(format) = std::env::var("SMCFAN_FORMAT") {
                if Self::validate_output_format(&format).is_ok() {
                    self.output_format = Some(format);
                }
            }
        }

        if self.backend.is_none() {
            if let Ok(backend) = std::env::var("SMCFAN_BACKEND") {
                if Backend::from_str(&backend).is_ok() {
                    self.backend = Some(backend);
                }
            }
        }

        if self.verbose.is_none() {
            if let Ok(verbose) = std::env::var("SMCFAN_VERBOSE") {
                self.verbose = Some(verbose.to_lowercase() == "true" || verbose == "1");
            }
        }

        self
    }

    /// Build the final configuration with validation
    pub fn build(self) -> Result<CliConfig> {
        let defaults = CliConfig::default();

        let output_format = self.output_format.unwrap_or(defaults.output_format);
        let backend = self.backend.unwrap_or(defaults.backend);
        let smc = self.smc.unwrap_or(defaults.smc);

        Self::validate_output_format(&output_format)?;
        Backend::from_str(&backend)?;
        smc.validate()?;

        Ok(CliConfig {
            output_format,
            backend,
            verbose: self.verbose.unwrap_or(defaults.verbose),
            smc,
        })
    }

    /// Validate output format
    fn validate_output_format(format: &str) -> Result<()> {
        match format {
            "table" | "json" => Ok(()),
            _ => Err(anyhow::anyhow!(
                "Invalid output format '{}'. Must be 'table' or 'json'",
                format
            )),
        }
    }
}
