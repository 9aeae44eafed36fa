//! Parser Configuration
//!
//! Limits and labels for one parse. Configuration can be set
//! programmatically, read from environment variables, or loaded from the
//! `[parser]` table of a TOML file.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `TOVA_MAX_ERRORS` | Errors collected before the parse is truncated | 50 |
//! | `TOVA_MAX_DEPTH` | Maximum expression/statement nesting depth | 64 |
//!
//! # Example
//!
//! ```rust
//! use tovac::config::ParserConfig;
//!
//! let config = ParserConfig::builder()
//!     .file("app.tova")
//!     .max_errors(10)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.max_depth, 64);
//! ```

use std::env;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

/// Default cap on collected errors.
pub const DEFAULT_MAX_ERRORS: usize = 50;
/// Default maximum nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Configuration for one parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// File name attached to the program and every error.
    pub file: Arc<str>,
    /// Number of errors collected before parsing stops and the result is
    /// flagged as truncated.
    pub max_errors: usize,
    /// Maximum nesting depth of expressions and blocks.
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            file: Arc::from("<input>"),
            max_errors: DEFAULT_MAX_ERRORS,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// The `[parser]` table of a configuration file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParserSection {
    file: Option<String>,
    max_errors: Option<usize>,
    max_depth: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    parser: ParserSection,
}

impl ParserConfig {
    /// Create a new builder for ParserConfig.
    pub fn builder() -> ParserConfigBuilder {
        ParserConfigBuilder::new()
    }

    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their default values.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(val) = parse_env_usize("TOVA_MAX_ERRORS") {
            if val > 0 {
                config.max_errors = val;
            }
        }

        if let Some(val) = parse_env_usize("TOVA_MAX_DEPTH") {
            if val > 0 {
                config.max_depth = val;
            }
        }

        config
    }

    /// Load configuration from TOML text, starting from the defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let parsed: ConfigFile = toml::from_str(text)?;
        let mut config = Self::default();
        if let Some(file) = parsed.parser.file {
            config.file = Arc::from(file);
        }
        if let Some(max_errors) = parsed.parser.max_errors {
            config.max_errors = max_errors;
        }
        if let Some(max_depth) = parsed.parser.max_depth {
            config.max_depth = max_depth;
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_errors == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_errors".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_depth".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("invalid configuration for '{field}': {message}")]
    InvalidValue { field: String, message: String },
    /// Malformed configuration file.
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Builder for ParserConfig.
#[derive(Debug, Clone, Default)]
pub struct ParserConfigBuilder {
    config: ParserConfig,
}

impl ParserConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file name reported in locations.
    pub fn file(mut self, file: impl AsRef<str>) -> Self {
        self.config.file = Arc::from(file.as_ref());
        self
    }

    /// Set the error cap.
    pub fn max_errors(mut self, n: usize) -> Self {
        self.config.max_errors = n;
        self
    }

    /// Set the maximum nesting depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Build the configuration.
    ///
    /// This validates the configuration and returns an error if invalid.
    pub fn build(self) -> Result<ParserConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Parse an environment variable as usize.
fn parse_env_usize(name: &str) -> Option<usize> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
