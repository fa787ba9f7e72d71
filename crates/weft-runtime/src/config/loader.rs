//! Configuration loader with layered merging.
//!
//! # Load order
//!
//! 1. Defaults
//! 2. Config file (if set via [`ConfigLoader::with_config_file`])
//! 3. `WEFT_*` environment variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `WEFT_RESOLUTION_POLICY` | `resolution.policy` |
//! | `WEFT_GC_AUTO_COLLECT` | `gc.auto_collect` |

use super::{ConfigError, EngineConfig};
use crate::binding::SelectionPolicy;
use std::path::{Path, PathBuf};
use tracing::debug;

macro_rules! parse_env_bool {
    ($field:expr, $var:literal) => {
        if let Ok(val) = std::env::var($var) {
            $field = parse_bool(&val)
                .ok_or_else(|| ConfigError::invalid_env_var($var, "expected bool"))?;
        }
    };
}

/// Loads [`EngineConfig`] from file and environment.
///
/// # Example
///
/// ```
/// use weft_runtime::ConfigLoader;
///
/// let config = ConfigLoader::new().skip_env_vars().load().unwrap();
/// assert!(!config.gc.auto_collect);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_file: Option<PathBuf>,
    skip_env: bool,
}

impl ConfigLoader {
    /// Creates a loader that reads only defaults and environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_file: None,
            skip_env: false,
        }
    }

    /// Adds a TOML config file layer.
    #[must_use]
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Skips environment variables. Useful in tests.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Loads and merges configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file exists but cannot be
    /// read or parsed, or an environment variable is malformed. A missing
    /// config file is silently ignored.
    pub fn load(&self) -> Result<EngineConfig, ConfigError> {
        let mut config = EngineConfig::default();

        if let Some(ref path) = self.config_file {
            if let Some(file_config) = self.load_file(path)? {
                debug!(path = %path.display(), "Loaded engine config");
                config.merge(&file_config);
            }
        }

        if !self.skip_env {
            self.apply_env_vars(&mut config)?;
        }

        Ok(config)
    }

    /// Loads a config file, returning None if it doesn't exist.
    fn load_file(&self, path: &Path) -> Result<Option<EngineConfig>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

        let config =
            EngineConfig::from_toml(&content).map_err(|e| ConfigError::parse_toml(path, e))?;

        Ok(Some(config))
    }

    fn apply_env_vars(&self, config: &mut EngineConfig) -> Result<(), ConfigError> {
        parse_env_bool!(config.gc.auto_collect, "WEFT_GC_AUTO_COLLECT");

        if let Ok(val) = std::env::var("WEFT_RESOLUTION_POLICY") {
            config.resolution.policy = val
                .parse::<SelectionPolicy>()
                .map_err(|e| ConfigError::invalid_env_var("WEFT_RESOLUTION_POLICY", e))?;
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a boolean from string.
///
/// Accepts: "true", "false", "1", "0", "yes", "no", "on", "off"
/// (case-insensitive).
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
