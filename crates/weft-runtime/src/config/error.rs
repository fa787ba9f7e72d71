//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;
use weft_types::ErrorCode;

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config file '{path}': {source}")]
    ParseToml {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Failed to serialize config.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Invalid environment variable value.
    #[error("invalid value for environment variable '{name}': {message}")]
    InvalidEnvVar {
        /// Variable name.
        name: String,
        /// What was wrong with it.
        message: String,
    },
}

impl ConfigError {
    /// Creates a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse TOML error.
    pub fn parse_toml(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::ParseToml {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid env var error.
    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::ReadFile { .. } => "CONFIG_READ_FILE",
            Self::ParseToml { .. } => "CONFIG_PARSE_TOML",
            Self::Serialize(_) => "CONFIG_SERIALIZE",
            Self::InvalidEnvVar { .. } => "CONFIG_INVALID_ENV_VAR",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_types::assert_error_codes;

    fn all_variants() -> Vec<ConfigError> {
        let parse = toml::from_str::<toml::Value>("=").err();
        let mut variants = vec![
            ConfigError::read_file(
                "/x",
                std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            ),
            ConfigError::invalid_env_var("WEFT_X", "bad"),
        ];
        if let Some(source) = parse {
            variants.push(ConfigError::parse_toml("/x", source));
        }
        variants
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(&all_variants(), "CONFIG_");
    }

    #[test]
    fn env_var_message() {
        let err = ConfigError::invalid_env_var("WEFT_GC_AUTO_COLLECT", "expected bool");
        assert_eq!(
            err.to_string(),
            "invalid value for environment variable 'WEFT_GC_AUTO_COLLECT': expected bool"
        );
    }
}
