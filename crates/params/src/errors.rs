//! Errors for the bridge parameters.

use thiserror::Error;

/// Error while loading or validating the bridge configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid TOML or does not match the expected schema.
    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside of its allowed range.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// The offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}
