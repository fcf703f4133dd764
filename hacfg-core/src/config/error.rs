//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Settings loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    ParseError(#[from] serde_saphyr::Error),

    /// I/O error reading the settings file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// An explicitly requested settings file does not exist.
    #[error("configuration file not found (searched: {searched:?})")]
    ConfigFileNotFound { searched: Vec<PathBuf> },

    /// Empty settings file.
    #[error("configuration file is empty")]
    EmptyConfigFile,

    /// Required environment variable not set.
    #[error("environment variable '{var}' not set")]
    MissingEnvVar { var: String },

    /// `haproxy` names a section the main document does not render.
    #[error("unknown haproxy parameter group '{group}', expected 'global' or 'defaults'")]
    UnknownParamGroup { group: String },
}
