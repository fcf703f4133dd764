//! Errors surfaced by the `hacfg` commands.

use hacfg_core::ProvisionError;
use hacfg_core::config::ConfigError;
use hacfg_core::params::ParamError;

/// Any failure that ends a `hacfg` command with a non-zero exit code.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Settings file could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A `--haproxy-param` flag could not be parsed.
    #[error("{0}")]
    Param(#[from] ParamError),

    /// Workspace provisioning or materialization failed.
    #[error("{0}")]
    Provision(#[from] ProvisionError),

    /// Output could not be encoded.
    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),

    /// Command output could not be written.
    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),

    /// Listening for termination signals failed.
    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}
