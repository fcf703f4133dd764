//! Error types for workspace provisioning and config materialization.
//!
//! None of these are retried internally. A caller that wants another attempt
//! provisions a fresh workspace; the failed one is still removed at shutdown
//! because its cleanup obligation was registered when the directory was
//! created.

use std::path::PathBuf;

use crate::render::TemplateError;

/// Failure while provisioning a workspace or writing its documents.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// The workspace directory could not be created or secured.
    #[error("failed to provision workspace under {}: {source}", base_dir.display())]
    Provisioning {
        /// Directory the workspace was requested under.
        base_dir: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },

    /// No tokio runtime is available to host the cleanup task.
    #[error("no async runtime available to host the workspace cleanup task")]
    RuntimeUnavailable,

    /// The main document skeleton could not be rendered.
    #[error("failed to render configuration: {0}")]
    Template(#[from] TemplateError),

    /// A configuration document could not be opened or written.
    #[error("failed to write {}: {source}", path.display())]
    Materialization {
        /// The document being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The secure random source could not produce a password.
    #[error("failed to generate control-plane credentials: {reason}")]
    Credentials {
        /// Human-readable description of the entropy failure.
        reason: String,
    },
}
