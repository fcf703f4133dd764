//! Settings file schema.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::params::ParameterSet;

/// Shutdown timeout when neither file nor environment sets one.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Root settings structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Directory workspaces are created under (default: OS temp dir).
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    /// Upper bound on waiting for workspace cleanup at shutdown.
    #[serde(default)]
    pub shutdown_timeout_secs: Option<u64>,

    /// HAProxy directive overrides, merged on top of the built-in defaults.
    #[serde(default)]
    pub haproxy: ParameterSet,
}

impl Settings {
    /// Effective workspace base directory.
    #[must_use]
    pub fn base_dir(&self) -> PathBuf {
        self.base_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Effective shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT)
    }
}
