//! Private, self-cleaning workspace directories.
//!
//! A [`Workspace`] is one running proxy instance's directory: its generated
//! configuration documents and the sockets HAProxy, the SPOE agent, the Data
//! Plane API and the log forwarder bind to. The directory is created with an
//! unpredictable name and owner-only permissions, and a background task
//! removes it once the [`ShutdownCoordinator`] signals stop.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ProvisionError;
use crate::lifecycle::{CleanupObligation, ShutdownCoordinator};

/// Name prefix of every workspace directory.
pub const WORKSPACE_PREFIX: &str = "haproxy-connect-";

/// Main HAProxy configuration document.
pub const HAPROXY_CONF: &str = "haproxy.conf";
/// SPOE agent configuration document.
pub const SPOE_CONF: &str = "spoe.conf";
/// SPOE agent socket.
pub const SPOE_SOCK: &str = "spoe.sock";
/// HAProxy management (stats) socket.
pub const STATS_SOCK: &str = "haproxy.sock";
/// Data Plane API socket.
pub const DATAPLANE_SOCK: &str = "dataplane.sock";
/// Data Plane API transaction staging directory.
pub const DATAPLANE_TRANSACTIONS: &str = "dataplane-transactions";
/// Log forwarding socket.
pub const LOGS_SOCK: &str = "logs.sock";

/// An exclusively-owned workspace directory and its derived paths.
///
/// Every path is fixed at provisioning time. The transaction directory is
/// only named here; the control-plane process creates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workspace {
    base: PathBuf,
    haproxy_conf: PathBuf,
    spoe_conf: PathBuf,
    spoe_sock: PathBuf,
    stats_sock: PathBuf,
    dataplane_sock: PathBuf,
    dataplane_transaction_dir: PathBuf,
    logs_sock: PathBuf,
}

impl Workspace {
    /// Create a new workspace directory under `base_dir`.
    ///
    /// The cleanup obligation is registered with `shutdown` before the
    /// directory exists and handed to a background task as soon as it does,
    /// so later failures (in materialization, say) still leave the directory
    /// scheduled for removal.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`ProvisionError::RuntimeUnavailable`] outside a tokio runtime.
    /// - [`ProvisionError::Provisioning`] if the directory cannot be created
    ///   or its permissions restricted.
    pub fn provision(
        base_dir: &Path,
        shutdown: &ShutdownCoordinator,
    ) -> Result<Self, ProvisionError> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(ProvisionError::RuntimeUnavailable);
        }

        let obligation = shutdown.register();

        let base = match create_private_dir(base_dir) {
            Ok(base) => base,
            // obligation dropped here, released without a task
            Err(source) => {
                return Err(ProvisionError::Provisioning {
                    base_dir: base_dir.to_path_buf(),
                    source,
                });
            }
        };

        spawn_cleanup(shutdown, obligation, base.clone());

        let workspace = Self::at(base);
        info!(workspace = %workspace.base.display(), "Workspace provisioned");
        Ok(workspace)
    }

    /// Derive every artifact path under `base`.
    fn at(base: PathBuf) -> Self {
        Self {
            haproxy_conf: base.join(HAPROXY_CONF),
            spoe_conf: base.join(SPOE_CONF),
            spoe_sock: base.join(SPOE_SOCK),
            stats_sock: base.join(STATS_SOCK),
            dataplane_sock: base.join(DATAPLANE_SOCK),
            dataplane_transaction_dir: base.join(DATAPLANE_TRANSACTIONS),
            logs_sock: base.join(LOGS_SOCK),
            base,
        }
    }

    /// The workspace directory.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Main HAProxy configuration document.
    #[must_use]
    pub fn haproxy_conf(&self) -> &Path {
        &self.haproxy_conf
    }

    /// SPOE agent configuration document.
    #[must_use]
    pub fn spoe_conf(&self) -> &Path {
        &self.spoe_conf
    }

    /// SPOE agent socket.
    #[must_use]
    pub fn spoe_sock(&self) -> &Path {
        &self.spoe_sock
    }

    /// HAProxy management socket.
    #[must_use]
    pub fn stats_sock(&self) -> &Path {
        &self.stats_sock
    }

    /// Data Plane API socket.
    #[must_use]
    pub fn dataplane_sock(&self) -> &Path {
        &self.dataplane_sock
    }

    /// Data Plane API transaction staging directory (not created here).
    #[must_use]
    pub fn dataplane_transaction_dir(&self) -> &Path {
        &self.dataplane_transaction_dir
    }

    /// Log forwarding socket.
    #[must_use]
    pub fn logs_sock(&self) -> &Path {
        &self.logs_sock
    }
}

/// Create an unpredictably named directory readable only by its owner.
fn create_private_dir(base_dir: &Path) -> std::io::Result<PathBuf> {
    let dir = tempfile::Builder::new()
        .prefix(WORKSPACE_PREFIX)
        .tempdir_in(base_dir)?
        .keep();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700)) {
            // Never hand out a directory we could not lock down.
            let _ = std::fs::remove_dir_all(&dir);
            return Err(e);
        }
    }

    Ok(dir)
}

fn spawn_cleanup(shutdown: &ShutdownCoordinator, obligation: CleanupObligation, base: PathBuf) {
    let stop = shutdown.stop_token();
    shutdown.spawn_with(obligation, remove_on_stop(base, stop));
}

/// Block until `stop` fires, then remove `base` and everything under it.
///
/// A directory that is already gone counts as cleaned.
async fn remove_on_stop(base: PathBuf, stop: CancellationToken) {
    stop.cancelled().await;
    info!(workspace = %base.display(), "Cleaning workspace");

    match tokio::fs::remove_dir_all(&base).await {
        Ok(()) => debug!(workspace = %base.display(), "Workspace removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(workspace = %base.display(), "Workspace already removed");
        }
        Err(e) => {
            warn!(workspace = %base.display(), error = %e, "Failed to remove workspace");
        }
    }
}
