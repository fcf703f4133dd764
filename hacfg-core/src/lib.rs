//! hacfg core: dynamic HAProxy sidecar configuration.
//!
//! Provisions a private workspace directory, renders the HAProxy and SPOE
//! configuration documents into it with freshly generated Data Plane API
//! credentials, and removes the whole directory when the process shuts down.
//!
//! ```no_run
//! # async fn demo() -> Result<(), hacfg_core::ProvisionError> {
//! use hacfg_core::{ParameterSet, ShutdownCoordinator, provision_config};
//!
//! let shutdown = ShutdownCoordinator::new();
//! let overrides = ParameterSet::from_flags(["global.maxconn=5000"]).expect("valid flag");
//! let rendered = provision_config(&std::env::temp_dir(), &overrides, &shutdown)?;
//! println!("haproxy -f {}", rendered.workspace().haproxy_conf().display());
//!
//! shutdown.begin_shutdown();
//! shutdown.wait().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod credentials;
pub mod error;
pub mod lifecycle;
pub mod materialize;
pub mod params;
pub mod render;
pub mod workspace;

use std::path::Path;

use serde::Serialize;

pub use credentials::Credentials;
pub use error::ProvisionError;
pub use lifecycle::{DrainResult, ShutdownCoordinator};
pub use materialize::materialize;
pub use params::ParameterSet;
pub use workspace::Workspace;

/// Everything a supervisor needs to start HAProxy and talk to its Data
/// Plane API.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedConfig {
    workspace: Workspace,
    credentials: Credentials,
}

impl RenderedConfig {
    /// The workspace holding both documents.
    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Data Plane API credentials present in the main document.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Arguments that point HAProxy at the main document.
    #[must_use]
    pub fn haproxy_args(&self) -> Vec<String> {
        vec![
            "-f".to_string(),
            self.workspace.haproxy_conf().display().to_string(),
        ]
    }
}

/// Provision a workspace under `base_dir` and write its documents.
///
/// `overrides` is merged on top of [`ParameterSet::defaults`]. The workspace
/// is removed once `shutdown` signals stop, including when this function
/// fails after the directory was created.
///
/// # Errors
///
/// Any [`ProvisionError`]; nothing is retried.
pub fn provision_config(
    base_dir: &Path,
    overrides: &ParameterSet,
    shutdown: &ShutdownCoordinator,
) -> Result<RenderedConfig, ProvisionError> {
    let workspace = Workspace::provision(base_dir, shutdown)?;
    let params = ParameterSet::defaults().with(overrides);
    let credentials = materialize(&workspace, &params)?;

    Ok(RenderedConfig {
        workspace,
        credentials,
    })
}
