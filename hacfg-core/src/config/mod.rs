//! Settings file and environment configuration.
//!
//! Settings come from an optional YAML file, then environment overrides:
//!
//! ```yaml
//! base_dir: /run/hacfg
//! shutdown_timeout_secs: 10
//! haproxy:
//!   global:
//!     maxconn: ["5000"]
//!   defaults:
//!     timeout: ["connect 5s", "client 30s"]
//! ```
//!
//! `${VAR}` and `${VAR:-default}` are substituted before parsing.

mod error;
mod loader;
mod schema;

pub use error::ConfigError;
pub use loader::{
    ENV_BASE_DIR, ENV_CONFIG, ENV_SHUTDOWN_TIMEOUT_SECS, default_config_paths, find_config_file,
    load, load_settings, substitute_env_vars,
};
pub use schema::{DEFAULT_SHUTDOWN_TIMEOUT, Settings};
