//! Settings discovery, loading and environment overrides.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use super::error::ConfigError;
use super::schema::Settings;
use crate::params::{DEFAULTS, GLOBAL};

/// Settings file location override.
pub const ENV_CONFIG: &str = "HACFG_CONFIG";
/// Workspace base directory override.
pub const ENV_BASE_DIR: &str = "HACFG_BASE_DIR";
/// Shutdown timeout override, in seconds.
pub const ENV_SHUTDOWN_TIMEOUT_SECS: &str = "HACFG_SHUTDOWN_TIMEOUT_SECS";

/// Settings file search paths (in priority order).
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(path) = std::env::var(ENV_CONFIG) {
        paths.push(PathBuf::from(path));
    }
    paths.push(PathBuf::from("/etc/hacfg/config.yaml"));
    paths.push(PathBuf::from("./hacfg.yaml"));

    paths
}

/// Find the settings file to load.
///
/// An explicit path must exist. Otherwise the first existing default path is
/// returned, or `None` when there is none; built-in defaults then apply.
pub fn find_config_file(explicit_path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(ConfigError::ConfigFileNotFound {
            searched: vec![path.to_path_buf()],
        });
    }

    Ok(default_config_paths().into_iter().find(|p| p.exists()))
}

/// Load and validate a settings file.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let contents = std::fs::read_to_string(path)?;

    if contents.trim().is_empty() {
        return Err(ConfigError::EmptyConfigFile);
    }

    let contents = substitute_env_vars(&contents)?;
    let settings: Settings = serde_saphyr::from_str(&contents)?;
    validate(&settings)?;

    Ok(settings)
}

/// Resolve settings: file (if any) then environment overrides.
pub fn load(explicit_path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut settings = match find_config_file(explicit_path)? {
        Some(path) => {
            debug!(path = %path.display(), "Loading settings file");
            load_settings(&path)?
        }
        None => {
            debug!("No settings file found, using built-in defaults");
            Settings::default()
        }
    };
    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    for (group, _) in settings.haproxy.groups() {
        if group != GLOBAL && group != DEFAULTS {
            return Err(ConfigError::UnknownParamGroup {
                group: group.to_string(),
            });
        }
    }
    Ok(())
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(dir) = std::env::var(ENV_BASE_DIR) {
        if !dir.is_empty() {
            settings.base_dir = Some(PathBuf::from(dir));
        }
    }

    let timeout = parse_duration_env(ENV_SHUTDOWN_TIMEOUT_SECS, settings.shutdown_timeout());
    settings.shutdown_timeout_secs = Some(timeout.as_secs());
}

/// Parse a duration environment variable with warning on invalid values.
fn parse_duration_env(var_name: &str, default: Duration) -> Duration {
    match std::env::var(var_name) {
        Ok(value) => match value.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                warn!(
                    var = var_name,
                    value = %value,
                    default_secs = default.as_secs(),
                    "Invalid value for environment variable, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Environment Variable Substitution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

// SAFETY: .expect() on LazyLock with a compile-time literal regex pattern.
// The pattern is known-valid and tested by test_env_var_pattern_compiles().
static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(\$)?\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .expect("BUG: ENV_VAR_PATTERN regex is invalid")
});

/// Substitute environment variables in a string.
///
/// # Syntax
/// - `${VAR}` - Required, fail if not set
/// - `${VAR:-default}` - Optional with default
/// - `$${VAR}` - Literal `${VAR}`, left for HAProxy to expand at runtime
pub fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut missing = None;

    let result = ENV_VAR_PATTERN.replace_all(content, |cap: &regex::Captures<'_>| {
        if cap.get(1).is_some() {
            return cap[0][1..].to_string();
        }
        let var_name = &cap[2];
        match (std::env::var(var_name), cap.get(3)) {
            (Ok(value), _) => value,
            (Err(_), Some(default)) => default.as_str().to_string(),
            (Err(_), None) => {
                missing.get_or_insert_with(|| var_name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(var) => Err(ConfigError::MissingEnvVar { var }),
        None => Ok(result.into_owned()),
    }
}
