//! CLI argument types for `hacfg run` and `hacfg params`.
//!
//! These types are defined separately from `main.rs` so that integration tests
//! can construct them directly.

use std::path::PathBuf;

use clap::Args;

/// Parameter sources shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ParamArgs {
    /// Settings file (YAML). Defaults to `$HACFG_CONFIG`,
    /// `/etc/hacfg/config.yaml`, then `./hacfg.yaml` when present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// HAProxy directive override as `<group>.<keyword>=<args>`.
    ///
    /// Group is `global` or `defaults`. Repeat a keyword to emit it on
    /// several lines.
    #[arg(long = "haproxy-param", value_name = "GROUP.KEYWORD=ARGS")]
    pub haproxy_params: Vec<String>,
}

/// Arguments for `hacfg run`.
///
/// Provisions a workspace, prints the rendered bundle as JSON on stdout, and
/// removes the workspace on SIGINT/SIGTERM.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub params: ParamArgs,

    /// Directory to create the workspace under (overrides the settings file).
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long)]
    pub verbose: bool,
}

/// Arguments for `hacfg params`.
///
/// Prints the effective merged parameters as JSON without provisioning.
#[derive(Args, Debug)]
pub struct ParamsArgs {
    #[command(flatten)]
    pub params: ParamArgs,
}
