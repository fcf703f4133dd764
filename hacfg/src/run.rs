//! `hacfg run` and `hacfg params` orchestration.
//!
//! Parameter precedence, lowest first: built-in defaults, the settings file's
//! `haproxy` section, then `--haproxy-param` flags. Each step replaces whole
//! keywords.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use serde::Serialize;

use hacfg_core::config::{self, Settings};
use hacfg_core::{DrainResult, ParameterSet, RenderedConfig, ShutdownCoordinator, provision_config};

use crate::cli::{ParamArgs, ParamsArgs, RunArgs};
use crate::error::CliError;

/// JSON document printed by `hacfg run`.
#[derive(Debug, Serialize)]
struct Bundle<'a> {
    #[serde(flatten)]
    rendered: &'a RenderedConfig,
    haproxy_args: Vec<String>,
}

/// Load settings and combine the file's overrides with the CLI flags.
pub fn resolve_overrides(args: &ParamArgs) -> Result<(Settings, ParameterSet), CliError> {
    let settings = config::load(args.config.as_deref())?;
    let flags = ParameterSet::from_flags(&args.haproxy_params)?;
    let overrides = settings.haproxy.with(&flags);
    Ok((settings, overrides))
}

/// Run `hacfg params`: print the effective merged parameters.
pub fn run_params(args: ParamsArgs) -> Result<i32, CliError> {
    let (_, overrides) = resolve_overrides(&args.params)?;
    let effective = ParameterSet::defaults().with(&overrides);

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &effective)?;
    writeln!(stdout).map_err(CliError::Output)?;
    stdout.flush().map_err(CliError::Output)?;
    Ok(0)
}

/// Run `hacfg run`.
///
/// Signal handlers are installed before anything is created, so a SIGINT or
/// SIGTERM that arrives while provisioning still ends in cleanup.
pub async fn run(args: RunArgs) -> Result<i32, CliError> {
    let signal = shutdown_signal()?;
    run_until(args, signal, std::io::stdout()).await
}

/// Provision one workspace, write its bundle to `out`, wait for `signal`,
/// then remove the workspace.
///
/// Returns exit code 1 if cleanup did not finish within the shutdown
/// timeout. Every error after provisioning starts still drains cleanup
/// before returning.
pub async fn run_until<S, W>(args: RunArgs, signal: S, mut out: W) -> Result<i32, CliError>
where
    S: Future<Output = ()>,
    W: Write,
{
    let (settings, overrides) = resolve_overrides(&args.params)?;
    let base_dir = args.base_dir.clone().unwrap_or_else(|| settings.base_dir());
    let timeout = settings.shutdown_timeout();

    let shutdown = ShutdownCoordinator::new();

    let rendered = match provision_config(&base_dir, &overrides, &shutdown) {
        Ok(rendered) => rendered,
        Err(e) => {
            // a directory may already exist
            drain(&shutdown, timeout).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        workspace = %rendered.workspace().base().display(),
        haproxy_conf = %rendered.workspace().haproxy_conf().display(),
        "Configuration ready"
    );

    if let Err(e) = write_bundle(&mut out, &rendered) {
        drain(&shutdown, timeout).await;
        return Err(e);
    }

    signal.await;
    match drain(&shutdown, timeout).await {
        DrainResult::Complete => {
            tracing::info!("Workspace cleanup complete");
            Ok(0)
        }
        DrainResult::Timeout { .. } => Ok(1),
    }
}

async fn drain(shutdown: &ShutdownCoordinator, timeout: Duration) -> DrainResult {
    shutdown.begin_shutdown();
    shutdown.wait_timeout(timeout).await
}

/// Write the bundle as one JSON line and flush it.
fn write_bundle<W: Write>(out: &mut W, rendered: &RenderedConfig) -> Result<(), CliError> {
    let bundle = Bundle {
        rendered,
        haproxy_args: rendered.haproxy_args(),
    };
    serde_json::to_writer(&mut *out, &bundle)?;
    writeln!(out).map_err(CliError::Output)?;
    out.flush().map_err(CliError::Output)
}

/// Install SIGINT/SIGTERM handlers now; the returned future resolves on the
/// first signal received after this call.
fn shutdown_signal() -> Result<impl Future<Output = ()>, CliError> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate()).map_err(CliError::Signal)?;
        let mut sigint = signal(SignalKind::interrupt()).map_err(CliError::Signal)?;

        Ok(async move {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating shutdown"),
                _ = sigint.recv() => tracing::info!("Received SIGINT, initiating shutdown"),
            }
        })
    }

    #[cfg(windows)]
    {
        let mut ctrl_c = tokio::signal::windows::ctrl_c().map_err(CliError::Signal)?;

        Ok(async move {
            ctrl_c.recv().await;
            tracing::info!("Received Ctrl+C, initiating shutdown");
        })
    }
}
