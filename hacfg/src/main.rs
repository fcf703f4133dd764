//! hacfg CLI entry point.
//!
//! Dispatches to `run` (provision and hold a workspace) or `params` (print
//! the effective parameters).

use clap::{Parser, Subcommand};

use hacfg::cli::{ParamsArgs, RunArgs};
use hacfg::run;

// ─────────────────────────────────────────────────────────────────────────────
// CLI Definitions
// ─────────────────────────────────────────────────────────────────────────────

/// hacfg: private, self-cleaning HAProxy sidecar configuration.
#[derive(Parser)]
#[command(name = "hacfg", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision a workspace, print its bundle, remove it on SIGINT/SIGTERM.
    Run(RunArgs),
    /// Print the effective merged HAProxy parameters.
    Params(ParamsArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry Point
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Run(args) => {
            init_tracing(args.verbose);
            match run::run(args).await {
                Ok(code) => code,
                Err(e) => {
                    tracing::error!(error = %e, "run failed");
                    eprintln!("hacfg run: {e}");
                    1
                }
            }
        }
        Commands::Params(args) => {
            init_tracing(false);
            match run::run_params(args) {
                Ok(code) => code,
                Err(e) => {
                    tracing::error!(error = %e, "params failed");
                    eprintln!("hacfg params: {e}");
                    1
                }
            }
        }
    };

    std::process::exit(code);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tracing Init
// ─────────────────────────────────────────────────────────────────────────────

/// Initialise tracing subscriber with stderr output.
///
/// When `verbose` is true, sets filter to `debug`. Otherwise, respects
/// `RUST_LOG` environment variable (defaulting to no output). Stdout is
/// reserved for command output.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
