use anyhow::Context;
use clap::Parser;
use configuration::{load_settings, LogGuard, Settings, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;
use std::process::ExitCode;
use web_server::shutdown::{install_panic_hook, shutdown_signal};

/// HTTP backend that accepts report submissions and stores them in MongoDB.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Optional TOML settings file. Environment variables take precedence over it.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Listen port, overriding PORT and the settings file.
    #[arg(long)]
    port: Option<u16>,
}

/// The main entry point for the report service.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // The guard flushes the file log on drop, so it lives until main returns.
    let (settings, _log_guard) = match bootstrap(&cli) {
        Ok(bootstrapped) => bootstrapped,
        Err(e) => {
            eprintln!("Error during startup: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    install_panic_hook();

    match web_server::run(&settings, shutdown_signal()).await {
        Ok(()) => {
            tracing::info!("Shutdown complete. Exiting.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Service stopped with a fatal error.");
            ExitCode::from(e.exit_code())
        }
    }
}

/// Loads `.env`, the settings and the CLI overrides, then installs logging.
fn bootstrap(cli: &Cli) -> anyhow::Result<(Settings, Option<LogGuard>)> {
    // A missing .env file is fine: production injects the environment directly.
    let _ = dotenvy::dotenv();

    let mut settings = load_settings(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if let Some(port) = cli.port {
        settings.port = port;
    }

    let guard = configuration::init_tracing(&settings).context("Failed to initialize logging")?;
    Ok((settings, guard))
}
