//! lsptap - interactive tester and pass-through proxy for LSP servers.

mod app;
mod config;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Cli, Config};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::resolve(&cli) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Error in command line flags: {error}.");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.log_level);

    match app::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing from `--log-level`, honoring `RUST_LOG` overrides.
fn init_logging(level: &str) {
    let directives = format!(
        "lsptap={level},lsptap_core={level},lsptap_protocol={level},lsptap_trace={level},lsptap_web={level}"
    );
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
