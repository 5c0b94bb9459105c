//! Bindery command line tool
//!
//! Loads a binds file, resolves bind keys to engines and manages the tables
//! of every bind.

mod commands;
mod config;

use clap::Parser;
use tracing::info;

use crate::config::CliConfig;

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bindery={},bindery_binds={}", level, level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    let (binds, current) = config.build()?;
    info!(
        config = ?config.config,
        database_url = %binds.config().database_url,
        binds = binds.bind_keys().len(),
        tenant = ?current.get(),
        command = ?config.command,
        "Starting bindery"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    commands::run(&config.command, &binds, &mut out)
}
