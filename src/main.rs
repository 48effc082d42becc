// Kepler CLI
//
// Logs go to stderr for one-shot commands and to <home>/kepler.log while the
// viewer owns the terminal.

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use kepler::cli::{self, Cli};
use kepler::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE: &str = "kepler.log";

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config();
    init_tracing(&cli, &config)?;

    tracing::debug!(home = %config.home().display(), "kepler starting");
    cli::run(cli, &config).context("kepler command failed")
}

fn init_tracing(cli: &Cli, config: &Config) -> Result<()> {
    if cli.is_tui() {
        std::fs::create_dir_all(config.home()).with_context(|| {
            format!("cannot create application directory {}", config.home().display())
        })?;
        let path = config.home().join(LOG_FILE);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("cannot open log file {}", path.display()))?;
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "kepler=info".into()))
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "kepler=warn".into()))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}
