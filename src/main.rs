use anyhow::Context;
use clap::Parser;
use cyclearb::app::{Config, Runtime};
use cyclearb::cli::{Cli, Commands};
use cyclearb::shutdown::Shutdown;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    config.dry_run |= cli.dry_run;

    if cli.command() == Commands::Check {
        println!("{} is valid: {} venues", cli.config.display(), config.venues.len());
        return Ok(());
    }

    config.init_logging();
    info!(config = %cli.config.display(), "cyclearb starting");

    let shutdown = Shutdown::new();
    let runtime = Runtime::start(&config, shutdown.clone())
        .await
        .context("failed to start engine")?;

    signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
    info!("Shutdown signal received");
    shutdown.trigger();
    runtime.wait_exit().await;

    info!("cyclearb stopped");
    Ok(())
}
