mod catalog;
mod commands;
mod error;
mod models;
mod schema; // Diesel schema definitions
mod selection;
mod setup;
mod tasks;
mod utils;

use anyhow::Context;
use clap::Parser;
use commands::Cli;
use utils::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if cli.verbose {
        config.debug_logging = true;
    }
    utils::logging::init(config.debug_logging);
    log::debug!("Using configuration {:?}", config);

    let mut app = setup::init(config)
        .await
        .context("Failed to initialize the catalog")?;

    cli.command.execute(&mut app).await
}
