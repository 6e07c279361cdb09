//! org-hierarchy: rebuild the management hierarchy from the directory.
//!
//! With no arguments, writes the whole organization; with a manager's mail
//! address, writes only that manager's reporting tree.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let config = commands::load_app_config(&cli)?;
    let _log_guard = commands::init_tracing(&cli, &config)?;
    commands::run(cli, config).await
}
