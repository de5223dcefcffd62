use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mikan_relay::cli::{commands, Cli, Commands};
use mikan_relay::config::Config;
use mikan_relay::store::SqliteLedger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { once } => {
            commands::run(config, once).await?;
        }
        Commands::Check => {
            commands::check(config).await?;
        }
        Commands::History { limit } => {
            let ledger = SqliteLedger::new(config.ledger_path()?)?;
            commands::history(&ledger, limit)?;
        }
        Commands::Config => {
            let path = match cli.config {
                Some(p) => p,
                None => Config::default_config_path()?,
            };
            commands::show_config(&path, &config)?;
        }
    }

    Ok(())
}
