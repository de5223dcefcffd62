use std::path::Path;
use std::sync::Arc;

use crate::app::{AppContext, Result};
use crate::config::Config;
use crate::daemon::Daemon;
use crate::store::Ledger;

pub async fn run(config: Config, once: bool) -> Result<()> {
    config.validate()?;
    let daemon = Daemon::new(Arc::new(AppContext::new(config)?));

    if once {
        daemon.run_once().await?;
        return Ok(());
    }
    daemon.run().await
}

pub async fn check(config: Config) -> Result<()> {
    config.validate()?;
    let daemon = Daemon::new(Arc::new(AppContext::new(config)?));

    let report = daemon.run_once().await?;
    println!(
        "Queued {} new releases, dispatched {}",
        report.queued, report.dispatched
    );
    Ok(())
}

pub fn history(ledger: &dyn Ledger, limit: usize) -> Result<()> {
    let records = ledger.list(limit)?;

    if records.is_empty() {
        println!("Nothing dispatched yet");
        return Ok(());
    }

    for record in &records {
        let date = record.created_at.format("%Y-%m-%d %H:%M");
        let anime = record.anime_name.as_deref().unwrap_or("?");
        println!("{} [{}] {}", date, anime, record.title);
    }
    println!("{} of {} records", records.len(), ledger.count()?);
    Ok(())
}

pub fn show_config(path: &Path, config: &Config) -> Result<()> {
    println!("Config file: {}", path.display());
    println!("Ledger: {}", config.ledger_path()?.display());
    println!(
        "Active filters: {}",
        if config.filters.active.is_empty() {
            "(none)".to_string()
        } else {
            config.filters.active.join(", ")
        }
    );

    match config.validate() {
        Ok(()) => println!("Configuration is valid"),
        Err(e) => println!("{}", e),
    }
    Ok(())
}
