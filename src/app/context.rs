use std::sync::Arc;

use crate::app::error::Result;
use crate::bridge::DispatchBridge;
use crate::config::Config;
use crate::dispatcher::DownloadDispatcher;
use crate::downloader::{AlistClient, DownloadBackend};
use crate::fetcher::http_fetcher::{build_client, HttpFetcher};
use crate::fetcher::Fetcher;
use crate::filter::RegexFilterChain;
use crate::homepage::NameResolver;
use crate::monitor::RssMonitor;
use crate::notifier::{Notifier, TelegramNotifier};
use crate::parser::FeedEntryParser;
use crate::queue::InFlight;
use crate::store::sqlite::SqliteLedger;
use crate::tracker::DownloadTracker;

/// Every long-lived component, built once from the loaded [`Config`].
pub struct AppContext {
    pub config: Config,
    pub ledger: Arc<SqliteLedger>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub backend: Arc<dyn DownloadBackend + Send + Sync>,
    pub notifiers: Vec<Arc<dyn Notifier + Send + Sync>>,
    pub in_flight: InFlight,
    filter: RegexFilterChain,
    resolver: Arc<NameResolver>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let ledger = Arc::new(SqliteLedger::new(config.ledger_path()?)?);
        Self::with_ledger(config, ledger)
    }

    pub fn with_ledger(config: Config, ledger: Arc<SqliteLedger>) -> Result<Self> {
        let client = build_client(&config.network)?;

        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(client.clone()));
        let backend: Arc<dyn DownloadBackend + Send + Sync> =
            Arc::new(AlistClient::new(client.clone(), &config.alist));

        let mut notifiers: Vec<Arc<dyn Notifier + Send + Sync>> = Vec::new();
        if let Some(telegram) = TelegramNotifier::from_config(client, &config.notification.telegram)
        {
            notifiers.push(Arc::new(telegram));
        }

        let filter = RegexFilterChain::new(&config.filters.patterns, &config.filters.active)?;
        let resolver = Arc::new(NameResolver::new(fetcher.clone(), &config.scraper)?);

        Ok(Self {
            config,
            ledger,
            fetcher,
            backend,
            notifiers,
            in_flight: InFlight::new(),
            filter,
            resolver,
        })
    }

    pub fn monitor(&self) -> RssMonitor {
        RssMonitor::new(
            self.config.rss.urls.clone(),
            self.fetcher.clone(),
            self.filter.clone(),
            FeedEntryParser::new(self.resolver.clone()),
            self.ledger.clone(),
            self.in_flight.clone(),
        )
    }

    pub fn bridge(&self) -> DispatchBridge {
        DispatchBridge::new(
            DownloadDispatcher::new(self.backend.clone()),
            self.ledger.clone(),
            self.notifiers.clone(),
            self.in_flight.clone(),
            self.config.alist.download_path.clone(),
        )
    }

    pub fn tracker(&self) -> DownloadTracker {
        DownloadTracker::new(self.backend.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        let mut config = Config::default();
        config.rss.urls = vec!["https://mikanani.me/RSS/MyBangumi?token=abc".into()];
        config.alist.base_url = "https://alist.example.com".into();
        config
    }

    #[test]
    fn test_builds_from_default_config() {
        let ledger = Arc::new(SqliteLedger::in_memory().unwrap());
        let ctx = AppContext::with_ledger(config(), ledger).unwrap();
        assert!(ctx.notifiers.is_empty());
        assert!(ctx.in_flight.is_empty());
    }

    #[test]
    fn test_telegram_enabled() {
        let mut config = config();
        config.notification.telegram.enabled = true;
        config.notification.telegram.bot_token = "123:abc".into();
        config.notification.telegram.chat_id = "42".into();

        let ledger = Arc::new(SqliteLedger::in_memory().unwrap());
        let ctx = AppContext::with_ledger(config, ledger).unwrap();
        assert_eq!(ctx.notifiers.len(), 1);
        assert_eq!(ctx.notifiers[0].name(), "telegram");
    }

    #[test]
    fn test_unknown_active_filter_fails() {
        let mut config = config();
        config.filters.active = vec!["nope".into()];
        let ledger = Arc::new(SqliteLedger::in_memory().unwrap());
        assert!(AppContext::with_ledger(config, ledger).is_err());
    }

    #[test]
    fn test_file_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config();
        config.database.path = Some(dir.path().join("nested").join("ledger.db"));

        AppContext::new(config).unwrap();
        assert!(dir.path().join("nested").join("ledger.db").exists());
    }
}
