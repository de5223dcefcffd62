//! Anime name lookup from an episode's homepage.
//!
//! The feed entry itself only carries the release title, which mixes the
//! show name with fansub tags. The episode page on the origin site has the
//! canonical show name in a dedicated element, so each new entry costs one
//! extra HTTP request:
//!
//! ```text
//! entry.link → GET → HTML → first element matching selector → trimmed text
//! ```
//!
//! Requests are spaced by a fixed minimum delay to stay polite with the
//! origin, and successful lookups are memoized by link so an entry seen on
//! several polls is fetched once. The monitor prunes links that have left
//! the feed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scraper::{Html, Selector};
use tokio::time::Instant;
use tracing::debug;

use crate::app::{RelayError, Result};
use crate::config::ScraperConfig;
use crate::fetcher::{FetchResult, Fetcher};

pub struct NameResolver {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    selector: Selector,
    selector_source: String,
    delay: Duration,
    last_fetch: tokio::sync::Mutex<Option<Instant>>,
    cache: Mutex<HashMap<String, String>>,
}

impl NameResolver {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>, config: &ScraperConfig) -> Result<Self> {
        let selector = Selector::parse(&config.title_selector).map_err(|e| {
            RelayError::Config(format!(
                "Invalid title selector {:?}: {}",
                config.title_selector, e
            ))
        })?;

        Ok(Self {
            fetcher,
            selector,
            selector_source: config.title_selector.clone(),
            delay: config.delay(),
            last_fetch: tokio::sync::Mutex::new(None),
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Resolve the anime name shown on `link`.
    pub async fn resolve(&self, link: &str) -> Result<String> {
        if let Some(name) = self.cached(link) {
            debug!(link, name = %name, "Anime name served from cache");
            return Ok(name);
        }

        let body = self.fetch_spaced(link).await?;
        let html = String::from_utf8_lossy(&body);
        let name = extract_title(&html, &self.selector).ok_or_else(|| {
            RelayError::Parse(format!(
                "No element matching {} at {}",
                self.selector_source, link
            ))
        })?;

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(link.to_string(), name.clone());
        }
        Ok(name)
    }

    /// Drop cached names whose link fails `keep`.
    pub fn retain(&self, keep: impl Fn(&str) -> bool) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.retain(|link, _| keep(link));
        }
    }

    #[cfg(test)]
    pub(crate) fn cached_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or_default()
    }

    fn cached(&self, link: &str) -> Option<String> {
        self.cache.lock().ok()?.get(link).cloned()
    }

    async fn fetch_spaced(&self, link: &str) -> Result<Vec<u8>> {
        let mut last = self.last_fetch.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }

        let result = self.fetcher.fetch(link, None, None).await;
        *last = Some(Instant::now());
        drop(last);

        match result.map_err(|e| RelayError::Parse(format!("Failed to fetch {}: {}", link, e)))? {
            FetchResult::Content { body, .. } => Ok(body),
            FetchResult::NotModified => Err(RelayError::Parse(format!(
                "Unexpected 304 from {}",
                link
            ))),
        }
    }
}

/// Text of the first element matching `selector`, whitespace-trimmed.
pub fn extract_title(html: &str, selector: &Selector) -> Option<String> {
    let document = Html::parse_document(html);
    let text = document
        .select(selector)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    (!text.is_empty()).then_some(text)
}
