//! Feed polling, the producer side of the pipeline.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::app::{RelayError, Result, Shutdown};
use crate::config::format_interval;
use crate::domain::{FeedEntry, Resource};
use crate::fetcher::{FetchResult, Fetcher};
use crate::filter::RegexFilterChain;
use crate::normalizer::Normalizer;
use crate::parser::FeedEntryParser;
use crate::queue::{InFlight, ResourceSender};
use crate::store::Ledger;

/// Conditional request validators from the last successful fetch.
#[derive(Debug, Default)]
struct Validators {
    etag: Option<String>,
    last_modified: Option<String>,
}

pub struct RssMonitor {
    feed_urls: Vec<String>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    normalizer: Normalizer,
    filter: RegexFilterChain,
    parser: FeedEntryParser,
    ledger: Arc<dyn Ledger + Send + Sync>,
    in_flight: InFlight,
    /// Keyed by feed URL
    validators: Mutex<HashMap<String, Validators>>,
}

impl RssMonitor {
    pub fn new(
        feed_urls: Vec<String>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        filter: RegexFilterChain,
        parser: FeedEntryParser,
        ledger: Arc<dyn Ledger + Send + Sync>,
        in_flight: InFlight,
    ) -> Self {
        Self {
            feed_urls,
            fetcher,
            normalizer: Normalizer::new(),
            filter,
            parser,
            ledger,
            in_flight,
            validators: Mutex::new(HashMap::new()),
        }
    }

    /// New dispatchable resources across every subscribed feed.
    ///
    /// Entries are filtered and deduplicated against the ledger and the
    /// in-flight set before any homepage request is made. A feed that
    /// cannot be fetched is skipped; the poll fails only when all of them do.
    pub async fn poll(&self) -> Result<Vec<Resource>> {
        let (entries, complete) = self.fetch_entries().await?;

        let mut seen = HashSet::new();
        let mut resources = Vec::new();
        for entry in &entries {
            if !self.filter.matches(&entry.title) {
                debug!(
                    title = %entry.title,
                    filters = ?self.filter.rejected_by(&entry.title),
                    "Filtered out"
                );
                continue;
            }

            let base = match FeedEntryParser::base_resource(entry) {
                Ok(base) => base,
                Err(e) => {
                    warn!(title = %entry.title, "Skipping entry: {}", e);
                    continue;
                }
            };
            if !seen.insert(base.id.clone()) {
                continue;
            }
            // In-flight before ledger: the bridge records an id before it
            // releases it, so a released id is always visible in the ledger.
            if self.in_flight.contains(&base.id) || self.ledger.exists(&base.id)? {
                continue;
            }

            match self.parser.parse(entry).await {
                Ok(resource) if resource.is_dispatchable() => resources.push(resource),
                Ok(resource) => {
                    debug!(id = %resource.id, title = %resource.title, "No torrent enclosure, skipping");
                }
                Err(e) => warn!(id = %base.id, title = %entry.title, "Failed to parse entry: {}", e),
            }
        }

        // Names of entries that left every feed will not be asked for again.
        // Only a poll where every feed returned a body shows the whole set.
        if complete {
            let links: HashSet<&str> = entries.iter().filter_map(|e| e.link.as_deref()).collect();
            self.parser.resolver().retain(|link| links.contains(link));
        }

        info!(
            feeds = self.feed_urls.len(),
            entries = entries.len(),
            new = resources.len(),
            "Polled subscription feeds"
        );
        Ok(resources)
    }

    /// Poll once and queue the results. Returns the number queued.
    pub async fn poll_into(&self, tx: &ResourceSender) -> Result<usize> {
        let mut queued = 0;
        for resource in self.poll().await? {
            if !self.in_flight.claim(&resource.id) {
                continue;
            }
            let id = resource.id.clone();
            if !tx.push(resource) {
                self.in_flight.release([id.as_str()]);
                return Err(RelayError::Other("Resource queue closed".into()));
            }
            queued += 1;
        }
        Ok(queued)
    }

    /// Poll now, then every `interval`, until shutdown.
    pub async fn run(&self, tx: ResourceSender, interval: Duration, mut shutdown: Shutdown) {
        info!(
            feeds = self.feed_urls.len(),
            interval = %format_interval(interval),
            "RSS monitor started"
        );

        loop {
            tokio::select! {
                result = self.poll_into(&tx) => match result {
                    Ok(0) => {}
                    Ok(n) => info!(count = n, "Queued new resources"),
                    Err(e) => error!("Feed poll failed: {}", e),
                },
                _ = shutdown.cancelled() => break,
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        info!("RSS monitor stopped");
    }

    /// Entries from every feed that answered, and whether all of them
    /// returned a body.
    async fn fetch_entries(&self) -> Result<(Vec<FeedEntry>, bool)> {
        let mut entries = Vec::new();
        let mut complete = true;
        let mut last_error = None;
        let mut failed = 0;

        for url in &self.feed_urls {
            let result = match self.fetch_feed(url).await {
                Ok(Some(body)) => self.normalizer.normalize(&body),
                Ok(None) => {
                    debug!(url = %url, "Feed not modified");
                    complete = false;
                    Ok(Vec::new())
                }
                Err(e) => Err(e),
            };
            match result {
                Ok(feed_entries) => entries.extend(feed_entries),
                Err(e) => {
                    warn!(url = %url, "Failed to poll feed: {}", e);
                    complete = false;
                    failed += 1;
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if failed == self.feed_urls.len() => Err(e),
            _ => Ok((entries, complete)),
        }
    }

    async fn fetch_feed(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let (etag, last_modified) = match self.validators.lock() {
            Ok(v) => v
                .get(url)
                .map(|v| (v.etag.clone(), v.last_modified.clone()))
                .unwrap_or_default(),
            Err(_) => (None, None),
        };

        let result = self
            .fetcher
            .fetch(url, etag.as_deref(), last_modified.as_deref())
            .await
            .map_err(|e| match e {
                RelayError::FeedFetch(msg) => RelayError::FeedFetch(msg),
                other => RelayError::FeedFetch(other.to_string()),
            })?;

        match result {
            FetchResult::NotModified => Ok(None),
            FetchResult::Content {
                body,
                etag,
                last_modified,
            } => {
                if let Ok(mut v) = self.validators.lock() {
                    v.insert(
                        url.to_string(),
                        Validators {
                            etag,
                            last_modified,
                        },
                    );
                }
                Ok(Some(body))
            }
        }
    }
}
