//! # mikan-relay
//!
//! Watches a Mikan subscription feed and turns new episode releases into
//! offline download tasks on an Alist server.
//!
//! ## Architecture
//!
//! ```text
//! Fetcher → Normalizer → Filter → Parser → Ledger dedup → queue
//!     → Dispatcher → Ledger insert + Notify → queue → Tracker
//! ```
//!
//! - [`monitor`]: polls the feed and queues new releases
//! - [`bridge`]: drains the queue and dispatches in batches
//! - [`tracker`]: follows dispatched tasks until they settle
//!
//! ## Quick Start
//!
//! ```bash
//! # Write the default config, then fill in rss.urls and [alist]
//! mikan-relay config
//!
//! # One cycle
//! mikan-relay check
//!
//! # Keep running
//! mikan-relay run
//! ```

/// Application context, error type and shutdown signal.
pub mod app;

/// Queue consumer: dispatch, ledger insert, notification.
pub mod bridge;

/// Command-line interface using clap.
pub mod cli;

/// TOML configuration, loaded from `~/.config/mikan-relay/config.toml`.
pub mod config;

/// Signal handling and task wiring for the long-running service.
pub mod daemon;

/// Batched submission of resources, grouped by anime and season.
pub mod dispatcher;

/// Core domain models.
///
/// - [`FeedEntry`](domain::FeedEntry): normalized feed entry
/// - [`Resource`](domain::Resource): one episode release
/// - [`TaskHandle`](domain::TaskHandle): backend download task
pub mod domain;

/// Remote download backends. [`AlistClient`](downloader::AlistClient) is the
/// only implementation.
pub mod downloader;

/// HTTP fetching with conditional request support.
pub mod fetcher;

/// Named regex filters over release titles.
pub mod filter;

/// Anime name lookup from episode homepages.
pub mod homepage;

/// Feed polling.
pub mod monitor;

/// Feed parsing and normalization via feed-rs.
pub mod normalizer;

/// Update digests and their delivery.
pub mod notifier;

/// Feed entry to [`Resource`](domain::Resource) conversion.
pub mod parser;

/// Channels between the pipeline stages.
pub mod queue;

/// SQLite ledger of dispatched releases.
pub mod store;

/// Download progress tracking.
pub mod tracker;

#[cfg(test)]
pub(crate) mod testing;
