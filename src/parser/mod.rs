pub mod season;

use std::sync::Arc;

use tracing::debug;

use crate::app::{RelayError, Result};
use crate::domain::{FeedEntry, Resource};
use crate::homepage::NameResolver;

pub use season::{detect_season, resolve_season};

/// Builds [`Resource`]s from feed entries, resolving the anime name remotely.
pub struct FeedEntryParser {
    resolver: Arc<NameResolver>,
}

impl FeedEntryParser {
    pub fn new(resolver: Arc<NameResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &NameResolver {
        &self.resolver
    }

    /// Everything derivable from the entry alone; no network.
    pub fn base_resource(entry: &FeedEntry) -> Result<Resource> {
        let id = entry.resource_id().ok_or_else(|| {
            RelayError::Parse(format!("Entry {:?} has no usable link", entry.title))
        })?;

        let mut resource = Resource::new(id, entry.title.clone());
        resource.torrent_url = entry.torrent_url().map(String::from);
        resource.published_at = entry
            .published
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();
        resource.season = resolve_season(None, &entry.title);
        Ok(resource)
    }

    /// Full resource. Entries without a torrent skip the name lookup and come
    /// back undispatchable.
    pub async fn parse(&self, entry: &FeedEntry) -> Result<Resource> {
        let mut resource = Self::base_resource(entry)?;
        if resource.torrent_url.is_none() {
            debug!(id = %resource.id, "Entry has no torrent enclosure");
            return Ok(resource);
        }

        // base_resource guarantees the link exists
        let link = entry.link.as_deref().unwrap_or_default();
        let name = self.resolver.resolve(link).await?;
        resource.season = resolve_season(Some(&name), &resource.title);
        resource.anime_name = Some(name);
        Ok(resource)
    }
}
