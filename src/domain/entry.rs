use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

pub const BITTORRENT_MIME: &str = "application/x-bittorrent";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryLink {
    pub href: String,
    pub media_type: Option<String>,
}

impl EntryLink {
    pub fn new(href: impl Into<String>, media_type: Option<&str>) -> Self {
        Self {
            href: href.into(),
            media_type: media_type.map(String::from),
        }
    }
}

/// One raw feed entry, as produced by the normalizer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Canonical link to the episode page
    pub link: Option<String>,
    pub title: String,
    pub published: Option<DateTime<Utc>>,
    /// Every link the entry carries, enclosures included
    pub links: Vec<EntryLink>,
}

impl FeedEntry {
    /// Last non-empty path segment of the canonical link.
    pub fn resource_id(&self) -> Option<String> {
        let link = self.link.as_deref()?;
        match Url::parse(link) {
            Ok(url) => url
                .path_segments()?
                .filter(|s| !s.is_empty())
                .next_back()
                .map(String::from),
            // Relative or otherwise odd links still carry a usable tail
            Err(_) => link
                .split('/')
                .filter(|s| !s.is_empty())
                .next_back()
                .map(String::from),
        }
    }

    pub fn torrent_url(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| {
                l.media_type
                    .as_deref()
                    .is_some_and(|t| t.eq_ignore_ascii_case(BITTORRENT_MIME))
            })
            .map(|l| l.href.as_str())
    }
}
