use chrono::Utc;
use feed_rs::model::Entry;
use feed_rs::parser;
use html_escape::decode_html_entities;

use crate::app::{RelayError, Result};
use crate::domain::{EntryLink, FeedEntry};

/// Converts raw feed bytes into [`FeedEntry`] records.
#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, body: &[u8]) -> Result<Vec<FeedEntry>> {
        let feed = parser::parse(body).map_err(|e| RelayError::FeedFetch(e.to_string()))?;

        Ok(feed.entries.into_iter().map(Self::entry).collect())
    }

    fn entry(entry: Entry) -> FeedEntry {
        let mut links: Vec<EntryLink> = entry
            .links
            .iter()
            .map(|l| EntryLink {
                href: l.href.clone(),
                media_type: l.media_type.clone(),
            })
            .collect();

        // RSS enclosures end up in the media section
        for media in &entry.media {
            for content in &media.content {
                if let Some(url) = &content.url {
                    links.push(EntryLink {
                        href: url.to_string(),
                        media_type: content.content_type.as_ref().map(|m| m.to_string()),
                    });
                }
            }
        }

        let link = entry
            .links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| entry.links.first())
            .map(|l| l.href.clone());

        FeedEntry {
            link,
            title: entry
                .title
                .map(|t| decode_html_entities(&t.content).trim().to_string())
                .unwrap_or_default(),
            published: entry
                .published
                .or(entry.updated)
                .map(|dt| dt.with_timezone(&Utc)),
            links,
        }
    }
}
