pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::Result;

pub use http_fetcher::HttpFetcher;

#[derive(Debug)]
pub enum FetchResult {
    /// New content fetched successfully
    Content {
        body: Vec<u8>,
        etag: Option<String>,
        last_modified: Option<String>,
    },
    /// Content not modified (HTTP 304)
    NotModified,
}

impl FetchResult {
    pub fn content(body: impl Into<Vec<u8>>) -> Self {
        Self::Content {
            body: body.into(),
            etag: None,
            last_modified: None,
        }
    }
}

/// Plain HTTP GET, used for the feed itself and for episode homepages.
#[async_trait]
pub trait Fetcher {
    async fn fetch(
        &self,
        url: &str,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<FetchResult>;
}
