use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, IF_MODIFIED_SINCE, IF_NONE_MATCH};
use reqwest::{Client, Proxy, StatusCode};

use crate::app::{RelayError, Result};
use crate::config::NetworkConfig;
use crate::fetcher::{FetchResult, Fetcher};

/// Build the shared reqwest client: timeout, proxy and user agent from config.
pub fn build_client(config: &NetworkConfig) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .gzip(true)
        .brotli(true)
        .user_agent(config.user_agent.as_str());

    if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
        let proxy = Proxy::all(proxy)
            .map_err(|e| RelayError::Config(format!("Invalid proxy {}: {}", proxy, e)))?;
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &NetworkConfig) -> Result<Self> {
        Ok(Self::new(build_client(config)?))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<FetchResult> {
        let mut headers = HeaderMap::new();

        if let Some(etag) = etag {
            if let Ok(value) = HeaderValue::from_str(etag) {
                headers.insert(IF_NONE_MATCH, value);
            }
        }

        if let Some(last_modified) = last_modified {
            if let Ok(value) = HeaderValue::from_str(last_modified) {
                headers.insert(IF_MODIFIED_SINCE, value);
            }
        }

        let response = self.client.get(url).headers(headers).send().await?;

        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(FetchResult::NotModified);
        }

        response.error_for_status_ref()?;

        let etag = response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let last_modified = response
            .headers()
            .get("last-modified")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = response.bytes().await?.to_vec();

        Ok(FetchResult::Content {
            body,
            etag,
            last_modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client_default() {
        assert!(build_client(&NetworkConfig::default()).is_ok());
    }

    #[test]
    fn test_build_client_with_proxy() {
        let config = NetworkConfig {
            proxy: Some("http://127.0.0.1:7890".into()),
            ..Default::default()
        };
        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn test_build_client_rejects_bad_proxy() {
        let config = NetworkConfig {
            proxy: Some("not a url".into()),
            ..Default::default()
        };
        assert!(matches!(build_client(&config), Err(RelayError::Config(_))));
    }
}
