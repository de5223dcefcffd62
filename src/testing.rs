//! In-memory fakes for the network-facing traits.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::app::{RelayError, Result};
use crate::domain::{Resource, TaskHandle, TaskStatus};
use crate::downloader::DownloadBackend;
use crate::fetcher::{FetchResult, Fetcher};
use crate::notifier::Notifier;

/// Serves canned bodies by URL. Each body gets an ETag derived from its
/// version, so conditional requests see 304 until the body changes.
#[derive(Default)]
pub struct FakeFetcher {
    pages: Mutex<HashMap<String, (Vec<u8>, u32)>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.set_page(url, body);
        self
    }

    pub fn set_page(&self, url: &str, body: impl Into<Vec<u8>>) {
        let mut pages = self.pages.lock().unwrap();
        let version = pages.get(url).map(|(_, v)| v + 1).unwrap_or(1);
        pages.insert(url.to_string(), (body.into(), version));
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(
        &self,
        url: &str,
        etag: Option<&str>,
        _last_modified: Option<&str>,
    ) -> Result<FetchResult> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;

        let pages = self.pages.lock().unwrap();
        let (body, version) = pages
            .get(url)
            .ok_or_else(|| RelayError::FeedFetch(format!("HTTP 404 for {}", url)))?;

        let current = format!("\"v{}\"", version);
        if etag == Some(current.as_str()) {
            return Ok(FetchResult::NotModified);
        }
        Ok(FetchResult::Content {
            body: body.clone(),
            etag: Some(current),
            last_modified: None,
        })
    }
}

/// Records every call. Accepts all URLs unless narrowed with `accept_only`.
#[derive(Default)]
pub struct FakeBackend {
    accept: Option<HashSet<String>>,
    fail_paths: HashSet<String>,
    fail_auth: bool,
    add_calls: Mutex<Vec<(String, Vec<String>)>>,
    auth_calls: Mutex<usize>,
    tasks: Mutex<Vec<TaskHandle>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept_only(mut self, urls: &[&str]) -> Self {
        self.accept = Some(urls.iter().map(|u| u.to_string()).collect());
        self
    }

    pub fn fail_path(mut self, path: &str) -> Self {
        self.fail_paths.insert(path.to_string());
        self
    }

    pub fn fail_auth(mut self) -> Self {
        self.fail_auth = true;
        self
    }

    pub fn add_calls(&self) -> Vec<(String, Vec<String>)> {
        self.add_calls.lock().unwrap().clone()
    }

    pub fn auth_calls(&self) -> usize {
        *self.auth_calls.lock().unwrap()
    }

    /// Replace what `task_list` reports.
    pub fn set_tasks(&self, tasks: Vec<TaskHandle>) {
        *self.tasks.lock().unwrap() = tasks;
    }
}

pub fn task_id(url: &str) -> String {
    format!("task-{}", url)
}

#[async_trait]
impl DownloadBackend for FakeBackend {
    async fn authenticate(&self) -> Result<()> {
        *self.auth_calls.lock().unwrap() += 1;
        if self.fail_auth {
            return Err(RelayError::Dispatch("Login rejected".into()));
        }
        Ok(())
    }

    async fn add_offline_download(&self, path: &str, urls: &[String]) -> Result<Vec<TaskHandle>> {
        self.add_calls
            .lock()
            .unwrap()
            .push((path.to_string(), urls.to_vec()));

        if self.fail_paths.contains(path) {
            return Err(RelayError::Dispatch(format!("Storage not found: {}", path)));
        }

        Ok(urls
            .iter()
            .filter(|u| self.accept.as_ref().is_none_or(|a| a.contains(*u)))
            .map(|u| TaskHandle::new(task_id(u), u.clone(), TaskStatus::Pending))
            .collect())
    }

    async fn task_list(&self) -> Result<Vec<TaskHandle>> {
        Ok(self.tasks.lock().unwrap().clone())
    }
}

pub struct RecordingNotifier {
    name: String,
    fail: bool,
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: false,
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_message(&self, text: &str) -> Result<()> {
        if self.fail {
            return Err(RelayError::Other("chat not found".into()));
        }
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

pub fn dispatchable(id: &str, anime_name: &str, season: &str, url: &str) -> Resource {
    let mut resource = Resource::new(id, format!("[Sub] {} - {}", anime_name, id));
    resource.anime_name = Some(anime_name.to_string());
    resource.season = season.to_string();
    resource.torrent_url = Some(url.to_string());
    resource
}

pub fn episode_page(anime_name: &str) -> String {
    format!(
        r#"<html><body><div class="bangumi-info"><p class="bangumi-title"><a href="/Home/Bangumi/1">{}</a></p></div></body></html>"#,
        anime_name
    )
}

/// RSS document in the shape the Mikan subscription feed uses.
pub fn mikan_feed(items: &[(&str, &str)]) -> String {
    let items: String = items
        .iter()
        .map(|(id, title)| {
            format!(
                r#"<item>
  <guid isPermaLink="false">{title}</guid>
  <link>https://mikanani.me/Home/Episode/{id}</link>
  <title>{title}</title>
  <enclosure type="application/x-bittorrent" length="1" url="https://mikanani.me/Download/20240101/{id}.torrent" />
  <torrent xmlns="https://mikanani.me/0.1/"><pubDate>2024-01-01T12:00:00</pubDate></torrent>
</item>
"#
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0"><channel>
<title>Mikan Project - 我的番组</title>
<link>http://mikanani.me/RSS/MyBangumi?token=abc</link>
<description>Mikan Project - 我的番组</description>
{items}</channel></rss>"#
    )
}
