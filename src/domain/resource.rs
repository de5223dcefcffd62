use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::TaskHandle;

/// One discovered episode release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub anime_name: Option<String>,
    pub season: String,
    pub torrent_url: Option<String>,
    pub title: String,
    pub published_at: String,
    pub download_task: Option<TaskHandle>,
}

impl Resource {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            anime_name: None,
            season: "1".to_string(),
            torrent_url: None,
            title: title.into(),
            published_at: String::new(),
            download_task: None,
        }
    }

    /// Both a torrent and a name are needed to pick a destination folder.
    pub fn is_dispatchable(&self) -> bool {
        self.torrent_url.is_some() && self.anime_name.is_some()
    }

    pub fn set_download_task(&mut self, task: TaskHandle) {
        self.download_task = Some(task);
    }
}

/// Row of the subscription ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub id: String,
    pub title: String,
    pub torrent_url: String,
    pub published_at: String,
    pub anime_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LedgerRecord {
    /// `None` for resources that never had a torrent to dispatch.
    pub fn from_resource(resource: &Resource) -> Option<Self> {
        Some(Self {
            id: resource.id.clone(),
            title: resource.title.clone(),
            torrent_url: resource.torrent_url.clone()?,
            published_at: resource.published_at.clone(),
            anime_name: resource.anime_name.clone(),
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;

    #[test]
    fn test_dispatchable_needs_torrent_and_name() {
        let mut r = Resource::new("a", "Show - 01");
        assert!(!r.is_dispatchable());

        r.torrent_url = Some("https://example.com/a.torrent".into());
        assert!(!r.is_dispatchable());

        r.anime_name = Some("Show".into());
        assert!(r.is_dispatchable());
    }

    #[test]
    fn test_set_download_task() {
        let mut r = Resource::new("a", "Show - 01");
        r.set_download_task(TaskHandle::new("t1", "u1", TaskStatus::Pending));
        assert_eq!(r.download_task.unwrap().backend_id, "t1");
    }

    #[test]
    fn test_ledger_record_requires_torrent() {
        let r = Resource::new("a", "Show - 01");
        assert!(LedgerRecord::from_resource(&r).is_none());

        let mut r = r;
        r.torrent_url = Some("u1".into());
        r.anime_name = Some("Show".into());
        let record = LedgerRecord::from_resource(&r).unwrap();
        assert_eq!(record.id, "a");
        assert_eq!(record.torrent_url, "u1");
        assert_eq!(record.anime_name, Some("Show".into()));
    }
}
