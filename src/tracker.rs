//! Follows dispatched resources until their backend task settles.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::app::{Result, Shutdown};
use crate::config::format_interval;
use crate::domain::{Resource, TaskStatus};
use crate::downloader::DownloadBackend;
use crate::queue::ResourceReceiver;

/// Consecutive checks a task may be absent from the backend's task list
/// before it is given up on. The backend purges its done list on its own.
pub const MAX_MISSED_CHECKS: u32 = 5;

struct Tracked {
    resource: Resource,
    missed: u32,
}

pub struct DownloadTracker {
    backend: Arc<dyn DownloadBackend + Send + Sync>,
    /// Keyed by backend task id
    tracked: HashMap<String, Tracked>,
}

impl DownloadTracker {
    pub fn new(backend: Arc<dyn DownloadBackend + Send + Sync>) -> Self {
        Self {
            backend,
            tracked: HashMap::new(),
        }
    }

    pub fn track(&mut self, resource: Resource) {
        match resource.download_task.as_ref() {
            Some(task) => {
                self.tracked
                    .insert(task.backend_id.clone(), Tracked { resource, missed: 0 });
            }
            None => debug!(id = %resource.id, "Resource has no download task, not tracking"),
        }
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Query the backend once. Finished resources are logged, dropped from
    /// tracking and returned with their final status. Tasks the backend no
    /// longer lists are dropped after [`MAX_MISSED_CHECKS`] checks.
    pub async fn check(&mut self) -> Result<Vec<(Resource, TaskStatus)>> {
        if self.tracked.is_empty() {
            return Ok(Vec::new());
        }

        let tasks = self.backend.task_list().await?;
        let listed: HashSet<String> = tasks.iter().map(|t| t.backend_id.clone()).collect();
        let mut finished = Vec::new();

        for task in tasks {
            if !task.status.is_finished() {
                if let Some(tracked) = self.tracked.get_mut(&task.backend_id) {
                    tracked.resource.set_download_task(task);
                    tracked.missed = 0;
                }
                continue;
            }
            let Some(tracked) = self.tracked.remove(&task.backend_id) else {
                continue;
            };
            let mut resource = tracked.resource;

            let anime = resource.anime_name.as_deref().unwrap_or_default();
            match task.status {
                TaskStatus::Succeeded => {
                    info!(id = %resource.id, anime, "Download finished: {}", resource.title);
                }
                status => warn!(
                    id = %resource.id,
                    anime,
                    ?status,
                    error = task.error.as_deref().unwrap_or_default(),
                    "Download did not complete: {}",
                    resource.title
                ),
            }

            let status = task.status;
            resource.set_download_task(task);
            finished.push((resource, status));
        }

        self.tracked.retain(|backend_id, tracked| {
            if listed.contains(backend_id) {
                return true;
            }
            tracked.missed += 1;
            if tracked.missed < MAX_MISSED_CHECKS {
                return true;
            }
            warn!(
                id = %tracked.resource.id,
                task = %backend_id,
                "Task vanished from the backend, no longer tracking: {}",
                tracked.resource.title
            );
            false
        });

        Ok(finished)
    }

    /// Track everything arriving on `rx`, checking every `interval`.
    pub async fn run(mut self, mut rx: ResourceReceiver, interval: Duration, mut shutdown: Shutdown) {
        info!(interval = %format_interval(interval), "Download tracker started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut open = true;

        loop {
            tokio::select! {
                received = rx.recv(), if open => match received {
                    Some(resource) => self.track(resource),
                    None => open = false,
                },
                _ = ticker.tick() => {
                    if let Err(e) = self.check().await {
                        warn!("Failed to query download tasks: {}", e);
                    }
                }
                _ = shutdown.cancelled() => break,
            }
        }

        if !self.is_empty() {
            info!(pending = self.len(), "Download tracker stopped with unfinished tasks");
        } else {
            info!("Download tracker stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskHandle;
    use crate::queue::resource_queue;
    use crate::testing::{dispatchable, task_id, FakeBackend};

    fn with_task(id: &str, url: &str) -> Resource {
        let mut r = dispatchable(id, "Show", "1", url);
        r.set_download_task(TaskHandle::new(task_id(url), url, TaskStatus::Pending));
        r
    }

    #[tokio::test]
    async fn test_check_with_nothing_tracked_skips_backend() {
        let backend = Arc::new(FakeBackend::new());
        let mut tracker = DownloadTracker::new(backend);
        assert!(tracker.check().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_untracked_resource_without_task() {
        let backend = Arc::new(FakeBackend::new());
        let mut tracker = DownloadTracker::new(backend);
        tracker.track(dispatchable("a", "Show", "1", "ua"));
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_check_settles_finished_tasks() {
        let backend = Arc::new(FakeBackend::new());
        let mut tracker = DownloadTracker::new(backend.clone());
        tracker.track(with_task("a", "ua"));
        tracker.track(with_task("b", "ub"));
        tracker.track(with_task("c", "uc"));

        let mut failed = TaskHandle::new(task_id("ub"), "ub", TaskStatus::Failed);
        failed.error = Some("tracker timeout".into());
        backend.set_tasks(vec![
            TaskHandle::new(task_id("ua"), "ua", TaskStatus::Succeeded),
            failed,
            TaskHandle::new(task_id("uc"), "uc", TaskStatus::Running),
            TaskHandle::new("someone-else", "ux", TaskStatus::Succeeded),
        ]);

        let finished = tracker.check().await.unwrap();
        let mut settled: Vec<(&str, TaskStatus)> =
            finished.iter().map(|(r, s)| (r.id.as_str(), *s)).collect();
        settled.sort_by_key(|(id, _)| *id);
        assert_eq!(
            settled,
            vec![("a", TaskStatus::Succeeded), ("b", TaskStatus::Failed)]
        );
        assert_eq!(tracker.len(), 1);

        backend.set_tasks(vec![TaskHandle::new(task_id("uc"), "uc", TaskStatus::Succeeded)]);
        assert_eq!(tracker.check().await.unwrap().len(), 1);
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_task_missing_from_backend_is_dropped() {
        let backend = Arc::new(FakeBackend::new());
        let mut tracker = DownloadTracker::new(backend.clone());
        tracker.track(with_task("a", "ua"));
        tracker.track(with_task("b", "ub"));

        backend.set_tasks(vec![TaskHandle::new(task_id("ub"), "ub", TaskStatus::Running)]);
        for _ in 1..MAX_MISSED_CHECKS {
            assert!(tracker.check().await.unwrap().is_empty());
        }
        assert_eq!(tracker.len(), 2);

        assert!(tracker.check().await.unwrap().is_empty());
        assert_eq!(tracker.len(), 1);
        assert!(tracker.tracked.contains_key(&task_id("ub")));
    }

    #[tokio::test]
    async fn test_reappearing_task_resets_missed_count() {
        let backend = Arc::new(FakeBackend::new());
        let mut tracker = DownloadTracker::new(backend.clone());
        tracker.track(with_task("a", "ua"));

        for _ in 1..MAX_MISSED_CHECKS {
            tracker.check().await.unwrap();
        }
        backend.set_tasks(vec![TaskHandle::new(task_id("ua"), "ua", TaskStatus::Running)]);
        tracker.check().await.unwrap();

        backend.set_tasks(Vec::new());
        tracker.check().await.unwrap();
        assert_eq!(tracker.len(), 1);
    }

    #[tokio::test]
    async fn test_run_tracks_queue_until_shutdown() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_tasks(vec![TaskHandle::new(task_id("ua"), "ua", TaskStatus::Succeeded)]);
        let tracker = DownloadTracker::new(backend);
        let (tx, rx) = resource_queue();
        let (trigger, shutdown) = crate::app::shutdown::channel();

        tx.push(with_task("a", "ua"));
        let handle = tokio::spawn(tracker.run(rx, Duration::from_millis(10), shutdown));

        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(tx);
        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
