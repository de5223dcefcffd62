pub mod group;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::app::{RelayError, Result};
use crate::domain::{Resource, TaskHandle};
use crate::downloader::DownloadBackend;

pub use group::{group_by_name, group_by_season, AnimeGroup, SeasonGroup};

/// `root/anime/Season N` on the backend filesystem.
pub fn season_folder(root: &str, anime_name: &str, season: &str) -> String {
    // A slash in a show name would otherwise open an extra directory level
    let anime_name = anime_name.replace(['/', '\\'], "_");
    let root = root.trim_end_matches('/');
    format!("{}/{}/Season {}", root, anime_name.trim(), season)
}

/// Submits resources as offline download tasks, one batch per season folder.
pub struct DownloadDispatcher {
    backend: Arc<dyn DownloadBackend + Send + Sync>,
}

impl DownloadDispatcher {
    pub fn new(backend: Arc<dyn DownloadBackend + Send + Sync>) -> Self {
        Self { backend }
    }

    /// Returns the resources the backend accepted, each with its task set.
    ///
    /// A failed batch only costs its own resources; an authentication
    /// failure fails the whole call.
    pub async fn dispatch(
        &self,
        resources: Vec<Resource>,
        download_root: &str,
    ) -> Result<Vec<Resource>> {
        let (ready, unusable): (Vec<Resource>, Vec<Resource>) =
            resources.into_iter().partition(Resource::is_dispatchable);
        for resource in &unusable {
            warn!(id = %resource.id, title = %resource.title, "Skipping resource without torrent or anime name");
        }
        if ready.is_empty() {
            return Ok(Vec::new());
        }

        self.backend.authenticate().await.map_err(|e| match e {
            RelayError::Dispatch(_) => e,
            other => RelayError::Dispatch(format!("Authentication failed: {}", other)),
        })?;

        let mut handles: HashMap<String, TaskHandle> = HashMap::new();
        let mut submitted: HashSet<String> = HashSet::new();

        for anime in group_by_season(&ready) {
            for season in &anime.seasons {
                let folder = season_folder(download_root, &anime.anime_name, &season.season);
                let urls: Vec<String> = season
                    .resources
                    .iter()
                    .filter_map(|r| r.torrent_url.clone())
                    .collect();

                match self.backend.add_offline_download(&folder, &urls).await {
                    Ok(tasks) => {
                        submitted.extend(urls);
                        for task in tasks {
                            handles.insert(task.url.clone(), task);
                        }
                    }
                    Err(e) => {
                        error!(
                            anime = %anime.anime_name,
                            season = %season.season,
                            count = urls.len(),
                            "Failed to add offline download tasks: {}",
                            e
                        );
                    }
                }
            }
        }

        let mut dispatched = Vec::new();
        for mut resource in ready {
            let Some(url) = resource.torrent_url.as_deref() else {
                continue;
            };
            match handles.get(url) {
                Some(task) => {
                    let task = task.clone();
                    resource.set_download_task(task);
                    info!(id = %resource.id, "Start to download: {}", resource.title);
                    dispatched.push(resource);
                }
                None if submitted.contains(url) => {
                    warn!(id = %resource.id, url, "Backend returned no task for resource");
                }
                None => {}
            }
        }

        Ok(dispatched)
    }
}
