pub mod alist;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::TaskHandle;

pub use alist::AlistClient;

/// Remote file manager able to fetch URLs into its own storage.
#[async_trait]
pub trait DownloadBackend {
    /// Establish a session. Cheap when one is already held.
    async fn authenticate(&self) -> Result<()>;

    /// Queue `urls` for download into `path`, one batched call.
    async fn add_offline_download(&self, path: &str, urls: &[String]) -> Result<Vec<TaskHandle>>;

    /// Every offline download task the backend knows about.
    async fn task_list(&self) -> Result<Vec<TaskHandle>>;
}
