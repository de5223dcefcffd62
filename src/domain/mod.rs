pub mod entry;
pub mod resource;
pub mod task;

pub use entry::{EntryLink, FeedEntry, BITTORRENT_MIME};
pub use resource::{LedgerRecord, Resource};
pub use task::{TaskHandle, TaskStatus};
