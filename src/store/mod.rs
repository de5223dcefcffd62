pub mod sqlite;

use crate::app::Result;
use crate::domain::LedgerRecord;

pub use sqlite::SqliteLedger;

/// Durable record of dispatched resource ids.
pub trait Ledger {
    fn exists(&self, id: &str) -> Result<bool>;
    /// Returns false if the id was already recorded.
    fn insert(&self, record: &LedgerRecord) -> Result<bool>;
    fn get(&self, id: &str) -> Result<Option<LedgerRecord>>;
    /// Newest first.
    fn list(&self, limit: usize) -> Result<Vec<LedgerRecord>>;
    fn count(&self) -> Result<usize>;
}
