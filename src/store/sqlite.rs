use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{RelayError, Result};
use crate::domain::LedgerRecord;
use crate::store::Ledger;

pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let ledger = Self {
            conn: Mutex::new(conn),
        };
        ledger.run_migrations()?;
        Ok(ledger)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let ledger = Self {
            conn: Mutex::new(conn),
        };
        ledger.run_migrations()?;
        Ok(ledger)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            RelayError::Ledger(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| RelayError::Ledger(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }

    fn record_from_row(row: &Row<'_>) -> rusqlite::Result<LedgerRecord> {
        Ok(LedgerRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            torrent_url: row.get(2)?,
            published_at: row.get(3)?,
            anime_name: row.get(4)?,
            created_at: row
                .get::<_, String>(5)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }
}

impl Ledger for SqliteLedger {
    fn exists(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM resources WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn insert(&self, record: &LedgerRecord) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO resources (id, title, torrent_url, published_at, anime_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.title,
                record.torrent_url,
                record.published_at,
                record.anime_name,
                record.created_at.to_rfc3339()
            ],
        )?;
        Ok(inserted > 0)
    }

    fn get(&self, id: &str) -> Result<Option<LedgerRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                "SELECT id, title, torrent_url, published_at, anime_name, created_at
                 FROM resources WHERE id = ?1",
                params![id],
                Self::record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn list(&self, limit: usize) -> Result<Vec<LedgerRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, torrent_url, published_at, anime_name, created_at
             FROM resources ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )?;
        let records = stmt
            .query_map(params![limit as i64], Self::record_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM resources", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, title: &str) -> LedgerRecord {
        LedgerRecord {
            id: id.into(),
            title: title.into(),
            torrent_url: format!("https://mikanani.me/Download/{}.torrent", id),
            published_at: "2024-01-01T12:00:00+00:00".into(),
            anime_name: Some("Show".into()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_exists() {
        let ledger = SqliteLedger::in_memory().unwrap();
        assert!(!ledger.exists("a").unwrap());

        assert!(ledger.insert(&record("a", "Show - 01")).unwrap());
        assert!(ledger.exists("a").unwrap());
        assert!(!ledger.exists("b").unwrap());
    }

    #[test]
    fn test_insert_is_at_most_once() {
        let ledger = SqliteLedger::in_memory().unwrap();
        assert!(ledger.insert(&record("a", "Original")).unwrap());
        assert!(!ledger.insert(&record("a", "Different")).unwrap());

        let stored = ledger.get("a").unwrap().unwrap();
        assert_eq!(stored.title, "Original");
        assert_eq!(ledger.count().unwrap(), 1);
    }

    #[test]
    fn test_get_roundtrip_fields() {
        let ledger = SqliteLedger::in_memory().unwrap();
        let mut r = record("a", "Show - 01");
        r.anime_name = None;
        ledger.insert(&r).unwrap();

        let stored = ledger.get("a").unwrap().unwrap();
        assert_eq!(stored.torrent_url, r.torrent_url);
        assert_eq!(stored.published_at, r.published_at);
        assert_eq!(stored.anime_name, None);
        assert!(ledger.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first_with_limit() {
        let ledger = SqliteLedger::in_memory().unwrap();
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            let mut r = record(id, id);
            r.created_at = Utc::now() + chrono::Duration::seconds(i as i64);
            ledger.insert(&r).unwrap();
        }

        let listed = ledger.list(2).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "c");
        assert_eq!(listed[1].id, "b");
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.db");

        {
            let ledger = SqliteLedger::new(&path).unwrap();
            ledger.insert(&record("a", "Show - 01")).unwrap();
        }

        let reopened = SqliteLedger::new(&path).unwrap();
        assert!(reopened.exists("a").unwrap());
        assert_eq!(reopened.count().unwrap(), 1);
    }
}
