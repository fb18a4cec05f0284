//! SQLite-backed transaction store.
//!
//! The table is created on open if missing; there is no migration step.
//! `rusqlite::Connection` is blocking and not `Sync`, so every call takes the
//! mutex inside `spawn_blocking`.

use async_trait::async_trait;
use chrono::NaiveDate;
use fynmate_core::time::{format_wall_clock, parse_wall_clock};
use fynmate_core::{Category, PaymentMethod, TransactionRecord};
use rusqlite::{Connection, Row, params};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::error::{LedgerError, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    username TEXT,
    note TEXT NOT NULL,
    category TEXT NOT NULL,
    amount INTEGER NOT NULL CHECK (amount >= 0),
    payment_method TEXT NOT NULL DEFAULT 'Other',
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_transactions_created_at ON transactions (created_at);
";

const SELECT_COLUMNS: &str =
    "SELECT id, user_id, username, note, category, amount, payment_method, created_at FROM transactions";

/// Anything a confirmed transaction can be handed to.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn insert(&self, record: &TransactionRecord) -> Result<()>;
}

/// A record as read back, with its row id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredTransaction {
    pub id: i64,
    #[serde(flatten)]
    pub record: TransactionRecord,
}

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| LedgerError::Lock)?;
            f(&guard)
        })
        .await?
    }

    /// Insert and return the new row id.
    pub async fn insert_returning_id(&self, record: &TransactionRecord) -> Result<i64> {
        let amount =
            i64::try_from(record.amount).map_err(|_| LedgerError::AmountOutOfRange(record.amount))?;
        let record = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO transactions (user_id, username, note, category, amount, payment_method, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.user_id,
                    record.username,
                    record.note,
                    record.category.label(),
                    amount,
                    record.payment_method.label(),
                    format_wall_clock(record.created_at),
                ],
            )?;
            let id = conn.last_insert_rowid();
            debug!(id, user_id = record.user_id, amount, "stored transaction");
            Ok(id)
        })
        .await
    }

    /// All transactions, newest first, optionally for one user.
    pub async fn list(&self, uid: Option<i64>) -> Result<Vec<StoredTransaction>> {
        self.with_conn(move |conn| {
            let sql = format!(
                "{SELECT_COLUMNS} WHERE (?1 IS NULL OR user_id = ?1) ORDER BY created_at DESC, id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![uid], map_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    /// Transactions whose local `created_at` falls on `day`, newest first.
    pub async fn list_on_day(&self, day: NaiveDate, uid: Option<i64>) -> Result<Vec<StoredTransaction>> {
        let day = day.format("%Y-%m-%d").to_string();
        self.with_conn(move |conn| {
            let sql = format!(
                "{SELECT_COLUMNS} WHERE substr(created_at, 1, 10) = ?1 AND (?2 IS NULL OR user_id = ?2)
                 ORDER BY created_at DESC, id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![day, uid], map_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }
}

#[async_trait]
impl RecordSink for SqliteStore {
    async fn insert(&self, record: &TransactionRecord) -> Result<()> {
        self.insert_returning_id(record).await.map(|_| ())
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<StoredTransaction> {
    let amount: i64 = row.get(5)?;
    let created_raw: String = row.get(7)?;
    let created_at = parse_wall_clock(&created_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            rusqlite::types::Type::Text,
            format!("invalid created_at: {created_raw}").into(),
        )
    })?;
    let category: String = row.get(4)?;
    let payment: String = row.get(6)?;

    Ok(StoredTransaction {
        id: row.get(0)?,
        record: TransactionRecord {
            user_id: row.get(1)?,
            username: row.get(2)?,
            note: row.get(3)?,
            category: Category::coerce(&category),
            amount: u64::try_from(amount).unwrap_or(0),
            payment_method: PaymentMethod::coerce(&payment),
            created_at,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(user_id: i64, note: &str, amount: u64, created_at: &str) -> TransactionRecord {
        TransactionRecord {
            user_id,
            username: Some(format!("user{user_id}")),
            note: note.to_string(),
            category: Category::Food,
            amount,
            payment_method: PaymentMethod::Cash,
            created_at: parse_wall_clock(created_at).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_newest_first() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(&record(1, "kopi", 20_000, "2026-02-18 08:00:00")).await.unwrap();
        store.insert(&record(1, "makan", 35_000, "2026-02-18 12:30:00")).await.unwrap();
        store.insert(&record(2, "parkir", 5_000, "2026-02-17 22:00:00")).await.unwrap();

        let all = store.list(None).await.unwrap();
        let notes: Vec<_> = all.iter().map(|t| t.record.note.as_str()).collect();
        assert_eq!(notes, vec!["makan", "kopi", "parkir"]);

        let mine = store.list(Some(2)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].record, record(2, "parkir", 5_000, "2026-02-17 22:00:00"));
    }

    #[tokio::test]
    async fn test_list_on_day() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(&record(1, "kopi", 20_000, "2026-02-18 08:00:00")).await.unwrap();
        store.insert(&record(1, "sate", 30_000, "2026-02-17 23:59:59")).await.unwrap();
        store.insert(&record(3, "roti", 10_000, "2026-02-18 00:00:00")).await.unwrap();

        let day = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();
        let today = store.list_on_day(day, None).await.unwrap();
        assert_eq!(today.len(), 2);

        let today_user1 = store.list_on_day(day, Some(1)).await.unwrap();
        assert_eq!(today_user1.len(), 1);
        assert_eq!(today_user1[0].record.note, "kopi");
    }

    #[tokio::test]
    async fn test_reopen_file_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("finance.db");

        let id = {
            let store = SqliteStore::open(&path).unwrap();
            store
                .insert_returning_id(&record(1, "bensin", 12_500, "2026-02-18 07:00:00"))
                .await
                .unwrap()
        };

        let store = SqliteStore::open(&path).unwrap();
        let rows = store.list(None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].record.amount, 12_500);
    }

    #[tokio::test]
    async fn test_amount_out_of_range() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .insert(&record(1, "absurd", u64::MAX, "2026-02-18 07:00:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AmountOutOfRange(_)));
    }

    #[test]
    fn test_stored_transaction_flattens() {
        let t = StoredTransaction {
            id: 5,
            record: record(1, "kopi", 20_000, "2026-02-18 08:00:00"),
        };
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v["id"], 5);
        assert_eq!(v["note"], "kopi");
        assert_eq!(v["created_at"], "2026-02-18 08:00:00");
    }
}
