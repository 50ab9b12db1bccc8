//! SQLite-backed token store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{ConsumeOutcome, TokenError, TokenRecord, TokenStore, Verdict};
use crate::storage::StorageError;

/// SQLite-backed token store.
///
/// `consume` runs inside an IMMEDIATE transaction and marks the token with a
/// conditional `UPDATE ... WHERE used = 0`, so a second process sharing the
/// database file cannot redeem the same token twice.
pub struct SqliteTokenStore {
    conn: Mutex<Connection>,
}

impl SqliteTokenStore {
    /// Create a new SQLite token store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, TokenError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::Io {
                    path: parent.display().to_string(),
                    message: e.to_string(),
                })?;
            }
        }
        let conn = Connection::open(path).map_err(db_error)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite token store (useful for testing).
    pub fn in_memory() -> Result<Self, TokenError> {
        let conn = Connection::open_in_memory().map_err(db_error)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TokenError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tokens (
                token TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                movie_id INTEGER NOT NULL,
                quality TEXT NOT NULL,
                file_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                used INTEGER NOT NULL DEFAULT 0,
                used_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_tokens_expires_at ON tokens(expires_at);
            "#,
        )
        .map_err(db_error)?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, TokenError> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()).into())
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<TokenRecord> {
        let used_at: Option<String> = row.get(7)?;
        Ok(TokenRecord {
            user_id: row.get(0)?,
            title_id: row.get::<_, i64>(1)? as u64,
            quality: row.get(2)?,
            file_id: row.get(3)?,
            created_at: parse_timestamp(4, &row.get::<_, String>(4)?)?,
            expires_at: parse_timestamp(5, &row.get::<_, String>(5)?)?,
            used: row.get(6)?,
            used_at: used_at.map(|s| parse_timestamp(7, &s)).transpose()?,
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT user_id, movie_id, quality, file_id, created_at, expires_at, used, used_at FROM tokens";

/// Fixed-width UTC timestamps so that text comparison in SQL matches time order.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn db_error(e: rusqlite::Error) -> TokenError {
    StorageError::Database(e.to_string()).into()
}

impl TokenStore for SqliteTokenStore {
    fn insert(&self, token: &str, record: TokenRecord) -> Result<(), TokenError> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO tokens
                (token, user_id, movie_id, quality, file_id, created_at, expires_at, used, used_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                token,
                record.user_id,
                record.title_id as i64,
                record.quality,
                record.file_id,
                format_timestamp(record.created_at),
                format_timestamp(record.expires_at),
                record.used,
                record.used_at.map(format_timestamp),
            ],
        )
        .map_err(db_error)?;
        Ok(())
    }

    fn get(&self, token: &str) -> Result<Option<TokenRecord>, TokenError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("{} WHERE token = ?", SELECT_COLUMNS),
            params![token],
            Self::row_to_record,
        )
        .optional()
        .map_err(db_error)
    }

    fn consume(
        &self,
        token: &str,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, TokenError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_error)?;

        let record = tx
            .query_row(
                &format!("{} WHERE token = ?", SELECT_COLUMNS),
                params![token],
                Self::row_to_record,
            )
            .optional()
            .map_err(db_error)?;

        let Some(mut record) = record else {
            return Ok(ConsumeOutcome::Unknown);
        };

        let outcome = match record.verdict(user_id, now) {
            Verdict::WrongOwner => ConsumeOutcome::WrongOwner,
            Verdict::AlreadyUsed => ConsumeOutcome::AlreadyUsed,
            Verdict::Expired => {
                tx.execute("DELETE FROM tokens WHERE token = ?", params![token])
                    .map_err(db_error)?;
                ConsumeOutcome::Expired
            }
            Verdict::Redeemable => {
                let updated = tx
                    .execute(
                        "UPDATE tokens SET used = 1, used_at = ? WHERE token = ? AND used = 0",
                        params![format_timestamp(now), token],
                    )
                    .map_err(db_error)?;
                if updated == 1 {
                    record.used = true;
                    record.used_at = Some(now);
                    ConsumeOutcome::Redeemed(record)
                } else {
                    ConsumeOutcome::AlreadyUsed
                }
            }
        };

        tx.commit().map_err(db_error)?;
        Ok(outcome)
    }

    fn remove_expired(&self, now: DateTime<Utc>) -> Result<usize, TokenError> {
        let conn = self.lock()?;
        let removed = conn
            .execute(
                "DELETE FROM tokens WHERE expires_at < ?",
                params![format_timestamp(now)],
            )
            .map_err(db_error)?;
        Ok(removed)
    }

    fn count(&self) -> Result<usize, TokenError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tokens", [], |row| row.get(0))
            .map_err(db_error)?;
        Ok(count as usize)
    }
}
