//! SQLite session table.

use crate::error::{SessionError, SessionResult};
use crate::store::SessionTable;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, trace};

/// Session rows in a SQLite table: `id TEXT PRIMARY KEY, data TEXT`.
///
/// Inserts are strict; a primary-key conflict is reported to
/// [`DurableStore`](crate::DurableStore), which retries as an update.
#[derive(Debug, Clone)]
pub struct SqliteTable {
    pool: SqlitePool,
    table: String,
}

impl SqliteTable {
    /// Wrap an existing pool, creating the table if needed.
    pub async fn new(pool: SqlitePool, table: impl Into<String>) -> SessionResult<Self> {
        let table = table.into();
        validate_table_name(&table)?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (id TEXT PRIMARY KEY, data TEXT NOT NULL)",
            table
        ))
        .execute(&pool)
        .await?;

        debug!(table = %table, "SQLite session table ready");
        Ok(Self { pool, table })
    }

    /// Open a pool for `url` and prepare the table.
    pub async fn connect(url: &str, table: impl Into<String>) -> SessionResult<Self> {
        let pool = SqlitePoolOptions::new().connect(url).await?;
        Self::new(pool, table).await
    }

    /// Single-connection in-memory database, for tests and prototypes.
    pub async fn in_memory(table: impl Into<String>) -> SessionResult<Self> {
        // Each connection to `sqlite::memory:` is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::new(pool, table).await
    }

    /// The connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of stored rows.
    pub async fn count(&self) -> SessionResult<usize> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {}", self.table))
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("n")?;
        Ok(count as usize)
    }
}

fn validate_table_name(table: &str) -> SessionResult<()> {
    if table.is_empty()
        || !table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(SessionError::Config(format!(
            "invalid session table name: {:?}",
            table
        )));
    }
    Ok(())
}

#[async_trait]
impl SessionTable for SqliteTable {
    async fn load(&self, id: &str) -> SessionResult<Option<String>> {
        let row = sqlx::query(&format!("SELECT data FROM {} WHERE id = ?", self.table))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("data")?)),
            None => Ok(None),
        }
    }

    async fn insert(
        &self,
        id: &str,
        payload: &str,
        _expires_at: Option<DateTime<Utc>>,
    ) -> SessionResult<bool> {
        let result = sqlx::query(&format!(
            "INSERT INTO {} (id, data) VALUES (?, ?)",
            self.table
        ))
        .bind(id)
        .bind(payload)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                trace!(table = %self.table, "Insert hit primary key conflict");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(
        &self,
        id: &str,
        payload: &str,
        _expires_at: Option<DateTime<Utc>>,
    ) -> SessionResult<bool> {
        let result = sqlx::query(&format!("UPDATE {} SET data = ? WHERE id = ?", self.table))
            .bind(payload)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, id: &str) -> SessionResult<()> {
        sqlx::query(&format!("DELETE FROM {} WHERE id = ?", self.table))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn table_type(&self) -> &'static str {
        "sqlite"
    }
}
