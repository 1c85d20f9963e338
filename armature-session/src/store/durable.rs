//! Durable key/value session store
//!
//! Records are serialized to JSON text and kept as one row per identifier
//! in a [`SessionTable`]. The store turns the table's strict insert/update
//! primitives into the upsert semantics every [`SessionStore`] provides.

use crate::cookie::CookieJar;
use crate::error::{SessionError, SessionResult};
use crate::record::SessionRecord;
use crate::store::SessionStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, trace};

/// One row of serialized session text per identifier.
#[async_trait]
pub trait SessionTable: Send + Sync {
    /// Load the payload stored under `id`.
    async fn load(&self, id: &str) -> SessionResult<Option<String>>;

    /// Insert a new row. Returns `false` if a row for `id` already exists.
    async fn insert(
        &self,
        id: &str,
        payload: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> SessionResult<bool>;

    /// Replace an existing row. Returns `false` if there was no row.
    async fn update(
        &self,
        id: &str,
        payload: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> SessionResult<bool>;

    /// Remove the row for `id`, if any.
    async fn remove(&self, id: &str) -> SessionResult<()>;

    /// Get table type name for debugging
    fn table_type(&self) -> &'static str;
}

/// Session store over a [`SessionTable`].
///
/// # Examples
///
/// ```no_run
/// use armature_session::{DurableStore, SqliteTable};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let table = SqliteTable::connect("sqlite://sessions.db?mode=rwc", "sessions").await?;
/// let store = DurableStore::new(table);
/// # Ok(())
/// # }
/// ```
pub struct DurableStore<T: SessionTable> {
    table: T,
}

impl<T: SessionTable> DurableStore<T> {
    pub fn new(table: T) -> Self {
        Self { table }
    }

    /// The underlying table.
    pub fn table(&self) -> &T {
        &self.table
    }

    fn serialize(record: &SessionRecord) -> SessionResult<String> {
        serde_json::to_string(record).map_err(SessionError::serialization)
    }
}

#[async_trait]
impl<T: SessionTable> SessionStore for DurableStore<T> {
    async fn fetch(&self, id: &str, _jar: &CookieJar) -> SessionResult<Option<SessionRecord>> {
        let Some(payload) = self.table.load(id).await? else {
            return Ok(None);
        };

        // An unreadable row is treated as a missing one
        match serde_json::from_str(&payload) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                debug!(session_id = %id, error = %e, "Discarding unreadable session row");
                Ok(None)
            }
        }
    }

    async fn create(
        &self,
        record: &SessionRecord,
        id: &str,
        _jar: &mut CookieJar,
    ) -> SessionResult<()> {
        let payload = Self::serialize(record)?;

        // A client may resubmit an identifier that still has a row
        if !self.table.insert(id, &payload, record.expires_at).await? {
            trace!(
                session_id = %id,
                table = self.table.table_type(),
                "Row exists, updating instead"
            );
            self.table.update(id, &payload, record.expires_at).await?;
        }
        Ok(())
    }

    async fn persist(
        &self,
        record: &SessionRecord,
        id: &str,
        _jar: &mut CookieJar,
    ) -> SessionResult<()> {
        let payload = Self::serialize(record)?;

        if !self.table.update(id, &payload, record.expires_at).await? {
            trace!(
                session_id = %id,
                table = self.table.table_type(),
                "Row missing, inserting instead"
            );
            // Lost a race with a concurrent create: the row is there now
            if !self.table.insert(id, &payload, record.expires_at).await? {
                self.table.update(id, &payload, record.expires_at).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &str, _jar: &mut CookieJar) -> SessionResult<()> {
        self.table.remove(id).await
    }

    fn store_type(&self) -> &'static str {
        "durable"
    }
}
