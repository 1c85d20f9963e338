//! Session storage backends
//!
//! Every backend implements [`SessionStore`] and must behave identically as
//! seen from the middleware:
//!
//! - **Memory**: process-local map behind a single lock
//! - **Cookie**: the record travels inside the session cookie itself
//! - **Durable**: one serialized row per identifier in a key/value table
//!   (SQLite via `sqlx`, or Redis)

mod cookie;
mod durable;
mod memory;
#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use cookie::CookieStore;
pub use durable::{DurableStore, SessionTable};
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis::RedisTable;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteTable;

use crate::cookie::{CookieJar, CookieOptions};
use crate::error::SessionResult;
use crate::record::SessionRecord;
use async_trait::async_trait;

/// Trait for session storage backends
///
/// Each operation receives the request's [`CookieJar`]; backends that keep
/// state elsewhere ignore it.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the record stored under `id`.
    ///
    /// Returns `Ok(None)` when nothing is stored. `Err` is reserved for
    /// genuine backend failures.
    async fn fetch(&self, id: &str, jar: &CookieJar) -> SessionResult<Option<SessionRecord>>;

    /// Store a brand-new record. Overwrites an existing record for `id`.
    async fn create(
        &self,
        record: &SessionRecord,
        id: &str,
        jar: &mut CookieJar,
    ) -> SessionResult<()>;

    /// Store the current record state, inserting it if missing.
    async fn persist(
        &self,
        record: &SessionRecord,
        id: &str,
        jar: &mut CookieJar,
    ) -> SessionResult<()>;

    /// Remove anything stored for `id`. Not an error if nothing exists.
    async fn delete(&self, id: &str, jar: &mut CookieJar) -> SessionResult<()>;

    /// Whether the record itself is the transport payload.
    ///
    /// Self-contained stores need no identifier cookie, so the middleware
    /// skips writing one.
    fn is_self_contained(&self) -> bool {
        false
    }

    /// Name and attributes of the cookie a self-contained store writes.
    ///
    /// The middleware reads and clears the session cookie through these
    /// instead of its own configuration when they are present.
    fn session_cookie(&self) -> Option<(&str, &CookieOptions)> {
        None
    }

    /// Get store type name for debugging
    fn store_type(&self) -> &'static str;
}
