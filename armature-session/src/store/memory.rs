//! In-memory session store
//!
//! A single map guarded by one mutex. Suitable for single-instance
//! deployments or testing; sessions live as long as the process.

use crate::cookie::CookieJar;
use crate::error::SessionResult;
use crate::record::SessionRecord;
use crate::store::SessionStore;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// In-memory session store
///
/// Construct it once and share it through an `Arc`; there is no global
/// instance.
pub struct MemoryStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
}

impl MemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        debug!("Creating new in-memory session store");
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored sessions, expired ones included until swept
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Drop every session.
    pub fn clear(&self) {
        self.sessions.lock().clear();
    }

    /// Remove expired sessions, returning how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, record| record.is_valid_at(now));
        let removed = before - sessions.len();
        debug!(removed = removed, "Cleaned up expired sessions");
        removed
    }

    /// Run [`cleanup_expired`](Self::cleanup_expired) periodically.
    ///
    /// Expired sessions are already rejected on read; the sweep only
    /// reclaims memory. Must be called from within a tokio runtime.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                self.cleanup_expired();
            }
        })
    }

    fn put(&self, record: &SessionRecord, id: &str) {
        self.sessions.lock().insert(id.to_string(), record.clone());
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn fetch(&self, id: &str, _jar: &CookieJar) -> SessionResult<Option<SessionRecord>> {
        trace!(session_id = %id, "Memory store fetch");
        Ok(self.sessions.lock().get(id).cloned())
    }

    async fn create(
        &self,
        record: &SessionRecord,
        id: &str,
        _jar: &mut CookieJar,
    ) -> SessionResult<()> {
        trace!(session_id = %id, "Memory store create");
        self.put(record, id);
        Ok(())
    }

    async fn persist(
        &self,
        record: &SessionRecord,
        id: &str,
        _jar: &mut CookieJar,
    ) -> SessionResult<()> {
        trace!(session_id = %id, "Memory store persist");
        self.put(record, id);
        Ok(())
    }

    async fn delete(&self, id: &str, _jar: &mut CookieJar) -> SessionResult<()> {
        trace!(session_id = %id, "Memory store delete");
        self.sessions.lock().remove(id);
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}
