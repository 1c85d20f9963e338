//! Per-request access to a session record.

use crate::error::{SessionError, SessionResult};
use crate::record::{SessionEntry, SessionRecord};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// How the middleware obtained the session for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// A valid record was found under the presented identifier
    Reused,
    /// A fresh empty record was created
    Created,
}

/// The session as seen by request-handling code.
///
/// Exactly one handle exists per in-flight request, so it carries no
/// internal locking. Reads of flash entries mutate the handle, which is why
/// `get` takes `&mut self`.
///
/// # Examples
///
/// ```
/// use armature_session::{SessionHandle, SessionOrigin, SessionRecord};
///
/// let mut session = SessionHandle::new("abc", SessionRecord::new(), SessionOrigin::Created);
/// session.set("user_id", 42).unwrap();
/// session.flash("notice", "Profile saved").unwrap();
///
/// assert_eq!(session.get::<i32>("user_id"), Some(42));
/// assert_eq!(session.get::<String>("notice").as_deref(), Some("Profile saved"));
/// assert_eq!(session.get::<String>("notice"), None);
/// ```
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: String,
    record: SessionRecord,
    origin: SessionOrigin,
}

impl SessionHandle {
    /// Wrap a record fetched or created under `id`.
    pub fn new(id: impl Into<String>, record: SessionRecord, origin: SessionOrigin) -> Self {
        Self {
            id: id.into(),
            record,
            origin,
        }
    }

    /// Session identifier.
    ///
    /// Sessions in a self-contained store get a fresh identifier on every
    /// request; it only tags log lines.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the session was reused or created for this request.
    pub fn origin(&self) -> SessionOrigin {
        self.origin
    }

    /// Read-only view of the underlying record.
    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    /// Split into identifier and record.
    pub fn into_parts(self) -> (String, SessionRecord) {
        (self.id, self.record)
    }

    /// Get a typed value.
    ///
    /// Flash entries are removed once they have been read successfully. A
    /// value that cannot be deserialized into `T` is left in place.
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let entry = self.record.entries.get(key)?;
        let value = serde_json::from_value(entry.value.clone()).ok()?;
        if entry.flash {
            self.record.entries.remove(key);
        }
        Some(value)
    }

    /// Get the raw JSON value, consuming it if it is a flash entry.
    pub fn get_value(&mut self, key: &str) -> Option<serde_json::Value> {
        let entry = self.record.entries.get(key)?;
        if entry.flash {
            return self.record.entries.remove(key).map(|entry| entry.value);
        }
        Some(entry.value.clone())
    }

    /// Set a persistent value.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> SessionResult<()> {
        self.insert(key, value, false)
    }

    /// Set a value that is consumed by the next successful read.
    pub fn flash<T: Serialize>(&mut self, key: &str, value: T) -> SessionResult<()> {
        self.insert(key, value, true)
    }

    fn insert<T: Serialize>(&mut self, key: &str, value: T, flash: bool) -> SessionResult<()> {
        let value = serde_json::to_value(value).map_err(SessionError::serialization)?;
        self.record
            .entries
            .insert(key.to_string(), SessionEntry { value, flash });
        Ok(())
    }

    /// Remove a value, returning it if present.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.record.entries.remove(key).map(|entry| entry.value)
    }

    /// Check if a key exists. Does not consume flash entries.
    pub fn contains(&self, key: &str) -> bool {
        self.record.entries.contains_key(key)
    }

    /// Get all keys in the session data.
    pub fn keys(&self) -> Vec<&String> {
        self.record.entries.keys().collect()
    }

    /// Clear all session data.
    pub fn clear(&mut self) {
        self.record.entries.clear();
    }

    /// Slide the expiry; see [`SessionRecord::renew`].
    pub fn renew(&mut self, ttl: Option<Duration>) {
        self.record.renew(ttl);
    }

    /// Mark the session for deletion at the end of the request.
    ///
    /// There is no way to undo this: the session is removed from the store
    /// regardless of later writes.
    pub fn mark_for_deletion(&mut self) {
        self.record.deleted = true;
    }

    /// Whether [`mark_for_deletion`](Self::mark_for_deletion) was called.
    pub fn is_marked_for_deletion(&self) -> bool {
        self.record.deleted
    }

    /// Check the session has not expired.
    pub fn is_valid(&self) -> bool {
        self.record.is_valid()
    }
}
