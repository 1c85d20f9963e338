//! Serializable session state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// A single value stored in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    /// Stored value
    pub value: serde_json::Value,
    /// Whether the entry is consumed by its first successful read
    #[serde(default)]
    pub flash: bool,
}

/// Session state as persisted by every store.
///
/// This is the payload that backends serialize: the cookie store encodes it
/// into the cookie value and durable stores write it as one row of JSON text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session data keyed by name
    #[serde(default)]
    pub entries: HashMap<String, SessionEntry>,
    /// Expiration timestamp, `None` means the session never expires
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Last access timestamp (informational only)
    #[serde(default)]
    pub accessed_at: Option<DateTime<Utc>>,
    /// Set once the session has been marked for deletion
    #[serde(default)]
    pub deleted: bool,
}

impl SessionRecord {
    /// Create an empty record with no expiry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check validity at the given instant.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }

    /// Check validity against the current time.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Slide the expiry to `now + ttl`.
    ///
    /// A missing or zero TTL leaves `expires_at` untouched.
    pub fn renew_at(&mut self, ttl: Option<Duration>, now: DateTime<Utc>) {
        let Some(ttl) = ttl.filter(|ttl| !ttl.is_zero()) else {
            return;
        };
        // A TTL beyond chrono's range saturates to "never expires"
        self.expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl));
    }

    /// Slide the expiry relative to the current time.
    pub fn renew(&mut self, ttl: Option<Duration>) {
        self.renew_at(ttl, Utc::now());
    }

    /// Record an access.
    pub fn touch_at(&mut self, now: DateTime<Utc>) {
        self.accessed_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_empty_and_valid() {
        let record = SessionRecord::new();
        assert!(record.entries.is_empty());
        assert!(record.expires_at.is_none());
        assert!(record.accessed_at.is_none());
        assert!(!record.deleted);
        assert!(record.is_valid());
    }

    #[test]
    fn test_validity_boundary() {
        let now = Utc::now();
        let mut record = SessionRecord::new();

        record.expires_at = Some(now + chrono::Duration::seconds(1));
        assert!(record.is_valid_at(now));

        // Expiry equal to the evaluation instant is already expired
        record.expires_at = Some(now);
        assert!(!record.is_valid_at(now));

        record.expires_at = Some(now - chrono::Duration::seconds(1));
        assert!(!record.is_valid_at(now));
    }

    #[test]
    fn test_expires_after_ttl_without_renewal() {
        let t0 = Utc::now();
        let mut record = SessionRecord::new();
        record.renew_at(Some(Duration::from_secs(10)), t0);

        assert!(record.is_valid_at(t0 + chrono::Duration::seconds(9)));
        assert!(!record.is_valid_at(t0 + chrono::Duration::seconds(11)));
    }

    #[test]
    fn test_renew_without_ttl_keeps_expiry() {
        let now = Utc::now();
        let expiry = now + chrono::Duration::seconds(30);
        let mut record = SessionRecord {
            expires_at: Some(expiry),
            ..Default::default()
        };

        record.renew_at(None, now);
        assert_eq!(record.expires_at, Some(expiry));

        record.renew_at(Some(Duration::ZERO), now);
        assert_eq!(record.expires_at, Some(expiry));

        record.renew_at(Some(Duration::from_secs(60)), now);
        assert_eq!(record.expires_at, Some(now + chrono::Duration::seconds(60)));
    }

    #[test]
    fn test_json_roundtrip_preserves_flash_flag() {
        let mut record = SessionRecord::new();
        record.entries.insert(
            "notice".to_string(),
            SessionEntry {
                value: serde_json::json!("saved"),
                flash: true,
            },
        );
        record.expires_at = Some(Utc::now());

        let json = serde_json::to_string(&record).unwrap();
        let decoded: SessionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_deserialize_tolerates_missing_fields() {
        let decoded: SessionRecord = serde_json::from_str(r#"{"entries":{}}"#).unwrap();
        assert_eq!(decoded, SessionRecord::new());
    }
}
