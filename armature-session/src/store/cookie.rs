//! Client-side session store
//!
//! The whole record is carried in the session cookie as base64url-encoded
//! JSON. Nothing is kept on the server, so the identifier passed to each
//! operation is ignored. Payloads are neither signed nor encrypted; do not
//! store anything the client must not read or forge.

use crate::config::{DEFAULT_COOKIE_NAME, validate_cookie_name};
use crate::cookie::{CookieJar, CookieOptions};
use crate::error::{SessionError, SessionResult};
use crate::record::SessionRecord;
use crate::store::SessionStore;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::{debug, trace};

/// Cookie-backed session store.
///
/// # Examples
///
/// ```
/// use armature_session::{CookieStore, SessionConfig, SessionMiddleware};
/// use std::sync::Arc;
///
/// let store = CookieStore::new("session");
/// let middleware = SessionMiddleware::new(Arc::new(store), SessionConfig::default());
/// ```
#[derive(Debug, Clone)]
pub struct CookieStore {
    cookie_name: String,
    cookie_options: CookieOptions,
}

impl CookieStore {
    /// Create a store writing to the named cookie.
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            cookie_options: CookieOptions::default(),
        }
    }

    /// Set the attributes of the payload cookie.
    pub fn with_cookie_options(mut self, options: CookieOptions) -> Self {
        self.cookie_options = options;
        self
    }

    /// Name of the payload cookie.
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Check the configured cookie name.
    pub fn validate(&self) -> SessionResult<()> {
        validate_cookie_name(&self.cookie_name)
    }

    fn encode(record: &SessionRecord) -> SessionResult<String> {
        let json = serde_json::to_vec(record).map_err(SessionError::serialization)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    fn decode(value: &str) -> SessionResult<SessionRecord> {
        let json = URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|e| SessionError::Deserialization(e.to_string()))?;
        serde_json::from_slice(&json).map_err(SessionError::deserialization)
    }

    fn write(&self, record: &SessionRecord, jar: &mut CookieJar) -> SessionResult<()> {
        let value = Self::encode(record)?;
        jar.set(&self.cookie_name, &value, &self.cookie_options);
        Ok(())
    }
}

impl Default for CookieStore {
    fn default() -> Self {
        Self::new(DEFAULT_COOKIE_NAME)
    }
}

#[async_trait]
impl SessionStore for CookieStore {
    async fn fetch(&self, _id: &str, jar: &CookieJar) -> SessionResult<Option<SessionRecord>> {
        let Some(value) = jar.get(&self.cookie_name) else {
            return Ok(None);
        };

        // A payload we cannot read is the same as no session at all
        match Self::decode(value) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                debug!(
                    cookie = %self.cookie_name,
                    error = %e,
                    "Discarding malformed session cookie"
                );
                Ok(None)
            }
        }
    }

    async fn create(
        &self,
        record: &SessionRecord,
        _id: &str,
        jar: &mut CookieJar,
    ) -> SessionResult<()> {
        trace!(cookie = %self.cookie_name, "Cookie store create");
        self.write(record, jar)
    }

    async fn persist(
        &self,
        record: &SessionRecord,
        _id: &str,
        jar: &mut CookieJar,
    ) -> SessionResult<()> {
        trace!(cookie = %self.cookie_name, "Cookie store persist");
        self.write(record, jar)
    }

    async fn delete(&self, _id: &str, jar: &mut CookieJar) -> SessionResult<()> {
        trace!(cookie = %self.cookie_name, "Cookie store delete");
        jar.remove(&self.cookie_name, &self.cookie_options);
        Ok(())
    }

    fn is_self_contained(&self) -> bool {
        true
    }

    fn session_cookie(&self) -> Option<(&str, &CookieOptions)> {
        Some((&self.cookie_name, &self.cookie_options))
    }

    fn store_type(&self) -> &'static str {
        "cookie"
    }
}
