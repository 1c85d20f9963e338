//! Per-request session orchestration
//!
//! [`SessionMiddleware::begin`] resolves the session for an incoming request
//! and [`SessionMiddleware::finish`] is the end-of-request hook. Between the
//! two, handler code works on the [`SessionHandle`].
//!
//! # Failure policy
//!
//! - No session cookie: a new session is created.
//! - `fetch` fails (I/O error, unreadable payload): the failure is logged and
//!   a new session is created. Read-side failures never fail the request.
//! - The stored session has expired: it is deleted, the cookie is cleared,
//!   and a new session is created under a fresh identifier.
//! - `create`, `persist` or `delete` fails: the error is returned to the
//!   caller. A session that cannot be written must not be silently dropped.

use crate::config::SessionConfig;
use crate::cookie::{CookieJar, CookieOptions};
use crate::error::SessionResult;
use crate::handle::{SessionHandle, SessionOrigin};
use crate::id::{AlphanumericIdGenerator, IdGenerator};
use crate::record::SessionRecord;
use crate::store::SessionStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Session middleware for Armature applications
///
/// # Examples
///
/// ```
/// use armature_session::{CookieJar, MemoryStore, SessionConfig, SessionHandle, SessionMiddleware};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), armature_session::SessionError> {
/// let store = Arc::new(MemoryStore::new());
/// let sessions = SessionMiddleware::new(store, SessionConfig::new(Duration::from_secs(1800)));
///
/// let mut jar = CookieJar::from_header("session=abc123");
/// let visits = sessions
///     .run(&mut jar, async |session: &mut SessionHandle| {
///         let visits = session.get::<u32>("visits").unwrap_or(0) + 1;
///         session.set("visits", visits)?;
///         Ok::<_, armature_session::SessionError>(visits)
///     })
///     .await??;
///
/// for header in jar.set_cookie_headers() {
///     println!("Set-Cookie: {}", header);
/// }
/// # let _ = visits;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SessionMiddleware {
    store: Arc<dyn SessionStore>,
    config: Arc<SessionConfig>,
    ids: Arc<dyn IdGenerator>,
}

impl SessionMiddleware {
    /// Create session middleware over a store.
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            ids: Arc::new(AlphanumericIdGenerator::default()),
        }
    }

    /// Use a custom identifier generator.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The active store.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Resolve or create the session for an incoming request.
    ///
    /// Writes the identifier cookie into `jar` unless the store is
    /// self-contained.
    pub async fn begin(&self, jar: &mut CookieJar) -> SessionResult<SessionHandle> {
        let handle = match self.resolve(jar).await? {
            Some(handle) => handle,
            None => self.recreate(jar).await?,
        };

        if !self.store.is_self_contained() {
            jar.set(
                &self.config.cookie_name,
                handle.id(),
                &self.config.cookie_options,
            );
        }

        Ok(handle)
    }

    /// Find a valid session for the presented cookie.
    ///
    /// Returns `None` whenever a new session has to be created. Fetch errors
    /// fail open: they are logged and treated as "no session".
    async fn resolve(&self, jar: &mut CookieJar) -> SessionResult<Option<SessionHandle>> {
        let Some(presented) = self.presented_cookie(jar) else {
            trace!("No session cookie presented");
            return Ok(None);
        };

        // A self-contained cookie holds the record, not an identifier
        let id = if self.store.is_self_contained() {
            self.ids.generate()
        } else {
            presented
        };

        let record = match self.store.fetch(&id, jar).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(session_id = %id, "Session not found");
                return Ok(None);
            }
            Err(e) => {
                warn!(
                    store = self.store.store_type(),
                    error = %e,
                    "Session fetch failed, starting a new session"
                );
                return Ok(None);
            }
        };

        if !record.is_valid() {
            debug!(session_id = %id, "Session expired");
            self.discard(&id, jar).await?;
            return Ok(None);
        }

        let mut handle = SessionHandle::new(id, record, SessionOrigin::Reused);
        handle.renew(self.config.ttl);
        Ok(Some(handle))
    }

    /// Create an empty session and store it.
    async fn recreate(&self, jar: &mut CookieJar) -> SessionResult<SessionHandle> {
        // A still-present identifier is reused as the new key; it is gone
        // here if the session behind it expired.
        let id = match self.presented_cookie(jar) {
            Some(id) if !self.store.is_self_contained() => id,
            _ => self.ids.generate(),
        };

        let record = SessionRecord::new();
        self.store.create(&record, &id, jar).await?;
        debug!(session_id = %id, store = self.store.store_type(), "Created session");

        Ok(SessionHandle::new(id, record, SessionOrigin::Created))
    }

    /// Name and attributes of the session cookie.
    ///
    /// Self-contained stores own their cookie; everything else uses the
    /// configured one.
    fn session_cookie(&self) -> (&str, &CookieOptions) {
        self.store
            .session_cookie()
            .unwrap_or((self.config.cookie_name.as_str(), &self.config.cookie_options))
    }

    fn presented_cookie(&self, jar: &CookieJar) -> Option<String> {
        let (name, _) = self.session_cookie();
        jar.get(name)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// Delete the stored session and clear the identifier cookie.
    async fn discard(&self, id: &str, jar: &mut CookieJar) -> SessionResult<()> {
        self.store.delete(id, jar).await?;

        // Self-contained stores clear their own cookie on delete
        if !self.store.is_self_contained() {
            jar.remove(&self.config.cookie_name, &self.config.cookie_options);
        }
        Ok(())
    }

    /// End-of-request hook: renew, persist, and delete if requested.
    ///
    /// Persistence is unconditional so the sliding expiry is recorded even
    /// when the handler never touched the session.
    pub async fn finish(&self, handle: SessionHandle, jar: &mut CookieJar) -> SessionResult<()> {
        let (id, mut record) = handle.into_parts();
        record.renew(self.config.ttl);
        record.touch_at(Utc::now());

        self.store.persist(&record, &id, jar).await?;

        if record.deleted {
            debug!(session_id = %id, "Deleting session");
            self.discard(&id, jar).await?;
        }

        Ok(())
    }

    /// Run `handler` inside a session: [`begin`](Self::begin), the handler,
    /// then [`finish`](Self::finish).
    ///
    /// If the returned future is dropped before completion, nothing is
    /// persisted for this request.
    pub async fn run<F, T>(&self, jar: &mut CookieJar, handler: F) -> SessionResult<T>
    where
        F: AsyncFnOnce(&mut SessionHandle) -> T,
    {
        let mut handle = self.begin(jar).await?;
        let output = handler(&mut handle).await;
        self.finish(handle, jar).await?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::store::{CookieStore, MemoryStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedIds(AtomicUsize);

    impl IdGenerator for FixedIds {
        fn generate(&self) -> String {
            format!("generated-{}", self.0.fetch_add(1, Ordering::SeqCst))
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum FailOn {
        Fetch,
        Create,
        Persist,
        Delete,
    }

    /// Memory store with one operation that always fails.
    struct FailingStore {
        fail_on: FailOn,
        inner: MemoryStore,
    }

    impl FailingStore {
        fn new(fail_on: FailOn) -> Self {
            Self {
                fail_on,
                inner: MemoryStore::new(),
            }
        }

        fn check(&self, op: FailOn) -> SessionResult<()> {
            if self.fail_on == op {
                return Err(SessionError::Backend("backend unavailable".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SessionStore for FailingStore {
        async fn fetch(&self, id: &str, jar: &CookieJar) -> SessionResult<Option<SessionRecord>> {
            self.check(FailOn::Fetch)?;
            self.inner.fetch(id, jar).await
        }

        async fn create(
            &self,
            record: &SessionRecord,
            id: &str,
            jar: &mut CookieJar,
        ) -> SessionResult<()> {
            self.check(FailOn::Create)?;
            self.inner.create(record, id, jar).await
        }

        async fn persist(
            &self,
            record: &SessionRecord,
            id: &str,
            jar: &mut CookieJar,
        ) -> SessionResult<()> {
            self.check(FailOn::Persist)?;
            self.inner.persist(record, id, jar).await
        }

        async fn delete(&self, id: &str, jar: &mut CookieJar) -> SessionResult<()> {
            self.check(FailOn::Delete)?;
            self.inner.delete(id, jar).await
        }

        fn store_type(&self) -> &'static str {
            "failing"
        }
    }

    fn middleware(store: Arc<dyn SessionStore>) -> SessionMiddleware {
        SessionMiddleware::new(store, SessionConfig::new(Duration::from_secs(10)))
            .with_id_generator(Arc::new(FixedIds(AtomicUsize::new(0))))
    }

    #[tokio::test]
    async fn test_new_session_without_cookie() {
        let store = Arc::new(MemoryStore::new());
        let sessions = middleware(store.clone());
        let mut jar = CookieJar::new();

        let handle = sessions.begin(&mut jar).await.unwrap();

        assert_eq!(handle.id(), "generated-0");
        assert_eq!(handle.origin(), SessionOrigin::Created);
        assert!(handle.record().entries.is_empty());
        assert!(handle.record().expires_at.is_none());
        assert_eq!(jar.get("session"), Some("generated-0"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_identifier_is_reused_as_key() {
        let store = Arc::new(MemoryStore::new());
        let sessions = middleware(store.clone());
        let mut jar = CookieJar::from_header("session=stale-id");

        let handle = sessions.begin(&mut jar).await.unwrap();

        assert_eq!(handle.id(), "stale-id");
        assert_eq!(handle.origin(), SessionOrigin::Created);
        assert!(store.fetch("stale-id", &jar).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reused_session_is_renewed() {
        let store = Arc::new(MemoryStore::new());
        let sessions = middleware(store.clone());
        let mut jar = CookieJar::new();
        store
            .create(&SessionRecord::new(), "known", &mut jar)
            .await
            .unwrap();

        let mut jar = CookieJar::from_header("session=known");
        let handle = sessions.begin(&mut jar).await.unwrap();

        assert_eq!(handle.origin(), SessionOrigin::Reused);
        assert_eq!(handle.id(), "known");
        assert!(handle.record().expires_at.is_some());
    }

    #[tokio::test]
    async fn test_expired_session_is_replaced() {
        let store = Arc::new(MemoryStore::new());
        let sessions = middleware(store.clone());
        let mut expired = SessionRecord::new();
        expired.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
        store
            .persist(&expired, "old", &mut CookieJar::new())
            .await
            .unwrap();

        let mut jar = CookieJar::from_header("session=old");
        let handle = sessions.begin(&mut jar).await.unwrap();

        assert_eq!(handle.origin(), SessionOrigin::Created);
        assert_eq!(handle.id(), "generated-0");
        assert!(store.fetch("old", &jar).await.unwrap().is_none());
        assert_eq!(jar.get("session"), Some("generated-0"));
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_open() {
        let sessions = middleware(Arc::new(FailingStore::new(FailOn::Fetch)));
        let mut jar = CookieJar::from_header("session=abc");

        let handle = sessions.begin(&mut jar).await.unwrap();
        assert_eq!(handle.origin(), SessionOrigin::Created);
    }

    #[tokio::test]
    async fn test_create_failure_is_propagated() {
        let sessions = middleware(Arc::new(FailingStore::new(FailOn::Create)));

        let result = sessions.begin(&mut CookieJar::new()).await;
        assert!(matches!(result, Err(SessionError::Backend(_))));
    }

    #[tokio::test]
    async fn test_persist_failure_is_propagated() {
        let sessions = middleware(Arc::new(FailingStore::new(FailOn::Persist)));
        let mut jar = CookieJar::new();

        let mut handle = sessions.begin(&mut jar).await.unwrap();
        handle.set("user_id", 5).unwrap();
        let result = sessions.finish(handle, &mut jar).await;
        assert!(matches!(result, Err(SessionError::Backend(_))));

        let result = sessions
            .run(&mut CookieJar::new(), async |session: &mut SessionHandle| {
                session.set("user_id", 6).unwrap();
            })
            .await;
        assert!(matches!(result, Err(SessionError::Backend(_))));
    }

    #[tokio::test]
    async fn test_delete_failure_is_propagated() {
        let store = Arc::new(FailingStore::new(FailOn::Delete));
        let sessions = middleware(store.clone());
        let mut jar = CookieJar::new();

        // Unmarked sessions never reach delete
        let handle = sessions.begin(&mut jar).await.unwrap();
        sessions.finish(handle, &mut jar).await.unwrap();

        let result = sessions
            .run(&mut jar, async |session: &mut SessionHandle| {
                session.mark_for_deletion();
            })
            .await;
        assert!(matches!(result, Err(SessionError::Backend(_))));
        assert_eq!(store.inner.len(), 1);
    }

    #[tokio::test]
    async fn test_finish_persists_and_renews() {
        let store = Arc::new(MemoryStore::new());
        let sessions = middleware(store.clone());
        let mut jar = CookieJar::new();

        let mut handle = sessions.begin(&mut jar).await.unwrap();
        handle.set("user_id", 5).unwrap();
        let id = handle.id().to_string();
        sessions.finish(handle, &mut jar).await.unwrap();

        let stored = store.fetch(&id, &jar).await.unwrap().unwrap();
        assert_eq!(stored.entries["user_id"].value, serde_json::json!(5));
        assert!(stored.expires_at.is_some());
        assert!(stored.accessed_at.is_some());
    }

    #[tokio::test]
    async fn test_deletion_wins() {
        let store = Arc::new(MemoryStore::new());
        let sessions = middleware(store.clone());
        let mut jar = CookieJar::new();

        let mut handle = sessions.begin(&mut jar).await.unwrap();
        let id = handle.id().to_string();
        handle.mark_for_deletion();
        handle.set("written_after", true).unwrap();
        sessions.finish(handle, &mut jar).await.unwrap();

        assert!(store.fetch(&id, &jar).await.unwrap().is_none());
        assert_eq!(jar.get("session"), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_cookie_store_skips_identifier_cookie() {
        let sessions = middleware(Arc::new(CookieStore::default()));
        let mut jar = CookieJar::new();

        let handle = sessions.begin(&mut jar).await.unwrap();

        // The cookie holds the encoded record, not the identifier
        let value = jar.get("session").unwrap();
        assert_ne!(value, handle.id());
        assert_eq!(jar.set_cookie_headers().len(), 1);
    }

    #[tokio::test]
    async fn test_cookie_store_session_gets_generated_identifier() {
        let sessions = middleware(Arc::new(CookieStore::default()));
        let mut jar = CookieJar::new();
        let handle = sessions.begin(&mut jar).await.unwrap();
        sessions.finish(handle, &mut jar).await.unwrap();

        let payload = jar.get("session").unwrap().to_string();
        let mut jar = CookieJar::new().with_cookie("session", payload.clone());
        let handle = sessions.begin(&mut jar).await.unwrap();

        assert_eq!(handle.origin(), SessionOrigin::Reused);
        assert_eq!(handle.id(), "generated-1");
        assert_ne!(handle.id(), payload);
    }

    #[tokio::test]
    async fn test_run_wraps_begin_and_finish() {
        let store = Arc::new(MemoryStore::new());
        let sessions = middleware(store.clone());
        let mut jar = CookieJar::new();

        let id = sessions
            .run(&mut jar, async |session: &mut SessionHandle| {
                session.set("step", 1).unwrap();
                session.id().to_string()
            })
            .await
            .unwrap();

        let stored = store.fetch(&id, &jar).await.unwrap().unwrap();
        assert!(stored.entries.contains_key("step"));
    }
}
