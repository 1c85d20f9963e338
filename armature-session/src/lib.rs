//! Session storage for Armature framework.
//!
//! Server-side session state for request/response cycles: data keyed by an
//! opaque identifier carried in a cookie, with a sliding time-to-live,
//! one-shot flash values, and a swappable persistence backend.
//!
//! # ⚠️ Important: Stateless Architecture is Preferred
//!
//! **Armature strongly recommends stateless architecture using JWT tokens
//! instead of server-side sessions.** This module is provided for cases
//! where sessions are absolutely necessary (e.g., legacy system integration,
//! flash messages across redirects, server-rendered forms).
//!
//! # Lifecycle
//!
//! 1. [`SessionMiddleware::begin`] reads the session cookie and fetches the
//!    record from the store. Missing, unreadable or expired sessions are
//!    replaced by a fresh empty one.
//! 2. Handler code reads and writes through the [`SessionHandle`].
//! 3. [`SessionMiddleware::finish`] slides the expiry, persists the record,
//!    and deletes it if the handler called
//!    [`mark_for_deletion`](SessionHandle::mark_for_deletion).
//!
//! # Stores
//!
//! All stores implement [`SessionStore`] and behave the same from the
//! middleware's point of view:
//!
//! - [`MemoryStore`] - in-process map, lost on restart
//! - [`CookieStore`] - the record itself travels in the cookie
//! - [`DurableStore`] - one serialized row per session in a [`SessionTable`]:
//!   [`SqliteTable`] (`sqlite` feature, default) or [`RedisTable`]
//!   (`redis` feature)
//!
//! # Examples
//!
//! ```
//! use armature_session::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SessionError> {
//!     let store = Arc::new(MemoryStore::new());
//!     let sessions = SessionMiddleware::new(store, SessionConfig::new(Duration::from_secs(3600)));
//!
//!     // First request: no cookie, a session is created
//!     let mut jar = CookieJar::new();
//!     let mut session = sessions.begin(&mut jar).await?;
//!     session.flash("notice", "Welcome back!")?;
//!     sessions.finish(session, &mut jar).await?;
//!     let id = jar.get("session").unwrap().to_string();
//!
//!     // Second request presents the cookie
//!     let mut jar = CookieJar::from_header(&format!("session={}", id));
//!     let mut session = sessions.begin(&mut jar).await?;
//!     assert_eq!(session.get::<String>("notice").as_deref(), Some("Welcome back!"));
//!     assert_eq!(session.get::<String>("notice"), None);
//!     sessions.finish(session, &mut jar).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod cookie;
pub mod error;
pub mod handle;
pub mod id;
pub mod middleware;
pub mod record;
pub mod store;

pub use config::SessionConfig;
pub use cookie::{CookieJar, CookieOptions, SameSite};
pub use error::{SessionError, SessionResult};
pub use handle::{SessionHandle, SessionOrigin};
pub use id::{AlphanumericIdGenerator, IdGenerator, UuidIdGenerator};
pub use middleware::SessionMiddleware;
pub use record::{SessionEntry, SessionRecord};
pub use store::{CookieStore, DurableStore, MemoryStore, SessionStore, SessionTable};

#[cfg(feature = "sqlite")]
pub use store::SqliteTable;

#[cfg(feature = "redis")]
pub use store::RedisTable;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::SessionConfig;
    pub use crate::cookie::{CookieJar, CookieOptions, SameSite};
    pub use crate::error::{SessionError, SessionResult};
    pub use crate::handle::{SessionHandle, SessionOrigin};
    pub use crate::middleware::SessionMiddleware;
    pub use crate::store::{CookieStore, DurableStore, MemoryStore, SessionStore, SessionTable};

    #[cfg(feature = "sqlite")]
    pub use crate::store::SqliteTable;

    #[cfg(feature = "redis")]
    pub use crate::store::RedisTable;
}
