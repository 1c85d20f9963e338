//! Session configuration.

use crate::cookie::CookieOptions;
use crate::error::{SessionError, SessionResult};
use std::env;
use std::time::Duration;

/// Default name of the session cookie.
pub const DEFAULT_COOKIE_NAME: &str = "session";

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sliding expiration applied on every request; `None` disables expiry
    pub ttl: Option<Duration>,
    /// Name of the cookie carrying the identifier
    pub cookie_name: String,
    /// Attributes for the identifier cookie
    pub cookie_options: CookieOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Some(Duration::from_secs(3600)), // 1 hour
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_options: CookieOptions::default(),
        }
    }
}

impl SessionConfig {
    /// Create a configuration with the given TTL.
    ///
    /// # Examples
    ///
    /// ```
    /// use armature_session::SessionConfig;
    /// use std::time::Duration;
    ///
    /// let config = SessionConfig::new(Duration::from_secs(600)).with_cookie_name("sid");
    /// assert_eq!(config.ttl, Some(Duration::from_secs(600)));
    /// assert_eq!(config.cookie_name, "sid");
    /// ```
    pub fn new(ttl: Duration) -> Self {
        Self::default().with_ttl(ttl)
    }

    /// Load overrides from the environment.
    ///
    /// - `ARMATURE_SESSION_TTL` - TTL in seconds, `0` disables expiry
    /// - `ARMATURE_SESSION_COOKIE` - cookie name
    pub fn from_env() -> SessionResult<Self> {
        let mut config = Self::default();

        if let Ok(ttl) = env::var("ARMATURE_SESSION_TTL") {
            let secs: u64 = ttl.trim().parse().map_err(|_| {
                SessionError::Config(format!("ARMATURE_SESSION_TTL is not a number: {}", ttl))
            })?;
            config = config.with_ttl(Duration::from_secs(secs));
        }

        if let Ok(name) = env::var("ARMATURE_SESSION_COOKIE") {
            config = config.with_cookie_name(name);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the sliding TTL. A zero TTL is treated as no TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = (!ttl.is_zero()).then_some(ttl);
        self
    }

    /// Sessions never expire.
    pub fn without_ttl(mut self) -> Self {
        self.ttl = None;
        self
    }

    /// Set the cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the cookie attributes.
    pub fn with_cookie_options(mut self, options: CookieOptions) -> Self {
        self.cookie_options = options;
        self
    }

    /// Check the cookie name is a valid RFC 6265 token.
    pub fn validate(&self) -> SessionResult<()> {
        validate_cookie_name(&self.cookie_name)
    }
}

pub(crate) fn validate_cookie_name(name: &str) -> SessionResult<()> {
    const SEPARATORS: &str = "()<>@,;:\\\"/[]?={} \t";

    if name.is_empty() {
        return Err(SessionError::Config(
            "cookie name must not be empty".to_string(),
        ));
    }

    if let Some(c) = name
        .chars()
        .find(|c| !c.is_ascii() || c.is_ascii_control() || SEPARATORS.contains(*c))
    {
        return Err(SessionError::Config(format!(
            "invalid character {:?} in cookie name {:?}",
            c, name
        )));
    }

    Ok(())
}
