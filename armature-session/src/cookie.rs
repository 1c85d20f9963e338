//! Cookie transport for the session identifier.
//!
//! The jar is the per-request view of cookies: it is built from the
//! incoming `Cookie` header, accumulates `Set-Cookie` writes, and answers
//! reads with the latest value for the current request.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

/// Cookie SameSite attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes forwarded verbatim to `Set-Cookie`.
#[derive(Debug, Clone, PartialEq)]
pub struct CookieOptions {
    /// Cookie domain
    pub domain: Option<String>,
    /// Cookie path
    pub path: Option<String>,
    /// Max-Age attribute
    pub max_age: Option<Duration>,
    /// Expires attribute
    pub expires: Option<DateTime<Utc>>,
    /// SameSite policy
    pub same_site: Option<SameSite>,
    /// Secure flag (HTTPS only)
    pub secure: bool,
    /// HttpOnly flag
    pub http_only: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            domain: None,
            path: Some("/".to_string()),
            max_age: None,
            expires: None,
            same_site: Some(SameSite::Lax),
            secure: false,
            http_only: true,
        }
    }
}

impl CookieOptions {
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Render a `Set-Cookie` header value.
    pub fn format(&self, name: &str, value: &str) -> String {
        let mut cookie = format!("{}={}", name, value);

        if let Some(ref path) = self.path {
            cookie.push_str(&format!("; Path={}", path));
        }

        if let Some(ref domain) = self.domain {
            cookie.push_str(&format!("; Domain={}", domain));
        }

        if let Some(max_age) = self.max_age {
            cookie.push_str(&format!("; Max-Age={}", max_age.as_secs()));
        }

        if let Some(expires) = self.expires {
            cookie.push_str(&format!("; Expires={}", http_date(expires)));
        }

        if self.secure {
            cookie.push_str("; Secure");
        }

        if self.http_only {
            cookie.push_str("; HttpOnly");
        }

        if let Some(same_site) = self.same_site {
            cookie.push_str(&format!("; SameSite={}", same_site.as_str()));
        }

        cookie
    }

    /// Render a header that makes the client drop the cookie.
    fn format_removal(&self, name: &str) -> String {
        let removal = CookieOptions {
            max_age: Some(Duration::ZERO),
            expires: Some(DateTime::<Utc>::UNIX_EPOCH),
            ..self.clone()
        };
        removal.format(name, "")
    }
}

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Cookies of one request/response cycle.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    /// Cookies presented by the client
    incoming: HashMap<String, String>,
    /// Pending writes; `None` marks a removal
    outgoing: Vec<(String, Option<String>, String)>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `Cookie` request header (`a=1; b=2`).
    pub fn from_header(header: &str) -> Self {
        let incoming = header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                let value = value.trim().trim_matches('"');
                Some((name.to_string(), value.to_string()))
            })
            .collect();

        Self {
            incoming,
            outgoing: Vec::new(),
        }
    }

    /// Build from a header map, matching `Cookie` case-insensitively.
    pub fn from_headers(headers: &HashMap<String, String>) -> Self {
        headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("cookie"))
            .map(|(_, value)| Self::from_header(value))
            .unwrap_or_default()
    }

    /// Add a cookie as if the client had presented it.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.incoming.insert(name.into(), value.into());
        self
    }

    /// Current value of a cookie, including writes made in this request.
    pub fn get(&self, name: &str) -> Option<&str> {
        if let Some((_, value, _)) = self.outgoing.iter().rev().find(|(n, _, _)| n == name) {
            return value.as_deref();
        }
        self.incoming.get(name).map(String::as_str)
    }

    /// Queue a cookie write.
    pub fn set(&mut self, name: &str, value: &str, options: &CookieOptions) {
        let header = options.format(name, value);
        self.outgoing
            .push((name.to_string(), Some(value.to_string()), header));
    }

    /// Queue a cookie removal.
    pub fn remove(&mut self, name: &str, options: &CookieOptions) {
        let header = options.format_removal(name);
        self.outgoing.push((name.to_string(), None, header));
    }

    /// `Set-Cookie` header values, one per cookie, last write wins.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        let mut headers: Vec<(&str, &str)> = Vec::new();
        for (name, _, header) in &self.outgoing {
            match headers.iter().position(|(n, _)| *n == name.as_str()) {
                Some(pos) => headers[pos].1 = header.as_str(),
                None => headers.push((name.as_str(), header.as_str())),
            }
        }
        headers
            .into_iter()
            .map(|(_, header)| header.to_string())
            .collect()
    }
}
