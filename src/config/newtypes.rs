//! Validated newtype wrappers for dispatcher configuration values.
//!
//! Invalid values are rejected on construction so a built client never has
//! to re-check them.

use crate::error::ConfigError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A credential attached to outbound requests.
///
/// Holds a Discord bot token or a Crunchy API key. The value is masked in
/// debug output so it never ends up in logs.
///
/// # Example
///
/// ```rust
/// use crunchy_dispatch::Credential;
///
/// let token = Credential::new("my-bot-token").unwrap();
/// assert_eq!(format!("{:?}", token), "Credential(*****)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Creates a new validated credential.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyCredential`] if the value is empty or
    /// whitespace only.
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ConfigError::EmptyCredential);
        }
        Ok(Self(value))
    }
}

impl AsRef<str> for Credential {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(*****)")
    }
}

/// A validated base URL for a remote service.
///
/// Requires an alphabetic scheme and a non-empty host. Trailing slashes are
/// stripped so paths can be joined without doubling separators.
///
/// # Example
///
/// ```rust
/// use crunchy_dispatch::BaseUrl;
///
/// let url = BaseUrl::new("https://discord.com/api/v8/").unwrap();
/// assert_eq!(url.as_ref(), "https://discord.com/api/v8");
/// assert_eq!(url.scheme(), "https");
/// assert_eq!(url.host_name(), "discord.com");
/// assert_eq!(url.join("/users/@me"), "https://discord.com/api/v8/users/@me");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseUrl {
    url: String,
    scheme_end: usize,
    host_start: usize,
    host_end: usize,
}

impl BaseUrl {
    /// Creates a new validated base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the URL has no scheme or
    /// no host.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        let url = url.trim().trim_end_matches('/').to_string();

        let scheme_end = url
            .find("://")
            .ok_or_else(|| ConfigError::InvalidBaseUrl { url: url.clone() })?;

        let scheme = &url[..scheme_end];
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidBaseUrl { url: url.clone() });
        }

        let host_start = scheme_end + 3;
        let remainder = &url[host_start..];
        let host_end = remainder
            .find([':', '/', '?', '#'])
            .map_or(url.len(), |i| host_start + i);

        if host_end <= host_start {
            return Err(ConfigError::InvalidBaseUrl { url: url.clone() });
        }

        Ok(Self {
            url,
            scheme_end,
            host_start,
            host_end,
        })
    }

    /// Returns the URL scheme (e.g., "https").
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.url[..self.scheme_end]
    }

    /// Returns the host name portion of the URL.
    #[must_use]
    pub fn host_name(&self) -> &str {
        &self.url[self.host_start..self.host_end]
    }

    /// Resolves a request path against this base URL.
    ///
    /// Fully-qualified paths (`http://` or `https://`) are returned untouched,
    /// which lets callers hit URLs handed out by the service itself, such as
    /// webhook execution URLs.
    #[must_use]
    pub fn join(&self, path: &str) -> String {
        if is_absolute(path) {
            return path.to_string();
        }
        format!("{}/{}", self.url, path.trim_start_matches('/'))
    }
}

fn is_absolute(path: &str) -> bool {
    path.starts_with("https://") || path.starts_with("http://")
}

impl AsRef<str> for BaseUrl {
    fn as_ref(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl Serialize for BaseUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.url)
    }
}

impl<'de> Deserialize<'de> for BaseUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(de::Error::custom)
    }
}
