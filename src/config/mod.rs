//! Configuration types for the dispatcher clients.
//!
//! # Overview
//!
//! - [`DispatcherConfig`]: everything a client needs to reach one service
//! - [`DispatcherConfigBuilder`]: builder for [`DispatcherConfig`]
//! - [`TransportBackoff`]: the linear backoff used after transport failures
//! - [`BaseUrl`] and [`Credential`]: validated newtypes
//!
//! Loading values from the environment is the caller's job; this module only
//! validates what it is handed.
//!
//! # Example
//!
//! ```rust
//! use crunchy_dispatch::{BaseUrl, Credential, DispatcherConfig};
//!
//! let config = DispatcherConfig::builder()
//!     .base_url(BaseUrl::new("https://discord.com/api/v8").unwrap())
//!     .credential(Credential::new("bot-token").unwrap())
//!     .user_agent_prefix("Crunchy/2.0")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.base_url().host_name(), "discord.com");
//! ```

mod newtypes;

pub use newtypes::{BaseUrl, Credential};

use std::time::Duration;

use crate::error::ConfigError;

/// Backoff applied between attempts that failed at the transport layer.
///
/// The wait before retry `k` (0-based attempt index of the failed attempt) is
/// `base + k * step`. The defaults give 1s, 3s, 5s, 7s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportBackoff {
    /// Delay after the first failed attempt.
    pub base: Duration,
    /// Extra delay added per preceding failed attempt.
    pub step: Duration,
}

impl TransportBackoff {
    /// Creates a backoff with the given base and step.
    #[must_use]
    pub const fn new(base: Duration, step: Duration) -> Self {
        Self { base, step }
    }

    /// Returns the delay to wait after the attempt with the given index failed.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base + self.step * attempt
    }
}

impl Default for TransportBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(2))
    }
}

/// Configuration for a single dispatcher client.
///
/// # Thread Safety
///
/// `DispatcherConfig` is `Clone`, `Send`, and `Sync`.
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    base_url: BaseUrl,
    credential: Credential,
    user_agent_prefix: Option<String>,
    transport_backoff: TransportBackoff,
    timeout: Option<Duration>,
}

impl DispatcherConfig {
    /// Creates a new builder for constructing a `DispatcherConfig`.
    #[must_use]
    pub fn builder() -> DispatcherConfigBuilder {
        DispatcherConfigBuilder::new()
    }

    /// Returns the base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Returns the credential attached to authenticated requests.
    #[must_use]
    pub const fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    /// Returns the transport failure backoff.
    #[must_use]
    pub const fn transport_backoff(&self) -> TransportBackoff {
        self.transport_backoff
    }

    /// Returns the per-attempt request timeout, if configured.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DispatcherConfig>();
};

/// Builder for constructing [`DispatcherConfig`] instances.
///
/// `credential` is required. `base_url` is required here; the platform and
/// partner clients offer constructors that fill in their default URLs.
///
/// # Defaults
///
/// - `user_agent_prefix`: `None`
/// - `transport_backoff`: 1s base, 2s step
/// - `timeout`: `None` (no per-attempt timeout)
#[derive(Debug, Default)]
pub struct DispatcherConfigBuilder {
    base_url: Option<BaseUrl>,
    credential: Option<Credential>,
    user_agent_prefix: Option<String>,
    transport_backoff: Option<TransportBackoff>,
    timeout: Option<Duration>,
}

impl DispatcherConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL (required).
    #[must_use]
    pub fn base_url(mut self, url: BaseUrl) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Sets the credential (required).
    #[must_use]
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Sets a prefix prepended to the `User-Agent` header.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Overrides the transport failure backoff.
    #[must_use]
    pub const fn transport_backoff(mut self, backoff: TransportBackoff) -> Self {
        self.transport_backoff = Some(backoff);
        self
    }

    /// Sets a timeout applied to every individual attempt.
    ///
    /// A timed-out attempt counts as a transport failure and is retried.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the [`DispatcherConfig`], validating that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `base_url` or
    /// `credential` are not set.
    pub fn build(self) -> Result<DispatcherConfig, ConfigError> {
        let base_url = self
            .base_url
            .ok_or(ConfigError::MissingRequiredField { field: "base_url" })?;
        let credential = self
            .credential
            .ok_or(ConfigError::MissingRequiredField {
                field: "credential",
            })?;

        Ok(DispatcherConfig {
            base_url,
            credential,
            user_agent_prefix: self.user_agent_prefix,
            transport_backoff: self.transport_backoff.unwrap_or_default(),
            timeout: self.timeout,
        })
    }
}
