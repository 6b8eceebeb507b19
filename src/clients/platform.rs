//! Discord REST API client.
//!
//! [`PlatformClient`] binds the dispatcher to Discord: bot-token
//! authorization on demand, and proactive deferral when a response reports
//! that the current rate-limit bucket is empty.

use crate::clients::{
    HttpClient, HttpError, HttpMethod, HttpRequest, ResponseBody, ServiceProfile,
};
use crate::config::{BaseUrl, Credential, DispatcherConfig};
use crate::error::ConfigError;

/// Default Discord API base URL.
pub const DEFAULT_PLATFORM_API: &str = "https://discord.com/api/v8";

/// Discord REST API client.
///
/// # Example
///
/// ```rust,ignore
/// use crunchy_dispatch::{Credential, PlatformClient};
/// use serde_json::json;
///
/// let discord = PlatformClient::with_credential(Credential::new(token)?)?;
///
/// let webhook = discord
///     .post("/channels/1234/webhooks", json!({"name": "Crunchy Anime News"}), true)
///     .await?;
/// ```
#[derive(Debug)]
pub struct PlatformClient {
    http_client: HttpClient,
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<PlatformClient>();
};

impl PlatformClient {
    /// Creates a client from a full configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if the connection pool cannot be
    /// created.
    pub fn new(config: &DispatcherConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            http_client: HttpClient::new(config, ServiceProfile::Platform)?,
        })
    }

    /// Creates a client for the public Discord API with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the default URL fails validation or the
    /// connection pool cannot be created.
    pub fn with_credential(token: Credential) -> Result<Self, ConfigError> {
        let config = DispatcherConfig::builder()
            .base_url(BaseUrl::new(DEFAULT_PLATFORM_API)?)
            .credential(token)
            .build()?;
        Self::new(&config)
    }

    /// Returns the underlying dispatcher.
    #[must_use]
    pub const fn http_client(&self) -> &HttpClient {
        &self.http_client
    }

    /// Dispatches a request. See [`HttpClient::request`].
    ///
    /// # Errors
    ///
    /// Returns the classified [`HttpError`] unchanged.
    pub async fn request(&self, request: HttpRequest) -> Result<ResponseBody, HttpError> {
        self.http_client.request(request).await
    }

    /// Sends a GET request.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::request`].
    pub async fn get(&self, path: &str, pass_token: bool) -> Result<ResponseBody, HttpError> {
        let request = HttpRequest::builder(HttpMethod::Get, path)
            .pass_credential(pass_token)
            .build()?;
        self.request(request).await
    }

    /// Sends a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::request`].
    pub async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
        pass_token: bool,
    ) -> Result<ResponseBody, HttpError> {
        self.send_json(HttpMethod::Post, path, body, pass_token).await
    }

    /// Sends a PATCH request with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::request`].
    pub async fn patch(
        &self,
        path: &str,
        body: serde_json::Value,
        pass_token: bool,
    ) -> Result<ResponseBody, HttpError> {
        self.send_json(HttpMethod::Patch, path, body, pass_token).await
    }

    /// Sends a DELETE request.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::request`].
    pub async fn delete(&self, path: &str, pass_token: bool) -> Result<ResponseBody, HttpError> {
        let request = HttpRequest::builder(HttpMethod::Delete, path)
            .pass_credential(pass_token)
            .build()?;
        self.request(request).await
    }

    /// Releases the connection pool. Idempotent.
    pub fn close(&self) {
        self.http_client.close();
    }

    async fn send_json(
        &self,
        method: HttpMethod,
        path: &str,
        body: serde_json::Value,
        pass_token: bool,
    ) -> Result<ResponseBody, HttpError> {
        let request = HttpRequest::builder(method, path)
            .json(body)
            .pass_credential(pass_token)
            .build()?;
        self.request(request).await
    }
}
