//! Crunchy backend API client.
//!
//! [`PartnerClient`] sends its API key on every request and relies on 429
//! handling alone; it never holds the lock past the end of a call.

use std::collections::HashMap;

use crate::clients::{
    HttpClient, HttpError, HttpMethod, HttpRequest, ResponseBody, ServiceProfile,
};
use crate::config::{BaseUrl, Credential, DispatcherConfig};
use crate::error::ConfigError;

/// Default Crunchy API base URL.
pub const DEFAULT_PARTNER_API: &str = "https://api.crunchy.gg/v0";

/// Crunchy backend API client.
///
/// # Example
///
/// ```rust,ignore
/// use crunchy_dispatch::{Credential, PartnerClient};
///
/// let crunchy = PartnerClient::with_credential(Credential::new(api_key)?)?;
///
/// let results = crunchy
///     .get("anime/search", [("query", "bleach"), ("limit", "3")].into())
///     .await?;
/// ```
#[derive(Debug)]
pub struct PartnerClient {
    http_client: HttpClient,
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<PartnerClient>();
};

impl PartnerClient {
    /// Creates a client from a full configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if the connection pool cannot be
    /// created.
    pub fn new(config: &DispatcherConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            http_client: HttpClient::new(config, ServiceProfile::Partner)?,
        })
    }

    /// Creates a client for the public Crunchy API with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the default URL fails validation or the
    /// connection pool cannot be created.
    pub fn with_credential(api_key: Credential) -> Result<Self, ConfigError> {
        let config = DispatcherConfig::builder()
            .base_url(BaseUrl::new(DEFAULT_PARTNER_API)?)
            .credential(api_key)
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

    /// Sends a GET request with query parameters.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::request`].
    pub async fn get<K, V>(
        &self,
        path: &str,
        query: HashMap<K, V>,
    ) -> Result<ResponseBody, HttpError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let query = query
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let request = HttpRequest::builder(HttpMethod::Get, path)
            .query(query)
            .build()?;
        self.request(request).await
    }

    /// Sends a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::request`].
    pub async fn post(&self, path: &str, body: serde_json::Value) -> Result<ResponseBody, HttpError> {
        self.send_json(HttpMethod::Post, path, body).await
    }

    /// Sends a PUT request with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::request`].
    pub async fn put(&self, path: &str, body: serde_json::Value) -> Result<ResponseBody, HttpError> {
        self.send_json(HttpMethod::Put, path, body).await
    }

    /// Sends a DELETE request.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::request`].
    pub async fn delete(&self, path: &str) -> Result<ResponseBody, HttpError> {
        let request = HttpRequest::builder(HttpMethod::Delete, path).build()?;
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
    ) -> Result<ResponseBody, HttpError> {
        let request = HttpRequest::builder(method, path).json(body).build()?;
        self.request(request).await
    }
}
