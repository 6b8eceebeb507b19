//! Request types for the dispatcher.
//!
//! This module provides [`HttpRequest`] and its builder. A request is plain
//! data; the dispatcher decides which headers to add on top of it.

use std::collections::HashMap;
use std::fmt;

use reqwest::header::{HeaderName, HeaderValue};

use crate::clients::errors::InvalidHttpRequestError;

/// HTTP methods used by the Discord and Crunchy APIs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl HttpMethod {
    pub(crate) fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Patch => write!(f, "PATCH"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A request to be dispatched.
///
/// Use [`HttpRequest::builder`] to construct requests.
///
/// # Example
///
/// ```rust
/// use crunchy_dispatch::clients::{HttpMethod, HttpRequest};
/// use serde_json::json;
///
/// let request = HttpRequest::builder(HttpMethod::Post, "/channels/1234/webhooks")
///     .pass_credential(true)
///     .json(json!({"name": "Crunchy Anime News"}))
///     .build()
///     .unwrap();
///
/// assert!(request.pass_credential);
/// ```
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// Request method.
    pub http_method: HttpMethod,
    /// Path relative to the client's base URL, or a fully-qualified URL.
    pub path: String,
    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
    /// Query string pairs.
    pub query: Option<HashMap<String, String>>,
    /// Caller headers. The client's own headers take precedence on collision.
    pub extra_headers: Option<HashMap<String, String>>,
    /// Whether the credential should be attached.
    ///
    /// Only consulted by clients that attach their credential on demand.
    pub pass_credential: bool,
}

impl HttpRequest {
    /// Starts a request for `method` on `path`.
    #[must_use]
    pub fn builder(method: HttpMethod, path: impl Into<String>) -> HttpRequestBuilder {
        HttpRequestBuilder::new(method, path)
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError`] if:
    /// - `path` is empty
    /// - an extra header name or value cannot be encoded
    pub fn verify(&self) -> Result<(), InvalidHttpRequestError> {
        if self.path.trim().is_empty() {
            return Err(InvalidHttpRequestError::EmptyPath);
        }

        if let Some(headers) = &self.extra_headers {
            for (name, value) in headers {
                if HeaderName::from_bytes(name.as_bytes()).is_err()
                    || HeaderValue::from_str(value).is_err()
                {
                    return Err(InvalidHttpRequestError::InvalidHeader { name: name.clone() });
                }
            }
        }

        Ok(())
    }
}

/// Fluent builder for [`HttpRequest`].
#[derive(Debug)]
pub struct HttpRequestBuilder {
    http_method: HttpMethod,
    path: String,
    body: Option<serde_json::Value>,
    query: Option<HashMap<String, String>>,
    extra_headers: Option<HashMap<String, String>>,
    pass_credential: bool,
}

impl HttpRequestBuilder {
    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            http_method: method,
            path: path.into(),
            body: None,
            query: None,
            extra_headers: None,
            pass_credential: false,
        }
    }

    /// Sets the JSON request body.
    #[must_use]
    pub fn json(mut self, body: impl Into<serde_json::Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Replaces the query string pairs.
    #[must_use]
    pub fn query(mut self, query: HashMap<String, String>) -> Self {
        self.query = Some(query);
        self
    }

    /// Appends one query string pair.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Replaces the caller headers.
    #[must_use]
    pub fn extra_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.extra_headers = Some(headers);
        self
    }

    /// Adds one header to send with the request.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Requests that the client attach its credential.
    #[must_use]
    pub const fn pass_credential(mut self, pass: bool) -> Self {
        self.pass_credential = pass;
        self
    }

    /// Finishes the request and checks it.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError`] if the request fails validation.
    pub fn build(self) -> Result<HttpRequest, InvalidHttpRequestError> {
        let request = HttpRequest {
            http_method: self.http_method,
            path: self.path,
            body: self.body,
            query: self.query,
            extra_headers: self.extra_headers,
            pass_credential: self.pass_credential,
        };
        request.verify()?;
        Ok(request)
    }
}
