//! Response types for the dispatcher.
//!
//! This module provides the decoded [`ResponseBody`], the [`StatusClass`]
//! used to classify responses, and the rate-limit data read from headers
//! and 429 payloads.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Remaining requests in the current rate-limit window.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Seconds until the current rate-limit window resets.
pub const RATE_LIMIT_RESET_AFTER_HEADER: &str = "x-ratelimit-reset-after";

/// Epoch seconds at which the current rate-limit window resets.
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// A decoded response body.
///
/// Bodies that parse as JSON are exposed as [`ResponseBody::Json`]; anything
/// else, including an empty body, is exposed as text.
///
/// # Example
///
/// ```rust
/// use crunchy_dispatch::ResponseBody;
///
/// let body = ResponseBody::decode(br#"{"id": "1234"}"#);
/// assert_eq!(body.as_json().unwrap()["id"], "1234");
///
/// let body = ResponseBody::decode(b"<html>banned</html>");
/// assert_eq!(body.as_text(), Some("<html>banned</html>"));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
    /// The body parsed as JSON.
    Json(serde_json::Value),
    /// The body did not parse as JSON.
    Text(String),
}

impl ResponseBody {
    /// Decodes raw body bytes, preferring JSON.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).map_or_else(
            |_| Self::Text(String::from_utf8_lossy(bytes).into_owned()),
            Self::Json,
        )
    }

    /// Returns the JSON value, if the body was JSON.
    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Returns the text, if the body was not JSON.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Json(_) => None,
            Self::Text(text) => Some(text),
        }
    }

    /// Returns `true` when the body decoded to structured data.
    ///
    /// A JSON string literal counts as plain text.
    #[must_use]
    pub const fn is_structured(&self) -> bool {
        !matches!(self, Self::Text(_) | Self::Json(serde_json::Value::String(_)))
    }

    /// Deserializes a JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the body is text or does not match `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match self {
            Self::Json(value) => T::deserialize(value),
            Self::Text(text) => serde_json::from_str(text),
        }
    }
}

impl fmt::Display for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// The closed set of status classes the dispatcher reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    /// 200-299.
    Success,
    /// 429.
    RateLimited,
    /// 403.
    Forbidden,
    /// 404.
    NotFound,
    /// 500 and above.
    ServerError,
    /// Any other status.
    ClientError,
}

impl StatusClass {
    /// Classifies a status code.
    #[must_use]
    pub const fn from_code(code: u16) -> Self {
        match code {
            500.. => Self::ServerError,
            200..=299 => Self::Success,
            429 => Self::RateLimited,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            _ => Self::ClientError,
        }
    }
}

/// The body Discord and the Crunchy API send with a genuine 429.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RateLimitPayload {
    /// Seconds to wait before retrying.
    pub retry_after: f64,
    /// Whether the limit applies to the whole application.
    #[serde(default)]
    pub global: bool,
    /// Human readable message, if provided.
    #[serde(default)]
    pub message: Option<String>,
}

impl RateLimitPayload {
    /// Extracts the payload from a decoded body.
    ///
    /// Returns `None` unless the body is a JSON object whose `retry_after`
    /// is a representable, non-negative number of seconds.
    #[must_use]
    pub fn from_body(body: &ResponseBody) -> Option<Self> {
        let value = body.as_json().filter(|value| value.is_object())?;
        let payload: Self = Self::deserialize(value).ok()?;
        Duration::try_from_secs_f64(payload.retry_after)
            .is_ok()
            .then_some(payload)
    }

    /// Returns the wait as a [`Duration`].
    #[must_use]
    pub fn retry_after(&self) -> Duration {
        Duration::try_from_secs_f64(self.retry_after).unwrap_or_default()
    }
}

/// Rate-limit window state read from response headers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RateLimitWindow {
    /// Requests left in the current window.
    pub remaining: Option<u32>,
    /// Time until the window resets.
    pub reset_after: Option<Duration>,
}

impl RateLimitWindow {
    /// Parses the window from response headers, using the current time for
    /// the absolute reset fallback.
    #[must_use]
    pub fn from_headers(headers: &HashMap<String, Vec<String>>) -> Self {
        Self::from_headers_at(headers, Utc::now())
    }

    /// Parses the window from response headers relative to `now`.
    ///
    /// `X-RateLimit-Reset-After` is preferred. When it is missing the delay
    /// is computed from the absolute `X-RateLimit-Reset` timestamp; a reset
    /// time already in the past yields a zero delay.
    #[must_use]
    pub fn from_headers_at(headers: &HashMap<String, Vec<String>>, now: DateTime<Utc>) -> Self {
        let remaining = first_header(headers, RATE_LIMIT_REMAINING_HEADER)
            .and_then(|value| value.trim().parse().ok());

        let reset_after = first_header(headers, RATE_LIMIT_RESET_AFTER_HEADER)
            .and_then(parse_seconds)
            .or_else(|| {
                let reset = first_header(headers, RATE_LIMIT_RESET_HEADER)?
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|secs| secs.is_finite())?;
                #[allow(clippy::cast_possible_truncation)]
                let reset = Utc.timestamp_millis_opt((reset * 1000.0) as i64).single()?;
                Some((reset - now).to_std().unwrap_or(Duration::ZERO))
            });

        Self {
            remaining,
            reset_after,
        }
    }

    /// Returns `true` when the window reports no remaining requests.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self.remaining, Some(0))
    }
}

fn first_header<'a>(headers: &'a HashMap<String, Vec<String>>, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|values| values.first())
        .map(String::as_str)
}

fn parse_seconds(value: &str) -> Option<Duration> {
    let secs = value.trim().parse::<f64>().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

/// A response as seen by the dispatcher: status, headers, decoded body.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub code: u16,
    /// Response headers, keyed by lowercase name.
    pub headers: HashMap<String, Vec<String>>,
    /// The decoded response body.
    pub body: ResponseBody,
}

impl HttpResponse {
    /// Creates a new `HttpResponse`.
    #[must_use]
    pub const fn new(code: u16, headers: HashMap<String, Vec<String>>, body: ResponseBody) -> Self {
        Self {
            code,
            headers,
            body,
        }
    }

    /// Returns the status class of this response.
    #[must_use]
    pub const fn status_class(&self) -> StatusClass {
        StatusClass::from_code(self.code)
    }

    /// Returns `true` if the named header is present and non-empty.
    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        first_header(&self.headers, &name.to_ascii_lowercase()).is_some_and(|v| !v.is_empty())
    }

    /// Returns the rate-limit window advertised by this response.
    #[must_use]
    pub fn rate_limit_window(&self) -> RateLimitWindow {
        RateLimitWindow::from_headers(&self.headers)
    }
}
