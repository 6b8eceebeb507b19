//! Error taxonomy for dispatched requests.
//!
//! Every call to a dispatcher ends in either a decoded body or exactly one
//! [`HttpError`] variant:
//!
//! - [`HttpError::Transport`]: the connection failed before any status arrived
//! - [`HttpError::ServerError`]: status 500 or above
//! - [`HttpError::Forbidden`]: status 403
//! - [`HttpError::NotFound`]: status 404
//! - [`HttpError::ClientError`]: any other non-2xx status, including a 429
//!   rejected by an edge proxy
//! - [`HttpError::MaxRetries`]: the attempt budget ran out while still being
//!   rate limited
//! - [`HttpError::InvalidRequest`]: the request was rejected before sending
//! - [`HttpError::Closed`]: the client was already closed
//!
//! Errors reach the caller unwrapped. Turning them into user-facing messages
//! is the caller's job.
//!
//! # Example
//!
//! ```rust,ignore
//! use crunchy_dispatch::HttpError;
//!
//! match client.request(request).await {
//!     Ok(body) => println!("created: {body}"),
//!     Err(HttpError::Forbidden(_)) => println!("missing MANAGE_WEBHOOKS"),
//!     Err(HttpError::NotFound(_)) => println!("webhook was deleted"),
//!     Err(HttpError::ServerError(e)) => println!("Discord is having issues: {}", e.code),
//!     Err(other) => return Err(other.into()),
//! }
//! ```

use thiserror::Error;

use crate::clients::http_response::ResponseBody;

/// A non-successful response, with its status and decoded body.
#[derive(Debug, Clone, Error)]
#[error("status {code}: {body}")]
pub struct HttpResponseError {
    /// The HTTP status code of the response.
    pub code: u16,
    /// The decoded response body.
    pub body: ResponseBody,
}

/// Error returned when the attempt budget was exhausted.
///
/// Returned when the final attempt was rate limited.
#[derive(Debug, Clone, Error)]
#[error("Exceeded maximum attempt count of {tries}. Last status {code}: {body}")]
pub struct MaxHttpRetriesExceededError {
    /// The HTTP status code of the last response.
    pub code: u16,
    /// The number of attempts made.
    pub tries: u32,
    /// The decoded body of the last response.
    pub body: ResponseBody,
}

/// Error returned when a request fails validation before it is sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// The request path was empty.
    #[error("Request path cannot be empty.")]
    EmptyPath,

    /// A header name or value could not be encoded.
    #[error("Invalid header '{name}'.")]
    InvalidHeader {
        /// The offending header name.
        name: String,
    },

    /// The resolved URL could not be parsed.
    #[error("Invalid request URL '{url}'.")]
    InvalidUrl {
        /// The URL that failed to parse.
        url: String,
    },
}

/// Unified error type for dispatched requests.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The transport failed before a status was obtained.
    ///
    /// The wrapped error is the one raised by the final attempt, unchanged.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a 5xx status.
    #[error("Server error: {0}")]
    ServerError(HttpResponseError),

    /// The service answered 403.
    #[error("Forbidden: {0}")]
    Forbidden(HttpResponseError),

    /// The service answered 404.
    #[error("Not found: {0}")]
    NotFound(HttpResponseError),

    /// Any other non-2xx status.
    #[error("Client error: {0}")]
    ClientError(HttpResponseError),

    /// Every attempt was consumed by rate limit waits.
    #[error(transparent)]
    MaxRetries(#[from] MaxHttpRetriesExceededError),

    /// Request validation failed.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),

    /// The client was closed before the request was issued.
    #[error("The client has been closed.")]
    Closed,
}

impl HttpError {
    /// Returns the response error for status-carrying variants.
    #[must_use]
    pub const fn response(&self) -> Option<&HttpResponseError> {
        match self {
            Self::ServerError(e) | Self::Forbidden(e) | Self::NotFound(e) | Self::ClientError(e) => {
                Some(e)
            }
            _ => None,
        }
    }

    /// Returns the HTTP status code, if a response was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::MaxRetries(e) => Some(e.code),
            _ => self.response().map(|e| e.code),
        }
    }

    /// Returns the decoded body, if a response was received.
    #[must_use]
    pub fn body(&self) -> Option<&ResponseBody> {
        match self {
            Self::MaxRetries(e) => Some(&e.body),
            _ => self.response().map(|e| &e.body),
        }
    }

    /// Returns `true` for a 429 that did not come from the service itself.
    ///
    /// Genuine rate limits are waited out inside the dispatcher, so a 429
    /// surfacing as [`HttpError::ClientError`] is always an edge block.
    #[must_use]
    pub const fn is_edge_block(&self) -> bool {
        matches!(self, Self::ClientError(e) if e.code == 429)
    }
}
