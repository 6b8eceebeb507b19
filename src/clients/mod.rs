//! HTTP dispatch for the Discord and Crunchy API clients.
//!
//! # Overview
//!
//! - [`HttpClient`]: the dispatcher engine
//! - [`PlatformClient`]: Discord REST API client
//! - [`PartnerClient`]: Crunchy backend API client
//! - [`HttpRequest`] / [`HttpRequestBuilder`]: request description
//! - [`ResponseBody`]: decoded response body
//! - [`HttpError`]: the error taxonomy
//! - [`DispatchGuard`]: scoped lock with deferred release
//!
//! # Retry Behavior
//!
//! Every request gets at most [`MAX_ATTEMPTS`] attempts:
//!
//! - **Transport failure**: retried after `1 + attempt * 2` seconds by default
//! - **429 with marker header and JSON body**: retried after `retry_after`
//! - **429 otherwise**: edge block, returned immediately as `ClientError`
//! - **5xx**: returned immediately, never retried
//! - **Other non-2xx**: returned immediately
//!
//! The lock is held across all attempts and waits, so concurrent callers on
//! the same client run strictly one after another.

mod errors;
mod http_client;
mod http_request;
mod http_response;
mod lock;
mod partner;
mod platform;

pub use errors::{
    HttpError, HttpResponseError, InvalidHttpRequestError, MaxHttpRetriesExceededError,
};
pub use http_client::{
    HttpClient, ServiceProfile, MAX_ATTEMPTS, PROJECT_URL, RATE_LIMIT_MARKER_HEADER, SDK_VERSION,
};
pub use http_request::{HttpMethod, HttpRequest, HttpRequestBuilder};
pub use http_response::{
    HttpResponse, RateLimitPayload, RateLimitWindow, ResponseBody, StatusClass,
    RATE_LIMIT_REMAINING_HEADER, RATE_LIMIT_RESET_AFTER_HEADER, RATE_LIMIT_RESET_HEADER,
};
pub use lock::{DispatchGuard, ScheduledRelease};
pub use partner::{PartnerClient, DEFAULT_PARTNER_API};
pub use platform::{PlatformClient, DEFAULT_PLATFORM_API};
