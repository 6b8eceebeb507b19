//! The request dispatcher shared by the Discord and Crunchy API clients.
//!
//! [`HttpClient`] serializes every request through a per-client lock,
//! retries transport failures with a linear backoff, waits out genuine rate
//! limits, and classifies everything else into [`HttpError`]. A single budget
//! of [`MAX_ATTEMPTS`] attempts covers both kinds of retry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Url;

use crate::clients::errors::{
    HttpError, HttpResponseError, InvalidHttpRequestError, MaxHttpRetriesExceededError,
};
use crate::clients::http_request::HttpRequest;
use crate::clients::http_response::{
    HttpResponse, RateLimitPayload, ResponseBody, StatusClass,
};
use crate::clients::lock::DispatchGuard;
use crate::config::{BaseUrl, Credential, DispatcherConfig, TransportBackoff};

/// Maximum number of attempts per request, shared by transport retries and
/// rate limit waits.
pub const MAX_ATTEMPTS: u32 = 5;

/// Header whose presence marks a 429 as coming from the service itself
/// rather than an edge proxy.
pub const RATE_LIMIT_MARKER_HEADER: &str = "via";

/// Crate version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Project URL advertised in the Discord `User-Agent`.
pub const PROJECT_URL: &str = "https://github.com/crunchy-bot/crunchy-dispatch";

/// How a client attaches its credential and reacts to rate-limit windows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceProfile {
    /// Discord REST API.
    ///
    /// Sends `Authorization: Bot <token>` only when the request asks for it,
    /// and holds the lock until an exhausted rate-limit window resets.
    Platform,
    /// Crunchy backend API.
    ///
    /// Sends the raw key as `Authorization` on every request and relies on
    /// 429 handling alone.
    Partner,
}

impl ServiceProfile {
    /// Returns a short name used in log output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Platform => "discord",
            Self::Partner => "crunchy-api",
        }
    }

    /// Returns the `Authorization` value for a request, if one is attached.
    #[must_use]
    pub fn authorization(self, credential: &Credential, pass_credential: bool) -> Option<String> {
        match self {
            Self::Platform if pass_credential => Some(format!("Bot {}", credential.as_ref())),
            Self::Platform => None,
            Self::Partner => Some(credential.as_ref().to_string()),
        }
    }

    /// Returns `true` when an exhausted window should hold the lock.
    #[must_use]
    pub const fn defers_on_exhausted_window(self) -> bool {
        matches!(self, Self::Platform)
    }

    fn user_agent(self) -> String {
        match self {
            Self::Platform => format!("DiscordBot ({PROJECT_URL}, {SDK_VERSION})"),
            Self::Partner => format!("crunchy-dispatch/{SDK_VERSION}"),
        }
    }
}

/// Rate-limited, retrying HTTP dispatcher for one remote service.
///
/// The client owns its lock and connection pool. Create one per service at
/// startup and share it by reference or `Arc`; every caller goes through the
/// same lock.
///
/// # Thread Safety
///
/// `HttpClient` is `Send + Sync`.
///
/// # Example
///
/// ```rust,ignore
/// use crunchy_dispatch::clients::{HttpClient, HttpMethod, HttpRequest, ServiceProfile};
///
/// let client = HttpClient::new(&config, ServiceProfile::Platform)?;
///
/// let request = HttpRequest::builder(HttpMethod::Get, "/users/@me")
///     .pass_credential(true)
///     .build()?;
///
/// let body = client.request(request).await?;
/// client.close();
/// ```
#[derive(Debug)]
pub struct HttpClient {
    /// Connection pool; `None` once closed.
    pool: Mutex<Option<reqwest::Client>>,
    /// Serializes requests, including deferred release windows.
    lock: Arc<tokio::sync::Mutex<()>>,
    base_url: BaseUrl,
    credential: Credential,
    profile: ServiceProfile,
    default_headers: HashMap<String, String>,
    backoff: TransportBackoff,
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl HttpClient {
    /// Creates a new dispatcher for the given configuration and profile.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::HttpClient`] if the connection pool
    /// cannot be created (e.g., TLS initialization failure).
    pub fn new(
        config: &DispatcherConfig,
        profile: ServiceProfile,
    ) -> Result<Self, crate::ConfigError> {
        let user_agent_prefix = config
            .user_agent_prefix()
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        let user_agent = format!("{user_agent_prefix}{}", profile.user_agent());

        let mut default_headers = HashMap::new();
        default_headers.insert("User-Agent".to_string(), user_agent);

        // Redirects surface as statuses instead of being followed.
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let pool = builder.build().map_err(|e| crate::ConfigError::HttpClient {
            reason: e.to_string(),
        })?;

        Ok(Self {
            pool: Mutex::new(Some(pool)),
            lock: Arc::new(tokio::sync::Mutex::new(())),
            base_url: config.base_url().clone(),
            credential: config.credential().clone(),
            profile,
            default_headers,
            backoff: config.transport_backoff(),
        })
    }

    /// Returns the base URL for this client.
    #[must_use]
    pub const fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Returns the profile this client was built with.
    #[must_use]
    pub const fn profile(&self) -> ServiceProfile {
        self.profile
    }

    /// Returns the headers attached to every request.
    ///
    /// The credential header is computed per request and not listed here.
    #[must_use]
    pub const fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Releases the connection pool.
    ///
    /// Idempotent, and safe to call on a client that never sent a request.
    /// Requests already in flight finish on their own handle to the pool;
    /// later requests fail with [`HttpError::Closed`].
    pub fn close(&self) {
        let pool = self
            .pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if pool.is_some() {
            tracing::debug!("Closed {} HTTP client", self.profile.name());
        }
    }

    /// Dispatches a request and returns its decoded body.
    ///
    /// The call waits for this client's lock and holds it across every
    /// attempt, including rate limit waits and transport backoff. On the
    /// Discord profile, a response reporting an exhausted rate-limit window
    /// keeps the lock held until the window resets, even after this call
    /// has returned.
    ///
    /// # Errors
    ///
    /// - [`HttpError::InvalidRequest`] if the request fails validation
    /// - [`HttpError::Closed`] if the client was closed
    /// - [`HttpError::ServerError`] on any 5xx (never retried)
    /// - [`HttpError::Forbidden`] / [`HttpError::NotFound`] on 403 / 404
    /// - [`HttpError::ClientError`] on other non-2xx statuses, and on 429s
    ///   without the marker header or a structured body
    /// - [`HttpError::Transport`] when the final attempt failed at the
    ///   transport layer
    /// - [`HttpError::MaxRetries`] when the final attempt was rate limited
    pub async fn request(&self, request: HttpRequest) -> Result<ResponseBody, HttpError> {
        request.verify()?;

        let pool = self.pool()?;
        let url = self.base_url.join(&request.path);
        let url = Url::parse(&url).map_err(|_| InvalidHttpRequestError::InvalidUrl { url })?;
        let headers = self.build_headers(&request)?;

        let mut guard = DispatchGuard::acquire(Arc::clone(&self.lock)).await;

        let mut attempt: u32 = 0;
        loop {
            let response = match Self::execute(&pool, &request, &url, &headers).await {
                Ok(response) => response,
                Err(error) => {
                    if error.is_builder() || attempt + 1 >= MAX_ATTEMPTS {
                        return Err(HttpError::Transport(error));
                    }
                    tracing::warn!(
                        "Transport failure on {} {}, retrying: {:?}",
                        request.http_method,
                        url,
                        error
                    );
                    tokio::time::sleep(self.backoff.delay_for(attempt)).await;
                    attempt += 1;
                    continue;
                }
            };

            let class = response.status_class();
            if self.profile.defers_on_exhausted_window()
                && !matches!(class, StatusClass::ServerError | StatusClass::RateLimited)
            {
                Self::defer_for_window(&mut guard, &response, &url);
            }

            match class {
                StatusClass::Success => {
                    tracing::debug!(
                        "{} {} successful response: {}",
                        request.http_method,
                        url,
                        response.body
                    );
                    return Ok(response.body);
                }
                StatusClass::RateLimited => {
                    let payload = if response.has_header(RATE_LIMIT_MARKER_HEADER) {
                        RateLimitPayload::from_body(&response.body)
                    } else {
                        None
                    };
                    let Some(payload) = payload else {
                        tracing::warn!(
                            "Rejected by an edge proxy on {} {}, not retrying",
                            request.http_method,
                            url
                        );
                        return Err(HttpError::ClientError(into_error(response)));
                    };

                    tracing::warn!(
                        "We are being rate limited. Retrying in {:.2} seconds.",
                        payload.retry_after
                    );
                    if payload.global {
                        tracing::warn!(
                            "Global rate limit has been hit. Retrying in {:.2} seconds.",
                            payload.retry_after
                        );
                    }

                    tokio::time::sleep(payload.retry_after()).await;
                    tracing::debug!("Rate limit wait period has elapsed. Retrying request.");

                    if attempt + 1 >= MAX_ATTEMPTS {
                        return Err(HttpError::MaxRetries(MaxHttpRetriesExceededError {
                            code: response.code,
                            tries: MAX_ATTEMPTS,
                            body: response.body,
                        }));
                    }
                    attempt += 1;
                }
                StatusClass::Forbidden => return Err(HttpError::Forbidden(into_error(response))),
                StatusClass::NotFound => return Err(HttpError::NotFound(into_error(response))),
                StatusClass::ServerError => {
                    return Err(HttpError::ServerError(into_error(response)))
                }
                StatusClass::ClientError => {
                    return Err(HttpError::ClientError(into_error(response)))
                }
            }
        }
    }

    fn pool(&self) -> Result<reqwest::Client, HttpError> {
        self.pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(HttpError::Closed)
    }

    /// Merges caller headers with the client's own; the client's win.
    fn build_headers(&self, request: &HttpRequest) -> Result<HeaderMap, InvalidHttpRequestError> {
        let mut headers = HeaderMap::new();

        let caller = request.extra_headers.iter().flatten();
        for (name, value) in caller.chain(&self.default_headers) {
            headers.insert(header_name(name)?, header_value(name, value)?);
        }

        if let Some(authorization) = self
            .profile
            .authorization(&self.credential, request.pass_credential)
        {
            let mut value = header_value(AUTHORIZATION.as_str(), &authorization)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// Runs one attempt: send, then drain the body before classifying.
    async fn execute(
        pool: &reqwest::Client,
        request: &HttpRequest,
        url: &Url,
        headers: &HeaderMap,
    ) -> Result<HttpResponse, reqwest::Error> {
        let mut builder = pool
            .request(request.http_method.as_reqwest(), url.clone())
            .headers(headers.clone());
        if let Some(query) = &request.query {
            builder = builder.query(query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let res = builder.send().await?;
        let code = res.status().as_u16();
        let res_headers = parse_response_headers(res.headers());
        let bytes = res.bytes().await?;

        Ok(HttpResponse::new(
            code,
            res_headers,
            ResponseBody::decode(&bytes),
        ))
    }

    fn defer_for_window(guard: &mut DispatchGuard, response: &HttpResponse, url: &Url) {
        let window = response.rate_limit_window();
        if !window.is_exhausted() {
            return;
        }

        match window.reset_after {
            Some(delay) => {
                tracing::debug!(
                    "Emptied rate limit bucket on endpoint: {}, retry: {:.2}",
                    url,
                    delay.as_secs_f64()
                );
                guard.defer(delay);
            }
            None => tracing::warn!(
                "Rate limit bucket on endpoint {} is empty but no reset was advertised",
                url
            ),
        }
    }
}

fn into_error(response: HttpResponse) -> HttpResponseError {
    HttpResponseError {
        code: response.code,
        body: response.body,
    }
}

fn header_name(name: &str) -> Result<HeaderName, InvalidHttpRequestError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| InvalidHttpRequestError::InvalidHeader {
        name: name.to_string(),
    })
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, InvalidHttpRequestError> {
    HeaderValue::from_str(value).map_err(|_| InvalidHttpRequestError::InvalidHeader {
        name: name.to_string(),
    })
}

/// Collects response headers under lowercase names.
fn parse_response_headers(headers: &HeaderMap) -> HashMap<String, Vec<String>> {
    let mut result: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers {
        let key = name.as_str().to_lowercase();
        let value = value.to_str().unwrap_or_default().to_string();
        result.entry(key).or_default().push(value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::HttpMethod;

    fn create_config() -> DispatcherConfig {
        DispatcherConfig::builder()
            .base_url(BaseUrl::new("https://discord.com/api/v8").unwrap())
            .credential(Credential::new("test-token").unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_platform_authorization_only_on_request() {
        let credential = Credential::new("abc").unwrap();
        assert_eq!(
            ServiceProfile::Platform.authorization(&credential, true),
            Some("Bot abc".to_string())
        );
        assert_eq!(ServiceProfile::Platform.authorization(&credential, false), None);
    }

    #[test]
    fn test_partner_authorization_always_attached() {
        let credential = Credential::new("abc").unwrap();
        assert_eq!(
            ServiceProfile::Partner.authorization(&credential, false),
            Some("abc".to_string())
        );
        assert_eq!(
            ServiceProfile::Partner.authorization(&credential, true),
            Some("abc".to_string())
        );
    }

    #[test]
    fn test_only_platform_defers() {
        assert!(ServiceProfile::Platform.defers_on_exhausted_window());
        assert!(!ServiceProfile::Partner.defers_on_exhausted_window());
    }

    #[test]
    fn test_user_agent_header_format() {
        let client = HttpClient::new(&create_config(), ServiceProfile::Platform).unwrap();
        let user_agent = client.default_headers().get("User-Agent").unwrap();
        assert!(user_agent.starts_with("DiscordBot ("));
        assert!(user_agent.contains(SDK_VERSION));
    }

    #[test]
    fn test_user_agent_with_prefix() {
        let config = DispatcherConfig::builder()
            .base_url(BaseUrl::new("https://api.crunchy.gg/v0").unwrap())
            .credential(Credential::new("key").unwrap())
            .user_agent_prefix("Crunchy/2.0")
            .build()
            .unwrap();
        let client = HttpClient::new(&config, ServiceProfile::Partner).unwrap();

        let user_agent = client.default_headers().get("User-Agent").unwrap();
        assert!(user_agent.starts_with("Crunchy/2.0 | crunchy-dispatch/"));
    }

    #[test]
    fn test_client_headers_override_caller_headers() {
        let client = HttpClient::new(&create_config(), ServiceProfile::Platform).unwrap();
        let request = HttpRequest::builder(HttpMethod::Get, "/users/@me")
            .header("User-Agent", "spoofed")
            .header("X-Audit-Log-Reason", "testing")
            .pass_credential(true)
            .build()
            .unwrap();

        let headers = client.build_headers(&request).unwrap();
        assert!(headers["user-agent"].to_str().unwrap().starts_with("DiscordBot"));
        assert_eq!(headers["x-audit-log-reason"], "testing");
        assert_eq!(headers[AUTHORIZATION], "Bot test-token");
        assert!(headers[AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn test_close_is_idempotent() {
        let client = HttpClient::new(&create_config(), ServiceProfile::Platform).unwrap();
        assert!(!client.is_closed());

        client.close();
        client.close();
        assert!(client.is_closed());
    }

    #[tokio::test]
    async fn test_request_after_close_fails() {
        let client = HttpClient::new(&create_config(), ServiceProfile::Platform).unwrap();
        client.close();

        let request = HttpRequest::builder(HttpMethod::Get, "/gateway")
            .build()
            .unwrap();
        let result = client.request(request).await;
        assert!(matches!(result, Err(HttpError::Closed)));
    }

    #[test]
    fn test_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpClient>();
    }
}
