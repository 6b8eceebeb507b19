//! # crunchy-dispatch
//!
//! Rate-limited, retrying HTTP dispatcher behind the Crunchy bot's two
//! outbound clients: the Discord REST API and the Crunchy backend API.
//!
//! ## Overview
//!
//! - One lock per client serializes every request, including rate limit
//!   waits and deferred release windows
//! - Transport failures are retried with a linear backoff
//! - Genuine 429s are waited out; 429s from an edge proxy are not
//! - Bodies are decoded to JSON when possible, else text
//! - Every failure ends in one [`HttpError`] variant
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crunchy_dispatch::{Credential, PartnerClient, PlatformClient, HttpError};
//! use serde_json::json;
//!
//! let discord = PlatformClient::with_credential(Credential::new(bot_token)?)?;
//! let crunchy = PartnerClient::with_credential(Credential::new(api_key)?)?;
//!
//! let webhook = discord
//!     .post("/channels/1234/webhooks", json!({"name": "Crunchy Anime News"}), true)
//!     .await?;
//!
//! crunchy
//!     .post("events/news/update", json!({"guild_id": "1", "webhook_url": "..."}))
//!     .await?;
//!
//! discord.close();
//! crunchy.close();
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: each client owns its lock and connection pool
//! - **Fail-fast validation**: configuration newtypes validate on construction
//! - **Thread-safe**: all clients are `Send + Sync`
//! - **Async-first**: built on the Tokio runtime

pub mod clients;
pub mod config;
pub mod error;

pub use config::{BaseUrl, Credential, DispatcherConfig, DispatcherConfigBuilder, TransportBackoff};
pub use error::ConfigError;

pub use clients::{
    DispatchGuard, HttpClient, HttpError, HttpMethod, HttpRequest, HttpRequestBuilder,
    HttpResponseError, InvalidHttpRequestError, MaxHttpRetriesExceededError, PartnerClient,
    PlatformClient, ResponseBody, ServiceProfile,
};
