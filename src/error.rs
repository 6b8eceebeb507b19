//! Configuration error types for the dispatcher crate.
//!
//! Dispatch-time failures live in [`crate::clients::HttpError`]; this module
//! only covers problems detected while building a client.
//!
//! # Example
//!
//! ```rust
//! use crunchy_dispatch::{ConfigError, Credential};
//!
//! let result = Credential::new("");
//! assert!(matches!(result, Err(ConfigError::EmptyCredential)));
//! ```

use thiserror::Error;

/// Errors that can occur while configuring a dispatcher.
///
/// Each variant carries enough context to tell the operator which value
/// needs fixing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The credential (bot token or API key) was empty.
    #[error("Credential cannot be empty. Please provide a valid token.")]
    EmptyCredential,

    /// The base URL could not be validated.
    #[error("Invalid base URL '{url}'. Please provide a URL with scheme and host (e.g., 'https://discord.com/api/v8').")]
    InvalidBaseUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// The underlying HTTP connection pool could not be created.
    #[error("Failed to create HTTP client: {reason}")]
    HttpClient {
        /// Description of the construction failure.
        reason: String,
    },
}
