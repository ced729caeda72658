//! Error types for the API client.
//!
//! # Design
//! `ApiError` is the technical side of a failure: its `Display` text becomes
//! the `raw_error_message` of an [`ApiFailure`](crate::result::ApiFailure) and
//! is only ever logged. What the user sees comes from the status table in
//! [`messages`](crate::messages).

use crate::transport::TransportError;

/// Technical failure while performing an API call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("request failed with status code {status}")]
    Status { status: u16, body: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body was not JSON at all.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// No response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors raised while resolving [`AppConfig`](crate::config::AppConfig).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown app variant '{0}' (expected develop, staging or production)")]
    UnknownVariant(String),

    #[error("unknown log level '{0}' (expected debug, info, warn or error)")]
    UnknownLogLevel(String),

    #[error("API_URL must start with http:// or https://, got '{0}'")]
    InvalidApiUrl(String),
}
