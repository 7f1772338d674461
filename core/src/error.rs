//! Error types for the todo API client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the resource does not exist" from "the server returned an unexpected
//! status." All other non-2xx responses land in `Http` with the status code
//! and the server's error message (or the raw body when it sent none).
//!
//! Transport failures are split into `Timeout` and `Transport`; the store
//! layer does not tell them apart and only keeps the display string.

use thiserror::Error;

/// Errors returned by `TodoClient` parse methods and `TodoApi` calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404, the requested todo does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The request never produced a response (connection refused, reset, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// No response arrived within the client timeout.
    #[error("request timed out")]
    Timeout,
}
