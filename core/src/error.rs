//! Error types for the Copper API client.
//!
//! # Design
//! One `Error` enum is the common ancestor for every failure this library
//! can produce, so callers can match on "anything from copper" in a single
//! arm. `Configuration` and `Validation` are raised eagerly at the call that
//! detects them; HTTP failure statuses are *not* errors at the connection
//! layer (the raw `Response` comes back for inspection) — resource-level
//! code opts into `Api` via `Response::api_error` when a failure status
//! should become a hard failure.

use thiserror::Error;

/// Errors produced by the Copper client.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing connection setup: bad URL shape, duplicate
    /// connection name, unknown connection name.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Schema load/dump failure: required field absent, null where not
    /// allowed, or a value that fails type coercion.
    #[error("validation error: {0}")]
    Validation(String),

    /// The remote service answered a validly-issued request with a failure
    /// status. Carries the response body for debugging.
    #[error("API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// Transport-level HTTP failure (connection refused, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] ureq::Error),

    /// A payload could not be encoded to or decoded from JSON.
    #[error("JSON error: {0}")]
    Decode(#[from] serde_json::Error),
}
