//! Error types for lightsock

use std::io;

use thiserror::Error;

/// Result type alias for lightsock
pub type Result<T> = std::result::Result<T, Error>;

/// Lightsock errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// SSRA or gateway API returned a non-success status
    #[error("API error: {0}")]
    Api(String),

    /// Login response did not carry the expected credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A required handoff field (token, nonce, or cookie) was absent
    #[error("Malformed handoff: {0}")]
    MalformedHandoff(String),

    /// Websocket connection or protocol error
    #[error("Stream error: {0}")]
    Stream(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
