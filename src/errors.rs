//! Error types for the Asana collaborator and the resolution engine.

use thiserror::Error;

/// Errors that can occur talking to the Asana API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success response.
    #[error("Asana API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body could not be decoded.
    #[error("Failed to decode Asana response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors surfaced by task location.
///
/// `NotFound` and `Ambiguous` are ordinary outcomes, not errors — they live on
/// [`crate::entities::TaskMatch`]. Only a failed search with no stand-in data
/// source is an error here.
#[derive(Debug, Error)]
pub enum LocateError {
    /// The task-search collaborator failed; there is no cached task index to
    /// fall back on.
    #[error("task search unavailable: {0}")]
    ProviderUnavailable(#[source] ApiError),
}
