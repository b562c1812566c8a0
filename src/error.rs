use std::time::Duration;
use thiserror::Error;

/// Failures of the geolocation adapter.
///
/// Permission denial is kept apart from the other variants because the UI
/// shows a different message (and a different remedy) for it.
#[derive(Debug, Error)]
pub enum LocationError {
    /// The user declined (or dismissed) the location consent prompt.
    #[error("location permission denied")]
    PermissionDenied,

    /// The position lookup failed or produced an unusable coordinate.
    #[error("position unavailable: {0}")]
    Unavailable(String),

    /// The lookup did not finish within the configured wait.
    #[error("position lookup timed out after {0:?}")]
    Timeout(Duration),
}

impl LocationError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, LocationError::PermissionDenied)
    }
}

/// Errors returned by the Gemini ranking client.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Gemini API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The provider refused the prompt and returned no candidates.
    #[error("prompt blocked by provider: {0}")]
    Blocked(String),

    /// The response envelope could not be decoded.
    #[error("could not decode Gemini response: {0}")]
    Decode(#[from] serde_json::Error),
}
