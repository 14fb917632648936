//! Error types shared by the backend clients, loader and exporters.

use thiserror::Error;

/// Main error type for course statistics operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend rejected the request body (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or invalid credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Target resource does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Success status but a body of the wrong shape
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The session token is past its expiry
    #[error("Session expired")]
    SessionExpired,

    /// Current user may not view the requested data
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Maps a non-success HTTP status and its `{error}` message onto a variant.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 => Error::Validation(message),
            401 => Error::Unauthorized(message),
            403 => Error::Forbidden(message),
            404 => Error::NotFound(message),
            _ => Error::Server { status, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_maps_known_codes() {
        assert!(matches!(Error::from_status(400, "bad"), Error::Validation(m) if m == "bad"));
        assert!(matches!(Error::from_status(401, "x"), Error::Unauthorized(_)));
        assert!(matches!(Error::from_status(403, "x"), Error::Forbidden(_)));
        assert!(matches!(Error::from_status(404, "x"), Error::NotFound(_)));
        assert!(matches!(
            Error::from_status(500, "boom"),
            Error::Server { status: 500, .. }
        ));
        assert!(matches!(
            Error::from_status(418, "teapot"),
            Error::Server { status: 418, .. }
        ));
    }

    #[test]
    fn test_display_includes_message() {
        let err = Error::from_status(503, "maintenance");
        assert_eq!(err.to_string(), "Server error (503): maintenance");
        assert_eq!(Error::SessionExpired.to_string(), "Session expired");
    }
}
