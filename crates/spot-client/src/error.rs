//! Error types for the Spot API client.

/// Spot client errors.
///
/// Errors are `Clone` so a single failed token exchange can be handed to
/// every caller that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpotError {
    /// Token exchange rejected by the authentication endpoint.
    #[error("authentication failed: HTTP {status} - {body}")]
    Auth { status: u16, body: String },

    /// Non-2xx response from a resource endpoint.
    #[error("request failed: HTTP {status} - {body}")]
    Transport { status: u16, body: String },

    /// Connection-level failure (DNS, TLS, timeout, reset).
    #[error("network error: {message}")]
    Network { message: String },

    /// 2xx response whose body could not be understood.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// A namespace or name that cannot be used as a path segment.
    #[error("invalid path segment {segment:?}: {reason}")]
    InvalidPath { segment: String, reason: String },
}

impl SpotError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Transport { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the error came from the token exchange.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}

impl From<reqwest::Error> for SpotError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for Spot client operations.
pub type SpotResult<T> = Result<T, SpotError>;
