//! Errors raised while resolving or running a command.
//!
//! None of these escape the executor; each is rendered into an error result.

use spot_client::SpotError;

/// Message fragment that marks a policy refusal. Stable, so agents can match on it.
pub const READ_ONLY_REFUSAL: &str = "is not available in read-only mode";

#[derive(Debug, Clone, thiserror::Error)]
pub enum CommandError {
    /// Mutating command refused by the restricted policy.
    #[error("Command '{name}' is not available in read-only mode")]
    Policy { name: String },

    /// No command with this name in the catalog.
    #[error("Unknown command: {name}")]
    NotFound { name: String },

    /// Arguments do not match the command's input schema.
    #[error("Invalid arguments for '{name}': {message}")]
    Validation { name: String, message: String },

    /// Failure from the Spot API (token exchange or resource call).
    #[error(transparent)]
    Spot(#[from] SpotError),

    /// Any other handler failure.
    #[error("{message}")]
    Handler { message: String },
}

impl CommandError {
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
        }
    }

    /// Short machine-readable kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Policy { .. } => "policy",
            Self::NotFound { .. } => "not_found",
            Self::Validation { .. } => "validation",
            Self::Spot(SpotError::Auth { .. }) => "auth",
            Self::Spot(SpotError::Transport { .. }) => "transport",
            Self::Spot(_) => "client",
            Self::Handler { .. } => "handler",
        }
    }
}
