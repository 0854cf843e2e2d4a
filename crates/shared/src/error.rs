use thiserror::Error;

/// Failure reported by a scoring service call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceFailure {
    /// The service answered with an error status; the message is shown to
    /// the player verbatim.
    #[error("scoring service rejected the request: {0}")]
    Rejected(String),
    /// Network failure, non-success HTTP status, or an unreadable body.
    /// The detail is for logs only.
    #[error("scoring service transport failure: {0}")]
    Transport(String),
}

/// Why a controller operation did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("identity code must not be empty")]
    Validation,
    #[error("no active session")]
    NotLoggedIn,
    #[error("service error: {0}")]
    Service(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<ServiceFailure> for SessionError {
    fn from(value: ServiceFailure) -> Self {
        match value {
            ServiceFailure::Rejected(message) => Self::Service(message),
            ServiceFailure::Transport(detail) => Self::Transport(detail),
        }
    }
}
