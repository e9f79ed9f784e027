use thiserror::Error;

use crate::core::agent::AgentError;

/// Errors that end a chat session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The first client frame was not a usable setup handshake
    #[error("Invalid setup message: {0}")]
    InvalidSetup(String),

    /// The client went away before the session became active
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Reading from or writing to the client socket failed
    #[error("Client transport error: {0}")]
    Transport(String),

    /// The agent backend failed
    #[error(transparent)]
    Agent(#[from] AgentError),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl From<axum::Error> for SessionError {
    fn from(err: axum::Error) -> Self {
        SessionError::Transport(err.to_string())
    }
}
