use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum RelayError {
    #[error("Request to assistant API failed: {0}")]
    Transport(String),

    #[error("Assistant API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response from assistant API: {0}")]
    InvalidResponse(String),

    #[error("Assistant run failed: {0}")]
    RunFailed(String),

    #[error("Assistant run ended with status {status}")]
    RunEnded { status: String },

    #[error("Assistant run did not finish within {0} seconds")]
    Timeout(u64),

    #[error("Relay reported an error: {0}")]
    Remote(String),

    #[error("Reply stream closed before it finished")]
    Abandoned,

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::InvalidResponse(err.to_string())
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
