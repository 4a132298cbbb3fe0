use thiserror::Error;

/// Failure talking to the chat backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request timed out")]
    Timeout,

    #[error("could not reach backend: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("backend returned HTTP {status}")]
    Http { status: u16, reason: Option<String> },

    #[error("unexpected response from backend: {0}")]
    Decode(String),
}

impl BackendError {
    /// Backend-provided explanation, only present for HTTP errors whose body
    /// carried one.
    pub fn reason(&self) -> Option<&str> {
        match self {
            BackendError::Http { reason, .. } => reason.as_deref(),
            _ => None,
        }
    }

    /// True when the backend was never reached (or never answered).
    pub fn is_unreachable(&self) -> bool {
        matches!(self, BackendError::Timeout | BackendError::Transport(_))
    }

    /// True when the backend answered with something that is not its JSON API.
    pub fn is_malformed(&self) -> bool {
        matches!(self, BackendError::Decode(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err)
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}
