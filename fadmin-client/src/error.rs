use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by the request pipeline and everything built on top of it.
///
/// The type is [`Clone`] so a single refresh outcome can be handed to every request waiting on it.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("HTTP error: {0}")]
    Reqwest(#[source] Arc<reqwest::Error>),
    #[error("Token refresh failed: {0}")]
    Refresh(#[from] RefreshError),
    #[error("Token refresh was abandoned before completing")]
    RefreshAbandoned,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Failed to decode response: {0}")]
    Decode(String),
    #[error("Credential store error: {0}")]
    Credentials(String),
    #[error("{0:#}")]
    Other(Arc<anyhow::Error>),
}

/// Reasons the refresh exchange failed. Every variant ends the current session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("refresh request failed: {0}")]
    Network(String),
    #[error("refresh rejected with HTTP status {status}")]
    Rejected { status: u16 },
    #[error("malformed refresh response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            return Error::Network(err.to_string());
        }
        Error::Reqwest(Arc::new(err))
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(Arc::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

pub trait LogErrExt<R> {
    fn log_err(self) -> Result<R, Error>;
}

impl<R> LogErrExt<R> for Result<R, Error> {
    fn log_err(self) -> Result<R, Error> {
        match self {
            Ok(val) => Ok(val),
            Err(err) => {
                tracing::error!(?err, "{err}");
                Err(err)
            }
        }
    }
}
