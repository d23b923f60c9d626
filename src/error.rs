use std::error::Error as _;
use thiserror::Error;

/// The completion client could not be built. Reported once at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API key is not a valid header value")]
    InvalidApiKey,

    #[error("invalid base URL `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// A single completion call failed.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion service timed out: {}", chain(.0))]
    Timeout(#[source] reqwest::Error),

    #[error("request to completion service failed: {}", chain(.0))]
    Transport(#[source] reqwest::Error),

    #[error("completion service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CompletionError::Timeout(err)
        } else {
            CompletionError::Transport(err)
        }
    }
}

/// Joins an error with its sources, e.g. `error sending request: connection refused`.
fn chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
