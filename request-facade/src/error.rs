use crate::r#static::{status_message, UNKNOWN_ERROR_MESSAGE};
use std::fmt::Display;

/// Broad classification of an [`Error`], used to decide how a failure is
/// surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum ErrorKind {
    /// The request was aborted through the cancellation registry.
    Cancelled,
    /// The transport failed or answered with a non-200 status.
    Transport,
    /// The server answered 200 but the envelope carried an error code.
    Business,
    /// The request could not be built or the response could not be read.
    Client,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Request cancelled")]
    Cancelled,
    #[error("HTTP error ({status}): {status_text}")]
    Status { status: u16, status_text: String },
    #[error("Business error ({code}): {message}")]
    Business { code: i64, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid response envelope: {0}")]
    Envelope(String),
    #[error("Failed to decode response data: {0}")]
    Decode(String),
    #[error("Invalid request url: {0}")]
    InvalidUrl(String),
    #[error("Invalid request header {0}")]
    InvalidHeader(String),
    #[error("Re-authentication failed: {0}")]
    Recovery(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Status { .. } | Error::Transport(_) => ErrorKind::Transport,
            Error::Business { .. } => ErrorKind::Business,
            Error::Envelope(_)
            | Error::Decode(_)
            | Error::InvalidUrl(_)
            | Error::InvalidHeader(_)
            | Error::Recovery(_)
            | Error::Config(_) => ErrorKind::Client,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// HTTP status carried by the error, if the server produced one.
    /// Business errors always arrive with a 200 transport status.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            Error::Business { .. } => Some(200),
            _ => None,
        }
    }

    /// Message shown to the user: the server's own message for business
    /// errors, the status table entry for HTTP errors, otherwise the generic
    /// fallback.
    pub fn user_message(&self) -> String {
        match self {
            Error::Business { message, .. } if !message.is_empty() => message.clone(),
            Error::Status { status, .. } => status_message(*status).to_string(),
            _ => UNKNOWN_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn recovery(err: impl Display) -> Self {
        Error::Recovery(err.to_string())
    }
}

impl From<surf::Error> for Error {
    fn from(err: surf::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(err.to_string())
    }
}
