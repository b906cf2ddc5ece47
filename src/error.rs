// src/error.rs
//! Application error types with structured error handling.
//!
//! Two layers of vocabulary live here. `AttemptError` describes what went
//! wrong during a single remote call and drives the retry decision.
//! `AppError` is what the export as a whole can fail with, and `ErrorKind`
//! is the shared classification both of them (and per-item failures) map to.

use std::fmt;
use thiserror::Error;

/// Classification of every failure the exporter can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    /// The session cookie was rejected (HTTP 401)
    AuthRequired,
    /// The session lacks access to the project (HTTP 403)
    AccessDenied,
    /// The project or conversation does not exist (HTTP 404)
    NotFound,
    /// Every attempt was answered with a rate-limit signal
    RateLimitExhausted,
    /// Any other failed request; carries the last HTTP status when there was one
    RequestFailed(Option<u16>),
    /// The remote answered with a document of an unexpected shape
    MalformedResponse,
    /// A precondition for the export does not hold
    FatalPrecondition,
    /// The export was cancelled before this unit of work ran
    Cancelled,
}

impl ErrorKind {
    /// Maps an HTTP status from the list endpoint to the taxonomy.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 => Self::AuthRequired,
            403 => Self::AccessDenied,
            404 => Self::NotFound,
            429 => Self::RateLimitExhausted,
            other => Self::RequestFailed(Some(other)),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthRequired => write!(f, "auth_required"),
            Self::AccessDenied => write!(f, "access_denied"),
            Self::NotFound => write!(f, "not_found"),
            Self::RateLimitExhausted => write!(f, "rate_limit_exhausted"),
            Self::RequestFailed(Some(status)) => write!(f, "request_failed_{}", status),
            Self::RequestFailed(None) => write!(f, "request_failed"),
            Self::MalformedResponse => write!(f, "malformed_response"),
            Self::FatalPrecondition => write!(f, "fatal_precondition"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// What went wrong during one remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("undecodable response body: {0}")]
    Decode(String),
}

impl AttemptError {
    /// Whether the remote explicitly asked us to slow down.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }

    /// The HTTP status behind this error, when there was a response at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited => Some(429),
            Self::Status(status) => Some(*status),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }
}

impl From<reqwest::Error> for AttemptError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AttemptError::Decode(err.to_string())
        } else {
            AttemptError::Transport(err.to_string())
        }
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("{message}")]
    RemoteRejected { kind: ErrorKind, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("{0}")]
    FatalPrecondition(String),

    #[error("Export cancelled after {processed} of {total} conversations")]
    Cancelled { processed: usize, total: usize },

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template render error for template {name}: {message}")]
    TemplateRenderError { name: String, message: String },

    #[error("Output delivery failed: {}", failures.join(", "))]
    DeliveryFailed { failures: Vec<String> },

    #[error(transparent)]
    ValidationError(#[from] crate::types::ValidationError),
}

impl AppError {
    /// Builds the error for a non-success answer from the list endpoint.
    pub fn from_list_status(status: u16) -> Self {
        let kind = ErrorKind::from_http_status(status);
        let message = match kind {
            ErrorKind::AuthRequired => {
                "Authentication failed. Refresh the session cookie and try again.".to_string()
            }
            ErrorKind::AccessDenied => {
                "Access denied. Make sure this session has access to the project.".to_string()
            }
            ErrorKind::NotFound => "Project not found. Check the project ID.".to_string(),
            _ => format!("Conversation list request failed with HTTP {}", status),
        };
        AppError::RemoteRejected { kind, message }
    }

    /// Classifies this error within the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::RemoteRejected { kind, .. } => *kind,
            AppError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            AppError::Cancelled { .. } => ErrorKind::Cancelled,
            AppError::NetworkFailure(err) => {
                ErrorKind::RequestFailed(err.status().map(|s| s.as_u16()))
            }
            _ => ErrorKind::FatalPrecondition,
        }
    }
}
