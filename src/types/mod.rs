use thiserror::Error;

mod ids;
mod session;

pub use ids::*;
pub(crate) use ids::looks_like_uuid;
pub use session::SessionCookie;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid identifier format: {0}")]
    InvalidId(String),

    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Value out of bounds: {value}, expected {min}..={max}")]
    OutOfBounds { value: usize, min: usize, max: usize },

    #[error("Invalid session cookie: {reason}")]
    InvalidSessionCookie { reason: String },

    #[error("Invalid batching configuration: {reason}")]
    InvalidBatching { reason: String },
}
