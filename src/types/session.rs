// src/types/session.rs
//! The authenticated browser session, carried as a `Cookie` header value.

use super::ValidationError;
use std::fmt;

/// Raw `Cookie` header copied from an authenticated browser session.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie(String);

impl SessionCookie {
    /// Create a new session cookie with validation
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into().trim().to_string();

        if raw.is_empty() {
            return Err(ValidationError::InvalidSessionCookie {
                reason: "cookie header cannot be empty".to_string(),
            });
        }

        if raw.contains(['\r', '\n']) {
            return Err(ValidationError::InvalidSessionCookie {
                reason: "cookie header must be a single line".to_string(),
            });
        }

        if !raw.contains('=') {
            return Err(ValidationError::InvalidSessionCookie {
                reason: "expected name=value pairs separated by ';'".to_string(),
            });
        }

        Ok(Self(raw))
    }

    /// Get the header value as a string reference
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates `(name, value)` pairs in header order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.split(';').filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.trim(), value.trim()))
        })
    }

    /// Looks up a single cookie by name.
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.pairs()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, value)| value)
    }
}

impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionCookie({} pairs, redacted)", self.pairs().count())
    }
}

impl fmt::Display for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<redacted session cookie>")
    }
}
