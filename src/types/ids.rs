use super::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

/// Strong typing for platform identifiers with phantom types
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T> {
    value: String,
    _phantom: PhantomData<T>,
}

// Manual impl: the marker types don't need to be Clone for the id to be.
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            _phantom: PhantomData,
        }
    }
}

/// Marker types for different ID kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrganizationMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationMarker;

pub type OrganizationId = Id<OrganizationMarker>;
pub type ProjectId = Id<ProjectMarker>;
pub type ConversationId = Id<ConversationMarker>;

/// Number of leading characters used when an id is embedded in a filename.
const SHORT_ID_LEN: usize = 8;

static PROJECT_PATH_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/project/([a-fA-F0-9-]{36})(?:[/?#]|$)")
        .expect("project path regex is a valid pattern")
});

impl<T> Id<T> {
    /// Parses a hyphenated UUID into a normalized (lowercase) id.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let cleaned = input.trim();
        if !looks_like_uuid(cleaned) {
            return Err(ValidationError::InvalidId(format!(
                "expected a hyphenated UUID, got '{}'",
                cleaned
            )));
        }
        Ok(Self::from_normalized(cleaned.to_lowercase()))
    }

    /// Wraps an identifier handed out by the remote API without validating it.
    pub(crate) fn from_normalized(value: String) -> Self {
        Self {
            value,
            _phantom: PhantomData,
        }
    }

    /// Create a new random v4 UUID ID
    pub fn new_v4() -> Self {
        Self::from_normalized(Uuid::new_v4().hyphenated().to_string())
    }

    /// Get the ID as a string reference
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The first eight characters, used for filename suffixes.
    pub fn short(&self) -> &str {
        self.value.get(..SHORT_ID_LEN).unwrap_or(&self.value)
    }
}

impl ProjectId {
    /// Accepts either a project page URL (`…/project/<uuid>`) or a bare UUID.
    pub fn from_input(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let captured = PROJECT_PATH_REGEX
                .captures(trimmed)
                .and_then(|caps| caps.get(1))
                .ok_or_else(|| {
                    ValidationError::InvalidUrl {
                        url: trimmed.to_string(),
                        reason: "URL must look like https://<host>/project/<uuid>".to_string(),
                    }
                })?;
            return Self::parse(captured.as_str());
        }
        Self::parse(trimmed)
    }
}

/// Strict `8-4-4-4-12` hex check; `Uuid::parse_str` alone also accepts the
/// simple and braced forms, which the platform never uses.
pub(crate) fn looks_like_uuid(candidate: &str) -> bool {
    candidate.len() == 36
        && candidate.as_bytes()[8] == b'-'
        && Uuid::parse_str(candidate).is_ok()
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_normalized(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parsing() {
        let id = OrganizationId::parse("550E8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(id.as_str(), "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(id.short(), "550e8400");
    }

    #[test]
    fn test_invalid_ids() {
        assert!(OrganizationId::parse("too-short").is_err());
        assert!(OrganizationId::parse("550e8400e29b41d4a716446655440000").is_err());
        assert!(OrganizationId::parse("zzzzzzzz-e29b-41d4-a716-446655440000").is_err());
        assert!(OrganizationId::parse("").is_err());
    }

    #[test]
    fn test_project_from_url() {
        let id = ProjectId::from_input(
            "https://claude.ai/project/0f5c1d2e-3b4a-4c5d-8e9f-a0b1c2d3e4f5",
        )
        .unwrap();
        assert_eq!(id.as_str(), "0f5c1d2e-3b4a-4c5d-8e9f-a0b1c2d3e4f5");

        let id = ProjectId::from_input(
            "https://claude.ai/project/0f5c1d2e-3b4a-4c5d-8e9f-a0b1c2d3e4f5?tab=chats",
        )
        .unwrap();
        assert_eq!(id.short(), "0f5c1d2e");
    }

    #[test]
    fn test_project_from_non_project_url() {
        let err = ProjectId::from_input("https://claude.ai/chat/0f5c1d2e-3b4a-4c5d-8e9f-a0b1c2d3e4f5");
        assert!(matches!(err, Err(ValidationError::InvalidUrl { .. })));
    }

    #[test]
    fn test_short_on_short_value() {
        let id = ConversationId::from_normalized("abc".to_string());
        assert_eq!(id.short(), "abc");
    }
}
