// src/output/paths.rs
//! Pure functions for filename generation.
//!
//! This module handles all naming decisions without performing any I/O.

use crate::constants::FILENAME_MAX_CHARS;
use crate::types::{ConversationId, ProjectId};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

const UNTITLED: &str = "untitled_conversation";

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex is a valid pattern"));

static UNDERSCORE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_{2,}").expect("underscore regex is a valid pattern"));

/// Sanitizes a conversation title to be safe for use as a filename stem.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let spaced = WHITESPACE_RUN.replace_all(&replaced, "_");
    let collapsed = UNDERSCORE_RUN.replace_all(&spaced, "_");
    let trimmed = collapsed.trim_matches('_');

    let limited: String = trimmed.chars().take(FILENAME_MAX_CHARS).collect();

    if limited.is_empty() {
        UNTITLED.to_string()
    } else {
        limited
    }
}

/// `<sanitized title>_<first 8 of uuid>.md`, unique per conversation.
pub fn conversation_filename(title: &str, id: &ConversationId) -> String {
    format!("{}_{}.md", sanitize_filename(title), id.short())
}

/// Single-file export name.
pub fn combined_filename(project: &ProjectId) -> String {
    format!("project_{}_export.md", project.short())
}

/// Chunk file name, 1-based and zero padded so listings sort naturally.
pub fn chunk_filename(index: usize) -> String {
    format!("project_chunk_{:02}.md", index)
}

/// Name of the index document.
pub const INDEX_FILENAME: &str = "index.md";

/// Default output directory for a project.
pub fn default_output_dir(project: &ProjectId) -> PathBuf {
    PathBuf::from(format!("project_{}_export", project.short()))
}

/// Joins `name` under `dir`.
pub fn output_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Hello/World"), "Hello_World");
        assert_eq!(sanitize_filename("Test: File*Name?"), "Test_File_Name");
        assert_eq!(sanitize_filename("   spaces   around  "), "spaces_around");
        assert_eq!(sanitize_filename("__a__b__"), "a_b");
        assert_eq!(sanitize_filename(""), "untitled_conversation");
        assert_eq!(sanitize_filename("???"), "untitled_conversation");
    }

    #[test]
    fn test_sanitize_limits_characters_not_bytes() {
        let long = "é".repeat(150);
        assert_eq!(sanitize_filename(&long).chars().count(), 100);
    }

    #[test]
    fn test_conversation_filename() {
        let id = ConversationId::parse("7d1b6a2e-0c4f-4b8a-9e3d-5f6a7b8c9d0e").unwrap();
        assert_eq!(
            conversation_filename("Trip <plans>", &id),
            "Trip_plans_7d1b6a2e.md"
        );
    }

    #[test]
    fn test_chunk_and_combined_names() {
        let project = ProjectId::parse("0f5c1d2e-3b4a-4c5d-8e9f-a0b1c2d3e4f5").unwrap();
        assert_eq!(chunk_filename(3), "project_chunk_03.md");
        assert_eq!(chunk_filename(12), "project_chunk_12.md");
        assert_eq!(combined_filename(&project), "project_0f5c1d2e_export.md");
        assert_eq!(
            default_output_dir(&project),
            PathBuf::from("project_0f5c1d2e_export")
        );
    }
}
