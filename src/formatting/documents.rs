// src/formatting/documents.rs
//! Index, combined and chunk documents rendered through Handlebars.
//!
//! Conversation bodies are rendered by `conversation`; the templates here
//! only produce the headers and listings around them.

use crate::error::AppError;
use crate::model::timestamps::{format_date, format_datetime};
use crate::types::ProjectId;
use chrono::{DateTime, Utc};
use handlebars::Handlebars;
use serde_json::json;

const INDEX_TEMPLATE: &str = "index";
const CHUNKED_INDEX_TEMPLATE: &str = "chunked_index";
const CHUNK_TEMPLATE: &str = "chunk";

/// Separator between conversations in multi-conversation documents.
pub fn document_separator() -> String {
    format!("\n\n{}\n\n", "=".repeat(80))
}

/// One line of an index listing.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub title: String,
    /// File the conversation lives in, relative to the index.
    pub file: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub model: String,
}

/// Renders the documents that frame conversation bodies.
pub struct DocumentRenderer {
    handlebars: Handlebars<'static>,
    project: ProjectId,
    exported_at: DateTime<Utc>,
}

impl DocumentRenderer {
    pub fn new(project: ProjectId, exported_at: DateTime<Utc>) -> Result<Self, AppError> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);

        for (name, source) in [
            (INDEX_TEMPLATE, include_str!("../../templates/index.hbs")),
            (CHUNKED_INDEX_TEMPLATE, include_str!("../../templates/chunked_index.hbs")),
            (CHUNK_TEMPLATE, include_str!("../../templates/chunk.hbs")),
        ] {
            handlebars
                .register_template_string(name, source)
                .map_err(|e| AppError::TemplateRenderError {
                    name: name.to_string(),
                    message: e.to_string(),
                })?;
        }

        Ok(Self {
            handlebars,
            project,
            exported_at,
        })
    }

    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    /// Index listing every exported conversation.
    pub fn render_index(&self, entries: &[IndexEntry]) -> Result<String, AppError> {
        let data = json!({
            "project_id": self.project.as_str(),
            "exported_at": format_datetime(Some(self.exported_at)),
            "total": entries.len(),
            "conversations": entry_rows(entries),
        });
        self.render(INDEX_TEMPLATE, &data)
    }

    /// Index followed by every conversation body, in one document.
    pub fn render_combined(
        &self,
        entries: &[IndexEntry],
        bodies: &[String],
    ) -> Result<String, AppError> {
        let mut document = self.render_index(entries)?;
        document.push_str("\n\n---\n\n# All Conversations\n\n");
        append_bodies(&mut document, bodies);
        Ok(document)
    }

    /// One chunk file of a flushed export.
    pub fn render_chunk(
        &self,
        chunk: usize,
        chunk_count: usize,
        bodies: &[String],
    ) -> Result<String, AppError> {
        let data = json!({
            "project_id": self.project.as_str(),
            "exported_at": format_datetime(Some(self.exported_at)),
            "chunk": chunk,
            "chunk_count": chunk_count,
            "total": bodies.len(),
        });
        let mut document = self.render(CHUNK_TEMPLATE, &data)?;
        append_bodies(&mut document, bodies);
        Ok(document)
    }

    /// Index of a flushed export: the chunk files, then every conversation
    /// with the chunk it was written to.
    pub fn render_chunked_index(
        &self,
        chunk_files: &[String],
        entries: &[IndexEntry],
    ) -> Result<String, AppError> {
        let data = json!({
            "project_id": self.project.as_str(),
            "exported_at": format_datetime(Some(self.exported_at)),
            "total": entries.len(),
            "chunk_count": chunk_files.len(),
            "chunk_files": chunk_files,
            "conversations": entry_rows(entries),
        });
        self.render(CHUNKED_INDEX_TEMPLATE, &data)
    }

    fn render(&self, name: &str, data: &serde_json::Value) -> Result<String, AppError> {
        self.handlebars
            .render(name, data)
            .map_err(|e| AppError::TemplateRenderError {
                name: name.to_string(),
                message: e.to_string(),
            })
    }
}

fn entry_rows(entries: &[IndexEntry]) -> Vec<serde_json::Value> {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            json!({
                "number": i + 1,
                "title": entry.title,
                "file": entry.file,
                "created": format_date(entry.created_at),
                "updated": format_date(entry.updated_at),
                "model": entry.model,
            })
        })
        .collect()
}

fn append_bodies(document: &mut String, bodies: &[String]) {
    let separator = document_separator();
    for body in bodies {
        document.push_str(body);
        document.push_str(&separator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn renderer() -> DocumentRenderer {
        DocumentRenderer::new(
            ProjectId::parse("0f5c1d2e-3b4a-4c5d-8e9f-a0b1c2d3e4f5").unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn entry(title: &str, file: Option<&str>) -> IndexEntry {
        IndexEntry {
            title: title.to_string(),
            file: file.map(str::to_string),
            created_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()),
            updated_at: None,
            model: "model-x".to_string(),
        }
    }

    #[test]
    fn index_links_files() {
        let index = renderer()
            .render_index(&[entry("A & B", Some("A_&_B_1234abcd.md")), entry("Plain", None)])
            .unwrap();

        assert!(index.starts_with("# Project Export\n"));
        assert!(index.contains("*Project ID: 0f5c1d2e-3b4a-4c5d-8e9f-a0b1c2d3e4f5*"));
        assert!(index.contains("*Total Conversations: 2*"));
        assert!(index.contains("1. [A & B](./A_&_B_1234abcd.md)"));
        assert!(index.contains("2. **Plain**"));
        assert!(index.contains("   - Created: 2024-05-01"));
        assert!(index.contains("   - Updated: unknown"));
    }

    #[test]
    fn combined_document_separates_bodies() {
        let combined = renderer()
            .render_combined(&[entry("One", None)], &["# One\n".to_string()])
            .unwrap();
        assert!(combined.contains("# All Conversations\n\n# One\n"));
        assert!(combined.ends_with(&document_separator()));
    }

    #[test]
    fn chunk_and_chunked_index() {
        let renderer = renderer();
        let chunk = renderer
            .render_chunk(2, 5, &["# A\n".to_string(), "# B\n".to_string()])
            .unwrap();
        assert!(chunk.starts_with("# Project Export - Chunk 2 of 5"));
        assert!(chunk.contains("*Conversations in this chunk: 2*"));

        let index = renderer
            .render_chunked_index(
                &["project_chunk_01.md".to_string()],
                &[entry("A", Some("project_chunk_01.md"))],
            )
            .unwrap();
        assert!(index.contains("- [project_chunk_01.md](./project_chunk_01.md)"));
        assert!(index.contains("1. **A** (in [project_chunk_01.md](./project_chunk_01.md))"));
        assert!(index.contains("*Total Chunks: 1*"));
    }
}
