// src/output/sink.rs
//! Turns fetched conversations into delivered documents.
//!
//! Small exports hand every success over at the end (`finish_retained`).
//! Large exports receive chunks as they complete through `ChunkSink` and
//! only write the index at the end (`finish_flushed`).

use super::paths::{
    chunk_filename, combined_filename, conversation_filename, output_path, INDEX_FILENAME,
};
use super::types::{DeliveryTarget, OutputMode, OutputPlan, OutputReport};
use super::writer::deliver;
use crate::analytics::ExportStats;
use crate::api::{FetchFailure, FetchedItem};
use crate::error::AppError;
use crate::formatting::{render_conversation, ConversationDocument, DocumentRenderer, IndexEntry};
use crate::model::timestamps;
use crate::model::ConversationSummary;
use crate::pipeline::{ChunkOutput, ChunkSink};
use crate::types::ConversationId;
use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Where documents go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Directory(PathBuf),
    Stdout,
}

/// Layout decisions for one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    pub destination: Destination,
    pub mode: OutputMode,
    pub combine_above: usize,
}

/// Renders and delivers documents, remembering what was written.
pub struct ExportSink {
    renderer: DocumentRenderer,
    summaries: Arc<IndexMap<ConversationId, ConversationSummary>>,
    settings: OutputSettings,
    /// Number of targets in the export, used to pick the layout of chunks.
    expected: usize,
    entries: Vec<IndexEntry>,
    chunk_files: Vec<String>,
    stats: ExportStats,
    report: OutputReport,
}

impl ExportSink {
    pub fn new(
        renderer: DocumentRenderer,
        summaries: Arc<IndexMap<ConversationId, ConversationSummary>>,
        settings: OutputSettings,
    ) -> Self {
        let expected = summaries.len();
        Self {
            renderer,
            summaries,
            settings,
            expected,
            entries: Vec::new(),
            chunk_files: Vec::new(),
            stats: ExportStats::default(),
            report: OutputReport::new(),
        }
    }

    pub fn stats(&self) -> &ExportStats {
        &self.stats
    }

    pub fn report(&self) -> &OutputReport {
        &self.report
    }

    /// Writes everything of a retained export: index plus conversations, or
    /// one combined document.
    pub fn finish_retained(&mut self, items: Vec<FetchedItem>) -> Result<(), AppError> {
        let combine = self
            .settings
            .mode
            .combines(items.len(), self.settings.combine_above);
        let mut plan = self.start_plan();

        if combine {
            let file = combined_filename(self.renderer.project());
            let (entries, bodies) = self.render_items(&items, |_| None);
            let document = self.renderer.render_combined(&entries, &bodies)?;
            plan.push(self.target(&file, document));
        } else {
            let (entries, bodies) =
                self.render_items(&items, |doc| Some(doc_filename(doc)));
            plan.push(self.target(INDEX_FILENAME, self.renderer.render_index(&entries)?));
            for (entry, body) in entries.iter().zip(bodies) {
                if let Some(file) = &entry.file {
                    plan.push(self.target(file, body));
                }
            }
        }

        self.execute(plan)
    }

    /// Writes the index of a flushed export.
    pub fn finish_flushed(&mut self) -> Result<(), AppError> {
        let mut entries = std::mem::take(&mut self.entries);
        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        let index = if self.combines_chunks() {
            self.renderer
                .render_chunked_index(&self.chunk_files, &entries)?
        } else {
            self.renderer.render_index(&entries)?
        };

        let mut plan = OutputPlan::new();
        plan.push(self.target(INDEX_FILENAME, index));
        self.execute(plan)
    }

    pub fn record_failures(&mut self, failures: &[FetchFailure]) {
        self.stats.record_failures(failures);
    }

    fn combines_chunks(&self) -> bool {
        self.settings
            .mode
            .combines(self.expected, self.settings.combine_above)
    }

    /// Renders items in order, counting them and building index entries.
    fn render_items<F>(&mut self, items: &[FetchedItem], file_for: F) -> (Vec<IndexEntry>, Vec<String>)
    where
        F: Fn(&ConversationDocument<'_>) -> Option<String>,
    {
        let mut entries = Vec::with_capacity(items.len());
        let mut bodies = Vec::with_capacity(items.len());

        for item in items {
            let summary = self.summary_for(item);
            let document = ConversationDocument::new(&summary, item);
            self.stats.record(&document);
            entries.push(IndexEntry {
                title: document.title().to_string(),
                file: file_for(&document),
                created_at: document.created_at(),
                updated_at: document.updated_at(),
                model: summary.model_name().to_string(),
            });
            bodies.push(render_conversation(&document));
        }

        (entries, bodies)
    }

    /// The index entry for `item`, or one rebuilt from the payload when the
    /// item is not in the index.
    fn summary_for(&self, item: &FetchedItem) -> ConversationSummary {
        if let Some(summary) = self.summaries.get(&item.target) {
            return summary.clone();
        }
        let text = |key: &str| item.payload.get(key).and_then(|v| v.as_str());
        ConversationSummary {
            uuid: item.target.clone(),
            name: text("name").unwrap_or_default().to_string(),
            model: text("model").map(str::to_string),
            created_at: text("created_at").and_then(timestamps::lenient::parse),
            updated_at: text("updated_at").and_then(timestamps::lenient::parse),
        }
    }

    fn start_plan(&self) -> OutputPlan {
        match &self.settings.destination {
            Destination::Directory(dir) => {
                OutputPlan::new().with_operation(DeliveryTarget::CreateDirectory { path: dir.clone() })
            }
            Destination::Stdout => OutputPlan::new(),
        }
    }

    fn target(&self, name: &str, content: String) -> DeliveryTarget {
        match &self.settings.destination {
            Destination::Directory(dir) => DeliveryTarget::WriteFile {
                path: output_path(dir, name),
                content,
            },
            Destination::Stdout => DeliveryTarget::PrintToStdout { content },
        }
    }

    fn execute(&mut self, plan: OutputPlan) -> Result<(), AppError> {
        let report = deliver(plan)?.into_result()?;
        self.report.merge(report);
        Ok(())
    }
}

impl ChunkSink for ExportSink {
    fn flush_chunk(&mut self, chunk: ChunkOutput) -> Result<(), AppError> {
        let mut plan = if self.chunk_files.is_empty() && self.entries.is_empty() {
            self.start_plan()
        } else {
            OutputPlan::new()
        };

        if self.combines_chunks() {
            let file = chunk_filename(chunk.index);
            let (entries, bodies) = self.render_items(&chunk.items, |_| Some(file.clone()));
            let document = self
                .renderer
                .render_chunk(chunk.index, chunk.total_chunks, &bodies)?;
            plan.push(self.target(&file, document));
            self.entries.extend(entries);
            self.chunk_files.push(file);
        } else {
            let (entries, bodies) =
                self.render_items(&chunk.items, |doc| Some(doc_filename(doc)));
            for (entry, body) in entries.iter().zip(bodies) {
                if let Some(file) = &entry.file {
                    plan.push(self.target(file, body));
                }
            }
            self.entries.extend(entries);
        }

        log::info!(
            "Writing chunk {}/{} ({} conversations)",
            chunk.index,
            chunk.total_chunks,
            chunk.items.len()
        );
        self.execute(plan)
    }
}

fn doc_filename(document: &ConversationDocument<'_>) -> String {
    conversation_filename(document.title(), &document.summary.uuid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProjectId;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn summaries(n: usize) -> (Vec<FetchedItem>, Arc<IndexMap<ConversationId, ConversationSummary>>) {
        let mut map = IndexMap::new();
        let mut items = Vec::new();
        for i in 0..n {
            let id = ConversationId::new_v4();
            map.insert(
                id.clone(),
                ConversationSummary {
                    uuid: id.clone(),
                    name: format!("Chat {}", i),
                    model: Some("model-x".into()),
                    created_at: None,
                    updated_at: None,
                },
            );
            items.push(FetchedItem {
                target: id,
                payload: json!({ "name": format!("Chat {}", i), "chat_messages": [] }),
            });
        }
        (items, Arc::new(map))
    }

    fn sink(dir: &std::path::Path, mode: OutputMode, n: usize) -> (ExportSink, Vec<FetchedItem>) {
        let (items, map) = summaries(n);
        let renderer = DocumentRenderer::new(
            ProjectId::parse("0f5c1d2e-3b4a-4c5d-8e9f-a0b1c2d3e4f5").unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        )
        .unwrap();
        let sink = ExportSink::new(
            renderer,
            map,
            OutputSettings {
                destination: Destination::Directory(dir.to_path_buf()),
                mode,
                combine_above: 20,
            },
        );
        (sink, items)
    }

    #[test]
    fn individual_mode_writes_index_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sink, items) = sink(dir.path(), OutputMode::Individual, 2);
        let first = format!("Chat_0_{}.md", items[0].target.short());

        sink.finish_retained(items).unwrap();

        assert!(dir.path().join("index.md").exists());
        assert!(dir.path().join(&first).exists());
        assert_eq!(sink.report().written_files().len(), 3);
        assert_eq!(sink.stats().conversations, 2);
    }

    #[test]
    fn auto_mode_combines_large_exports() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sink, items) = sink(dir.path(), OutputMode::Auto, 21);

        sink.finish_retained(items).unwrap();

        let files = sink.report().written_files();
        assert_eq!(files, vec![dir.path().join("project_0f5c1d2e_export.md")]);
        let combined = std::fs::read_to_string(&files[0]).unwrap();
        assert!(combined.contains("*Total Conversations: 21*"));
    }

    #[test]
    fn flushed_chunks_then_chunked_index() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sink, items) = sink(dir.path(), OutputMode::Combined, 4);
        let (first, second) = items.split_at(2);

        sink.flush_chunk(ChunkOutput {
            index: 1,
            total_chunks: 2,
            items: first.to_vec(),
        })
        .unwrap();
        sink.flush_chunk(ChunkOutput {
            index: 2,
            total_chunks: 2,
            items: second.to_vec(),
        })
        .unwrap();
        sink.finish_flushed().unwrap();

        assert!(dir.path().join("project_chunk_01.md").exists());
        assert!(dir.path().join("project_chunk_02.md").exists());
        let index = std::fs::read_to_string(dir.path().join("index.md")).unwrap();
        assert!(index.contains("*Total Chunks: 2*"));
        assert!(index.contains("*Total Conversations: 4*"));
    }
}
