// src/pipeline.rs
//! Pipeline capability traits: the seams between fetching and the outside world.
//!
//! The fetch pipeline never prints and never writes files itself. It reports
//! progress through a `ProgressReporter` and hands finished chunks to a
//! `ChunkSink`, so each side can be tested in isolation.

use crate::api::FetchedItem;
use crate::error::AppError;

/// How a progress message should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Structured progress emitted while an export runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Started {
        total: usize,
    },
    BatchSettled {
        processed: usize,
        total: usize,
        failed: usize,
    },
    ChunkStarted {
        index: usize,
        total_chunks: usize,
        size: usize,
    },
    ChunkFlushed {
        index: usize,
        conversations: usize,
    },
    Completed {
        exported: usize,
        failed: usize,
    },
    Failed {
        reason: String,
    },
}

impl ProgressEvent {
    /// One line of human readable text for this event.
    pub fn message(&self) -> String {
        match self {
            ProgressEvent::Started { total } => {
                format!("Found {} conversations, starting export", total)
            }
            ProgressEvent::BatchSettled {
                processed,
                total,
                failed,
            } => {
                let percent = if *total == 0 {
                    100
                } else {
                    processed * 100 / total
                };
                if *failed > 0 {
                    format!(
                        "Processed {}/{} ({}%), {} failed so far",
                        processed, total, percent, failed
                    )
                } else {
                    format!("Processed {}/{} ({}%)", processed, total, percent)
                }
            }
            ProgressEvent::ChunkStarted {
                index,
                total_chunks,
                size,
            } => format!(
                "Processing chunk {}/{} ({} conversations)",
                index, total_chunks, size
            ),
            ProgressEvent::ChunkFlushed {
                index,
                conversations,
            } => format!("Chunk {} written ({} conversations)", index, conversations),
            ProgressEvent::Completed { exported, failed } => {
                if *failed > 0 {
                    format!(
                        "Export complete: {} conversations exported, {} failed",
                        exported, failed
                    )
                } else {
                    format!("Export complete: {} conversations exported", exported)
                }
            }
            ProgressEvent::Failed { reason } => format!("Export failed: {}", reason),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ProgressEvent::Completed { failed, .. } if *failed > 0 => Severity::Warning,
            ProgressEvent::Completed { .. } | ProgressEvent::ChunkFlushed { .. } => {
                Severity::Success
            }
            ProgressEvent::Failed { .. } => Severity::Error,
            _ => Severity::Info,
        }
    }
}

/// Receives progress notifications. Implementations decide how to show them.
pub trait ProgressReporter: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);

    fn report(&self, event: &ProgressEvent) {
        self.notify(&event.message(), event.severity());
    }
}

/// A reporter that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn notify(&self, _message: &str, _severity: Severity) {}
}

/// A completed chunk of a flushed export.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkOutput {
    /// 1-based chunk number.
    pub index: usize,
    pub total_chunks: usize,
    /// Successes of this chunk, newest first.
    pub items: Vec<FetchedItem>,
}

/// Destination for chunks that are written out as soon as they complete.
pub trait ChunkSink: Send {
    fn flush_chunk(&mut self, chunk: ChunkOutput) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_message_includes_percentage() {
        let event = ProgressEvent::BatchSettled {
            processed: 5,
            total: 20,
            failed: 0,
        };
        assert_eq!(event.message(), "Processed 5/20 (25%)");
        assert_eq!(event.severity(), Severity::Info);
    }

    #[test]
    fn completion_with_failures_is_a_warning() {
        let event = ProgressEvent::Completed {
            exported: 3,
            failed: 1,
        };
        assert_eq!(event.severity(), Severity::Warning);
        assert!(event.message().contains("1 failed"));
    }
}
