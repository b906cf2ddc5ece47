// src/analytics/mod.rs
//! Content measurement and statistics for an export.

use crate::api::FetchFailure;
use crate::error::ErrorKind;
use crate::formatting::ConversationDocument;
use crate::model::ContentBlock;
use std::collections::BTreeMap;
use std::fmt;

/// Running totals gathered while conversations are rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub conversations: usize,
    /// Conversations that rendered as a "failed to load" stub.
    pub stubs: usize,
    pub messages: usize,
    pub attachments: usize,
    pub tool_calls: usize,
    pub thinking_blocks: usize,
    pub failures_by_kind: BTreeMap<ErrorKind, usize>,
}

impl ExportStats {
    /// Counts one rendered conversation.
    pub fn record(&mut self, document: &ConversationDocument<'_>) {
        self.conversations += 1;

        let Some(messages) = document.messages() else {
            self.stubs += 1;
            return;
        };

        self.messages += messages.len();
        for message in messages {
            self.attachments += message.attachments.len();
            for block in &message.content {
                match block {
                    ContentBlock::ToolUse { .. } => self.tool_calls += 1,
                    ContentBlock::Thinking { .. } => self.thinking_blocks += 1,
                    _ => {}
                }
            }
        }
    }

    pub fn record_failures(&mut self, failures: &[FetchFailure]) {
        for failure in failures {
            *self.failures_by_kind.entry(failure.kind).or_insert(0) += 1;
        }
    }

    pub fn failed(&self) -> usize {
        self.failures_by_kind.values().sum()
    }
}

impl fmt::Display for ExportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} conversations, {} messages, {} attachments, {} tool calls",
            self.conversations, self.messages, self.attachments, self.tool_calls
        )?;
        if self.stubs > 0 {
            write!(f, ", {} without messages", self.stubs)?;
        }
        if !self.failures_by_kind.is_empty() {
            let breakdown: Vec<String> = self
                .failures_by_kind
                .iter()
                .map(|(kind, count)| format!("{} {}", count, kind))
                .collect();
            write!(f, "; failed: {}", breakdown.join(", "))?;
        }
        Ok(())
    }
}
