// src/formatting/conversation.rs
//! Renders one fetched conversation as a Markdown document.

use crate::api::FetchedItem;
use crate::constants::{ATTACHMENT_PREVIEW_CHARS, CHARS_PER_MESSAGE_ESTIMATE};
use crate::model::timestamps::format_datetime;
use crate::model::{
    Attachment, ChatMessage, ContentBlock, Conversation, ConversationSummary, Sender,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt::Write;

/// Marker the platform leaves in content it shortened on export.
const TRUNCATION_MARKER: &str = "characters truncated";

/// A fetched conversation paired with its index entry.
#[derive(Debug, Clone)]
pub struct ConversationDocument<'a> {
    pub summary: &'a ConversationSummary,
    /// `None` when the payload could not be decoded at all.
    pub conversation: Option<Conversation>,
}

impl<'a> ConversationDocument<'a> {
    pub fn new(summary: &'a ConversationSummary, item: &FetchedItem) -> Self {
        let conversation = match Conversation::from_payload(&item.payload) {
            Ok(conversation) => Some(conversation),
            Err(e) => {
                log::warn!(
                    "Conversation {} has an unexpected shape, exporting a stub: {}",
                    item.target,
                    e
                );
                None
            }
        };
        Self {
            summary,
            conversation,
        }
    }

    /// Title from the document, falling back to the index entry.
    pub fn title(&self) -> &str {
        self.conversation
            .as_ref()
            .and_then(|c| c.name.as_deref())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.summary.display_name())
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.conversation
            .as_ref()
            .and_then(|c| c.created_at)
            .or(self.summary.created_at)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.conversation
            .as_ref()
            .and_then(|c| c.updated_at)
            .or(self.summary.updated_at)
    }

    /// Messages, or `None` if the document carried none to render.
    pub fn messages(&self) -> Option<&[ChatMessage]> {
        self.conversation
            .as_ref()
            .and_then(|c| c.chat_messages.as_deref())
    }
}

/// Renders the whole conversation.
pub fn render_conversation(document: &ConversationDocument<'_>) -> String {
    let Some(messages) = document.messages() else {
        return format!(
            "# {}\n\n*Failed to load conversation data*\n\n---\n\n",
            document.summary.display_name()
        );
    };

    let mut markdown = String::with_capacity(CHARS_PER_MESSAGE_ESTIMATE * (messages.len() + 1));

    let _ = write!(markdown, "# {}\n\n", document.title());

    if let Some(summary) = document
        .conversation
        .as_ref()
        .and_then(|c| c.summary.as_deref())
        .filter(|s| !s.trim().is_empty())
    {
        let _ = write!(markdown, "## Summary\n{}\n\n", summary);
    }

    let _ = writeln!(markdown, "*Created: {}*", format_datetime(document.created_at()));
    let _ = writeln!(markdown, "*Updated: {}*", format_datetime(document.updated_at()));
    let _ = write!(markdown, "*Model: {}*\n\n", document.summary.model_name());
    markdown.push_str("---\n\n");

    for message in messages {
        render_message(&mut markdown, message);
    }

    markdown
}

fn render_message(markdown: &mut String, message: &ChatMessage) {
    let sender = match message.sender {
        Sender::Human => "👤 **Human**",
        Sender::Assistant | Sender::Other => "🤖 **Assistant**",
    };
    let _ = write!(markdown, "## {}\n\n", sender);

    for block in &message.content {
        render_block(markdown, block);
    }

    if !message.attachments.is_empty() {
        markdown.push_str("### Attachments:\n");
        for attachment in &message.attachments {
            render_attachment(markdown, attachment);
        }
        markdown.push('\n');
    }

    let _ = write!(markdown, "*{}*\n\n", format_datetime(message.created_at));
    markdown.push_str("---\n\n");
}

fn render_block(markdown: &mut String, block: &ContentBlock) {
    match block {
        ContentBlock::Thinking { thinking } if !thinking.is_empty() => {
            let text = if thinking.contains(TRUNCATION_MARKER) {
                "**Note:** Full thinking content is truncated in the export.\n\n"
            } else {
                thinking.as_str()
            };
            let _ = write!(markdown, "**Thinking:**\n```\n{}\n```\n\n", text);
        }
        ContentBlock::Text { text } if !text.is_empty() => {
            let _ = write!(markdown, "{}\n\n", text);
        }
        ContentBlock::ToolUse { name, input } if !input.is_null() => {
            match name {
                Some(name) => {
                    let _ = writeln!(markdown, "**Tool Use:** `{}`", name);
                }
                None => markdown.push_str("**Tool Use:**\n"),
            }
            let _ = write!(markdown, "```json\n{}\n```\n\n", pretty_json(input));
        }
        ContentBlock::ToolResult { content } if !content.is_null() => {
            markdown.push_str("**Tool Result:**\n```\n");
            markdown.push_str(&tool_result_text(content));
            markdown.push_str("\n```\n\n");
        }
        _ => {}
    }
}

/// Text items of a result are concatenated; anything else is shown as JSON.
fn tool_result_text(content: &Value) -> String {
    match content {
        Value::Array(items) => items
            .iter()
            .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .collect(),
        other => pretty_json(other),
    }
}

fn render_attachment(markdown: &mut String, attachment: &Attachment) {
    let _ = writeln!(
        markdown,
        "- **{}** ({})",
        attachment.file_name.as_deref().unwrap_or("Attachment"),
        attachment.file_type.as_deref().unwrap_or("file")
    );

    if let Some(content) = attachment
        .extracted_content
        .as_deref()
        .filter(|c| !c.is_empty() && !c.contains("truncated"))
    {
        let preview: String = content.chars().take(ATTACHMENT_PREVIEW_CHARS).collect();
        let _ = write!(markdown, "  ```\n{}...\n  ```\n", preview);
    }
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
