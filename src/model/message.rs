use super::{null_as_default, timestamps};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Human,
    Assistant,
    #[serde(other)]
    Other,
}

impl Default for Sender {
    fn default() -> Self {
        Self::Other
    }
}

/// One message of the conversation tree, flattened in display order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sender: Sender,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Vec<ContentBlock>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<Attachment>,
    #[serde(default, with = "timestamps::lenient")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A typed piece of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(default, deserialize_with = "null_as_default")]
        text: String,
    },
    Thinking {
        #[serde(default, deserialize_with = "null_as_default")]
        thinking: String,
    },
    ToolUse {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        input: serde_json::Value,
    },
    ToolResult {
        #[serde(default)]
        content: serde_json::Value,
    },
    /// Content types this exporter does not render (images, citations, …).
    #[serde(other)]
    Unsupported,
}

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub extracted_content: Option<String>,
}
