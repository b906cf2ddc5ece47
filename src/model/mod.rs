//! Conversation data as the platform serves it.
//!
//! Every field the exporter does not strictly need is optional: the private
//! API changes shape without notice and a missing field must never sink a
//! whole conversation.

mod message;
pub mod timestamps;

pub use message::{Attachment, ChatMessage, ContentBlock, Sender};

use crate::types::ConversationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One entry of the project's conversation index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub uuid: ConversationId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, with = "timestamps::lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamps::lenient")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConversationSummary {
    /// Title shown to the user; the index allows empty names.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "Untitled conversation"
        } else {
            &self.name
        }
    }

    /// Model name, or a placeholder when the index doesn't say.
    pub fn model_name(&self) -> &str {
        self.model.as_deref().unwrap_or("unknown")
    }
}

/// A fully fetched conversation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, with = "timestamps::lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamps::lenient")]
    pub updated_at: Option<DateTime<Utc>>,
    /// `None` when the payload carried no message list at all.
    #[serde(default)]
    pub chat_messages: Option<Vec<ChatMessage>>,
}

impl Conversation {
    /// Decodes a conversation from the raw item payload.
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Conversation::deserialize(payload)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.chat_messages.as_deref().unwrap_or_default()
    }
}

/// Reads an explicit `null` the same way as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
