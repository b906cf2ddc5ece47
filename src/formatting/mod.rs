// src/formatting/mod.rs
//! Renders fetched conversations and the documents around them as Markdown.

mod conversation;
mod documents;

pub use self::conversation::{render_conversation, ConversationDocument};
pub use self::documents::{document_separator, DocumentRenderer, IndexEntry};
