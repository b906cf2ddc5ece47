// src/api/mod.rs
//! Remote API interaction: enumerating and fetching a project's conversations.
//!
//! The pipeline in this module is layered leaves-first:
//! `fetcher` (one conversation, with retries) → `scheduler` (concurrent
//! batches) → `chunked` (memory-bounded groups of batches), with `collector`
//! accumulating the outcomes. Business logic depends on the
//! `ConversationRepository` trait, never on HTTP details.

mod chunked;
pub mod client;
mod collector;
mod fetcher;
mod outcome;
pub mod parser;
mod scheduler;

use crate::error::{AppError, AttemptError};
use crate::model::ConversationSummary;
use crate::resolver::ProjectIdentifiers;
use crate::types::{ConversationId, OrganizationId};

/// The ability to read a project's conversations from the platform.
#[async_trait::async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Lists every conversation summary in the project, in index order.
    async fn list_conversations(
        &self,
        ids: &ProjectIdentifiers,
    ) -> Result<Vec<ConversationSummary>, AppError>;

    /// Performs exactly one fetch of a conversation's full document.
    ///
    /// Retrying is the caller's business; implementations must not retry.
    async fn fetch_conversation(
        &self,
        organization: &OrganizationId,
        conversation: &ConversationId,
    ) -> Result<serde_json::Value, AttemptError>;
}

// Re-export the public interface
pub use chunked::ChunkedAggregator;
pub use client::ChatHttpClient;
pub use collector::{updated_at_key, ResultCollector};
pub use fetcher::RateLimitedFetcher;
pub use outcome::{
    AggregateResult, BatchResult, ExecutionPath, FetchFailure, FetchOutcome, FetchTarget,
    FetchedItem, PipelineReport,
};
pub use scheduler::{BatchScheduler, BatchSettings, DelaySchedule};
