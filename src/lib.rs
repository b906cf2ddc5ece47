// src/lib.rs
//! project-chat-export library: exports every conversation of a chat
//! platform project to Markdown.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `ErrorKind`, `AttemptError`, `ValidationError`
//! - **Configuration**: `CommandLineInput`, `PipelineConfig`
//! - **Fetch pipeline**: `RateLimitedFetcher`, `BatchScheduler`, `ChunkedAggregator`, `ResultCollector`
//! - **Seams**: `ConversationRepository`, `IdentifierResolver`, `ProgressReporter`, `ChunkSink`
//! - **Output**: `ExportSink`, `OutputMode`, `DocumentRenderer`
//! - **Orchestration**: `ProjectExporter`

pub mod analytics;
pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod error_recovery;
pub mod export;
pub mod formatting;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod resolver;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, AttemptError, ErrorKind};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{CommandLineInput, PipelineConfig, COOKIE_ENV_VAR};

// --- Domain Types ---
pub use crate::model::{ChatMessage, ContentBlock, Conversation, ConversationSummary};
pub use crate::types::{ConversationId, OrganizationId, ProjectId, SessionCookie};

// --- Fetch Pipeline ---
pub use crate::api::{
    AggregateResult, BatchScheduler, BatchSettings, ChatHttpClient, ChunkedAggregator,
    ConversationRepository, DelaySchedule, ExecutionPath, FetchFailure, FetchOutcome,
    FetchedItem, PipelineReport, RateLimitedFetcher, ResultCollector,
};
pub use crate::error_recovery::{retry_with_backoff, RetryPolicy};

// --- Pipeline Traits ---
pub use crate::pipeline::{
    ChunkOutput, ChunkSink, ProgressEvent, ProgressReporter, Severity, SilentReporter,
};
pub use crate::resolver::{FixedResolver, IdentifierResolver, ProjectIdentifiers, SessionResolver};

// --- Output ---
pub use crate::output::{Destination, ExportSink, OutputMode, OutputSettings};

// --- Orchestration ---
pub use crate::export::{ExportReport, ProjectExporter};
pub use crate::progress::ConsoleReporter;
