// src/api/outcome.rs
//! Outcomes produced by the fetch pipeline.

use crate::error::ErrorKind;
use crate::types::ConversationId;
use std::fmt;

/// One conversation to be fetched.
pub type FetchTarget = ConversationId;

/// A successfully fetched conversation document.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedItem {
    pub target: FetchTarget,
    /// The item endpoint's JSON document, untouched.
    pub payload: serde_json::Value,
}

/// A conversation that could not be fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchFailure {
    pub target: FetchTarget,
    pub kind: ErrorKind,
    /// Remote calls made before giving up; 0 for cancelled targets.
    pub attempts: u32,
    pub detail: String,
}

impl FetchFailure {
    /// Failure record for a target that was never dispatched.
    pub fn cancelled(target: FetchTarget) -> Self {
        Self {
            target,
            kind: ErrorKind::Cancelled,
            attempts: 0,
            detail: "export cancelled before this conversation was fetched".to_string(),
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} after {} attempt(s)): {}",
            self.target, self.kind, self.attempts, self.detail
        )
    }
}

/// Terminal state of one target.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(FetchedItem),
    Failure(FetchFailure),
}

impl FetchOutcome {
    pub fn target(&self) -> &FetchTarget {
        match self {
            FetchOutcome::Success(item) => &item.target,
            FetchOutcome::Failure(failure) => &failure.target,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }
}

/// Outcomes of one batch in settlement order.
pub type BatchResult = Vec<FetchOutcome>;

/// Which scheduling path handled an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPath {
    /// Plain sequence of batches, everything kept in memory.
    Direct,
    /// Batches grouped into chunks.
    Chunked { chunks: usize, flushed: bool },
}

/// What the pipeline hands back once every target has settled.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateResult {
    /// All successes, sorted newest first.
    Retained(Vec<FetchedItem>),
    /// Successes were written through the chunk sink as chunks completed.
    Flushed { chunks: usize, successes: usize },
}

impl AggregateResult {
    pub fn success_count(&self) -> usize {
        match self {
            AggregateResult::Retained(items) => items.len(),
            AggregateResult::Flushed { successes, .. } => *successes,
        }
    }
}

/// Full result of a pipeline run: aggregate plus the structured failures.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub total: usize,
    pub aggregate: AggregateResult,
    pub failures: Vec<FetchFailure>,
    pub path: ExecutionPath,
}

impl PipelineReport {
    /// Number of targets that produced an outcome. Always equals `total`.
    pub fn outcome_count(&self) -> usize {
        self.aggregate.success_count() + self.failures.len()
    }

    pub fn was_cancelled(&self) -> bool {
        self.failures.iter().any(|f| f.kind == ErrorKind::Cancelled)
    }
}
