// src/output/types.rs
//! Type definitions for output operations.
//!
//! This module defines immutable types for planning and executing
//! output operations following data-oriented design principles.

use clap::ValueEnum;
use std::path::PathBuf;

/// How exported conversations are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputMode {
    /// One file per conversation plus an index
    #[default]
    Individual,
    /// A single document holding the index and every conversation
    Combined,
    /// Individual files for small exports, one combined document above the limit
    Auto,
}

impl OutputMode {
    /// Whether `conversations` successes should go into combined documents.
    pub fn combines(&self, conversations: usize, combine_above: usize) -> bool {
        match self {
            OutputMode::Individual => false,
            OutputMode::Combined => true,
            OutputMode::Auto => conversations > combine_above,
        }
    }
}

/// Represents a complete output plan.
#[derive(Debug, Clone, Default)]
pub struct OutputPlan {
    /// List of operations to perform
    pub operations: Vec<DeliveryTarget>,
}

impl OutputPlan {
    /// Creates a new empty output plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an operation to the plan.
    pub fn with_operation(mut self, operation: DeliveryTarget) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn push(&mut self, operation: DeliveryTarget) {
        self.operations.push(operation);
    }
}

/// Represents a single output operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryTarget {
    /// Write content to a file
    WriteFile { path: PathBuf, content: String },
    /// Create a directory
    CreateDirectory { path: PathBuf },
    /// Print to stdout
    PrintToStdout { content: String },
}

/// Result of executing an output plan.
#[derive(Debug, Clone, Default)]
pub struct OutputReport {
    /// Successfully completed operations
    pub completed: Vec<CompletedOperation>,
    /// Failed operations with errors
    pub failed: Vec<FailedOperation>,
    /// Execution statistics
    pub stats: ExecutionStats,
}

impl OutputReport {
    /// Creates a new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a completed operation to the report.
    pub fn with_completed(mut self, operation: CompletedOperation) -> Self {
        self.stats.operations_completed += 1;
        self.stats.bytes_written += operation.bytes_written;
        self.completed.push(operation);
        self
    }

    /// Adds a failed operation to the report.
    pub fn with_failed(mut self, operation: FailedOperation) -> Self {
        self.stats.operations_failed += 1;
        self.failed.push(operation);
        self
    }

    /// Folds another report into this one.
    pub fn merge(&mut self, other: OutputReport) {
        self.stats.operations_completed += other.stats.operations_completed;
        self.stats.operations_failed += other.stats.operations_failed;
        self.stats.bytes_written += other.stats.bytes_written;
        self.stats.total_duration_ms += other.stats.total_duration_ms;
        self.completed.extend(other.completed);
        self.failed.extend(other.failed);
    }

    /// Checks if all operations succeeded.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Paths of every file written.
    pub fn written_files(&self) -> Vec<PathBuf> {
        self.completed
            .iter()
            .filter_map(|done| match &done.operation {
                DeliveryTarget::WriteFile { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// Converts failed operations into an error.
    pub fn into_result(self) -> Result<Self, crate::error::AppError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(crate::error::AppError::DeliveryFailed {
                failures: self.failed.iter().map(|f| f.error.clone()).collect(),
            })
        }
    }
}

/// A successfully completed operation.
#[derive(Debug, Clone)]
pub struct CompletedOperation {
    pub operation: DeliveryTarget,
    pub bytes_written: usize,
    pub duration_ms: u64,
}

/// A failed operation with error information.
#[derive(Debug, Clone)]
pub struct FailedOperation {
    pub operation: DeliveryTarget,
    pub error: String,
}

/// Execution statistics.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStats {
    pub operations_completed: usize,
    pub operations_failed: usize,
    pub bytes_written: usize,
    pub total_duration_ms: u64,
}
