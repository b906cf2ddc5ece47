// src/api/scheduler.rs
//! Batch scheduling: bounded concurrency with pauses between waves.
//!
//! Targets are split into consecutive batches. All members of a batch are
//! polled together on the current task and the next batch is only dispatched
//! once every member has settled, so at most `batch_size` requests are ever
//! in flight.

use super::chunked::ChunkedAggregator;
use super::collector::ResultCollector;
use super::fetcher::RateLimitedFetcher;
use super::outcome::{
    AggregateResult, ExecutionPath, FetchFailure, FetchTarget, PipelineReport,
};
use crate::constants::{
    CHUNKING_THRESHOLD, DEFAULT_BATCH_SIZE, DEFAULT_CHUNK_SIZE, FLUSH_THRESHOLD,
    LARGE_EXPORT_BATCH_DELAY, MEDIUM_EXPORT_BATCH_DELAY, MEDIUM_EXPORT_LIMIT,
    SMALL_EXPORT_BATCH_DELAY, SMALL_EXPORT_LIMIT,
};
use crate::error::AppError;
use crate::pipeline::{ChunkSink, ProgressEvent, ProgressReporter};
use crate::types::ValidationError;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Inter-batch pause, scaled by the size of the whole export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelaySchedule {
    pub small: Duration,
    pub medium: Duration,
    pub large: Duration,
}

impl Default for DelaySchedule {
    fn default() -> Self {
        Self {
            small: SMALL_EXPORT_BATCH_DELAY,
            medium: MEDIUM_EXPORT_BATCH_DELAY,
            large: LARGE_EXPORT_BATCH_DELAY,
        }
    }
}

impl DelaySchedule {
    /// No pauses at all.
    pub fn none() -> Self {
        Self {
            small: Duration::ZERO,
            medium: Duration::ZERO,
            large: Duration::ZERO,
        }
    }

    pub fn for_total(&self, total: usize) -> Duration {
        if total <= SMALL_EXPORT_LIMIT {
            self.small
        } else if total <= MEDIUM_EXPORT_LIMIT {
            self.medium
        } else {
            self.large
        }
    }
}

/// Sizes and thresholds of the fetch pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSettings {
    pub batch_size: usize,
    pub chunk_size: usize,
    /// Above this many targets the chunked path is taken.
    pub chunk_threshold: usize,
    /// Above this many targets finished chunks are flushed to the sink.
    pub flush_threshold: usize,
    pub delays: DelaySchedule,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_threshold: CHUNKING_THRESHOLD,
            flush_threshold: FLUSH_THRESHOLD,
            delays: DelaySchedule::default(),
        }
    }
}

impl BatchSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.batch_size == 0 {
            return Err(ValidationError::InvalidBatching {
                reason: "batch size must be at least 1".to_string(),
            });
        }
        if self.chunk_size < self.batch_size {
            return Err(ValidationError::InvalidBatching {
                reason: format!(
                    "chunk size ({}) must not be smaller than batch size ({})",
                    self.chunk_size, self.batch_size
                ),
            });
        }
        Ok(())
    }
}

/// Cumulative counters shared by every batch of one run.
#[derive(Debug, Clone)]
pub(super) struct RunProgress {
    pub processed: usize,
    pub failed: usize,
    pub total: usize,
    pub delay: Duration,
}

/// How a batch loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LoopState {
    Completed,
    Cancelled,
}

/// Drives the fetcher over a list of targets, batch by batch.
pub struct BatchScheduler {
    fetcher: RateLimitedFetcher,
    settings: BatchSettings,
    reporter: Arc<dyn ProgressReporter>,
    cancel: CancellationToken,
}

impl BatchScheduler {
    pub fn new(
        fetcher: RateLimitedFetcher,
        settings: BatchSettings,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            fetcher,
            settings,
            reporter,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `token` to stop the run at the next batch boundary.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    pub(super) fn reporter(&self) -> &dyn ProgressReporter {
        self.reporter.as_ref()
    }

    /// Fetches every target. Large inputs are handed to the chunked path,
    /// which may write finished chunks through `sink`.
    pub async fn run(
        &self,
        targets: Vec<FetchTarget>,
        sink: &mut dyn ChunkSink,
    ) -> Result<PipelineReport, AppError> {
        self.settings.validate()?;

        if targets.len() > self.settings.chunk_threshold {
            log::info!(
                "{} conversations exceed the chunking threshold of {}",
                targets.len(),
                self.settings.chunk_threshold
            );
            return ChunkedAggregator::new(self).run(targets, sink).await;
        }

        Ok(self.run_direct(targets).await)
    }

    /// Plain batching with every result kept in memory.
    async fn run_direct(&self, targets: Vec<FetchTarget>) -> PipelineReport {
        let total = targets.len();
        let mut collector = ResultCollector::with_capacity(total);
        let mut progress = self.start_progress(total);

        if self.run_batches(&targets, &mut collector, &mut progress).await == LoopState::Cancelled {
            log::warn!(
                "Export cancelled after {} of {} conversations",
                progress.processed,
                total
            );
        }

        let (successes, failures) = collector.finalize_newest_first();
        PipelineReport {
            total,
            aggregate: AggregateResult::Retained(successes),
            failures,
            path: ExecutionPath::Direct,
        }
    }

    pub(super) fn start_progress(&self, total: usize) -> RunProgress {
        RunProgress {
            processed: 0,
            failed: 0,
            total,
            delay: self.settings.delays.for_total(total),
        }
    }

    /// The batch loop. Every target in `targets` ends up in `collector`,
    /// either as a fetch outcome or as a cancelled failure.
    pub(super) async fn run_batches(
        &self,
        targets: &[FetchTarget],
        collector: &mut ResultCollector,
        progress: &mut RunProgress,
    ) -> LoopState {
        let batch_size = self.settings.batch_size.max(1);

        for (index, batch) in targets.chunks(batch_size).enumerate() {
            if self.cancel.is_cancelled() {
                record_cancelled(&targets[index * batch_size..], collector);
                return LoopState::Cancelled;
            }

            log::debug!(
                "Dispatching batch of {} ({} already processed)",
                batch.len(),
                progress.processed
            );
            let outcomes = join_all(batch.iter().map(|target| self.fetcher.fetch(target))).await;

            progress.processed += outcomes.len();
            progress.failed += outcomes.iter().filter(|o| !o.is_success()).count();
            collector.append(outcomes);

            self.reporter.report(&ProgressEvent::BatchSettled {
                processed: progress.processed,
                total: progress.total,
                failed: progress.failed,
            });

            if progress.processed < progress.total {
                self.pause(progress.delay).await;
            }
        }

        LoopState::Completed
    }

    pub(super) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sleeps between batches; cancellation cuts the sleep short.
    async fn pause(&self, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.cancel.cancelled() => {
                log::debug!("Inter-batch pause interrupted by cancellation");
            }
        }
    }
}

/// Records a cancelled failure for every target that was never dispatched.
pub(super) fn record_cancelled(targets: &[FetchTarget], collector: &mut ResultCollector) {
    for target in targets {
        collector.record_failure(FetchFailure::cancelled(target.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_scales_with_total() {
        let delays = DelaySchedule::default();
        assert_eq!(delays.for_total(1), Duration::from_millis(500));
        assert_eq!(delays.for_total(50), Duration::from_millis(500));
        assert_eq!(delays.for_total(51), Duration::from_millis(750));
        assert_eq!(delays.for_total(200), Duration::from_millis(750));
        assert_eq!(delays.for_total(201), Duration::from_millis(1000));
    }

    #[test]
    fn rejects_chunks_smaller_than_batches() {
        let settings = BatchSettings {
            batch_size: 10,
            chunk_size: 5,
            ..BatchSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ValidationError::InvalidBatching { .. })
        ));
    }

    #[test]
    fn rejects_empty_batches() {
        let settings = BatchSettings {
            batch_size: 0,
            ..BatchSettings::default()
        };
        assert!(settings.validate().is_err());
        assert!(BatchSettings::default().validate().is_ok());
    }
}
