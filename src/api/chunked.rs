// src/api/chunked.rs
//! Memory-bounded processing of large exports.
//!
//! Chunks are consecutive groups of targets, each run through the ordinary
//! batch loop. Above the flush threshold a finished chunk is moved into the
//! sink and dropped, so peak memory stays at one chunk of documents.

use super::collector::{sort_descending_by, updated_at_key, ResultCollector};
use super::outcome::{AggregateResult, ExecutionPath, FetchTarget, FetchedItem, PipelineReport};
use super::scheduler::{record_cancelled, BatchScheduler, LoopState};
use crate::error::AppError;
use crate::pipeline::{ChunkOutput, ChunkSink, ProgressEvent};

/// Runs the batch loop chunk by chunk on behalf of a `BatchScheduler`.
pub struct ChunkedAggregator<'a> {
    scheduler: &'a BatchScheduler,
}

impl<'a> ChunkedAggregator<'a> {
    pub fn new(scheduler: &'a BatchScheduler) -> Self {
        Self { scheduler }
    }

    pub async fn run(
        &self,
        targets: Vec<FetchTarget>,
        sink: &mut dyn ChunkSink,
    ) -> Result<PipelineReport, AppError> {
        let settings = self.scheduler.settings();
        let total = targets.len();
        let chunk_size = settings.chunk_size.max(1);
        let total_chunks = total.div_ceil(chunk_size);
        let flush = total > settings.flush_threshold;

        log::info!(
            "Processing {} conversations in {} chunks of {} ({})",
            total,
            total_chunks,
            chunk_size,
            if flush { "flushing each chunk" } else { "retaining results" }
        );

        let mut progress = self.scheduler.start_progress(total);
        let mut collector = ResultCollector::new();
        let mut retained: Vec<FetchedItem> = Vec::new();
        let mut flushed_chunks = 0;
        let mut flushed_successes = 0;

        for (position, chunk) in targets.chunks(chunk_size).enumerate() {
            let index = position + 1;

            if self.scheduler.is_cancelled() {
                record_cancelled(&targets[position * chunk_size..], &mut collector);
                log::warn!("Export cancelled before chunk {}/{}", index, total_chunks);
                break;
            }

            self.scheduler.reporter().report(&ProgressEvent::ChunkStarted {
                index,
                total_chunks,
                size: chunk.len(),
            });

            let state = self
                .scheduler
                .run_batches(chunk, &mut collector, &mut progress)
                .await;

            let mut items = collector.take_successes();
            if flush {
                if !items.is_empty() {
                    sort_descending_by(&mut items, updated_at_key);
                    let conversations = items.len();
                    sink.flush_chunk(ChunkOutput {
                        index,
                        total_chunks,
                        items,
                    })?;
                    flushed_chunks += 1;
                    flushed_successes += conversations;
                    self.scheduler
                        .reporter()
                        .report(&ProgressEvent::ChunkFlushed {
                            index,
                            conversations,
                        });
                } else {
                    log::warn!("Chunk {} produced no conversations, nothing to write", index);
                }
            } else {
                retained.append(&mut items);
            }

            if state == LoopState::Cancelled {
                let rest = (position + 1) * chunk_size;
                if rest < total {
                    record_cancelled(&targets[rest..], &mut collector);
                }
                log::warn!("Export cancelled during chunk {}/{}", index, total_chunks);
                break;
            }
        }

        let aggregate = if flush {
            AggregateResult::Flushed {
                chunks: flushed_chunks,
                successes: flushed_successes,
            }
        } else {
            sort_descending_by(&mut retained, updated_at_key);
            AggregateResult::Retained(retained)
        };

        Ok(PipelineReport {
            total,
            aggregate,
            failures: collector.take_failures(),
            path: ExecutionPath::Chunked {
                chunks: total_chunks,
                flushed: flush,
            },
        })
    }
}
