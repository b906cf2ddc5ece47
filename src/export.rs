// src/export.rs
//! The whole export: resolve, list, fetch, render, deliver.

use crate::analytics::ExportStats;
use crate::api::{
    AggregateResult, BatchScheduler, BatchSettings, ConversationRepository, ExecutionPath,
    FetchFailure, PipelineReport, RateLimitedFetcher,
};
use crate::error::{AppError, ErrorKind};
use crate::error_recovery::RetryPolicy;
use crate::formatting::DocumentRenderer;
use crate::model::ConversationSummary;
use crate::output::{ExportSink, OutputSettings};
use crate::pipeline::{ProgressEvent, ProgressReporter};
use crate::resolver::{IdentifierResolver, ProjectIdentifiers};
use crate::types::ConversationId;
use chrono::Utc;
use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What a finished export produced.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub identifiers: ProjectIdentifiers,
    /// Conversations listed for the project.
    pub total: usize,
    pub exported: usize,
    pub failures: Vec<FetchFailure>,
    pub path: ExecutionPath,
    pub stats: ExportStats,
    pub files: Vec<PathBuf>,
}

/// Runs one project export against a repository.
pub struct ProjectExporter {
    resolver: Box<dyn IdentifierResolver>,
    repository: Arc<dyn ConversationRepository>,
    reporter: Arc<dyn ProgressReporter>,
    batching: BatchSettings,
    retry: RetryPolicy,
    output: OutputSettings,
    cancel: CancellationToken,
}

impl ProjectExporter {
    pub fn new(
        resolver: Box<dyn IdentifierResolver>,
        repository: Arc<dyn ConversationRepository>,
        reporter: Arc<dyn ProgressReporter>,
        output: OutputSettings,
    ) -> Self {
        Self {
            resolver,
            repository,
            reporter,
            batching: BatchSettings::default(),
            retry: RetryPolicy::default(),
            output,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_batching(mut self, batching: BatchSettings) -> Self {
        self.batching = batching;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs the export. A fatal error is reported once and returned.
    pub async fn run(&self) -> Result<ExportReport, AppError> {
        match self.execute().await {
            Ok(report) => {
                self.reporter.report(&ProgressEvent::Completed {
                    exported: report.exported,
                    failed: report.failures.len(),
                });
                Ok(report)
            }
            Err(e) => {
                self.reporter.report(&ProgressEvent::Failed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn execute(&self) -> Result<ExportReport, AppError> {
        self.batching.validate()?;

        let identifiers = self.resolver.resolve()?;
        let summaries = self.repository.list_conversations(&identifiers).await?;
        if summaries.is_empty() {
            return Err(AppError::FatalPrecondition(
                "No conversations found in this project".to_string(),
            ));
        }

        let index = index_summaries(summaries);
        let targets: Vec<ConversationId> = index.keys().cloned().collect();
        let total = targets.len();
        self.reporter.report(&ProgressEvent::Started { total });

        let renderer = DocumentRenderer::new(identifiers.project.clone(), Utc::now())?;
        let mut sink = ExportSink::new(renderer, Arc::new(index), self.output.clone());

        let fetcher = RateLimitedFetcher::new(
            self.repository.clone(),
            identifiers.organization.clone(),
            self.retry,
        );
        let scheduler = BatchScheduler::new(fetcher, self.batching.clone(), self.reporter.clone())
            .with_cancellation(self.cancel.clone());

        let report = scheduler.run(targets, &mut sink).await?;
        check_outcome(&report)?;

        let PipelineReport {
            total,
            aggregate,
            failures,
            path,
        } = report;

        for failure in &failures {
            log::warn!("Skipped conversation {}", failure);
        }
        sink.record_failures(&failures);

        let exported = aggregate.success_count();
        match aggregate {
            AggregateResult::Retained(items) => sink.finish_retained(items)?,
            AggregateResult::Flushed { .. } => sink.finish_flushed()?,
        }

        Ok(ExportReport {
            identifiers,
            total,
            exported,
            failures,
            path,
            stats: sink.stats().clone(),
            files: sink.report().written_files(),
        })
    }
}

/// Keys summaries by id in listing order. A conversation listed twice is
/// fetched once.
fn index_summaries(
    summaries: Vec<ConversationSummary>,
) -> IndexMap<ConversationId, ConversationSummary> {
    let listed = summaries.len();
    let index: IndexMap<_, _> = summaries
        .into_iter()
        .map(|summary| (summary.uuid.clone(), summary))
        .collect();
    if index.len() < listed {
        log::warn!(
            "Conversation list repeated {} entries; each is exported once",
            listed - index.len()
        );
    }
    index
}

/// Turns a finished run into a fatal error when nothing usable came back.
fn check_outcome(report: &PipelineReport) -> Result<(), AppError> {
    if report.was_cancelled() {
        let skipped = report
            .failures
            .iter()
            .filter(|f| f.kind == ErrorKind::Cancelled)
            .count();
        return Err(AppError::Cancelled {
            processed: report.total - skipped,
            total: report.total,
        });
    }

    if report.aggregate.success_count() == 0 {
        return Err(AppError::FatalPrecondition(format!(
            "Failed to fetch any of the {} conversations",
            report.total
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FetchedItem;
    use serde_json::json;

    fn failure(kind: ErrorKind) -> FetchFailure {
        FetchFailure {
            target: ConversationId::new_v4(),
            kind,
            attempts: 0,
            detail: String::new(),
        }
    }

    #[test]
    fn zero_successes_is_fatal() {
        let report = PipelineReport {
            total: 1,
            aggregate: AggregateResult::Retained(vec![]),
            failures: vec![failure(ErrorKind::RequestFailed(Some(500)))],
            path: ExecutionPath::Direct,
        };
        assert!(matches!(
            check_outcome(&report),
            Err(AppError::FatalPrecondition(_))
        ));
    }

    #[test]
    fn cancellation_reports_processed_count() {
        let report = PipelineReport {
            total: 3,
            aggregate: AggregateResult::Retained(vec![FetchedItem {
                target: ConversationId::new_v4(),
                payload: json!({}),
            }]),
            failures: vec![failure(ErrorKind::Cancelled), failure(ErrorKind::Cancelled)],
            path: ExecutionPath::Direct,
        };
        match check_outcome(&report) {
            Err(AppError::Cancelled { processed, total }) => {
                assert_eq!((processed, total), (1, 3));
            }
            other => panic!("expected cancellation, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_listings_collapse() {
        let summary: ConversationSummary = serde_json::from_value(json!({
            "uuid": "7d1b6a2e-0c4f-4b8a-9e3d-5f6a7b8c9d0e",
            "name": "once"
        }))
        .unwrap();
        let index = index_summaries(vec![summary.clone(), summary]);
        assert_eq!(index.len(), 1);
    }
}
