// tests/common/mod.rs
//! Shared test doubles for the integration tests.

#![allow(dead_code)]

use project_chat_export::{
    AppError, AttemptError, BatchScheduler, BatchSettings, ChunkOutput, ChunkSink,
    ConversationId, ConversationRepository, ConversationSummary, DelaySchedule, OrganizationId,
    ProgressEvent, ProgressReporter, ProjectIdentifiers, RateLimitedFetcher, RetryPolicy, Severity,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// In-process repository with scripted answers and concurrency tracking.
pub struct StubRepository {
    summaries: Vec<ConversationSummary>,
    payloads: HashMap<ConversationId, Value>,
    scripts: Mutex<HashMap<ConversationId, VecDeque<Result<Value, AttemptError>>>>,
    calls: Mutex<HashMap<ConversationId, u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Duration,
}

impl StubRepository {
    /// `n` conversations; conversation `i` was updated `i` minutes after a
    /// fixed epoch, so newest first is reverse listing order.
    pub fn with_conversations(n: usize) -> Self {
        let mut summaries = Vec::with_capacity(n);
        let mut payloads = HashMap::with_capacity(n);
        for i in 0..n {
            let id = ConversationId::new_v4();
            let updated_at = timestamp(i);
            summaries.push(
                serde_json::from_value(json!({
                    "uuid": id.as_str(),
                    "name": format!("Conversation {}", i),
                    "model": "model-x",
                    "updated_at": updated_at,
                }))
                .unwrap(),
            );
            payloads.insert(
                id,
                json!({
                    "name": format!("Conversation {}", i),
                    "updated_at": updated_at,
                    "chat_messages": [
                        { "sender": "human", "content": [{ "type": "text", "text": "hi" }] }
                    ]
                }),
            );
        }
        Self {
            summaries,
            payloads,
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            latency: Duration::ZERO,
        }
    }

    /// Every fetch takes `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// The next answers for `id`, consumed one per call before the default.
    pub fn script(self, id: &ConversationId, answers: Vec<Result<Value, AttemptError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(id.clone(), answers.into_iter().collect());
        self
    }

    /// `id` always answers with `status`.
    pub fn always_fail(self, id: &ConversationId, status: u16) -> Self {
        let answers = (0..32).map(|_| Err(AttemptError::Status(status))).collect();
        self.script(id, answers)
    }

    pub fn targets(&self) -> Vec<ConversationId> {
        self.summaries.iter().map(|s| s.uuid.clone()).collect()
    }

    pub fn calls_for(&self, id: &ConversationId) -> u32 {
        self.calls.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ConversationRepository for StubRepository {
    async fn list_conversations(
        &self,
        _ids: &ProjectIdentifiers,
    ) -> Result<Vec<ConversationSummary>, AppError> {
        Ok(self.summaries.clone())
    }

    async fn fetch_conversation(
        &self,
        _organization: &OrganizationId,
        conversation: &ConversationId,
    ) -> Result<Value, AttemptError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(conversation.clone())
            .or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(conversation)
            .and_then(|answers| answers.pop_front());
        match scripted {
            Some(answer) => answer,
            None => self
                .payloads
                .get(conversation)
                .cloned()
                .ok_or(AttemptError::Status(404)),
        }
    }
}

/// RFC 3339 timestamp `minutes` after a fixed point.
pub fn timestamp(minutes: usize) -> String {
    let base = chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap();
    (base + chrono::Duration::minutes(minutes as i64))
        .with_timezone(&chrono::Utc)
        .to_rfc3339()
}

/// Records every event; optionally cancels a token on the first settled batch.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ProgressEvent>>,
    cancel_after_first_batch: Option<CancellationToken>,
}

impl RecordingReporter {
    pub fn cancelling(token: CancellationToken) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            cancel_after_first_batch: Some(token),
        }
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    /// `processed` of every `BatchSettled` event, in order.
    pub fn processed_counts(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::BatchSettled { processed, .. } => Some(processed),
                _ => None,
            })
            .collect()
    }
}

impl ProgressReporter for RecordingReporter {
    fn notify(&self, _message: &str, _severity: Severity) {}

    fn report(&self, event: &ProgressEvent) {
        if let (ProgressEvent::BatchSettled { .. }, Some(token)) =
            (event, &self.cancel_after_first_batch)
        {
            token.cancel();
        }
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Keeps flushed chunks in memory.
#[derive(Default)]
pub struct MemorySink {
    pub chunks: Vec<ChunkOutput>,
}

impl ChunkSink for MemorySink {
    fn flush_chunk(&mut self, chunk: ChunkOutput) -> Result<(), AppError> {
        self.chunks.push(chunk);
        Ok(())
    }
}

/// Batch settings with production sizes and no pauses.
pub fn fast_settings(batch_size: usize) -> BatchSettings {
    BatchSettings {
        batch_size,
        chunk_size: BatchSettings::default().chunk_size.max(batch_size),
        delays: DelaySchedule::none(),
        ..BatchSettings::default()
    }
}

/// A scheduler over `repo` that retries immediately.
pub fn scheduler(
    repo: Arc<StubRepository>,
    settings: BatchSettings,
    reporter: Arc<dyn ProgressReporter>,
) -> BatchScheduler {
    let fetcher = RateLimitedFetcher::new(repo, OrganizationId::new_v4(), RetryPolicy::immediate(3));
    BatchScheduler::new(fetcher, settings, reporter)
}
