// src/api/fetcher.rs
//! Fetches a single conversation, absorbing rate limits and transient errors.

use super::outcome::{FetchFailure, FetchOutcome, FetchTarget, FetchedItem};
use super::ConversationRepository;
use crate::error::ErrorKind;
use crate::error_recovery::{retry_with_backoff, RetriesExhausted, RetryPolicy};
use crate::types::OrganizationId;
use std::sync::Arc;

/// Turns one target into exactly one `FetchOutcome`, never an error.
pub struct RateLimitedFetcher {
    repository: Arc<dyn ConversationRepository>,
    organization: OrganizationId,
    policy: RetryPolicy,
}

impl RateLimitedFetcher {
    pub fn new(
        repository: Arc<dyn ConversationRepository>,
        organization: OrganizationId,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            repository,
            organization,
            policy,
        }
    }

    /// Fetches `target`, retrying per the policy.
    pub async fn fetch(&self, target: &FetchTarget) -> FetchOutcome {
        let result = retry_with_backoff(&self.policy, |attempt| {
            log::debug!("GET conversation {} (attempt {})", target, attempt);
            self.repository
                .fetch_conversation(&self.organization, target)
        })
        .await;

        match result {
            Ok(payload) => FetchOutcome::Success(FetchedItem {
                target: target.clone(),
                payload,
            }),
            Err(exhausted) => {
                let failure = classify_exhausted(target, exhausted);
                log::warn!("❌ Failed to fetch conversation {}", failure);
                FetchOutcome::Failure(failure)
            }
        }
    }
}

/// Maps the last attempt's error onto the per-item taxonomy.
fn classify_exhausted(target: &FetchTarget, exhausted: RetriesExhausted) -> FetchFailure {
    let kind = if exhausted.last_error.is_rate_limited() {
        ErrorKind::RateLimitExhausted
    } else {
        ErrorKind::RequestFailed(exhausted.last_error.status())
    };

    FetchFailure {
        target: target.clone(),
        kind,
        attempts: exhausted.attempts,
        detail: exhausted.last_error.to_string(),
    }
}
