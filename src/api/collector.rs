// src/api/collector.rs
//! Accumulates fetch outcomes and produces the final ordering.

use super::outcome::{BatchResult, FetchFailure, FetchOutcome, FetchedItem};
use crate::model::timestamps;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;

/// Sort key used for exports: the conversation's `updated_at`.
///
/// Missing or unparsable timestamps sort last.
pub fn updated_at_key(item: &FetchedItem) -> Option<DateTime<Utc>> {
    item.payload
        .get("updated_at")
        .and_then(|v| v.as_str())
        .and_then(timestamps::lenient::parse)
}

/// Successes and failures seen so far, in settlement order.
#[derive(Debug, Default)]
pub struct ResultCollector {
    successes: Vec<FetchedItem>,
    failures: Vec<FetchFailure>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            successes: Vec::with_capacity(capacity),
            failures: Vec::new(),
        }
    }

    /// Appends one batch's outcomes.
    pub fn append(&mut self, batch: BatchResult) {
        for outcome in batch {
            match outcome {
                FetchOutcome::Success(item) => self.successes.push(item),
                FetchOutcome::Failure(failure) => self.failures.push(failure),
            }
        }
    }

    /// Records a failure that never went through a fetcher.
    pub fn record_failure(&mut self, failure: FetchFailure) {
        self.failures.push(failure);
    }

    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn outcome_count(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// Moves the successes out, leaving failures in place.
    pub fn take_successes(&mut self) -> Vec<FetchedItem> {
        std::mem::take(&mut self.successes)
    }

    /// Moves the failures out.
    pub fn take_failures(&mut self) -> Vec<FetchFailure> {
        std::mem::take(&mut self.failures)
    }

    /// Consumes the collector, returning successes sorted by `key`
    /// descending. Equal keys keep their settlement order.
    pub fn finalize_by<K, F>(self, key: F) -> (Vec<FetchedItem>, Vec<FetchFailure>)
    where
        K: Ord,
        F: Fn(&FetchedItem) -> K,
    {
        let mut successes = self.successes;
        sort_descending_by(&mut successes, key);
        (successes, self.failures)
    }

    /// `finalize_by(updated_at_key)`.
    pub fn finalize_newest_first(self) -> (Vec<FetchedItem>, Vec<FetchFailure>) {
        self.finalize_by(updated_at_key)
    }
}

/// Stable descending sort that computes each item's key once; ties keep
/// insertion order.
pub(crate) fn sort_descending_by<K, F>(items: &mut [FetchedItem], key: F)
where
    K: Ord,
    F: Fn(&FetchedItem) -> K,
{
    items.sort_by_cached_key(|item| Reverse(key(item)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::ConversationId;
    use serde_json::json;

    fn item(rank: u64) -> FetchedItem {
        FetchedItem {
            target: ConversationId::new_v4(),
            payload: json!({ "rank": rank }),
        }
    }

    fn rank(item: &FetchedItem) -> u64 {
        item.payload["rank"].as_u64().unwrap_or(0)
    }

    #[test]
    fn ties_keep_settlement_order() {
        let (t1, t2, t3) = (item(5), item(9), item(5));
        let expected = vec![t2.target.clone(), t1.target.clone(), t3.target.clone()];

        let mut collector = ResultCollector::new();
        collector.append(vec![
            FetchOutcome::Success(t1),
            FetchOutcome::Success(t2),
            FetchOutcome::Success(t3),
        ]);

        let (sorted, failures) = collector.finalize_by(rank);
        let order: Vec<_> = sorted.into_iter().map(|i| i.target).collect();
        assert_eq!(order, expected);
        assert!(failures.is_empty());
    }

    #[test]
    fn each_key_is_computed_once() {
        use std::cell::Cell;

        let calls = Cell::new(0);
        let mut items: Vec<_> = (0..64).map(item).collect();
        sort_descending_by(&mut items, |i| {
            calls.set(calls.get() + 1);
            rank(i)
        });

        assert_eq!(calls.get(), 64);
        assert_eq!(rank(&items[0]), 63);
        assert_eq!(rank(&items[63]), 0);
    }

    #[test]
    fn separates_failures() {
        let mut collector = ResultCollector::new();
        collector.append(vec![
            FetchOutcome::Success(item(1)),
            FetchOutcome::Failure(FetchFailure {
                target: ConversationId::new_v4(),
                kind: ErrorKind::RequestFailed(Some(404)),
                attempts: 3,
                detail: "HTTP 404".into(),
            }),
        ]);
        collector.record_failure(FetchFailure::cancelled(ConversationId::new_v4()));

        assert_eq!(collector.success_count(), 1);
        assert_eq!(collector.failure_count(), 2);
        assert_eq!(collector.outcome_count(), 3);
        assert_eq!(collector.take_successes().len(), 1);
        assert_eq!(collector.success_count(), 0);
    }

    #[test]
    fn newest_first_puts_undated_last() {
        let dated_old = FetchedItem {
            target: ConversationId::new_v4(),
            payload: json!({ "updated_at": "2024-01-01T00:00:00Z" }),
        };
        let dated_new = FetchedItem {
            target: ConversationId::new_v4(),
            payload: json!({ "updated_at": "2024-06-01T00:00:00Z" }),
        };
        let undated = FetchedItem {
            target: ConversationId::new_v4(),
            payload: json!({}),
        };

        let mut collector = ResultCollector::new();
        collector.append(vec![
            FetchOutcome::Success(undated.clone()),
            FetchOutcome::Success(dated_old.clone()),
            FetchOutcome::Success(dated_new.clone()),
        ]);

        let (sorted, _) = collector.finalize_newest_first();
        assert_eq!(sorted, vec![dated_new, dated_old, undated]);
    }
}
