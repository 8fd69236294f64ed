use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::ValidationError;
use crate::model::ids::{LearnerId, TopicId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("progress percent {0} is outside 0..=100")]
    PercentOutOfRange(u8),

    #[error("completed_at must be set exactly when progress is 100 (percent {percent})")]
    CompletionMismatch { percent: u8 },
}

//
// ─── PERCENT ───────────────────────────────────────────────────────────────────
//

/// A validated completion percentage in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProgressPercent(u8);

impl ProgressPercent {
    pub const COMPLETE: Self = Self(100);
    pub const LESSON_DONE: Self = Self(50);
    pub const PRACTICE_PASSED: Self = Self(75);
    pub const PRACTICE_NEEDS_WORK: Self = Self(60);

    /// # Errors
    ///
    /// Returns `ValidationError::PercentOutOfRange` outside `0..=100`.
    pub fn new(value: i32) -> Result<Self, ValidationError> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= 100)
            .map(Self)
            .ok_or(ValidationError::PercentOutOfRange(value))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_complete(self) -> bool {
        self.0 == 100
    }
}

//
// ─── RECORD ────────────────────────────────────────────────────────────────────
//

/// Per-(learner, topic) progress. One record per pair; never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    learner_id: LearnerId,
    topic_id: TopicId,
    progress_percent: u8,
    time_spent_minutes: u32,
    last_accessed_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

/// The "progress changed" event produced by every ledger write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressChange {
    pub record: ProgressRecord,
    pub previous_percent: Option<u8>,
    pub newly_completed: bool,
}

impl ProgressRecord {
    /// Rehydrate a record from storage, enforcing the completion invariant.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the percent is out of range or `completed_at`
    /// disagrees with the percent.
    pub fn from_persisted(
        learner_id: LearnerId,
        topic_id: TopicId,
        progress_percent: u8,
        time_spent_minutes: u32,
        last_accessed_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, ProgressError> {
        if progress_percent > 100 {
            return Err(ProgressError::PercentOutOfRange(progress_percent));
        }
        if completed_at.is_some() != (progress_percent == 100) {
            return Err(ProgressError::CompletionMismatch {
                percent: progress_percent,
            });
        }
        Ok(Self {
            learner_id,
            topic_id,
            progress_percent,
            time_spent_minutes,
            last_accessed_at,
            completed_at,
        })
    }

    /// Apply a ledger write on top of an optional existing record.
    ///
    /// Latest assessment wins: the percent is overwritten, not maxed.
    /// `completed_at` is stamped only on the first transition to 100 and
    /// cleared if a later write drops below 100.
    #[must_use]
    pub fn apply(
        existing: Option<Self>,
        learner_id: LearnerId,
        topic_id: TopicId,
        percent: ProgressPercent,
        additional_minutes: u32,
        now: DateTime<Utc>,
    ) -> ProgressChange {
        let previous_percent = existing.as_ref().map(|r| r.progress_percent);
        let mut record = existing.unwrap_or(Self {
            learner_id,
            topic_id,
            progress_percent: 0,
            time_spent_minutes: 0,
            last_accessed_at: now,
            completed_at: None,
        });

        let was_complete = record.completed_at.is_some();
        record.progress_percent = percent.value();
        record.time_spent_minutes = record.time_spent_minutes.saturating_add(additional_minutes);
        record.last_accessed_at = now;
        record.completed_at = match (percent.is_complete(), record.completed_at) {
            (true, Some(first)) => Some(first),
            (true, None) => Some(now),
            (false, _) => None,
        };

        ProgressChange {
            newly_completed: percent.is_complete() && !was_complete,
            previous_percent,
            record,
        }
    }

    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    #[must_use]
    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    #[must_use]
    pub fn time_spent_minutes(&self) -> u32 {
        self.time_spent_minutes
    }

    #[must_use]
    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

//
// ─── SNAPSHOT ──────────────────────────────────────────────────────────────────
//

/// Read-only view of one learner's ledger, keyed by topic.
#[derive(Debug, Clone, Default)]
pub struct ProgressSnapshot {
    records: HashMap<TopicId, ProgressRecord>,
}

impl ProgressSnapshot {
    #[must_use]
    pub fn new(records: impl IntoIterator<Item = ProgressRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.topic_id(), r)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, topic_id: TopicId) -> Option<&ProgressRecord> {
        self.records.get(&topic_id)
    }

    #[must_use]
    pub fn percent(&self, topic_id: TopicId) -> u8 {
        self.get(topic_id).map_or(0, ProgressRecord::progress_percent)
    }

    pub fn records(&self) -> impl Iterator<Item = &ProgressRecord> {
        self.records.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Rounded mean of per-topic percents; missing records count as 0 and an
/// empty topic list yields 0.
#[must_use]
pub fn mean_completion(topic_ids: &[TopicId], snapshot: &ProgressSnapshot) -> u8 {
    if topic_ids.is_empty() {
        return 0;
    }
    let total: u64 = topic_ids
        .iter()
        .map(|id| u64::from(snapshot.percent(*id)))
        .sum();
    let count = topic_ids.len() as u64;
    // Round half up in integer arithmetic; the mean never exceeds 100.
    let mean = (total * 2 + count) / (count * 2);
    u8::try_from(mean).unwrap_or(100)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
