use async_trait::async_trait;
use campus_core::model::{
    Badge, BadgeId, EarnedBadge, GamificationState, LearnerId, ProgressChange, ProgressPercent,
    ProgressRecord, QuizAttempt, Subject, SubjectId, Topic, TopicId,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// One ledger write. The adapter applies it atomically against whatever is
/// stored for `(learner_id, topic_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressWrite {
    pub learner_id: LearnerId,
    pub topic_id: TopicId,
    pub percent: ProgressPercent,
    pub additional_minutes: u32,
    pub at: DateTime<Utc>,
}

// ─── CONTRACTS ─────────────────────────────────────────────────────────────────

/// Subjects, topics and the badge catalog. Seeded by staff; read-mostly.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the subject cannot be stored.
    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, StorageError>;

    /// All subjects ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the subject does not exist, or
    /// other storage errors.
    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn get_topic(&self, id: TopicId) -> Result<Option<Topic>, StorageError>;

    /// Topics of one subject ordered by `(order_index, id)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_topics(&self, subject_id: SubjectId) -> Result<Vec<Topic>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the badge cannot be stored.
    async fn upsert_badge(&self, badge: &Badge) -> Result<(), StorageError>;

    /// Badge catalog ordered by `(xp_required, id)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_badges(&self) -> Result<Vec<Badge>, StorageError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Apply a ledger write atomically and report what changed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the topic does not exist, or other
    /// storage errors.
    async fn record_progress(&self, write: ProgressWrite) -> Result<ProgressChange, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn get_progress(
        &self,
        learner_id: LearnerId,
        topic_id: TopicId,
    ) -> Result<Option<ProgressRecord>, StorageError>;

    /// Every record of the learner, ordered by topic id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_progress(&self, learner_id: LearnerId) -> Result<Vec<ProgressRecord>, StorageError>;
}

#[async_trait]
pub trait GamificationRepository: Send + Sync {
    /// Load the learner's state, creating an empty one on first access.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or write failures.
    async fn get_or_create_state(
        &self,
        learner_id: LearnerId,
    ) -> Result<GamificationState, StorageError>;

    /// Atomically add `amount` XP and return the updated state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the increment cannot be applied.
    async fn increment_xp(
        &self,
        learner_id: LearnerId,
        amount: u64,
    ) -> Result<GamificationState, StorageError>;

    /// Persist the streak fields of `state` only if the stored version still
    /// equals `state.version()`. Returns the new state on success and `None`
    /// when another writer got there first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on write failures.
    async fn update_streak_if_version(
        &self,
        state: &GamificationState,
    ) -> Result<Option<GamificationState>, StorageError>;
}

#[async_trait]
pub trait BadgeAwardRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_earned(&self, learner_id: LearnerId) -> Result<Vec<EarnedBadge>, StorageError>;

    /// Insert the award unless the learner already holds the badge. Returns
    /// `true` only when a row was created.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the badge is not in the catalog, or
    /// other storage errors.
    async fn insert_earned_if_absent(&self, earned: &EarnedBadge) -> Result<bool, StorageError>;
}

#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    /// Append a finished attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the same `(learner, quiz,
    /// completed_at)` was already recorded, or other storage errors.
    async fn append_attempt(&self, attempt: &QuizAttempt) -> Result<(), StorageError>;

    /// Attempts of the learner, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_attempts(&self, learner_id: LearnerId) -> Result<Vec<QuizAttempt>, StorageError>;
}

// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Catalog {
    subjects: BTreeMap<SubjectId, Subject>,
    topics: BTreeMap<TopicId, Topic>,
    badges: BTreeMap<BadgeId, Badge>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    catalog: Arc<Mutex<Catalog>>,
    progress: Arc<Mutex<BTreeMap<(LearnerId, TopicId), ProgressRecord>>>,
    gamification: Arc<Mutex<HashMap<LearnerId, GamificationState>>>,
    earned: Arc<Mutex<BTreeMap<(LearnerId, BadgeId), EarnedBadge>>>,
    attempts: Arc<Mutex<Vec<QuizAttempt>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        lock(&self.catalog)?
            .subjects
            .insert(subject.id(), subject.clone());
        Ok(())
    }

    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, StorageError> {
        Ok(lock(&self.catalog)?.subjects.get(&id).cloned())
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError> {
        Ok(lock(&self.catalog)?.subjects.values().cloned().collect())
    }

    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError> {
        let mut guard = lock(&self.catalog)?;
        if !guard.subjects.contains_key(&topic.subject_id()) {
            return Err(StorageError::NotFound);
        }
        guard.topics.insert(topic.id(), topic.clone());
        Ok(())
    }

    async fn get_topic(&self, id: TopicId) -> Result<Option<Topic>, StorageError> {
        Ok(lock(&self.catalog)?.topics.get(&id).cloned())
    }

    async fn list_topics(&self, subject_id: SubjectId) -> Result<Vec<Topic>, StorageError> {
        let guard = lock(&self.catalog)?;
        let mut topics: Vec<Topic> = guard
            .topics
            .values()
            .filter(|t| t.subject_id() == subject_id)
            .cloned()
            .collect();
        topics.sort_by_key(|t| (t.order_index(), t.id()));
        Ok(topics)
    }

    async fn upsert_badge(&self, badge: &Badge) -> Result<(), StorageError> {
        lock(&self.catalog)?.badges.insert(badge.id, badge.clone());
        Ok(())
    }

    async fn list_badges(&self) -> Result<Vec<Badge>, StorageError> {
        let mut badges: Vec<Badge> = lock(&self.catalog)?.badges.values().cloned().collect();
        badges.sort_by_key(|b| (b.xp_required, b.id));
        Ok(badges)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn record_progress(&self, write: ProgressWrite) -> Result<ProgressChange, StorageError> {
        if !lock(&self.catalog)?.topics.contains_key(&write.topic_id) {
            return Err(StorageError::NotFound);
        }
        // one critical section for the whole read-modify-write
        let mut guard = lock(&self.progress)?;
        let key = (write.learner_id, write.topic_id);
        let change = ProgressRecord::apply(
            guard.remove(&key),
            write.learner_id,
            write.topic_id,
            write.percent,
            write.additional_minutes,
            write.at,
        );
        guard.insert(key, change.record.clone());
        Ok(change)
    }

    async fn get_progress(
        &self,
        learner_id: LearnerId,
        topic_id: TopicId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        Ok(lock(&self.progress)?.get(&(learner_id, topic_id)).cloned())
    }

    async fn list_progress(&self, learner_id: LearnerId) -> Result<Vec<ProgressRecord>, StorageError> {
        Ok(lock(&self.progress)?
            .iter()
            .filter(|((learner, _), _)| *learner == learner_id)
            .map(|(_, record)| record.clone())
            .collect())
    }
}

#[async_trait]
impl GamificationRepository for InMemoryRepository {
    async fn get_or_create_state(
        &self,
        learner_id: LearnerId,
    ) -> Result<GamificationState, StorageError> {
        Ok(lock(&self.gamification)?
            .entry(learner_id)
            .or_insert_with(|| GamificationState::new(learner_id))
            .clone())
    }

    async fn increment_xp(
        &self,
        learner_id: LearnerId,
        amount: u64,
    ) -> Result<GamificationState, StorageError> {
        let mut guard = lock(&self.gamification)?;
        let state = guard
            .entry(learner_id)
            .or_insert_with(|| GamificationState::new(learner_id));
        state.add_xp(amount);
        let next_version = state.version() + 1;
        *state = state.clone().with_version(next_version);
        Ok(state.clone())
    }

    async fn update_streak_if_version(
        &self,
        state: &GamificationState,
    ) -> Result<Option<GamificationState>, StorageError> {
        let mut guard = lock(&self.gamification)?;
        let stored = guard
            .entry(state.learner_id())
            .or_insert_with(|| GamificationState::new(state.learner_id()));
        if stored.version() != state.version() {
            return Ok(None);
        }
        let updated = GamificationState::from_persisted(
            state.learner_id(),
            stored.total_xp(),
            state.current_streak_days(),
            state.longest_streak_days(),
            state.last_activity_date(),
            stored.version() + 1,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        *stored = updated.clone();
        Ok(Some(updated))
    }
}

#[async_trait]
impl BadgeAwardRepository for InMemoryRepository {
    async fn list_earned(&self, learner_id: LearnerId) -> Result<Vec<EarnedBadge>, StorageError> {
        Ok(lock(&self.earned)?
            .values()
            .filter(|e| e.learner_id == learner_id)
            .cloned()
            .collect())
    }

    async fn insert_earned_if_absent(&self, earned: &EarnedBadge) -> Result<bool, StorageError> {
        if !lock(&self.catalog)?.badges.contains_key(&earned.badge_id) {
            return Err(StorageError::NotFound);
        }
        let mut guard = lock(&self.earned)?;
        let key = (earned.learner_id, earned.badge_id);
        if guard.contains_key(&key) {
            return Ok(false);
        }
        guard.insert(key, earned.clone());
        Ok(true)
    }
}

#[async_trait]
impl QuizAttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: &QuizAttempt) -> Result<(), StorageError> {
        let mut guard = lock(&self.attempts)?;
        let duplicate = guard.iter().any(|a| {
            a.learner_id() == attempt.learner_id()
                && a.quiz_id() == attempt.quiz_id()
                && a.completed_at() == attempt.completed_at()
        });
        if duplicate {
            return Err(StorageError::Conflict);
        }
        guard.push(attempt.clone());
        Ok(())
    }

    async fn list_attempts(&self, learner_id: LearnerId) -> Result<Vec<QuizAttempt>, StorageError> {
        let mut attempts: Vec<QuizAttempt> = lock(&self.attempts)?
            .iter()
            .filter(|a| a.learner_id() == learner_id)
            .cloned()
            .collect();
        attempts.sort_by_key(QuizAttempt::completed_at);
        Ok(attempts)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub gamification: Arc<dyn GamificationRepository>,
    pub badges: Arc<dyn BadgeAwardRepository>,
    pub quiz_attempts: Arc<dyn QuizAttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Wire every contract to one backend.
    #[must_use]
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: CatalogRepository
            + ProgressRepository
            + GamificationRepository
            + BadgeAwardRepository
            + QuizAttemptRepository
            + Clone
            + 'static,
    {
        Self {
            catalog: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            gamification: Arc::new(repo.clone()),
            badges: Arc::new(repo.clone()),
            quiz_attempts: Arc::new(repo),
        }
    }
}
