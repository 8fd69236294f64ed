use std::collections::BTreeMap;
use std::sync::Arc;

use campus_core::model::{
    LearnerId, ProgressChange, ProgressPercent, ProgressRecord, ProgressSnapshot, SubjectId,
    TopicId, mean_completion,
};
use campus_core::overview::LearningOverview;
use campus_core::unlock::{TopicState, ordered_topic_states};
use storage::repository::{
    CatalogRepository, ProgressRepository, ProgressWrite, QuizAttemptRepository,
};

use crate::Clock;
use crate::error::ServiceError;
use crate::retry::with_backoff;

/// The progress ledger: one record per (learner, topic), last write wins.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    progress: Arc<dyn ProgressRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        progress: Arc<dyn ProgressRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            progress,
            attempts,
        }
    }

    /// Write the latest assessment for a topic.
    ///
    /// `percent` replaces whatever was stored; `additional_minutes` is added
    /// to the running total.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if `percent` is outside `0..=100`
    /// (nothing is written), `ServiceError::NotFound` for an unknown topic, or
    /// `ServiceError::Storage` once retries are exhausted.
    pub async fn record_progress(
        &self,
        learner_id: LearnerId,
        topic_id: TopicId,
        percent: i32,
        additional_minutes: u32,
    ) -> Result<ProgressChange, ServiceError> {
        let percent = ProgressPercent::new(percent)?;
        let write = ProgressWrite {
            learner_id,
            topic_id,
            percent,
            additional_minutes,
            at: self.clock.now(),
        };
        let progress = &self.progress;
        let change = with_backoff("record_progress", || progress.record_progress(write))
            .await
            .map_err(ServiceError::missing("topic"))?;

        tracing::debug!(
            %learner_id,
            %topic_id,
            percent = percent.value(),
            previous = ?change.previous_percent,
            "progress recorded"
        );
        if change.newly_completed {
            tracing::info!(%learner_id, %topic_id, "topic completed");
        }
        Ok(change)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Storage` on read failures.
    pub async fn get_progress(
        &self,
        learner_id: LearnerId,
        topic_id: TopicId,
    ) -> Result<Option<ProgressRecord>, ServiceError> {
        let progress = &self.progress;
        Ok(with_backoff("get_progress", || progress.get_progress(learner_id, topic_id)).await?)
    }

    async fn snapshot(&self, learner_id: LearnerId) -> Result<ProgressSnapshot, ServiceError> {
        let progress = &self.progress;
        let records = with_backoff("list_progress", || progress.list_progress(learner_id)).await?;
        Ok(ProgressSnapshot::new(records))
    }

    /// Rounded mean of `progress_percent` over every topic of the subject;
    /// topics without a record count as 0, a subject without topics is 0.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` on read failures.
    pub async fn subject_completion_percent(
        &self,
        learner_id: LearnerId,
        subject_id: SubjectId,
    ) -> Result<u8, ServiceError> {
        let catalog = &self.catalog;
        let topics = with_backoff("list_topics", || catalog.list_topics(subject_id)).await?;
        let ids: Vec<TopicId> = topics.iter().map(|t| t.id()).collect();
        let snapshot = self.snapshot(learner_id).await?;
        Ok(mean_completion(&ids, &snapshot))
    }

    /// Completion per subject, in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` on read failures.
    pub async fn completion_by_subject(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<(String, u8)>, ServiceError> {
        let catalog = &self.catalog;
        let subjects = with_backoff("list_subjects", || catalog.list_subjects()).await?;
        let snapshot = self.snapshot(learner_id).await?;

        let mut out = Vec::with_capacity(subjects.len());
        for subject in subjects {
            let id = subject.id();
            let topics = with_backoff("list_topics", || catalog.list_topics(id)).await?;
            let ids: Vec<TopicId> = topics.iter().map(|t| t.id()).collect();
            out.push((subject.name().to_owned(), mean_completion(&ids, &snapshot)));
        }
        Ok(out)
    }

    /// Unlock state of each topic in the subject, ordered for display.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown subject or
    /// `ServiceError::Storage` on read failures.
    pub async fn topic_states(
        &self,
        learner_id: LearnerId,
        subject_id: SubjectId,
    ) -> Result<Vec<(TopicId, TopicState)>, ServiceError> {
        let catalog = &self.catalog;
        if with_backoff("get_subject", || catalog.get_subject(subject_id))
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound("subject"));
        }
        let topics = with_backoff("list_topics", || catalog.list_topics(subject_id)).await?;
        let snapshot = self.snapshot(learner_id).await?;
        Ok(ordered_topic_states(&topics, &snapshot))
    }

    /// Whether the learner may open the topic right now.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown topic or
    /// `ServiceError::Storage` on read failures.
    pub async fn topic_state(
        &self,
        learner_id: LearnerId,
        topic_id: TopicId,
    ) -> Result<TopicState, ServiceError> {
        let catalog = &self.catalog;
        let topic = with_backoff("get_topic", || catalog.get_topic(topic_id))
            .await?
            .ok_or(ServiceError::NotFound("topic"))?;
        let states: BTreeMap<TopicId, TopicState> = self
            .topic_states(learner_id, topic.subject_id())
            .await?
            .into_iter()
            .collect();
        states
            .get(&topic_id)
            .copied()
            .ok_or(ServiceError::NotFound("topic"))
    }

    /// Dashboard totals across every subject.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` on read failures.
    pub async fn overview(&self, learner_id: LearnerId) -> Result<LearningOverview, ServiceError> {
        let catalog = &self.catalog;
        let attempts_repo = &self.attempts;
        let subjects = with_backoff("list_subjects", || catalog.list_subjects()).await?;
        let mut topic_ids = Vec::new();
        for subject in &subjects {
            let id = subject.id();
            let topics = with_backoff("list_topics", || catalog.list_topics(id)).await?;
            topic_ids.extend(topics.iter().map(|t| t.id()));
        }
        let snapshot = self.snapshot(learner_id).await?;
        let attempts =
            with_backoff("list_attempts", || attempts_repo.list_attempts(learner_id)).await?;
        Ok(LearningOverview::compute(&topic_ids, &snapshot, &attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::ValidationError;
    use campus_core::model::{Subject, Topic};
    use campus_core::time::fixed_now;
    use storage::repository::Storage;

    async fn setup() -> (ProgressService, Storage) {
        let storage = Storage::in_memory();
        storage
            .catalog
            .upsert_subject(&Subject::new(SubjectId::new(1), "Math").unwrap())
            .await
            .unwrap();
        for (id, order) in [(1, 0), (2, 1), (3, 2)] {
            let topic =
                Topic::new(TopicId::new(id), SubjectId::new(1), format!("T{id}"), order).unwrap();
            storage.catalog.upsert_topic(&topic).await.unwrap();
        }
        let service = ProgressService::new(
            Clock::fixed(fixed_now()),
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.quiz_attempts),
        );
        (service, storage)
    }

    fn learner() -> LearnerId {
        LearnerId::random()
    }

    #[tokio::test]
    async fn out_of_range_percent_writes_nothing() {
        let (service, _) = setup().await;
        let learner = learner();
        for bad in [-1, 101] {
            let err = service
                .record_progress(learner, TopicId::new(1), bad, 5)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                ServiceError::Validation(ValidationError::PercentOutOfRange(_))
            ));
        }
        assert!(
            service
                .get_progress(learner, TopicId::new(1))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn completion_is_stamped_once() {
        let (service, _) = setup().await;
        let learner = learner();
        let first = service
            .record_progress(learner, TopicId::new(1), 100, 10)
            .await
            .unwrap();
        assert!(first.newly_completed);
        let second = service
            .record_progress(learner, TopicId::new(1), 100, 0)
            .await
            .unwrap();
        assert!(!second.newly_completed);
        assert_eq!(second.record.completed_at(), first.record.completed_at());
    }

    #[tokio::test]
    async fn unknown_topic_is_not_found() {
        let (service, _) = setup().await;
        let err = service
            .record_progress(learner(), TopicId::new(77), 10, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("topic")));
    }

    #[tokio::test]
    async fn subject_completion_counts_missing_topics_as_zero() {
        let (service, _) = setup().await;
        let learner = learner();
        service
            .record_progress(learner, TopicId::new(1), 100, 0)
            .await
            .unwrap();
        service
            .record_progress(learner, TopicId::new(2), 50, 0)
            .await
            .unwrap();
        let percent = service
            .subject_completion_percent(learner, SubjectId::new(1))
            .await
            .unwrap();
        assert_eq!(percent, 50);
        assert_eq!(
            service
                .subject_completion_percent(learner, SubjectId::new(9))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn topic_states_follow_completion() {
        let (service, _) = setup().await;
        let learner = learner();
        service
            .record_progress(learner, TopicId::new(1), 100, 0)
            .await
            .unwrap();
        let states = service
            .topic_states(learner, SubjectId::new(1))
            .await
            .unwrap();
        assert_eq!(
            states,
            vec![
                (TopicId::new(1), TopicState::Completed),
                (TopicId::new(2), TopicState::Available),
                (TopicId::new(3), TopicState::Locked),
            ]
        );
        assert_eq!(
            service.topic_state(learner, TopicId::new(3)).await.unwrap(),
            TopicState::Locked
        );
    }

    #[tokio::test]
    async fn overview_summarises_ledger() {
        let (service, _) = setup().await;
        let learner = learner();
        service
            .record_progress(learner, TopicId::new(1), 100, 45)
            .await
            .unwrap();
        service
            .record_progress(learner, TopicId::new(2), 50, 20)
            .await
            .unwrap();
        let overview = service.overview(learner).await.unwrap();
        assert_eq!(overview.topics_completed, 1);
        assert_eq!(overview.total_topics, 3);
        assert_eq!(overview.overall_completion_percent, 33);
        assert_eq!(overview.total_time_spent_minutes, 65);
        assert_eq!(overview.average_quiz_score, None);
    }
}
