use campus_core::ValidationError;
use campus_core::model::{GamificationState, LearnerId, ProgressChange, ProgressPercent, TopicId};

use crate::error::ServiceError;
use crate::gamification_service::{GamificationService, XpAward};
use crate::progress_service::ProgressService;

/// XP for finishing a lesson.
pub const LESSON_XP: i64 = 10;
/// XP for each correct practice answer.
pub const PRACTICE_ANSWER_XP: i64 = 5;
/// Practice accuracy (percent) needed for the higher progress mark.
pub const PRACTICE_PASS_ACCURACY: u32 = 70;

/// What one learning action changed.
#[derive(Debug)]
pub struct ActivityOutcome {
    pub progress: Option<ProgressChange>,
    pub streak: GamificationState,
    pub xp: Option<XpAward>,
}

/// Lessons and practice rounds. Every action runs in the same order:
/// progress, then activity, then XP (which evaluates badges).
#[derive(Clone)]
pub struct LearningService {
    progress: ProgressService,
    gamification: GamificationService,
}

impl LearningService {
    #[must_use]
    pub fn new(progress: ProgressService, gamification: GamificationService) -> Self {
        Self {
            progress,
            gamification,
        }
    }

    /// Lesson read to the end: progress 50, time added, +10 XP.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError` if any step fails; earlier steps stay applied.
    pub async fn complete_lesson(
        &self,
        learner_id: LearnerId,
        topic_id: TopicId,
        minutes_spent: u32,
    ) -> Result<ActivityOutcome, ServiceError> {
        let progress = self
            .progress
            .record_progress(
                learner_id,
                topic_id,
                i32::from(ProgressPercent::LESSON_DONE.value()),
                minutes_spent,
            )
            .await?;
        let streak = self.gamification.touch_today(learner_id).await?;
        let xp = self.gamification.award_xp(learner_id, LESSON_XP).await?;
        Ok(ActivityOutcome {
            progress: Some(progress),
            streak,
            xp: Some(xp),
        })
    }

    /// One practice question answered. Correct answers earn XP; every answer
    /// counts as activity.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError` if the streak or XP update fails.
    pub async fn practice_answer(
        &self,
        learner_id: LearnerId,
        correct: bool,
    ) -> Result<ActivityOutcome, ServiceError> {
        let streak = self.gamification.touch_today(learner_id).await?;
        let xp = if correct {
            Some(
                self.gamification
                    .award_xp(learner_id, PRACTICE_ANSWER_XP)
                    .await?,
            )
        } else {
            None
        };
        Ok(ActivityOutcome {
            progress: None,
            streak,
            xp,
        })
    }

    /// Practice round finished: accuracy of at least 70% marks the topic at
    /// 75, anything lower at 60.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for an empty round or more correct
    /// answers than questions, or any storage failure.
    pub async fn complete_practice(
        &self,
        learner_id: LearnerId,
        topic_id: TopicId,
        correct: u32,
        total: u32,
    ) -> Result<ActivityOutcome, ServiceError> {
        let percent = practice_progress(correct, total)?;
        let progress = self
            .progress
            .record_progress(learner_id, topic_id, i32::from(percent.value()), 0)
            .await?;
        let streak = self.gamification.touch_today(learner_id).await?;
        Ok(ActivityOutcome {
            progress: Some(progress),
            streak,
            xp: None,
        })
    }
}

fn practice_progress(correct: u32, total: u32) -> Result<ProgressPercent, ValidationError> {
    if total == 0 {
        return Err(ValidationError::EmptyPractice);
    }
    if correct > total {
        return Err(ValidationError::CorrectExceedsTotal { correct, total });
    }
    let passed = u64::from(correct) * 100 >= u64::from(PRACTICE_PASS_ACCURACY) * u64::from(total);
    Ok(if passed {
        ProgressPercent::PRACTICE_PASSED
    } else {
        ProgressPercent::PRACTICE_NEEDS_WORK
    })
}
