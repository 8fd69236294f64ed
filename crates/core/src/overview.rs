//! Dashboard aggregates derived from the progress ledger and quiz history.

use crate::model::{ProgressSnapshot, QuizAttempt, TopicId};

/// Learner-wide progress summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LearningOverview {
    pub topics_completed: usize,
    pub total_topics: usize,
    /// `round(100 * completed / total)`; 0 without topics.
    pub overall_completion_percent: u8,
    pub total_time_spent_minutes: u64,
    /// Rounded mean over all attempts; `None` before the first quiz.
    pub average_quiz_score: Option<u8>,
}

impl LearningOverview {
    #[must_use]
    pub fn compute(
        topic_ids: &[TopicId],
        progress: &ProgressSnapshot,
        attempts: &[QuizAttempt],
    ) -> Self {
        let topics_completed = topic_ids
            .iter()
            .filter(|id| progress.get(**id).is_some_and(|r| r.is_completed()))
            .count();
        let total_time_spent_minutes = progress
            .records()
            .map(|r| u64::from(r.time_spent_minutes()))
            .sum();

        Self {
            topics_completed,
            total_topics: topic_ids.len(),
            overall_completion_percent: rounded_ratio(topics_completed as u64, topic_ids.len() as u64),
            total_time_spent_minutes,
            average_quiz_score: average_score(attempts),
        }
    }
}

fn rounded_ratio(part: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (200 * part.min(total) + total) / (2 * total);
    u8::try_from(percent).unwrap_or(100)
}

fn average_score(attempts: &[QuizAttempt]) -> Option<u8> {
    if attempts.is_empty() {
        return None;
    }
    let sum: u64 = attempts.iter().map(|a| u64::from(a.score())).sum();
    let n = attempts.len() as u64;
    u8::try_from((2 * sum + n) / (2 * n)).ok()
}

/// `1h 5m` for an hour or more, `45m` otherwise.
#[must_use]
pub fn format_minutes(minutes: u64) -> String {
    let (hours, mins) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}

/// Mastery label for a subject completion percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasteryLevel {
    NotStarted,
    Beginning,
    Developing,
    Proficient,
    Mastered,
}

impl MasteryLevel {
    #[must_use]
    pub fn from_percent(percent: u8) -> Self {
        match percent {
            90.. => Self::Mastered,
            70..=89 => Self::Proficient,
            50..=69 => Self::Developing,
            25..=49 => Self::Beginning,
            _ => Self::NotStarted,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::Beginning => "Beginning",
            Self::Developing => "Developing",
            Self::Proficient => "Proficient",
            Self::Mastered => "Mastered",
        }
    }
}

/// Quiz catalog tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuizFilter {
    #[default]
    All,
    /// Lesson work done, quiz still outstanding.
    Assigned,
    Practice,
    Completed,
}

impl QuizFilter {
    #[must_use]
    pub fn matches(self, progress_percent: u8, completed: bool) -> bool {
        match self {
            Self::All => true,
            Self::Assigned => !completed && progress_percent >= 50,
            Self::Practice => progress_percent < 50,
            Self::Completed => completed,
        }
    }
}
