use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ValidationError;
use crate::model::ids::{LearnerId, QuizId, TopicId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizQuestionError {
    #[error("question text cannot be empty")]
    EmptyQuestion,

    #[error("a question needs at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("option {0} is empty")]
    EmptyOption(usize),

    #[error("correct option index {index} is out of range for {len} options")]
    CorrectIndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizAttemptError {
    #[error("score {0} is above 100")]
    ScoreOutOfRange(u8),
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question whose shape has been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    question: String,
    options: Vec<String>,
    correct_index: usize,
    explanation: String,
}

impl QuizQuestion {
    /// # Errors
    ///
    /// Returns `QuizQuestionError` when the text is blank, fewer than two
    /// options are given, an option is blank, or the correct index is out of
    /// range.
    pub fn new(
        question: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
        explanation: impl Into<String>,
    ) -> Result<Self, QuizQuestionError> {
        let question = question.into().trim().to_owned();
        if question.is_empty() {
            return Err(QuizQuestionError::EmptyQuestion);
        }
        if options.len() < 2 {
            return Err(QuizQuestionError::TooFewOptions(options.len()));
        }
        let options: Vec<String> = options.into_iter().map(|o| o.trim().to_owned()).collect();
        if let Some(blank) = options.iter().position(String::is_empty) {
            return Err(QuizQuestionError::EmptyOption(blank));
        }
        if correct_index >= options.len() {
            return Err(QuizQuestionError::CorrectIndexOutOfRange {
                index: correct_index,
                len: options.len(),
            });
        }
        Ok(Self {
            question,
            options,
            correct_index,
            explanation: explanation.into().trim().to_owned(),
        })
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_index]
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// An absent answer never matches.
    #[must_use]
    pub fn is_correct(&self, answer: Option<usize>) -> bool {
        answer == Some(self.correct_index)
    }
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// `round(100 * correct / total)`; zero questions score 0.
#[must_use]
pub fn score_percent(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total) as u64;
    let total = total as u64;
    let score = (200 * correct + total) / (2 * total);
    u8::try_from(score).unwrap_or(100)
}

/// XP for a quiz score: `round(score / 5)`, so 0..=20.
#[must_use]
pub fn xp_for_score(score: u8) -> u64 {
    (u64::from(score) * 2 + 5) / 10
}

/// Feedback tier shown on the results screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    /// 80 and above; the UI celebrates.
    Excellent,
    Good,
    NeedsWork,
}

impl ScoreBand {
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => Self::Excellent,
            60..=79 => Self::Good,
            _ => Self::NeedsWork,
        }
    }

    #[must_use]
    pub fn celebrate(self) -> bool {
        matches!(self, Self::Excellent)
    }
}

/// Formats a countdown as `m:ss`.
#[must_use]
pub fn format_countdown(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Used for practice rounds.
    Easy,
    #[default]
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        })
    }
}

/// Quiz configuration: 5 questions, 10 minutes, 3 second integrity warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSettings {
    question_count: u32,
    time_budget_secs: u32,
    warning_secs: u32,
    difficulty: Difficulty,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            question_count: 5,
            time_budget_secs: 600,
            warning_secs: 3,
            difficulty: Difficulty::Medium,
        }
    }
}

impl QuizSettings {
    /// # Errors
    ///
    /// Returns `ValidationError::QuizSettings` if the count or budget is zero.
    pub fn new(
        question_count: u32,
        time_budget_secs: u32,
        warning_secs: u32,
        difficulty: Difficulty,
    ) -> Result<Self, ValidationError> {
        if question_count == 0 {
            return Err(ValidationError::QuizSettings("question count must be > 0"));
        }
        if time_budget_secs == 0 {
            return Err(ValidationError::QuizSettings("time budget must be > 0"));
        }
        Ok(Self {
            question_count,
            time_budget_secs,
            warning_secs,
            difficulty,
        })
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn time_budget_secs(&self) -> u32 {
        self.time_budget_secs
    }

    #[must_use]
    pub fn warning_secs(&self) -> u32 {
        self.warning_secs
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

/// Immutable record of one finished quiz session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAttempt {
    learner_id: LearnerId,
    quiz_id: QuizId,
    topic_id: TopicId,
    answers: Vec<Option<usize>>,
    score: u8,
    completed_at: DateTime<Utc>,
}

impl QuizAttempt {
    /// # Errors
    ///
    /// Returns `QuizAttemptError::ScoreOutOfRange` for scores above 100.
    pub fn new(
        learner_id: LearnerId,
        quiz_id: QuizId,
        topic_id: TopicId,
        answers: Vec<Option<usize>>,
        score: u8,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, QuizAttemptError> {
        if score > 100 {
            return Err(QuizAttemptError::ScoreOutOfRange(score));
        }
        Ok(Self {
            learner_id,
            quiz_id,
            topic_id,
            answers,
            score,
            completed_at,
        })
    }

    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    #[must_use]
    pub fn score(&self) -> u8 {
        self.score
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
