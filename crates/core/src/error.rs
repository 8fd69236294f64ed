use thiserror::Error;

/// Caller supplied an out-of-contract value. Never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("progress percent must be between 0 and 100, got {0}")]
    PercentOutOfRange(i32),

    #[error("xp amount must be positive, got {0}")]
    NonPositiveXp(i64),

    #[error("practice round has no questions")]
    EmptyPractice,

    #[error("correct answers ({correct}) exceed total questions ({total})")]
    CorrectExceedsTotal { correct: u32, total: u32 },

    #[error("quiz settings are invalid: {0}")]
    QuizSettings(&'static str),
}
