mod badge;
mod gamification;
mod ids;
mod learner;
mod progress;
mod quiz;
mod subject;

pub use ids::{BadgeId, LearnerId, ParseIdError, QuizId, SubjectId, TopicId};

pub use badge::{Badge, BadgeCategory, EarnedBadge, newly_eligible};
pub use gamification::{
    GamificationError, GamificationState, Level, StreakUpdate, XP_PER_LEVEL, derive_level,
};
pub use learner::{GradeLevel, LearnerProfile};
pub use progress::{
    ProgressChange, ProgressError, ProgressPercent, ProgressRecord, ProgressSnapshot,
    mean_completion,
};
pub use quiz::{
    Difficulty, QuizAttempt, QuizAttemptError, QuizQuestion, QuizQuestionError, QuizSettings,
    ScoreBand, format_countdown, score_percent, xp_for_score,
};
pub use subject::{Subject, SubjectError, Topic, TopicError};
