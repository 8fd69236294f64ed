use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::ids::LearnerId;

/// Grade-level classification supplied by the identity collaborator.
///
/// Only used to pick a prompt-adaptation tier; the core does not interpret it
/// any further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeLevel {
    Elementary,
    MiddleSchool,
    #[default]
    HighSchool,
    College,
    Adult,
}

impl GradeLevel {
    /// Parses the persisted classification, falling back to `HighSchool` for
    /// unknown or missing values.
    #[must_use]
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("elementary") => Self::Elementary,
            Some("middle_school") => Self::MiddleSchool,
            Some("college") => Self::College,
            Some("adult") => Self::Adult,
            _ => Self::HighSchool,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Elementary => "elementary",
            Self::MiddleSchool => "middle_school",
            Self::HighSchool => "high_school",
            Self::College => "college",
            Self::Adult => "adult",
        }
    }

    /// Human wording used inside prompts ("middle school").
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Elementary => "elementary",
            Self::MiddleSchool => "middle school",
            Self::HighSchool => "high school",
            Self::College => "college",
            Self::Adult => "adult",
        }
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the identity collaborator tells us about the current learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LearnerProfile {
    pub learner_id: LearnerId,
    pub grade_level: GradeLevel,
}

impl LearnerProfile {
    #[must_use]
    pub fn new(learner_id: LearnerId, grade_level: GradeLevel) -> Self {
        Self {
            learner_id,
            grade_level,
        }
    }
}
