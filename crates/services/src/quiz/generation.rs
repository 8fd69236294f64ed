//! Turning untrusted advisor text into validated quiz questions.

use campus_core::model::{QuizQuestion, Topic};
use serde::Deserialize;

use crate::error::AdvisorError;

/// Questions for one quiz, tagged with where they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedQuiz {
    Validated {
        title: String,
        questions: Vec<QuizQuestion>,
    },
    /// The advisor failed or replied with something unusable.
    Fallback {
        title: String,
        questions: Vec<QuizQuestion>,
        reason: String,
    },
}

impl GeneratedQuiz {
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Validated { title, .. } | Self::Fallback { title, .. } => title,
        }
    }

    #[must_use]
    pub fn questions(&self) -> &[QuizQuestion] {
        match self {
            Self::Validated { questions, .. } | Self::Fallback { questions, .. } => questions,
        }
    }

    #[must_use]
    pub fn into_questions(self) -> Vec<QuizQuestion> {
        match self {
            Self::Validated { questions, .. } | Self::Fallback { questions, .. } => questions,
        }
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

#[must_use]
pub fn quiz_title(topic: &Topic) -> String {
    format!("{} Quiz", topic.title())
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    question: String,
    options: Vec<String>,
    #[serde(rename = "correctIndex", alias = "correct_index")]
    correct_index: i64,
    #[serde(default)]
    explanation: String,
}

/// The slice from the first `[` to the last `]`, if any.
pub(crate) fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse and validate the advisor's reply. Extra questions beyond `limit`
/// are dropped; a single invalid question rejects the whole reply.
///
/// # Errors
///
/// Returns `AdvisorError::Malformed` when no JSON array is found, it does not
/// deserialise, it is empty, or any question fails validation.
pub fn parse_questions(text: &str, limit: usize) -> Result<Vec<QuizQuestion>, AdvisorError> {
    let json = extract_json_array(text)
        .ok_or_else(|| AdvisorError::Malformed("no JSON array in reply".into()))?;
    let raw: Vec<RawQuestion> =
        serde_json::from_str(json).map_err(|err| AdvisorError::Malformed(err.to_string()))?;
    if raw.is_empty() {
        return Err(AdvisorError::Malformed("reply contained no questions".into()));
    }

    raw.into_iter()
        .take(limit.max(1))
        .enumerate()
        .map(|(i, q)| {
            let index = usize::try_from(q.correct_index).map_err(|_| {
                AdvisorError::Malformed(format!("question {i}: negative correct index"))
            })?;
            QuizQuestion::new(q.question, q.options, index, q.explanation)
                .map_err(|err| AdvisorError::Malformed(format!("question {i}: {err}")))
        })
        .collect()
}

/// Deterministic placeholder quiz used whenever generation fails.
#[must_use]
pub fn fallback_questions(topic: &Topic) -> Vec<QuizQuestion> {
    let options = ["Option A", "Option B", "Option C", "Option D"]
        .into_iter()
        .map(String::from)
        .collect();
    QuizQuestion::new(
        format!("What is the main concept of {}?", topic.title()),
        options,
        0,
        "This is a placeholder question. Please regenerate the quiz.",
    )
    .map(|q| vec![q])
    .unwrap_or_default()
}
