use std::sync::Arc;

use campus_core::model::{GradeLevel, LearnerProfile, Topic};

use crate::advisor::{Advisor, Prompt, prompts};

pub const CHAT_FALLBACK: &str = "I'm sorry, I couldn't process that. Please try again!";
pub const HINT_FALLBACK: &str = "Think about the key concepts you learned in the lesson.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorReply {
    pub text: String,
    pub from_advisor: bool,
}

impl TutorReply {
    fn canned(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from_advisor: false,
        }
    }
}

/// Free-form tutoring, generated lessons and practice hints. Every call
/// answers; advisor failures become canned text.
#[derive(Clone)]
pub struct TutorService {
    advisor: Arc<dyn Advisor>,
}

impl TutorService {
    #[must_use]
    pub fn new(advisor: Arc<dyn Advisor>) -> Self {
        Self { advisor }
    }

    async fn reply(&self, prompt: &Prompt, kind: &'static str, fallback: String) -> TutorReply {
        match self.advisor.complete(prompt).await {
            Ok(text) => TutorReply {
                text,
                from_advisor: true,
            },
            Err(err) => {
                tracing::warn!(kind, error = %err, "tutor fell back");
                TutorReply::canned(fallback)
            }
        }
    }

    /// Answer a learner's question in the tutor persona for their grade.
    /// Blank questions are not sent.
    pub async fn ask(&self, profile: &LearnerProfile, text: &str) -> TutorReply {
        let text = text.trim();
        if text.is_empty() {
            return TutorReply::canned(CHAT_FALLBACK);
        }
        let prompt =
            Prompt::user(text).with_system(prompts::tutor_system(profile.grade_level, None));
        tracing::debug!(learner_id = %profile.learner_id, "tutor question");
        self.reply(&prompt, "chat", CHAT_FALLBACK.to_owned()).await
    }

    /// The topic's written lesson, or one generated for `grade` when the
    /// catalog has none.
    pub async fn lesson(&self, topic: &Topic, subject: &str, grade: GradeLevel) -> TutorReply {
        if let Some(content) = topic.content() {
            return TutorReply::canned(content);
        }
        let fallback = format!("# {}\n\nLesson content is being prepared...", topic.title());
        self.reply(&prompts::lesson(topic, subject, grade), "lesson", fallback)
            .await
    }

    pub async fn hint(
        &self,
        question: &str,
        topic: &Topic,
        subject: &str,
        grade: GradeLevel,
    ) -> TutorReply {
        let prompt = prompts::hint(question, topic, subject, grade);
        self.reply(&prompt, "hint", HINT_FALLBACK.to_owned()).await
    }
}
