//! Prompt text sent to the advisor.

use campus_core::model::{Difficulty, GradeLevel, QuizQuestion, Topic};

const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Lower for replies that must parse as JSON.
const STRUCTURED_TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: Option<String>,
    pub user: String,
    pub temperature: f32,
}

impl Prompt {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            system: None,
            user: text.into(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    #[must_use]
    pub fn structured(mut self) -> Self {
        self.temperature = STRUCTURED_TEMPERATURE;
        self
    }
}

fn grade_adaptation(grade: GradeLevel) -> &'static str {
    match grade {
        GradeLevel::Elementary => {
            "Explain concepts using simple words, short sentences, and fun examples. Use analogies a young child would understand."
        }
        GradeLevel::MiddleSchool => {
            "Explain concepts clearly with some technical terms. Use relatable examples for teenagers."
        }
        GradeLevel::HighSchool => {
            "Provide detailed explanations with proper terminology. Include real-world applications."
        }
        GradeLevel::College => {
            "Use advanced terminology and in-depth explanations. Reference academic concepts and theories."
        }
        GradeLevel::Adult => {
            "Provide comprehensive, professional explanations suitable for lifelong learners."
        }
    }
}

/// System prompt for the tutor persona, tuned to the learner's grade tier.
#[must_use]
pub fn tutor_system(grade: GradeLevel, subject: Option<&str>) -> String {
    let mut out = format!(
        "You are a friendly, patient AI tutor helping a {} student",
        grade.label()
    );
    if let Some(subject) = subject {
        out.push_str(&format!(" with {subject}"));
    }
    out.push_str(".\n\n");
    out.push_str(grade_adaptation(grade));
    out.push_str(
        "\n\nGuidelines:\n\
         - Be encouraging and supportive\n\
         - Break down complex concepts into smaller parts\n\
         - Use examples to illustrate ideas\n\
         - Ask follow-up questions to check understanding\n\
         - Correct mistakes gently and explain why\n\
         - Celebrate progress and effort\n\
         - Keep responses concise and focused",
    );
    out
}

/// Quiz generation prompt. The reply must be a bare JSON array of
/// `{question, options, correctIndex, explanation}` objects.
#[must_use]
pub fn quiz_generation(
    topic: &Topic,
    grade: GradeLevel,
    count: u32,
    difficulty: Difficulty,
) -> Prompt {
    let text = format!(
        "You are an expert educator creating a quiz.\n\n\
         Topic: {title}\n\
         Grade Level: {grade}\n\
         Difficulty: {difficulty}\n\
         Number of Questions: {count}\n\n\
         Topic Content:\n{content}\n\n\
         Create exactly {count} multiple choice questions. Each question must have exactly 4 options.\n\n\
         Respond with a JSON array in this format:\n\
         [{{\"question\": \"...\", \"options\": [\"A\", \"B\", \"C\", \"D\"], \"correctIndex\": 0, \"explanation\": \"...\"}}]\n\n\
         Only return the JSON array, no other text.",
        title = topic.title(),
        grade = grade.label(),
        content = topic.source_text(),
    );
    Prompt::user(text).structured()
}

#[must_use]
pub fn lesson(topic: &Topic, subject: &str, grade: GradeLevel) -> Prompt {
    let text = format!(
        "Create a comprehensive lesson on \"{title}\" for a {grade} student studying {subject}.\n\n\
         Include:\n\
         1. A clear introduction\n\
         2. Key concepts explained simply\n\
         3. Real-world examples\n\
         4. Important points to remember\n\n\
         Format with clear headings and bullet points. Make it engaging and educational.",
        title = topic.title(),
        grade = grade.label(),
    );
    Prompt::user(text).with_system(tutor_system(grade, Some(subject)))
}

#[must_use]
pub fn hint(question: &str, topic: &Topic, subject: &str, grade: GradeLevel) -> Prompt {
    let text = format!(
        "Give me a helpful hint (without giving away the answer) for this question: \"{question}\". The topic is {} in {subject}.",
        topic.title()
    );
    Prompt::user(text).with_system(tutor_system(grade, Some(subject)))
}

/// Why the correct option of `question` is correct.
#[must_use]
pub fn explanation(question: &QuizQuestion, grade: GradeLevel) -> Prompt {
    let text = format!(
        "Briefly explain why the correct answer to this question is correct: \"{}\" - The answer is: {}",
        question.question(),
        question.correct_option()
    );
    Prompt::user(text).with_system(tutor_system(grade, None))
}
