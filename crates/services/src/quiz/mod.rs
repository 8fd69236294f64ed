mod generation;
mod service;

pub use generation::{GeneratedQuiz, fallback_questions, parse_questions, quiz_title};
pub(crate) use generation::extract_json_array;
pub use service::{MistakeExplanation, QuizOutcome, QuizRun, QuizService, QuizStep};
