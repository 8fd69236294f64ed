#![forbid(unsafe_code)]

pub mod advisor;
pub mod app_services;
pub mod error;
pub mod gamification_service;
pub mod learning_service;
pub mod progress_service;
pub mod quiz;
pub mod recommendation_service;
pub mod retry;
pub mod tutor_service;

pub use campus_core::Clock;

pub use advisor::{Advisor, AdvisorConfig, ChatAdvisor, DisabledAdvisor, Prompt};
pub use app_services::{AppServices, advisor_from_env};
pub use error::{AdvisorError, AppServicesError, ServiceError};
pub use gamification_service::{GamificationService, XpAward};
pub use learning_service::{ActivityOutcome, LearningService};
pub use progress_service::ProgressService;
pub use quiz::{GeneratedQuiz, QuizOutcome, QuizRun, QuizService, QuizStep};
pub use recommendation_service::{Advice, RecommendationService, StudyPlan};
pub use tutor_service::{TutorReply, TutorService};
