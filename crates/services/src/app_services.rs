use std::sync::Arc;

use campus_core::model::QuizSettings;
use storage::repository::Storage;

use crate::Clock;
use crate::advisor::{Advisor, AdvisorConfig, AdvisorConfigError, ChatAdvisor, DisabledAdvisor};
use crate::error::AppServicesError;
use crate::gamification_service::GamificationService;
use crate::learning_service::LearningService;
use crate::progress_service::ProgressService;
use crate::quiz::QuizService;
use crate::recommendation_service::RecommendationService;
use crate::tutor_service::TutorService;

/// Build the advisor described by the environment, or a disabled one when
/// no API key is set.
///
/// # Errors
///
/// Returns `AdvisorConfigError` if the configured base URL is unusable.
pub fn advisor_from_env() -> Result<Arc<dyn Advisor>, AdvisorConfigError> {
    Ok(match AdvisorConfig::from_env()? {
        Some(config) => {
            tracing::info!(model = %config.model, base_url = %config.base_url, "advisor enabled");
            Arc::new(ChatAdvisor::new(config))
        }
        None => {
            tracing::info!("advisor disabled, canned fallbacks will be used");
            Arc::new(DisabledAdvisor)
        }
    })
}

/// Assembles app-facing services over one storage backend and one advisor.
#[derive(Clone)]
pub struct AppServices {
    progress: Arc<ProgressService>,
    gamification: Arc<GamificationService>,
    learning: Arc<LearningService>,
    quizzes: Arc<QuizService>,
    recommendations: Arc<RecommendationService>,
    tutor: Arc<TutorService>,
    advisor: Arc<dyn Advisor>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, with the advisor taken
    /// from the environment.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// advisor configuration is invalid.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let advisor = advisor_from_env()?;
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(
            &storage,
            clock,
            QuizSettings::default(),
            advisor,
        ))
    }

    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        quiz_settings: QuizSettings,
        advisor: Arc<dyn Advisor>,
    ) -> Self {
        let progress = ProgressService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.quiz_attempts),
        );
        let gamification = GamificationService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.gamification),
            Arc::clone(&storage.badges),
        );
        let learning = LearningService::new(progress.clone(), gamification.clone());
        let quizzes = QuizService::new(
            clock,
            quiz_settings,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.quiz_attempts),
            progress.clone(),
            gamification.clone(),
            Arc::clone(&advisor),
        );
        let recommendations =
            RecommendationService::new(progress.clone(), gamification.clone(), Arc::clone(&advisor));

        Self {
            progress: Arc::new(progress),
            gamification: Arc::new(gamification),
            learning: Arc::new(learning),
            quizzes: Arc::new(quizzes),
            recommendations: Arc::new(recommendations),
            tutor: Arc::new(TutorService::new(Arc::clone(&advisor))),
            advisor,
        }
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn gamification(&self) -> Arc<GamificationService> {
        Arc::clone(&self.gamification)
    }

    #[must_use]
    pub fn learning(&self) -> Arc<LearningService> {
        Arc::clone(&self.learning)
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<QuizService> {
        Arc::clone(&self.quizzes)
    }

    #[must_use]
    pub fn recommendations(&self) -> Arc<RecommendationService> {
        Arc::clone(&self.recommendations)
    }

    #[must_use]
    pub fn tutor(&self) -> Arc<TutorService> {
        Arc::clone(&self.tutor)
    }

    #[must_use]
    pub fn advisor_enabled(&self) -> bool {
        self.advisor.enabled()
    }
}
