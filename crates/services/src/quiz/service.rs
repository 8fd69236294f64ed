use std::sync::Arc;

use campus_core::model::{
    Difficulty, GradeLevel, LearnerId, ProgressChange, ProgressPercent, QuizAttempt, QuizId,
    QuizQuestion, QuizSettings, Topic, TopicId,
};
use campus_core::quiz_session::{
    FinishReason, QuizEvent, QuizResults, QuizSession, QuizTransition,
};
use chrono::{DateTime, Utc};
use storage::repository::{CatalogRepository, QuizAttemptRepository, StorageError};

use crate::Clock;
use crate::advisor::{Advisor, Prompt, prompts};
use crate::error::ServiceError;
use crate::gamification_service::{GamificationService, XpAward};
use crate::progress_service::ProgressService;
use crate::quiz::generation::{GeneratedQuiz, fallback_questions, parse_questions, quiz_title};
use crate::retry::with_backoff;

/// Which finalize steps already went through, so a retried finalize after a
/// partial failure never repeats one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FinalizeSteps {
    progress: bool,
    activity: bool,
    xp: bool,
    attempt_recorded: bool,
}

impl FinalizeSteps {
    fn all_done(self) -> bool {
        self.progress && self.activity && self.xp && self.attempt_recorded
    }
}

/// One learner's run through a quiz.
#[derive(Debug, Clone)]
pub struct QuizRun {
    learner_id: LearnerId,
    quiz_id: QuizId,
    session: QuizSession,
    steps: FinalizeSteps,
}

impl QuizRun {
    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    /// True once every side effect of the results has been persisted.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.steps.all_done()
    }
}

/// What finalizing a quiz changed. Steps completed by an earlier call are
/// reported as `None`/`false`.
#[derive(Debug)]
pub struct QuizOutcome {
    pub score: u8,
    pub xp_awarded: u64,
    pub reason: FinishReason,
    pub progress: Option<ProgressChange>,
    pub xp: Option<XpAward>,
    pub attempt_newly_recorded: bool,
}

#[derive(Debug)]
pub struct QuizStep {
    pub transition: QuizTransition,
    /// Present when this step moved the session into results.
    pub outcome: Option<QuizOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MistakeExplanation {
    pub question: String,
    pub chosen: Option<String>,
    pub correct: String,
    pub text: String,
    pub from_advisor: bool,
}

#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    settings: QuizSettings,
    catalog: Arc<dyn CatalogRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    progress: ProgressService,
    gamification: GamificationService,
    advisor: Arc<dyn Advisor>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        settings: QuizSettings,
        catalog: Arc<dyn CatalogRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        progress: ProgressService,
        gamification: GamificationService,
        advisor: Arc<dyn Advisor>,
    ) -> Self {
        Self {
            clock,
            settings,
            catalog,
            attempts,
            progress,
            gamification,
            advisor,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    /// Ask the advisor for questions. Never fails: any advisor or validation
    /// problem yields [`GeneratedQuiz::Fallback`].
    pub async fn generate_questions(
        &self,
        topic: &Topic,
        grade: GradeLevel,
        count: u32,
        difficulty: Difficulty,
    ) -> GeneratedQuiz {
        let title = quiz_title(topic);
        let prompt = prompts::quiz_generation(topic, grade, count, difficulty);
        let limit = usize::try_from(count).unwrap_or(usize::MAX);
        let parsed = match self.advisor.complete(&prompt).await {
            Ok(reply) => parse_questions(&reply, limit),
            Err(err) => Err(err),
        };
        match parsed {
            Ok(questions) => {
                tracing::debug!(topic_id = %topic.id(), count = questions.len(), "quiz generated");
                GeneratedQuiz::Validated { title, questions }
            }
            Err(err) => {
                tracing::warn!(topic_id = %topic.id(), error = %err, "quiz generation fell back");
                GeneratedQuiz::Fallback {
                    title,
                    questions: fallback_questions(topic),
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Build a session for the topic and start it immediately.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown topic,
    /// `ServiceError::Quiz(NoQuestions)` for an empty set, or storage errors.
    pub async fn start(
        &self,
        learner_id: LearnerId,
        topic_id: TopicId,
        questions: Vec<QuizQuestion>,
    ) -> Result<QuizRun, ServiceError> {
        let catalog = &self.catalog;
        with_backoff("get_topic", || catalog.get_topic(topic_id))
            .await?
            .ok_or(ServiceError::NotFound("topic"))?;

        let mut session = QuizSession::new(topic_id, &self.settings);
        session.apply(QuizEvent::Start { questions }, self.clock.now())?;
        tracing::debug!(%learner_id, %topic_id, "quiz started");
        Ok(QuizRun {
            learner_id,
            quiz_id: QuizId::new(topic_id.value()),
            session,
            steps: FinalizeSteps::default(),
        })
    }

    /// Apply an event observed now.
    ///
    /// # Errors
    ///
    /// See [`Self::handle_at`].
    pub async fn handle(&self, run: &mut QuizRun, event: QuizEvent) -> Result<QuizStep, ServiceError> {
        self.handle_at(run, event, self.clock.now()).await
    }

    /// Apply an event observed at `now`. Entering results finalizes the run.
    ///
    /// A `Quiz(AlreadyFinished)` error means another event (usually timer
    /// expiry) got there first and can be ignored.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Quiz` for events invalid in the current phase,
    /// or the error of the failing finalize step.
    pub async fn handle_at(
        &self,
        run: &mut QuizRun,
        event: QuizEvent,
        now: DateTime<Utc>,
    ) -> Result<QuizStep, ServiceError> {
        let transition = run.session.apply(event, now)?;
        let outcome = if matches!(transition, QuizTransition::Finished(_)) {
            Some(self.finalize(run).await?)
        } else {
            None
        };
        Ok(QuizStep {
            transition,
            outcome,
        })
    }

    /// Persist the results: progress 100, activity, XP (and badges), then
    /// the attempt record. Safe to call again after a failure; finished steps
    /// are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::QuizInProgress` before results exist, or the
    /// error of the failing step.
    pub async fn finalize(&self, run: &mut QuizRun) -> Result<QuizOutcome, ServiceError> {
        let results = run.session.results().ok_or(ServiceError::QuizInProgress)?;
        let learner_id = run.learner_id;
        let topic_id = run.session.topic_id();
        let mut outcome = QuizOutcome {
            score: results.score(),
            xp_awarded: results.xp_awarded(),
            reason: results.reason(),
            progress: None,
            xp: None,
            attempt_newly_recorded: false,
        };

        if !run.steps.progress {
            let change = self
                .progress
                .record_progress(
                    learner_id,
                    topic_id,
                    i32::from(ProgressPercent::COMPLETE.value()),
                    0,
                )
                .await?;
            outcome.progress = Some(change);
            run.steps.progress = true;
        }

        if !run.steps.activity {
            self.gamification.touch_today(learner_id).await?;
            run.steps.activity = true;
        }

        if !run.steps.xp {
            if results.xp_awarded() > 0 {
                let amount = i64::try_from(results.xp_awarded()).unwrap_or(i64::MAX);
                outcome.xp = Some(self.gamification.award_xp(learner_id, amount).await?);
            }
            run.steps.xp = true;
        }

        if !run.steps.attempt_recorded {
            let attempt = QuizAttempt::new(
                learner_id,
                run.quiz_id,
                topic_id,
                results.answers().to_vec(),
                results.score(),
                results.finished_at(),
            )?;
            match self.attempts.append_attempt(&attempt).await {
                Ok(()) => outcome.attempt_newly_recorded = true,
                Err(StorageError::Conflict) => {
                    tracing::debug!(%learner_id, quiz_id = %run.quiz_id, "attempt already recorded");
                }
                Err(err) => return Err(err.into()),
            }
            run.steps.attempt_recorded = true;
        }

        tracing::info!(
            %learner_id,
            %topic_id,
            score = outcome.score,
            reason = ?outcome.reason,
            "quiz finalized"
        );
        Ok(outcome)
    }

    /// One advisor prompt per wrong or unanswered question.
    #[must_use]
    pub fn explanation_prompts(results: &QuizResults, grade: GradeLevel) -> Vec<Prompt> {
        results
            .wrong_questions()
            .map(|(question, _)| prompts::explanation(question, grade))
            .collect()
    }

    /// Explain every mistake, falling back to the question's own explanation
    /// (or a canned line) when the advisor cannot help.
    pub async fn explain_mistakes(
        &self,
        results: &QuizResults,
        grade: GradeLevel,
    ) -> Vec<MistakeExplanation> {
        let mut out = Vec::new();
        for (question, chosen) in results.wrong_questions() {
            let prompt = prompts::explanation(question, grade);
            let (text, from_advisor) = match self.advisor.complete(&prompt).await {
                Ok(text) => (text, true),
                Err(err) => {
                    tracing::warn!(error = %err, "explanation fell back to canned text");
                    (canned_explanation(question), false)
                }
            };
            out.push(MistakeExplanation {
                question: question.question().to_owned(),
                chosen: chosen.and_then(|i| question.options().get(i).cloned()),
                correct: question.correct_option().to_owned(),
                text,
                from_advisor,
            });
        }
        out
    }
}

fn canned_explanation(question: &QuizQuestion) -> String {
    if question.explanation().is_empty() {
        format!("The correct answer is: {}", question.correct_option())
    } else {
        question.explanation().to_owned()
    }
}
