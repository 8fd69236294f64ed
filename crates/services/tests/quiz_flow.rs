use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use campus_core::model::{
    Badge, BadgeCategory, BadgeId, Difficulty, GradeLevel, LearnerId, QuizQuestion, QuizSettings,
    Subject, SubjectId, Topic, TopicId,
};
use campus_core::quiz_session::{FinishReason, QuizEvent, QuizSessionError, QuizTransition};
use campus_core::time::fixed_clock;
use chrono::Duration;
use services::{
    Advisor, AdvisorError, AppServices, DisabledAdvisor, Prompt, QuizService, ServiceError,
};
use storage::repository::Storage;

/// Replies with the same text every time and counts calls.
struct CannedAdvisor {
    reply: String,
    calls: AtomicUsize,
}

impl CannedAdvisor {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_owned(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Advisor for CannedAdvisor {
    async fn complete(&self, _prompt: &Prompt) -> Result<String, AdvisorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

async fn seeded_storage() -> Storage {
    let storage = Storage::in_memory();
    storage
        .catalog
        .upsert_subject(&Subject::new(SubjectId::new(1), "Mathematics").unwrap())
        .await
        .unwrap();
    for (id, order) in [(1, 0), (2, 1)] {
        let topic = Topic::new(TopicId::new(id), SubjectId::new(1), format!("Topic {id}"), order)
            .unwrap();
        storage.catalog.upsert_topic(&topic).await.unwrap();
    }
    storage
        .catalog
        .upsert_badge(&Badge::new(
            BadgeId::new(1),
            "First Steps",
            10,
            BadgeCategory::Milestone,
        ))
        .await
        .unwrap();
    storage
}

fn services(storage: &Storage, advisor: Arc<dyn Advisor>) -> AppServices {
    AppServices::from_storage(
        storage,
        fixed_clock(),
        QuizSettings::default(),
        advisor,
    )
}

fn five_questions() -> Vec<QuizQuestion> {
    (1..=5)
        .map(|i| {
            QuizQuestion::new(
                format!("Question {i}"),
                vec!["a".into(), "b".into(), "c".into(), "d".into()],
                0,
                format!("Because of rule {i}."),
            )
            .unwrap()
        })
        .collect()
}

#[tokio::test]
async fn four_of_five_scores_80_and_awards_16_xp() {
    let storage = seeded_storage().await;
    let app = services(&storage, Arc::new(DisabledAdvisor));
    let quizzes = app.quizzes();
    let learner = LearnerId::random();

    let mut run = quizzes
        .start(learner, TopicId::new(1), five_questions())
        .await
        .unwrap();

    let mut outcome = None;
    for i in 0..5 {
        let choice = if i == 4 { 1 } else { 0 };
        quizzes
            .handle(&mut run, QuizEvent::SelectAnswer(choice))
            .await
            .unwrap();
        let step = quizzes
            .handle(&mut run, QuizEvent::ConfirmAndAdvance)
            .await
            .unwrap();
        if i < 4 {
            assert!(matches!(step.transition, QuizTransition::Advanced { .. }));
            assert!(step.outcome.is_none());
        } else {
            assert_eq!(
                step.transition,
                QuizTransition::Finished(FinishReason::Completed)
            );
            outcome = step.outcome;
        }
    }

    let outcome = outcome.unwrap();
    assert_eq!(outcome.score, 80);
    assert_eq!(outcome.xp_awarded, 16);
    assert!(outcome.attempt_newly_recorded);
    let xp = outcome.xp.unwrap();
    assert_eq!(xp.total_xp, 16);
    assert_eq!(xp.new_badges.len(), 1);
    assert!(run.is_finalized());

    let record = storage
        .progress
        .get_progress(learner, TopicId::new(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.progress_percent(), 100);
    assert!(record.is_completed());

    let attempts = storage.quiz_attempts.list_attempts(learner).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].score(), 80);

    let state = storage
        .gamification
        .get_or_create_state(learner)
        .await
        .unwrap();
    assert_eq!(state.current_streak_days(), 1);
}

#[tokio::test]
async fn expiry_scores_unanswered_as_wrong_and_still_completes_topic() {
    let storage = seeded_storage().await;
    let app = services(&storage, Arc::new(DisabledAdvisor));
    let quizzes = app.quizzes();
    let learner = LearnerId::random();
    let mut run = quizzes
        .start(learner, TopicId::new(2), five_questions())
        .await
        .unwrap();

    for _ in 0..2 {
        quizzes
            .handle(&mut run, QuizEvent::SelectAnswer(0))
            .await
            .unwrap();
        quizzes
            .handle(&mut run, QuizEvent::ConfirmAndAdvance)
            .await
            .unwrap();
    }

    let mut wall = fixed_clock();
    wall.advance(Duration::seconds(601));
    let step = quizzes
        .handle_at(&mut run, QuizEvent::Tick, wall.now())
        .await
        .unwrap();
    assert_eq!(
        step.transition,
        QuizTransition::Finished(FinishReason::TimedOut)
    );
    let outcome = step.outcome.unwrap();
    assert_eq!(outcome.score, 40);
    assert_eq!(outcome.xp_awarded, 8);

    let results = run.session().results().unwrap();
    assert_eq!(results.answers(), &[Some(0), Some(0), None, None, None]);
    let mut deadline = fixed_clock();
    deadline.advance(Duration::seconds(600));
    assert_eq!(results.finished_at(), deadline.now());

    let record = storage
        .progress
        .get_progress(learner, TopicId::new(2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.progress_percent(), 100);
}

#[tokio::test]
async fn finished_quiz_rejects_events_and_never_double_records() {
    let storage = seeded_storage().await;
    let app = services(&storage, Arc::new(DisabledAdvisor));
    let quizzes = app.quizzes();
    let learner = LearnerId::random();
    let questions = five_questions()[..1].to_vec();

    let mut run = quizzes
        .start(learner, TopicId::new(1), questions.clone())
        .await
        .unwrap();
    quizzes
        .handle(&mut run, QuizEvent::SelectAnswer(0))
        .await
        .unwrap();
    quizzes
        .handle(&mut run, QuizEvent::ConfirmAndAdvance)
        .await
        .unwrap();

    let err = quizzes
        .handle(&mut run, QuizEvent::ConfirmAndAdvance)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Quiz(QuizSessionError::AlreadyFinished)
    ));

    let again = quizzes.finalize(&mut run).await.unwrap();
    assert!(!again.attempt_newly_recorded);
    assert!(again.progress.is_none());
    assert!(again.xp.is_none());

    // Same learner, quiz and completion instant: the store rejects it and
    // the service treats it as already recorded.
    let mut twin = quizzes
        .start(learner, TopicId::new(1), questions)
        .await
        .unwrap();
    quizzes
        .handle(&mut twin, QuizEvent::SelectAnswer(0))
        .await
        .unwrap();
    let step = quizzes
        .handle(&mut twin, QuizEvent::ConfirmAndAdvance)
        .await
        .unwrap();
    assert!(!step.outcome.unwrap().attempt_newly_recorded);
    assert!(twin.is_finalized());

    let attempts = storage.quiz_attempts.list_attempts(learner).await.unwrap();
    assert_eq!(attempts.len(), 1);
}

#[tokio::test]
async fn finalize_before_results_is_rejected() {
    let storage = seeded_storage().await;
    let app = services(&storage, Arc::new(DisabledAdvisor));
    let quizzes = app.quizzes();
    let mut run = quizzes
        .start(LearnerId::random(), TopicId::new(1), five_questions())
        .await
        .unwrap();
    let err = quizzes.finalize(&mut run).await.unwrap_err();
    assert!(matches!(err, ServiceError::QuizInProgress));
}

#[tokio::test]
async fn unknown_topic_cannot_start() {
    let storage = seeded_storage().await;
    let app = services(&storage, Arc::new(DisabledAdvisor));
    let err = app
        .quizzes()
        .start(LearnerId::random(), TopicId::new(99), five_questions())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound("topic")));
}

#[tokio::test]
async fn advisor_questions_are_validated_or_replaced() {
    let storage = seeded_storage().await;
    let topic = storage
        .catalog
        .get_topic(TopicId::new(1))
        .await
        .unwrap()
        .unwrap();

    let good = Arc::new(CannedAdvisor::new(
        r#"```json
[{"question": "2 + 2?", "options": ["3", "4", "5", "6"], "correctIndex": 1, "explanation": "Sum."}]
```"#,
    ));
    let app = services(&storage, good.clone());
    let quiz = app
        .quizzes()
        .generate_questions(&topic, GradeLevel::MiddleSchool, 5, Difficulty::Medium)
        .await;
    assert!(!quiz.is_fallback());
    assert_eq!(quiz.questions()[0].correct_option(), "4");
    assert_eq!(good.calls.load(Ordering::SeqCst), 1);

    let broken = Arc::new(CannedAdvisor::new(
        r#"[{"question": "2 + 2?", "options": ["4"], "correctIndex": 3}]"#,
    ));
    let app = services(&storage, broken);
    let quiz = app
        .quizzes()
        .generate_questions(&topic, GradeLevel::MiddleSchool, 5, Difficulty::Medium)
        .await;
    assert!(quiz.is_fallback());
    assert_eq!(quiz.title(), "Topic 1 Quiz");

    let app = services(&storage, Arc::new(DisabledAdvisor));
    let quiz = app
        .quizzes()
        .generate_questions(&topic, GradeLevel::MiddleSchool, 5, Difficulty::Medium)
        .await;
    assert!(quiz.is_fallback());
    assert_eq!(
        quiz.questions()[0].question(),
        "What is the main concept of Topic 1?"
    );
}

#[tokio::test]
async fn mistakes_are_explained_with_fallback() {
    let storage = seeded_storage().await;
    let app = services(&storage, Arc::new(DisabledAdvisor));
    let quizzes = app.quizzes();
    let mut run = quizzes
        .start(LearnerId::random(), TopicId::new(1), five_questions()[..2].to_vec())
        .await
        .unwrap();
    for choice in [2, 0] {
        quizzes
            .handle(&mut run, QuizEvent::SelectAnswer(choice))
            .await
            .unwrap();
        quizzes
            .handle(&mut run, QuizEvent::ConfirmAndAdvance)
            .await
            .unwrap();
    }
    let results = run.session().results().unwrap();
    assert_eq!(
        QuizService::explanation_prompts(results, GradeLevel::College).len(),
        1
    );

    let explained = quizzes
        .explain_mistakes(results, GradeLevel::College)
        .await;
    assert_eq!(explained.len(), 1);
    assert_eq!(explained[0].chosen.as_deref(), Some("c"));
    assert_eq!(explained[0].correct, "a");
    assert_eq!(explained[0].text, "Because of rule 1.");
    assert!(!explained[0].from_advisor);
}
