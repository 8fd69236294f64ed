use std::sync::Arc;

use async_trait::async_trait;
use campus_core::model::{
    Badge, BadgeCategory, BadgeId, GradeLevel, LearnerId, LearnerProfile, QuizSettings, Subject,
    SubjectId, Topic, TopicId,
};
use campus_core::recommend::Recommendation;
use campus_core::time::fixed_now;
use campus_core::unlock::TopicState;
use services::{Advisor, AdvisorError, AppServices, Clock, DisabledAdvisor, Prompt};
use storage::repository::Storage;

/// Echoes the prompt back so tests can see what was asked.
struct EchoAdvisor;

#[async_trait]
impl Advisor for EchoAdvisor {
    async fn complete(&self, prompt: &Prompt) -> Result<String, AdvisorError> {
        Ok(format!("echo: {}", prompt.user))
    }
}

struct PlannerAdvisor;

#[async_trait]
impl Advisor for PlannerAdvisor {
    async fn complete(&self, _prompt: &Prompt) -> Result<String, AdvisorError> {
        Ok(r#"[{"time": "8:30", "subject": "Science", "topic": "Cells", "duration": 40}]"#.into())
    }
}

/// Mathematics (topics 1-2), Science (topic 3), English (topic 4).
async fn seeded_storage() -> Storage {
    let storage = Storage::in_memory();
    for (id, name) in [(1, "Mathematics"), (2, "Science"), (3, "English")] {
        storage
            .catalog
            .upsert_subject(&Subject::new(SubjectId::new(id), name).unwrap())
            .await
            .unwrap();
    }
    for (id, subject, order) in [(1, 1, 0), (2, 1, 1), (3, 2, 0), (4, 3, 0)] {
        let topic = Topic::new(
            TopicId::new(id),
            SubjectId::new(subject),
            format!("Topic {id}"),
            order,
        )
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

fn build(storage: &Storage, advisor: Arc<dyn Advisor>) -> AppServices {
    AppServices::from_storage(
        storage,
        Clock::fixed(fixed_now()),
        QuizSettings::default(),
        advisor,
    )
}

#[tokio::test]
async fn lesson_then_practice_moves_the_ledger() {
    let storage = seeded_storage().await;
    let app = build(&storage, Arc::new(DisabledAdvisor));
    let learning = app.learning();
    let learner = LearnerId::random();

    let lesson = learning
        .complete_lesson(learner, TopicId::new(1), 25)
        .await
        .unwrap();
    assert_eq!(lesson.progress.unwrap().record.progress_percent(), 50);
    assert_eq!(lesson.streak.current_streak_days(), 1);
    let xp = lesson.xp.unwrap();
    assert_eq!(xp.total_xp, 10);
    assert_eq!(xp.new_badges.len(), 1);

    let answer = learning.practice_answer(learner, true).await.unwrap();
    assert_eq!(answer.xp.unwrap().total_xp, 15);
    let miss = learning.practice_answer(learner, false).await.unwrap();
    assert!(miss.xp.is_none());

    let practice = learning
        .complete_practice(learner, TopicId::new(1), 3, 4)
        .await
        .unwrap();
    let record = practice.progress.unwrap().record;
    assert_eq!(record.progress_percent(), 75);
    assert_eq!(record.time_spent_minutes(), 25);
    assert!(!record.is_completed());

    let badges = app.gamification().earned_badges(learner).await.unwrap();
    assert_eq!(badges.len(), 1);
}

#[tokio::test]
async fn topics_unlock_in_order() {
    let storage = seeded_storage().await;
    let app = build(&storage, Arc::new(DisabledAdvisor));
    let progress = app.progress();
    let learner = LearnerId::random();

    assert_eq!(
        progress.topic_state(learner, TopicId::new(2)).await.unwrap(),
        TopicState::Locked
    );
    progress
        .record_progress(learner, TopicId::new(1), 100, 10)
        .await
        .unwrap();
    assert_eq!(
        progress.topic_state(learner, TopicId::new(2)).await.unwrap(),
        TopicState::Available
    );

    let overview = progress.overview(learner).await.unwrap();
    assert_eq!(overview.topics_completed, 1);
    assert_eq!(overview.total_topics, 4);
    assert_eq!(overview.overall_completion_percent, 25);
}

#[tokio::test]
async fn recommendation_lists_weakest_subjects_first() {
    let storage = seeded_storage().await;
    let app = build(&storage, Arc::new(EchoAdvisor));
    let progress = app.progress();
    let learner = LearnerId::random();

    // Mathematics 40, Science 80, English 20.
    progress
        .record_progress(learner, TopicId::new(1), 80, 0)
        .await
        .unwrap();
    progress
        .record_progress(learner, TopicId::new(3), 80, 0)
        .await
        .unwrap();
    progress
        .record_progress(learner, TopicId::new(4), 20, 0)
        .await
        .unwrap();

    let advice = app.recommendations().recommend(learner).await.unwrap();
    let Recommendation::Focus(weak) = &advice.recommendation else {
        panic!("expected focus, got {:?}", advice.recommendation);
    };
    let names: Vec<_> = weak.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["English", "Mathematics"]);
    assert!(advice.from_advisor);
    assert!(advice.message.contains("English (20%), Mathematics (40%)"));
}

#[tokio::test]
async fn advisor_failures_fall_back_to_canned_text() {
    let storage = seeded_storage().await;
    let app = build(&storage, Arc::new(DisabledAdvisor));
    let learner = LearnerId::random();
    assert!(!app.advisor_enabled());

    let advice = app.recommendations().recommend(learner).await.unwrap();
    assert!(!advice.from_advisor);
    assert!(advice.message.contains("Mathematics"));

    let plan = app.recommendations().study_plan(learner).await.unwrap();
    assert!(!plan.from_advisor);
    assert_eq!(plan.slots.len(), 4);
    assert_eq!(plan.slots[0].subject, "Mathematics");
}

#[tokio::test]
async fn advisor_schedule_is_used_when_valid() {
    let storage = seeded_storage().await;
    let app = build(&storage, Arc::new(PlannerAdvisor));
    let plan = app
        .recommendations()
        .study_plan(LearnerId::random())
        .await
        .unwrap();
    assert!(plan.from_advisor);
    assert_eq!(plan.slots.len(), 1);
    assert_eq!(plan.slots[0].activity, "Cells");
}

fn fractions() -> Topic {
    Topic::new(TopicId::new(1), SubjectId::new(1), "Fractions", 0).unwrap()
}

#[tokio::test]
async fn tutor_answers_through_the_advisor() {
    let storage = seeded_storage().await;
    let tutor = build(&storage, Arc::new(EchoAdvisor)).tutor();
    let profile = LearnerProfile::new(LearnerId::random(), GradeLevel::Elementary);

    let reply = tutor.ask(&profile, "  What is a fraction? ").await;
    assert!(reply.from_advisor);
    assert_eq!(reply.text, "echo: What is a fraction?");

    let lesson = tutor
        .lesson(&fractions(), "Mathematics", GradeLevel::Elementary)
        .await;
    assert!(lesson.from_advisor);
    assert!(
        lesson
            .text
            .contains("lesson on \"Fractions\" for a elementary student studying Mathematics")
    );

    let hint = tutor
        .hint("What is 1/2 of 8?", &fractions(), "Mathematics", GradeLevel::Elementary)
        .await;
    assert!(hint.from_advisor);
    assert!(hint.text.contains("The topic is Fractions in Mathematics."));

    let written = fractions().with_content("# Fractions\n\nParts of a whole.");
    let lesson = tutor
        .lesson(&written, "Mathematics", GradeLevel::Elementary)
        .await;
    assert!(!lesson.from_advisor);
    assert_eq!(lesson.text, "# Fractions\n\nParts of a whole.");

    let blank = tutor.ask(&profile, "   ").await;
    assert!(!blank.from_advisor);
}

#[tokio::test]
async fn tutor_falls_back_when_the_advisor_is_unavailable() {
    let storage = seeded_storage().await;
    let tutor = build(&storage, Arc::new(DisabledAdvisor)).tutor();
    let profile = LearnerProfile::new(LearnerId::random(), GradeLevel::HighSchool);

    let reply = tutor.ask(&profile, "Why is the sky blue?").await;
    assert!(!reply.from_advisor);
    assert_eq!(
        reply.text,
        "I'm sorry, I couldn't process that. Please try again!"
    );

    let lesson = tutor
        .lesson(&fractions(), "Mathematics", GradeLevel::HighSchool)
        .await;
    assert!(!lesson.from_advisor);
    assert_eq!(lesson.text, "# Fractions\n\nLesson content is being prepared...");

    let hint = tutor
        .hint("What is 1/2 of 8?", &fractions(), "Mathematics", GradeLevel::HighSchool)
        .await;
    assert!(!hint.from_advisor);
    assert_eq!(
        hint.text,
        "Think about the key concepts you learned in the lesson."
    );
}
