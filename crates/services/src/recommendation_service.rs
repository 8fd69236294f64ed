use std::sync::Arc;

use campus_core::model::LearnerId;
use campus_core::recommend::{
    Recommendation, StudySlot, SubjectStanding, fallback_schedule, study_focus, study_plan_prompt,
    summarize,
};

use crate::advisor::{Advisor, Prompt};
use crate::error::{AdvisorError, ServiceError};
use crate::gamification_service::GamificationService;
use crate::progress_service::ProgressService;
use crate::quiz::extract_json_array;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advice {
    pub recommendation: Recommendation,
    pub message: String,
    pub from_advisor: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyPlan {
    pub slots: Vec<StudySlot>,
    pub from_advisor: bool,
}

/// Pull a timetable out of advisor text.
///
/// # Errors
///
/// Returns `AdvisorError::Malformed` if there is no JSON array, it does not
/// deserialise into slots, it is empty, or a slot has a blank subject or a
/// zero duration.
pub fn parse_schedule(text: &str) -> Result<Vec<StudySlot>, AdvisorError> {
    let json = extract_json_array(text)
        .ok_or_else(|| AdvisorError::Malformed("no JSON array in reply".into()))?;
    let slots: Vec<StudySlot> =
        serde_json::from_str(json).map_err(|err| AdvisorError::Malformed(err.to_string()))?;
    if slots.is_empty() {
        return Err(AdvisorError::Malformed("empty schedule".into()));
    }
    if let Some(bad) = slots
        .iter()
        .position(|s| s.subject.trim().is_empty() || s.duration_minutes == 0)
    {
        return Err(AdvisorError::Malformed(format!("slot {bad} is incomplete")));
    }
    Ok(slots)
}

/// Weak-subject advice and daily study plans.
#[derive(Clone)]
pub struct RecommendationService {
    progress: ProgressService,
    gamification: GamificationService,
    advisor: Arc<dyn Advisor>,
}

impl RecommendationService {
    #[must_use]
    pub fn new(
        progress: ProgressService,
        gamification: GamificationService,
        advisor: Arc<dyn Advisor>,
    ) -> Self {
        Self {
            progress,
            gamification,
            advisor,
        }
    }

    async fn standings(&self, learner_id: LearnerId) -> Result<Vec<SubjectStanding>, ServiceError> {
        Ok(self
            .progress
            .completion_by_subject(learner_id)
            .await?
            .into_iter()
            .map(|(name, percent)| SubjectStanding::new(name, percent))
            .collect())
    }

    /// Rank weak subjects and ask the advisor how to proceed. Advisor
    /// failures fall back to a canned message.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if the ledger cannot be read.
    pub async fn recommend(&self, learner_id: LearnerId) -> Result<Advice, ServiceError> {
        let recommendation = summarize(&self.standings(learner_id).await?);
        let prompt = Prompt::user(recommendation.advisor_prompt());
        let (message, from_advisor) = match self.advisor.complete(&prompt).await {
            Ok(text) => (text, true),
            Err(err) => {
                tracing::warn!(%learner_id, error = %err, "recommendation fell back");
                (recommendation.fallback_message(), false)
            }
        };
        Ok(Advice {
            recommendation,
            message,
            from_advisor,
        })
    }

    /// Today's timetable, weighted towards subjects under 70%.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if the ledger or streak cannot be read.
    pub async fn study_plan(&self, learner_id: LearnerId) -> Result<StudyPlan, ServiceError> {
        let focus = study_focus(&self.standings(learner_id).await?);
        let streak = self.gamification.state(learner_id).await?.current_streak_days();
        let prompt = Prompt::user(study_plan_prompt(&focus, streak)).structured();

        let parsed = match self.advisor.complete(&prompt).await {
            Ok(text) => parse_schedule(&text),
            Err(err) => Err(err),
        };
        Ok(match parsed {
            Ok(slots) => StudyPlan {
                slots,
                from_advisor: true,
            },
            Err(err) => {
                tracing::warn!(%learner_id, error = %err, "study plan fell back");
                StudyPlan {
                    slots: fallback_schedule(&focus),
                    from_advisor: false,
                }
            }
        })
    }
}
