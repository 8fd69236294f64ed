use std::collections::HashSet;
use std::sync::Arc;

use campus_core::ValidationError;
use campus_core::model::{
    Badge, BadgeId, EarnedBadge, GamificationState, LearnerId, Level, StreakUpdate,
    newly_eligible,
};
use chrono::NaiveDate;
use storage::repository::{
    BadgeAwardRepository, CatalogRepository, GamificationRepository, StorageError,
};

use crate::Clock;
use crate::error::ServiceError;
use crate::retry::with_backoff;

/// Streak CAS attempts before giving up.
const STREAK_CAS_ATTEMPTS: u32 = 5;

/// Outcome of an XP award.
#[derive(Debug)]
pub struct XpAward {
    pub total_xp: u64,
    pub level: Level,
    /// Badges that were unlocked by this award.
    pub new_badges: Vec<Badge>,
    /// Set when badge evaluation failed; the XP itself was still applied.
    pub badge_error: Option<StorageError>,
}

/// XP, levels, streaks and badges.
#[derive(Clone)]
pub struct GamificationService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    state: Arc<dyn GamificationRepository>,
    awards: Arc<dyn BadgeAwardRepository>,
}

impl GamificationService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        state: Arc<dyn GamificationRepository>,
        awards: Arc<dyn BadgeAwardRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            state,
            awards,
        }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Storage` on read failures.
    pub async fn state(&self, learner_id: LearnerId) -> Result<GamificationState, ServiceError> {
        let repo = &self.state;
        Ok(with_backoff("get_or_create_state", || repo.get_or_create_state(learner_id)).await?)
    }

    /// Add XP and evaluate badges.
    ///
    /// The increment is a single atomic repository call and is never retried.
    /// Badge evaluation runs afterwards; if it fails the error is returned in
    /// [`XpAward::badge_error`] and the XP stays applied.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for `amount <= 0` or
    /// `ServiceError::Storage` if the increment fails.
    pub async fn award_xp(&self, learner_id: LearnerId, amount: i64) -> Result<XpAward, ServiceError> {
        let amount = u64::try_from(amount)
            .ok()
            .filter(|a| *a > 0)
            .ok_or(ValidationError::NonPositiveXp(amount))?;

        let state = self.state.increment_xp(learner_id, amount).await?;
        tracing::info!(%learner_id, amount, total_xp = state.total_xp(), "xp awarded");

        let (new_badges, badge_error) = match self.evaluate_badges_for(&state).await {
            Ok(badges) => (badges, None),
            Err(err) => {
                tracing::warn!(%learner_id, error = %err, "badge evaluation failed after xp award");
                (Vec::new(), Some(err))
            }
        };

        Ok(XpAward {
            total_xp: state.total_xp(),
            level: state.level(),
            new_badges,
            badge_error,
        })
    }

    /// Evaluate the daily streak for `today`.
    ///
    /// Optimistic: the new streak is written only if nobody else changed the
    /// learner's row in between, retrying a bounded number of times.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` on storage failure, or
    /// `StorageError::Conflict` if every CAS attempt lost the race.
    pub async fn touch_activity(
        &self,
        learner_id: LearnerId,
        today: NaiveDate,
    ) -> Result<GamificationState, ServiceError> {
        for attempt in 1..=STREAK_CAS_ATTEMPTS {
            let mut state = self.state(learner_id).await?;
            let update = state.touch(today);
            if update == StreakUpdate::Unchanged {
                return Ok(state);
            }
            let repo = &self.state;
            let written = with_backoff("update_streak", || repo.update_streak_if_version(&state)).await?;
            if let Some(saved) = written {
                tracing::debug!(
                    %learner_id,
                    ?update,
                    streak = saved.current_streak_days(),
                    longest = saved.longest_streak_days(),
                    "streak updated"
                );
                return Ok(saved);
            }
            tracing::debug!(%learner_id, attempt, "streak write lost a race, reloading");
        }
        Err(StorageError::Conflict.into())
    }

    /// [`Self::touch_activity`] for the clock's current day.
    ///
    /// # Errors
    ///
    /// See [`Self::touch_activity`].
    pub async fn touch_today(&self, learner_id: LearnerId) -> Result<GamificationState, ServiceError> {
        self.touch_activity(learner_id, self.clock.today()).await
    }

    /// Award every catalog badge the learner's XP has unlocked and that they
    /// do not hold yet. Returns only badges inserted by this call.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` on storage failure.
    pub async fn evaluate_badges(&self, learner_id: LearnerId) -> Result<Vec<Badge>, ServiceError> {
        let state = self.state(learner_id).await?;
        Ok(self.evaluate_badges_for(&state).await?)
    }

    async fn evaluate_badges_for(
        &self,
        state: &GamificationState,
    ) -> Result<Vec<Badge>, StorageError> {
        let learner_id = state.learner_id();
        let catalog = &self.catalog;
        let awards = &self.awards;

        let badges = with_backoff("list_badges", || catalog.list_badges()).await?;
        let earned: HashSet<BadgeId> = with_backoff("list_earned", || awards.list_earned(learner_id))
            .await?
            .into_iter()
            .map(|e| e.badge_id)
            .collect();

        let now = self.clock.now();
        let mut awarded = Vec::new();
        for badge in newly_eligible(&badges, state.total_xp(), &earned) {
            let earned = EarnedBadge {
                learner_id,
                badge_id: badge.id,
                earned_at: now,
            };
            // Upsert: a concurrent evaluation that got there first makes this a no-op.
            let inserted =
                with_backoff("insert_earned", || awards.insert_earned_if_absent(&earned)).await?;
            if inserted {
                tracing::info!(%learner_id, badge = %badge.name, "badge earned");
                awarded.push(badge.clone());
            }
        }
        Ok(awarded)
    }

    /// Every badge the learner holds, with its catalog entry.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` on read failures.
    pub async fn earned_badges(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<(Badge, EarnedBadge)>, ServiceError> {
        let catalog = &self.catalog;
        let awards = &self.awards;
        let badges = with_backoff("list_badges", || catalog.list_badges()).await?;
        let earned = with_backoff("list_earned", || awards.list_earned(learner_id)).await?;
        Ok(earned
            .into_iter()
            .filter_map(|e| {
                badges
                    .iter()
                    .find(|b| b.id == e.badge_id)
                    .map(|b| (b.clone(), e))
            })
            .collect())
    }
}
