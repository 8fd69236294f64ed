use chrono::NaiveDate;
use thiserror::Error;

use crate::model::ids::LearnerId;

/// XP needed to climb one level.
pub const XP_PER_LEVEL: u64 = 100;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GamificationError {
    #[error("current streak ({current}) exceeds longest streak ({longest})")]
    StreakInvariant { current: u32, longest: u32 },
}

//
// ─── LEVEL ─────────────────────────────────────────────────────────────────────
//

/// Level derived from total XP: every 100 XP is one level, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub level: u64,
    pub xp_into_level: u64,
    pub xp_to_next_level: u64,
}

impl Level {
    #[must_use]
    pub fn from_total_xp(total_xp: u64) -> Self {
        let xp_into_level = total_xp % XP_PER_LEVEL;
        Self {
            level: total_xp / XP_PER_LEVEL + 1,
            xp_into_level,
            xp_to_next_level: XP_PER_LEVEL - xp_into_level,
        }
    }
}

/// Shorthand for `Level::from_total_xp(total).level`.
#[must_use]
pub fn derive_level(total_xp: u64) -> u64 {
    Level::from_total_xp(total_xp).level
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Per-learner XP and streak counters.
///
/// `version` increases on every persisted mutation and backs the optimistic
/// compare-and-swap used for streak updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamificationState {
    learner_id: LearnerId,
    total_xp: u64,
    current_streak_days: u32,
    longest_streak_days: u32,
    last_activity_date: Option<NaiveDate>,
    version: u64,
}

/// Outcome of a streak evaluation for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakUpdate {
    /// Already counted today (or the date is older than the last activity).
    Unchanged,
    /// Activity yesterday: streak grew by one.
    Extended,
    /// First activity ever or a gap of two or more days.
    Restarted,
}

impl GamificationState {
    /// A brand-new learner: no XP, no streak.
    #[must_use]
    pub fn new(learner_id: LearnerId) -> Self {
        Self {
            learner_id,
            total_xp: 0,
            current_streak_days: 0,
            longest_streak_days: 0,
            last_activity_date: None,
            version: 0,
        }
    }

    /// Rehydrate from storage.
    ///
    /// # Errors
    ///
    /// Returns `GamificationError::StreakInvariant` if current > longest.
    pub fn from_persisted(
        learner_id: LearnerId,
        total_xp: u64,
        current_streak_days: u32,
        longest_streak_days: u32,
        last_activity_date: Option<NaiveDate>,
        version: u64,
    ) -> Result<Self, GamificationError> {
        if current_streak_days > longest_streak_days {
            return Err(GamificationError::StreakInvariant {
                current: current_streak_days,
                longest: longest_streak_days,
            });
        }
        Ok(Self {
            learner_id,
            total_xp,
            current_streak_days,
            longest_streak_days,
            last_activity_date,
            version,
        })
    }

    /// Evaluate the daily streak for `today`. Idempotent within a day.
    pub fn touch(&mut self, today: NaiveDate) -> StreakUpdate {
        let update = match self.last_activity_date {
            Some(last) if last >= today => return StreakUpdate::Unchanged,
            Some(last) if last.succ_opt() == Some(today) => {
                self.current_streak_days = self.current_streak_days.saturating_add(1);
                StreakUpdate::Extended
            }
            _ => {
                self.current_streak_days = 1;
                StreakUpdate::Restarted
            }
        };
        self.longest_streak_days = self.longest_streak_days.max(self.current_streak_days);
        self.last_activity_date = Some(today);
        update
    }

    /// Add XP in memory. Persistence uses an atomic increment instead.
    pub fn add_xp(&mut self, amount: u64) {
        self.total_xp = self.total_xp.saturating_add(amount);
    }

    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    #[must_use]
    pub fn total_xp(&self) -> u64 {
        self.total_xp
    }

    #[must_use]
    pub fn level(&self) -> Level {
        Level::from_total_xp(self.total_xp)
    }

    #[must_use]
    pub fn current_streak_days(&self) -> u32 {
        self.current_streak_days
    }

    #[must_use]
    pub fn longest_streak_days(&self) -> u32 {
        self.longest_streak_days
    }

    #[must_use]
    pub fn last_activity_date(&self) -> Option<NaiveDate> {
        self.last_activity_date
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn state(current: u32, longest: u32, last: Option<NaiveDate>) -> GamificationState {
        GamificationState::from_persisted(
            LearnerId::new(uuid::Uuid::from_u128(1)),
            0,
            current,
            longest,
            last,
            3,
        )
        .unwrap()
    }

    #[test]
    fn level_boundaries() {
        assert_eq!(derive_level(0), 1);
        assert_eq!(derive_level(99), 1);
        assert_eq!(derive_level(100), 2);
        assert_eq!(derive_level(250), 3);

        let level = Level::from_total_xp(250);
        assert_eq!(level.xp_into_level, 50);
        assert_eq!(level.xp_to_next_level, 50);
    }

    #[test]
    fn first_activity_starts_streak() {
        let mut s = state(0, 0, None);
        assert_eq!(s.touch(day(10)), StreakUpdate::Restarted);
        assert_eq!(s.current_streak_days(), 1);
        assert_eq!(s.longest_streak_days(), 1);
        assert_eq!(s.last_activity_date(), Some(day(10)));
    }

    #[test]
    fn same_day_touch_is_idempotent() {
        let mut s = state(3, 5, Some(day(10)));
        assert_eq!(s.touch(day(10)), StreakUpdate::Unchanged);
        assert_eq!(s.touch(day(10)), StreakUpdate::Unchanged);
        assert_eq!(s.current_streak_days(), 3);
    }

    #[test]
    fn yesterday_extends_streak() {
        let mut s = state(4, 4, Some(day(9)));
        assert_eq!(s.touch(day(10)), StreakUpdate::Extended);
        assert_eq!(s.current_streak_days(), 5);
        assert!(s.longest_streak_days() >= 5);
    }

    #[test]
    fn two_day_gap_restarts_streak() {
        let mut s = state(6, 9, Some(day(8)));
        assert_eq!(s.touch(day(10)), StreakUpdate::Restarted);
        assert_eq!(s.current_streak_days(), 1);
        assert_eq!(s.longest_streak_days(), 9);
    }

    #[test]
    fn streak_extends_across_month_boundary() {
        let mut s = state(2, 2, Some(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
        assert_eq!(s.touch(day(1)), StreakUpdate::Extended);
        assert_eq!(s.current_streak_days(), 3);
    }

    #[test]
    fn backdated_touch_is_ignored() {
        let mut s = state(2, 2, Some(day(10)));
        assert_eq!(s.touch(day(7)), StreakUpdate::Unchanged);
        assert_eq!(s.last_activity_date(), Some(day(10)));
    }

    #[test]
    fn persisted_state_rejects_broken_streak() {
        let err = GamificationState::from_persisted(
            LearnerId::new(uuid::Uuid::from_u128(1)),
            0,
            4,
            2,
            None,
            0,
        )
        .unwrap_err();
        assert_eq!(err, GamificationError::StreakInvariant { current: 4, longest: 2 });
    }
}
