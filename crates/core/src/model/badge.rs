use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{BadgeId, LearnerId};

/// Grouping used by the achievements screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeCategory {
    Milestone,
    Streak,
    Mastery,
    Special,
}

impl BadgeCategory {
    /// Unknown categories are filed under `Special`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "milestone" => Self::Milestone,
            "streak" => Self::Streak,
            "mastery" => Self::Mastery,
            _ => Self::Special,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Milestone => "milestone",
            Self::Streak => "streak",
            Self::Mastery => "mastery",
            Self::Special => "special",
        }
    }
}

impl fmt::Display for BadgeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub id: BadgeId,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub xp_required: u64,
    pub category: BadgeCategory,
}

impl Badge {
    #[must_use]
    pub fn new(id: BadgeId, name: impl Into<String>, xp_required: u64, category: BadgeCategory) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            icon: String::new(),
            xp_required,
            category,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    /// Zero-threshold badges are not XP badges; they are never awarded here.
    #[must_use]
    pub fn is_unlocked_by(&self, total_xp: u64) -> bool {
        self.xp_required > 0 && self.xp_required <= total_xp
    }
}

/// One-time award of a badge to a learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarnedBadge {
    pub learner_id: LearnerId,
    pub badge_id: BadgeId,
    pub earned_at: DateTime<Utc>,
}

/// Catalog badges unlocked by `total_xp` that the learner does not hold yet,
/// in ascending threshold order.
#[must_use]
pub fn newly_eligible<'a>(
    catalog: &'a [Badge],
    total_xp: u64,
    earned: &HashSet<BadgeId>,
) -> Vec<&'a Badge> {
    let mut eligible: Vec<&Badge> = catalog
        .iter()
        .filter(|b| b.is_unlocked_by(total_xp) && !earned.contains(&b.id))
        .collect();
    eligible.sort_by_key(|b| (b.xp_required, b.id));
    eligible
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Badge> {
        vec![
            Badge::new(BadgeId::new(3), "Scholar", 500, BadgeCategory::Mastery),
            Badge::new(BadgeId::new(1), "First Steps", 10, BadgeCategory::Milestone),
            Badge::new(BadgeId::new(2), "Centurion", 100, BadgeCategory::Milestone),
            Badge::new(BadgeId::new(4), "Founder", 0, BadgeCategory::Special),
        ]
    }

    #[test]
    fn eligible_badges_are_sorted_and_skip_earned() {
        let catalog = catalog();
        let earned: HashSet<_> = [BadgeId::new(1)].into_iter().collect();
        let ids: Vec<_> = newly_eligible(&catalog, 120, &earned)
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![BadgeId::new(2)]);
    }

    #[test]
    fn zero_threshold_badges_are_never_xp_awarded() {
        let catalog = catalog();
        let eligible = newly_eligible(&catalog, 0, &HashSet::new());
        assert!(eligible.is_empty());
    }

    #[test]
    fn category_parse_is_lenient() {
        assert_eq!(BadgeCategory::parse("Streak"), BadgeCategory::Streak);
        assert_eq!(BadgeCategory::parse("seasonal"), BadgeCategory::Special);
    }
}
