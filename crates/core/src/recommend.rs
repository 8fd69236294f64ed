//! Weak-subject prioritisation.
//!
//! Pure ranking over per-subject completion. The advisor only ever sees the
//! prompt rendered from the ranked list; nothing here talks to it.

use serde::{Deserialize, Serialize};

/// Subjects below this completion are "struggling".
pub const STRUGGLING_THRESHOLD: u8 = 50;

/// Subjects below this completion get study-plan time.
pub const FOCUS_THRESHOLD: u8 = 70;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectStanding {
    pub name: String,
    pub percent: u8,
}

impl SubjectStanding {
    #[must_use]
    pub fn new(name: impl Into<String>, percent: u8) -> Self {
        Self {
            name: name.into(),
            percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recommendation {
    /// Struggling subjects, weakest first.
    Focus(Vec<SubjectStanding>),
    AllHealthy,
}

/// Ranks subjects under [`STRUGGLING_THRESHOLD`] ascending by completion.
/// Ties keep input order.
#[must_use]
pub fn summarize(standings: &[SubjectStanding]) -> Recommendation {
    let weak = below(standings, STRUGGLING_THRESHOLD);
    if weak.is_empty() {
        Recommendation::AllHealthy
    } else {
        Recommendation::Focus(weak)
    }
}

/// Subjects that deserve time in today's plan (under [`FOCUS_THRESHOLD`]).
#[must_use]
pub fn study_focus(standings: &[SubjectStanding]) -> Vec<SubjectStanding> {
    below(standings, FOCUS_THRESHOLD)
}

fn below(standings: &[SubjectStanding], threshold: u8) -> Vec<SubjectStanding> {
    let mut picked: Vec<SubjectStanding> = standings
        .iter()
        .filter(|s| s.percent < threshold)
        .cloned()
        .collect();
    // stable
    picked.sort_by_key(|s| s.percent);
    picked
}

impl Recommendation {
    #[must_use]
    pub fn advisor_prompt(&self) -> String {
        match self {
            Self::Focus(weak) => {
                let listed = weak
                    .iter()
                    .map(|s| format!("{} ({}%)", s.name, s.percent))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "Based on the student's progress, they are struggling with: {listed}. \
                     Give a brief, encouraging recommendation (2-3 sentences) on which \
                     subject to focus on next and why."
                )
            }
            Self::AllHealthy => "The student is doing well across all subjects! Give a brief, \
                                 encouraging message (2-3 sentences) to keep them motivated."
                .to_owned(),
        }
    }

    /// Shown when the advisor cannot be reached.
    #[must_use]
    pub fn fallback_message(&self) -> String {
        match self {
            Self::Focus(weak) => match weak.first() {
                Some(first) => format!(
                    "Try spending your next session on {}. A little steady practice there \
                     will lift your overall progress the most.",
                    first.name
                ),
                None => Self::AllHealthy.fallback_message(),
            },
            Self::AllHealthy => {
                "Great work across all of your subjects. Keep your streak going!".to_owned()
            }
        }
    }
}

//
// ─── STUDY PLAN ────────────────────────────────────────────────────────────────
//

/// One session in a daily study plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySlot {
    /// Wall time as written by the planner, e.g. `9:00`.
    pub time: String,
    pub subject: String,
    #[serde(alias = "topic")]
    pub activity: String,
    #[serde(alias = "duration")]
    pub duration_minutes: u32,
}

/// Prompt asking the advisor for a JSON timetable.
#[must_use]
pub fn study_plan_prompt(focus: &[SubjectStanding], current_streak_days: u32) -> String {
    let priorities = if focus.is_empty() {
        "all subjects equally".to_owned()
    } else {
        focus
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "Create a study schedule for today with 4-5 study sessions.\n\
         The student needs to focus more on these subjects (in order of priority): {priorities}.\n\
         Current streak: {current_streak_days} days.\n\n\
         Return ONLY a JSON array with this format, no other text:\n\
         [{{\"time\": \"9:00\", \"subject\": \"Subject Name\", \"topic\": \"Specific Topic\", \"duration\": 45}}]\n\n\
         Make the schedule realistic with breaks and varied durations (30-60 minutes)."
    )
}

/// Canned four-slot plan used when the advisor's timetable is unusable.
#[must_use]
pub fn fallback_schedule(focus: &[SubjectStanding]) -> Vec<StudySlot> {
    let pick = |i: usize, default: &str| {
        focus
            .get(i)
            .map_or_else(|| default.to_owned(), |s| s.name.clone())
    };
    let slot = |time: &str, subject: String, activity: &str, minutes: u32| StudySlot {
        time: time.to_owned(),
        subject,
        activity: activity.to_owned(),
        duration_minutes: minutes,
    };
    vec![
        slot("9:00", pick(0, "Mathematics"), "Review Session", 45),
        slot("10:00", pick(1, "Science"), "Practice Problems", 45),
        slot("11:30", pick(2, "English"), "Reading Comprehension", 30),
        slot("14:00", pick(0, "Mathematics"), "Quiz Practice", 45),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standings() -> Vec<SubjectStanding> {
        vec![
            SubjectStanding::new("Math", 40),
            SubjectStanding::new("Science", 80),
            SubjectStanding::new("Art", 20),
        ]
    }

    #[test]
    fn struggling_subjects_are_ranked_weakest_first() {
        let Recommendation::Focus(weak) = summarize(&standings()) else {
            panic!("expected focus");
        };
        let names: Vec<_> = weak.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Art", "Math"]);
        assert_eq!(weak[0].percent, 20);
    }

    #[test]
    fn healthy_learners_get_motivation() {
        let healthy = [SubjectStanding::new("Math", 50), SubjectStanding::new("Art", 90)];
        let rec = summarize(&healthy);
        assert_eq!(rec, Recommendation::AllHealthy);
        assert!(rec.advisor_prompt().contains("doing well"));
        assert!(summarize(&[]).advisor_prompt().contains("motivated"));
    }

    #[test]
    fn ties_keep_input_order() {
        let tied = [SubjectStanding::new("B", 10), SubjectStanding::new("A", 10)];
        let Recommendation::Focus(weak) = summarize(&tied) else {
            panic!("expected focus");
        };
        assert_eq!(weak[0].name, "B");
    }

    #[test]
    fn prompt_lists_subjects_with_percent() {
        let prompt = summarize(&standings()).advisor_prompt();
        assert!(prompt.contains("Art (20%), Math (40%)"));
    }

    #[test]
    fn study_focus_uses_wider_threshold() {
        let mut s = standings();
        s.push(SubjectStanding::new("History", 65));
        let names: Vec<_> = study_focus(&s).into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["Art", "Math", "History"]);
    }

    #[test]
    fn fallback_schedule_fills_in_defaults() {
        let plan = fallback_schedule(&[SubjectStanding::new("Art", 20)]);
        assert_eq!(plan.len(), 4);
        assert_eq!(plan[0].subject, "Art");
        assert_eq!(plan[1].subject, "Science");
        assert_eq!(plan[3].subject, "Art");
        assert_eq!(plan[2].duration_minutes, 30);
    }

    #[test]
    fn fallback_message_names_weakest_subject() {
        let msg = summarize(&standings()).fallback_message();
        assert!(msg.contains("Art"));
    }
}
