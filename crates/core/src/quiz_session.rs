//! Timed, proctored quiz session.
//!
//! The session is a finite-state value: `Intro -> Active -> Results`, driven
//! by a single transition function, [`QuizSession::apply`]. Time is never
//! counted down; every event carries the wall-clock instant it was observed
//! at and the remaining time is derived from the deadline fixed at start.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::{QuizQuestion, QuizSettings, TopicId, score_percent, xp_for_score};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizSessionError {
    #[error("cannot start a quiz without questions")]
    NoQuestions,

    #[error("quiz has not been started")]
    NotStarted,

    #[error("quiz is already running")]
    AlreadyStarted,

    #[error("quiz already finished")]
    AlreadyFinished,

    #[error("no answer selected for the current question")]
    NoSelection,

    #[error("option {index} does not exist (question has {len} options)")]
    InvalidOption { index: usize, len: usize },
}

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// Advisory proctoring signals raised by the host while a quiz runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegritySignal {
    /// The quiz tab or window lost visibility.
    TabHidden,
    /// A copy, cut or paste was attempted and blocked.
    ClipboardBlocked,
}

impl fmt::Display for IntegritySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TabHidden => "tab switch detected",
            Self::ClipboardBlocked => "copy and paste are disabled during quizzes",
        })
    }
}

/// Transient warning shown to the learner; expires on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrityWarning {
    pub signal: IntegritySignal,
    pub raised_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizEvent {
    Start { questions: Vec<QuizQuestion> },
    SelectAnswer(usize),
    ConfirmAndAdvance,
    /// Re-evaluate the timer against the wall clock.
    Tick,
    Integrity(IntegritySignal),
}

/// What a successful `apply` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizTransition {
    Started { total_questions: usize },
    AnswerSelected { index: usize },
    Advanced { current_index: usize },
    Finished(FinishReason),
    TimeRemaining { seconds: u64 },
    Warned(IntegrityWarning),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The last question was confirmed.
    Completed,
    /// The deadline passed; unanswered questions count as wrong.
    TimedOut,
}

//
// ─── PHASES ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveQuiz {
    questions: Vec<QuizQuestion>,
    current_index: usize,
    answers: Vec<usize>,
    selection: Option<usize>,
    started_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
}

impl ActiveQuiz {
    #[must_use]
    pub fn current_question(&self) -> &QuizQuestion {
        &self.questions[self.current_index]
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn confirmed_answers(&self) -> &[usize] {
        &self.answers
    }

    #[must_use]
    pub fn selection(&self) -> Option<usize> {
        self.selection
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((self.deadline - now).num_seconds()).unwrap_or(0)
    }
}

/// Final, scored outcome. Computed exactly once on entry to `Results`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResults {
    questions: Vec<QuizQuestion>,
    answers: Vec<Option<usize>>,
    correct_count: usize,
    score: u8,
    xp_awarded: u64,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    reason: FinishReason,
}

impl QuizResults {
    fn compute(
        questions: Vec<QuizQuestion>,
        answers: Vec<Option<usize>>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        reason: FinishReason,
    ) -> Self {
        let correct_count = questions
            .iter()
            .zip(&answers)
            .filter(|(q, a)| q.is_correct(**a))
            .count();
        let score = score_percent(correct_count, questions.len());
        Self {
            xp_awarded: xp_for_score(score),
            questions,
            answers,
            correct_count,
            score,
            started_at,
            finished_at,
            reason,
        }
    }

    /// One entry per question; `None` for questions never answered.
    #[must_use]
    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    #[must_use]
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn score(&self) -> u8 {
        self.score
    }

    #[must_use]
    pub fn xp_awarded(&self) -> u64 {
        self.xp_awarded
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    #[must_use]
    pub fn reason(&self) -> FinishReason {
        self.reason
    }

    /// Questions answered wrongly or left unanswered, with the given answer.
    pub fn wrong_questions(&self) -> impl Iterator<Item = (&QuizQuestion, Option<usize>)> {
        self.questions
            .iter()
            .zip(self.answers.iter().copied())
            .filter(|(q, a)| !q.is_correct(*a))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizPhase {
    Intro,
    Active(ActiveQuiz),
    Results(QuizResults),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSession {
    topic_id: TopicId,
    time_budget: Duration,
    warning_duration: Duration,
    phase: QuizPhase,
    warning: Option<IntegrityWarning>,
    integrity_events: u32,
}

impl QuizSession {
    /// A new session waiting in `Intro`.
    #[must_use]
    pub fn new(topic_id: TopicId, settings: &QuizSettings) -> Self {
        Self {
            topic_id,
            time_budget: Duration::seconds(i64::from(settings.time_budget_secs())),
            warning_duration: Duration::seconds(i64::from(settings.warning_secs())),
            phase: QuizPhase::Intro,
            warning: None,
            integrity_events: 0,
        }
    }

    /// The single transition function.
    ///
    /// Any event observed at or after the deadline of an active quiz first
    /// forces the timeout transition and returns it; the event itself is then
    /// dropped. Events in `Results` are always rejected.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError` when the event is not valid in the current
    /// phase; the session is left untouched in that case.
    pub fn apply(
        &mut self,
        event: QuizEvent,
        now: DateTime<Utc>,
    ) -> Result<QuizTransition, QuizSessionError> {
        if let Some(expired) = self.expire_if_due(now) {
            return Ok(expired);
        }

        match (&mut self.phase, event) {
            (QuizPhase::Results(_), _) => Err(QuizSessionError::AlreadyFinished),

            (QuizPhase::Intro, QuizEvent::Start { questions }) => {
                if questions.is_empty() {
                    return Err(QuizSessionError::NoQuestions);
                }
                let total_questions = questions.len();
                self.phase = QuizPhase::Active(ActiveQuiz {
                    answers: Vec::with_capacity(total_questions),
                    questions,
                    current_index: 0,
                    selection: None,
                    started_at: now,
                    deadline: now + self.time_budget,
                });
                Ok(QuizTransition::Started { total_questions })
            }
            (QuizPhase::Intro, _) => Err(QuizSessionError::NotStarted),

            (QuizPhase::Active(_), QuizEvent::Start { .. }) => {
                Err(QuizSessionError::AlreadyStarted)
            }
            (QuizPhase::Active(active), QuizEvent::SelectAnswer(index)) => {
                let len = active.current_question().options().len();
                if index >= len {
                    return Err(QuizSessionError::InvalidOption { index, len });
                }
                active.selection = Some(index);
                Ok(QuizTransition::AnswerSelected { index })
            }
            (QuizPhase::Active(active), QuizEvent::ConfirmAndAdvance) => {
                let selected = active.selection.ok_or(QuizSessionError::NoSelection)?;
                active.answers.push(selected);
                active.selection = None;
                if active.current_index + 1 >= active.questions.len() {
                    Ok(self.finish(FinishReason::Completed, now))
                } else {
                    active.current_index += 1;
                    Ok(QuizTransition::Advanced {
                        current_index: active.current_index,
                    })
                }
            }
            (QuizPhase::Active(active), QuizEvent::Tick) => Ok(QuizTransition::TimeRemaining {
                seconds: active.remaining_secs(now),
            }),
            (QuizPhase::Active(_), QuizEvent::Integrity(signal)) => {
                let warning = IntegrityWarning {
                    signal,
                    raised_at: now,
                    expires_at: now + self.warning_duration,
                };
                self.warning = Some(warning);
                self.integrity_events = self.integrity_events.saturating_add(1);
                Ok(QuizTransition::Warned(warning))
            }
        }
    }

    fn expire_if_due(&mut self, now: DateTime<Utc>) -> Option<QuizTransition> {
        match &self.phase {
            QuizPhase::Active(active) if now >= active.deadline => {
                Some(self.finish(FinishReason::TimedOut, now))
            }
            _ => None,
        }
    }

    /// Move an active session into `Results`, scoring it once.
    fn finish(&mut self, reason: FinishReason, now: DateTime<Utc>) -> QuizTransition {
        let active = match std::mem::replace(&mut self.phase, QuizPhase::Intro) {
            QuizPhase::Active(active) => active,
            other => {
                self.phase = other;
                return QuizTransition::Finished(reason);
            }
        };

        let total = active.questions.len();
        let mut answers: Vec<Option<usize>> = active.answers.into_iter().map(Some).collect();
        if answers.len() < total {
            answers.push(active.selection);
        }
        answers.resize(total, None);

        let finished_at = match reason {
            FinishReason::TimedOut => now.min(active.deadline),
            FinishReason::Completed => now,
        };
        self.phase = QuizPhase::Results(QuizResults::compute(
            active.questions,
            answers,
            active.started_at,
            finished_at,
            reason,
        ));
        self.warning = None;
        QuizTransition::Finished(reason)
    }

    #[must_use]
    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    #[must_use]
    pub fn phase(&self) -> &QuizPhase {
        &self.phase
    }

    #[must_use]
    pub fn active(&self) -> Option<&ActiveQuiz> {
        match &self.phase {
            QuizPhase::Active(active) => Some(active),
            _ => None,
        }
    }

    #[must_use]
    pub fn results(&self) -> Option<&QuizResults> {
        match &self.phase {
            QuizPhase::Results(results) => Some(results),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, QuizPhase::Results(_))
    }

    /// Seconds left according to the wall clock. The full budget before the
    /// quiz starts, zero once it has finished.
    #[must_use]
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        match &self.phase {
            QuizPhase::Intro => u64::try_from(self.time_budget.num_seconds()).unwrap_or(0),
            QuizPhase::Active(active) => active.remaining_secs(now),
            QuizPhase::Results(_) => 0,
        }
    }

    /// The integrity warning to display at `now`, if it has not expired.
    #[must_use]
    pub fn active_warning(&self, now: DateTime<Utc>) -> Option<&IntegrityWarning> {
        self.warning.as_ref().filter(|w| now < w.expires_at)
    }

    #[must_use]
    pub fn integrity_events(&self) -> u32 {
        self.integrity_events
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
