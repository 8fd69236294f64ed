use campus_core::model::{
    Badge, BadgeCategory, BadgeId, EarnedBadge, GamificationState, LearnerId, ProgressRecord,
    QuizAttempt, QuizId, Subject, SubjectId, Topic, TopicId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use sqlx::types::Uuid;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Constraint violations are caller errors; everything else is treated as a
/// (possibly transient) connection problem.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        _ => StorageError::Connection(e.to_string()),
    }
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn get_i64(row: &SqliteRow, field: &'static str) -> Result<i64, StorageError> {
    row.try_get::<i64, _>(field).map_err(ser)
}

fn learner_from_row(row: &SqliteRow) -> Result<LearnerId, StorageError> {
    Ok(LearnerId::new(row.try_get::<Uuid, _>("learner_id").map_err(ser)?))
}

// ─── CATALOG ───────────────────────────────────────────────────────────────────

pub(crate) fn map_subject_row(row: &SqliteRow) -> Result<Subject, StorageError> {
    Subject::new(
        SubjectId::new(i64_to_u64("id", get_i64(row, "id")?)?),
        row.try_get::<String, _>("name").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_topic_row(row: &SqliteRow) -> Result<Topic, StorageError> {
    let mut topic = Topic::new(
        TopicId::new(i64_to_u64("id", get_i64(row, "id")?)?),
        SubjectId::new(i64_to_u64("subject_id", get_i64(row, "subject_id")?)?),
        row.try_get::<String, _>("title").map_err(ser)?,
        u32_from_i64("order_index", get_i64(row, "order_index")?)?,
    )
    .map_err(ser)?;

    if let Some(minutes) = row
        .try_get::<Option<i64>, _>("estimated_duration_minutes")
        .map_err(ser)?
    {
        topic = topic.with_estimated_duration(u32_from_i64("estimated_duration_minutes", minutes)?);
    }
    if let Some(content) = row.try_get::<Option<String>, _>("content").map_err(ser)? {
        topic = topic.with_content(content);
    }
    Ok(topic)
}

pub(crate) fn map_badge_row(row: &SqliteRow) -> Result<Badge, StorageError> {
    let category: String = row.try_get("category").map_err(ser)?;
    Ok(Badge::new(
        BadgeId::new(i64_to_u64("id", get_i64(row, "id")?)?),
        row.try_get::<String, _>("name").map_err(ser)?,
        i64_to_u64("xp_required", get_i64(row, "xp_required")?)?,
        BadgeCategory::parse(&category),
    )
    .with_description(row.try_get::<String, _>("description").map_err(ser)?)
    .with_icon(row.try_get::<String, _>("icon").map_err(ser)?))
}

// ─── LEARNER STATE ─────────────────────────────────────────────────────────────

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<ProgressRecord, StorageError> {
    let percent = get_i64(row, "progress_percent")?;
    let percent = u8::try_from(percent)
        .map_err(|_| StorageError::Serialization(format!("invalid progress_percent: {percent}")))?;

    ProgressRecord::from_persisted(
        learner_from_row(row)?,
        TopicId::new(i64_to_u64("topic_id", get_i64(row, "topic_id")?)?),
        percent,
        u32_from_i64("time_spent_minutes", get_i64(row, "time_spent_minutes")?)?,
        row.try_get("last_accessed_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_gamification_row(row: &SqliteRow) -> Result<GamificationState, StorageError> {
    GamificationState::from_persisted(
        learner_from_row(row)?,
        i64_to_u64("total_xp", get_i64(row, "total_xp")?)?,
        u32_from_i64("current_streak_days", get_i64(row, "current_streak_days")?)?,
        u32_from_i64("longest_streak_days", get_i64(row, "longest_streak_days")?)?,
        row.try_get("last_activity_date").map_err(ser)?,
        i64_to_u64("version", get_i64(row, "version")?)?,
    )
    .map_err(ser)
}

pub(crate) fn map_earned_row(row: &SqliteRow) -> Result<EarnedBadge, StorageError> {
    Ok(EarnedBadge {
        learner_id: learner_from_row(row)?,
        badge_id: BadgeId::new(i64_to_u64("badge_id", get_i64(row, "badge_id")?)?),
        earned_at: row.try_get("earned_at").map_err(ser)?,
    })
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<QuizAttempt, StorageError> {
    let score = get_i64(row, "score")?;
    let score =
        u8::try_from(score).map_err(|_| StorageError::Serialization(format!("invalid score: {score}")))?;
    let answers: String = row.try_get("answers").map_err(ser)?;

    QuizAttempt::new(
        learner_from_row(row)?,
        QuizId::new(i64_to_u64("quiz_id", get_i64(row, "quiz_id")?)?),
        TopicId::new(i64_to_u64("topic_id", get_i64(row, "topic_id")?)?),
        decode_answers(&answers)?,
        score,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)
}

// ─── ANSWERS ───────────────────────────────────────────────────────────────────

/// Answers are stored as `0,2,-,1`: one slot per question, `-` when the
/// question was never answered.
pub(crate) fn encode_answers(answers: &[Option<usize>]) -> String {
    answers
        .iter()
        .map(|a| a.map_or_else(|| "-".to_owned(), |i| i.to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

pub(crate) fn decode_answers(raw: &str) -> Result<Vec<Option<usize>>, StorageError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .map(|slot| match slot {
            "-" => Ok(None),
            digits => digits
                .parse::<usize>()
                .map(Some)
                .map_err(|_| StorageError::Serialization(format!("invalid answer slot: {digits}"))),
        })
        .collect()
}
