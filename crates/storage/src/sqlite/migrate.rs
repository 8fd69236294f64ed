use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Ordered schema steps. Each version runs once, inside its own transaction.
const MIGRATIONS: &[(i64, &[&str])] = &[
    (
        1,
        &[
            r"
            CREATE TABLE IF NOT EXISTS subjects (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL CHECK (length(trim(name)) > 0)
            );
            ",
            r"
            CREATE TABLE IF NOT EXISTS topics (
                id INTEGER PRIMARY KEY,
                subject_id INTEGER NOT NULL,
                title TEXT NOT NULL CHECK (length(trim(title)) > 0),
                order_index INTEGER NOT NULL CHECK (order_index >= 0),
                estimated_duration_minutes INTEGER CHECK (estimated_duration_minutes >= 0),
                content TEXT,
                FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE
            );
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_topics_subject_order
                ON topics (subject_id, order_index, id);
            ",
            r"
            CREATE TABLE IF NOT EXISTS learner_progress (
                learner_id BLOB NOT NULL,
                topic_id INTEGER NOT NULL,
                progress_percent INTEGER NOT NULL CHECK (progress_percent BETWEEN 0 AND 100),
                time_spent_minutes INTEGER NOT NULL CHECK (time_spent_minutes >= 0),
                last_accessed_at TEXT NOT NULL,
                completed_at TEXT,
                PRIMARY KEY (learner_id, topic_id),
                CHECK ((completed_at IS NOT NULL) = (progress_percent = 100)),
                FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
            );
            ",
        ],
    ),
    (
        2,
        &[
            r"
            CREATE TABLE IF NOT EXISTS gamification (
                learner_id BLOB PRIMARY KEY,
                total_xp INTEGER NOT NULL CHECK (total_xp >= 0),
                current_streak_days INTEGER NOT NULL CHECK (current_streak_days >= 0),
                longest_streak_days INTEGER NOT NULL CHECK (longest_streak_days >= current_streak_days),
                last_activity_date TEXT,
                version INTEGER NOT NULL DEFAULT 0
            );
            ",
            r"
            CREATE TABLE IF NOT EXISTS badges (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                icon TEXT NOT NULL DEFAULT '',
                xp_required INTEGER NOT NULL CHECK (xp_required >= 0),
                category TEXT NOT NULL
            );
            ",
            r"
            CREATE TABLE IF NOT EXISTS earned_badges (
                learner_id BLOB NOT NULL,
                badge_id INTEGER NOT NULL,
                earned_at TEXT NOT NULL,
                PRIMARY KEY (learner_id, badge_id),
                FOREIGN KEY (badge_id) REFERENCES badges(id) ON DELETE CASCADE
            );
            ",
        ],
    ),
    (
        3,
        &[
            r"
            CREATE TABLE IF NOT EXISTS quiz_attempts (
                id INTEGER PRIMARY KEY,
                learner_id BLOB NOT NULL,
                quiz_id INTEGER NOT NULL,
                topic_id INTEGER NOT NULL,
                answers TEXT NOT NULL,
                score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
                completed_at TEXT NOT NULL,
                UNIQUE (learner_id, quiz_id, completed_at),
                FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
            );
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_quiz_attempts_learner_completed
                ON quiz_attempts (learner_id, completed_at);
            ",
        ],
    ),
];

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    for (version, statements) in MIGRATIONS {
        if is_applied(pool, *version).await? {
            continue;
        }
        let mut tx = pool.begin().await?;
        for statement in *statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(*version)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        tracing::info!(version, "applied schema migration");
    }

    Ok(())
}
