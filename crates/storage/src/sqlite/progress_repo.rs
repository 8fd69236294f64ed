use campus_core::model::{LearnerId, ProgressChange, ProgressRecord, TopicId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db_err, id_i64, map_progress_row, ser};
use crate::repository::{ProgressRepository, ProgressWrite, StorageError};

const PROGRESS_COLUMNS: &str =
    "learner_id, topic_id, progress_percent, time_spent_minutes, last_accessed_at, completed_at";

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn record_progress(&self, write: ProgressWrite) -> Result<ProgressChange, StorageError> {
        let learner = write.learner_id.value();
        let topic = id_i64("topic_id", write.topic_id.value())?;
        let percent = i64::from(write.percent.value());

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let previous: Option<(i64, bool)> = sqlx::query(
            "SELECT progress_percent, completed_at IS NOT NULL AS done \
             FROM learner_progress WHERE learner_id = ?1 AND topic_id = ?2",
        )
        .bind(learner)
        .bind(topic)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?
        .map(|row| -> Result<_, StorageError> {
            Ok((
                row.try_get::<i64, _>("progress_percent").map_err(ser)?,
                row.try_get::<bool, _>("done").map_err(ser)?,
            ))
        })
        .transpose()?;

        // Same rules as `ProgressRecord::apply`, evaluated inside the upsert.
        let row = sqlx::query(&format!(
            r"
            INSERT INTO learner_progress ({PROGRESS_COLUMNS})
            VALUES (?1, ?2, ?3, ?4, ?5, CASE WHEN ?3 = 100 THEN ?5 ELSE NULL END)
            ON CONFLICT(learner_id, topic_id) DO UPDATE SET
                progress_percent = excluded.progress_percent,
                time_spent_minutes = MIN(
                    learner_progress.time_spent_minutes + excluded.time_spent_minutes,
                    4294967295
                ),
                last_accessed_at = excluded.last_accessed_at,
                completed_at = CASE
                    WHEN excluded.progress_percent = 100
                        THEN COALESCE(learner_progress.completed_at, excluded.last_accessed_at)
                    ELSE NULL
                END
            RETURNING {PROGRESS_COLUMNS}
            "
        ))
        .bind(learner)
        .bind(topic)
        .bind(percent)
        .bind(i64::from(write.additional_minutes))
        .bind(write.at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        let record = map_progress_row(&row)?;

        tx.commit().await.map_err(db_err)?;

        let was_complete = previous.is_some_and(|(_, done)| done);
        let previous_percent = previous
            .map(|(p, _)| u8::try_from(p).map_err(ser))
            .transpose()?;
        Ok(ProgressChange {
            newly_completed: record.is_completed() && !was_complete,
            previous_percent,
            record,
        })
    }

    async fn get_progress(
        &self,
        learner_id: LearnerId,
        topic_id: TopicId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM learner_progress WHERE learner_id = ?1 AND topic_id = ?2"
        ))
        .bind(learner_id.value())
        .bind(id_i64("topic_id", topic_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(map_progress_row).transpose()
    }

    async fn list_progress(&self, learner_id: LearnerId) -> Result<Vec<ProgressRecord>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM learner_progress WHERE learner_id = ?1 ORDER BY topic_id ASC"
        ))
        .bind(learner_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(map_progress_row).collect()
    }
}
