use campus_core::model::{LearnerId, QuizAttempt};

use super::SqliteRepository;
use super::mapping::{db_err, encode_answers, id_i64, map_attempt_row};
use crate::repository::{QuizAttemptRepository, StorageError};

#[async_trait::async_trait]
impl QuizAttemptRepository for SqliteRepository {
    async fn append_attempt(&self, attempt: &QuizAttempt) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO quiz_attempts (learner_id, quiz_id, topic_id, answers, score, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(attempt.learner_id().value())
        .bind(id_i64("quiz_id", attempt.quiz_id().value())?)
        .bind(id_i64("topic_id", attempt.topic_id().value())?)
        .bind(encode_answers(attempt.answers()))
        .bind(i64::from(attempt.score()))
        .bind(attempt.completed_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list_attempts(&self, learner_id: LearnerId) -> Result<Vec<QuizAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT learner_id, quiz_id, topic_id, answers, score, completed_at
            FROM quiz_attempts
            WHERE learner_id = ?1
            ORDER BY completed_at ASC, id ASC
            ",
        )
        .bind(learner_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(map_attempt_row).collect()
    }
}
