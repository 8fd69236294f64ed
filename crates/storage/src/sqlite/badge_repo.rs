use campus_core::model::{EarnedBadge, LearnerId};

use super::SqliteRepository;
use super::mapping::{db_err, id_i64, map_earned_row};
use crate::repository::{BadgeAwardRepository, StorageError};

#[async_trait::async_trait]
impl BadgeAwardRepository for SqliteRepository {
    async fn list_earned(&self, learner_id: LearnerId) -> Result<Vec<EarnedBadge>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT learner_id, badge_id, earned_at
            FROM earned_badges
            WHERE learner_id = ?1
            ORDER BY earned_at ASC, badge_id ASC
            ",
        )
        .bind(learner_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(map_earned_row).collect()
    }

    async fn insert_earned_if_absent(&self, earned: &EarnedBadge) -> Result<bool, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO earned_badges (learner_id, badge_id, earned_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(learner_id, badge_id) DO NOTHING
            ",
        )
        .bind(earned.learner_id.value())
        .bind(id_i64("badge_id", earned.badge_id.value())?)
        .bind(earned.earned_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(res.rows_affected() == 1)
    }
}
