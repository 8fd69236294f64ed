use campus_core::model::{GamificationState, LearnerId};

use super::SqliteRepository;
use super::mapping::{db_err, id_i64, map_gamification_row};
use crate::repository::{GamificationRepository, StorageError};

const STATE_COLUMNS: &str = "learner_id, total_xp, current_streak_days, longest_streak_days, \
                             last_activity_date, version";

#[async_trait::async_trait]
impl GamificationRepository for SqliteRepository {
    async fn get_or_create_state(
        &self,
        learner_id: LearnerId,
    ) -> Result<GamificationState, StorageError> {
        sqlx::query(
            r"
            INSERT INTO gamification (learner_id, total_xp, current_streak_days, longest_streak_days, version)
            VALUES (?1, 0, 0, 0, 0)
            ON CONFLICT(learner_id) DO NOTHING
            ",
        )
        .bind(learner_id.value())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let row = sqlx::query(&format!(
            "SELECT {STATE_COLUMNS} FROM gamification WHERE learner_id = ?1"
        ))
        .bind(learner_id.value())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        map_gamification_row(&row)
    }

    async fn increment_xp(
        &self,
        learner_id: LearnerId,
        amount: u64,
    ) -> Result<GamificationState, StorageError> {
        // Single statement: concurrent increments never lose an update.
        let row = sqlx::query(&format!(
            r"
            INSERT INTO gamification (learner_id, total_xp, current_streak_days, longest_streak_days, version)
            VALUES (?1, ?2, 0, 0, 1)
            ON CONFLICT(learner_id) DO UPDATE SET
                total_xp = gamification.total_xp + excluded.total_xp,
                version = gamification.version + 1
            RETURNING {STATE_COLUMNS}
            "
        ))
        .bind(learner_id.value())
        .bind(id_i64("xp amount", amount)?)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        let state = map_gamification_row(&row)?;
        tracing::debug!(%learner_id, amount, total_xp = state.total_xp(), "xp incremented");
        Ok(state)
    }

    async fn update_streak_if_version(
        &self,
        state: &GamificationState,
    ) -> Result<Option<GamificationState>, StorageError> {
        let row = sqlx::query(&format!(
            r"
            UPDATE gamification SET
                current_streak_days = ?2,
                longest_streak_days = ?3,
                last_activity_date = ?4,
                version = version + 1
            WHERE learner_id = ?1 AND version = ?5
            RETURNING {STATE_COLUMNS}
            "
        ))
        .bind(state.learner_id().value())
        .bind(i64::from(state.current_streak_days()))
        .bind(i64::from(state.longest_streak_days()))
        .bind(state.last_activity_date())
        .bind(id_i64("version", state.version())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(map_gamification_row).transpose()
    }
}
