use campus_core::model::{Badge, Subject, SubjectId, Topic, TopicId};

use super::SqliteRepository;
use super::mapping::{db_err, id_i64, map_badge_row, map_subject_row, map_topic_row};
use crate::repository::{CatalogRepository, StorageError};

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO subjects (id, name) VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name
            ",
        )
        .bind(id_i64("subject_id", subject.id().value())?)
        .bind(subject.name())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, StorageError> {
        let row = sqlx::query("SELECT id, name FROM subjects WHERE id = ?1")
            .bind(id_i64("subject_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(map_subject_row).transpose()
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError> {
        let rows = sqlx::query("SELECT id, name FROM subjects ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(map_subject_row).collect()
    }

    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO topics (id, subject_id, title, order_index, estimated_duration_minutes, content)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                subject_id = excluded.subject_id,
                title = excluded.title,
                order_index = excluded.order_index,
                estimated_duration_minutes = excluded.estimated_duration_minutes,
                content = excluded.content
            ",
        )
        .bind(id_i64("topic_id", topic.id().value())?)
        .bind(id_i64("subject_id", topic.subject_id().value())?)
        .bind(topic.title())
        .bind(i64::from(topic.order_index()))
        .bind(topic.estimated_duration_minutes().map(i64::from))
        .bind(topic.content())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_topic(&self, id: TopicId) -> Result<Option<Topic>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, subject_id, title, order_index, estimated_duration_minutes, content
            FROM topics WHERE id = ?1
            ",
        )
        .bind(id_i64("topic_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(map_topic_row).transpose()
    }

    async fn list_topics(&self, subject_id: SubjectId) -> Result<Vec<Topic>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, subject_id, title, order_index, estimated_duration_minutes, content
            FROM topics
            WHERE subject_id = ?1
            ORDER BY order_index ASC, id ASC
            ",
        )
        .bind(id_i64("subject_id", subject_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(map_topic_row).collect()
    }

    async fn upsert_badge(&self, badge: &Badge) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO badges (id, name, description, icon, xp_required, category)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                icon = excluded.icon,
                xp_required = excluded.xp_required,
                category = excluded.category
            ",
        )
        .bind(id_i64("badge_id", badge.id.value())?)
        .bind(badge.name.as_str())
        .bind(badge.description.as_str())
        .bind(badge.icon.as_str())
        .bind(id_i64("xp_required", badge.xp_required)?)
        .bind(badge.category.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list_badges(&self) -> Result<Vec<Badge>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, description, icon, xp_required, category
            FROM badges
            ORDER BY xp_required ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(map_badge_row).collect()
    }
}
