use crate::db::post_repo::get_or_create_tag;
use crate::db::store::TagSubscriberStore;
use crate::db::user_repo::record_user;
use crate::error::ServiceResult;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for tag subscriptions (`follow_tags`)
#[derive(Clone)]
pub struct TagFollowRepository {
    pool: PgPool,
}

impl TagFollowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Subscribe `user_id` to the tag named `tag_name`, creating the tag if needed.
    /// Returns true if a new subscription was inserted.
    pub async fn subscribe(
        &self,
        user_id: Uuid,
        username: &str,
        tag_name: &str,
    ) -> ServiceResult<bool> {
        let mut tx = self.pool.begin().await?;

        record_user(&mut *tx, user_id, username).await?;

        let tag_id = get_or_create_tag(&mut *tx, tag_name).await?;

        let inserted = sqlx::query_as::<_, (Uuid,)>(
            r#"
            INSERT INTO follow_tags (id, fk_user_id, fk_tag_id, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (fk_user_id, fk_tag_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(tag_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(inserted.is_some())
    }

    /// Returns true if a subscription was removed.
    pub async fn unsubscribe(&self, user_id: Uuid, tag_name: &str) -> ServiceResult<bool> {
        let affected = sqlx::query(
            r#"
            DELETE FROM follow_tags ft
            USING tags t
            WHERE ft.fk_tag_id = t.id
              AND ft.fk_user_id = $1
              AND t.name = $2
            "#,
        )
        .bind(user_id)
        .bind(tag_name)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }
}

#[async_trait]
impl TagSubscriberStore for TagFollowRepository {
    async fn subscribers_of(&self, tag_id: Uuid) -> ServiceResult<Vec<Uuid>> {
        let subscribers: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT fk_user_id
            FROM follow_tags
            WHERE fk_tag_id = $1
            "#,
        )
        .bind(tag_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(subscribers)
    }
}
