use crate::db::store::FollowerStore;
use crate::db::user_repo::record_user;
use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for the `follow_users` relation.
/// A row means `fk_user_id` follows `fk_follow_user_id`.
#[derive(Clone)]
pub struct FollowRepository {
    pool: PgPool,
}

impl FollowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent create follow; returns true if a new row was inserted.
    /// An unknown followee is reported as `NotFound`.
    pub async fn follow(
        &self,
        follower_id: Uuid,
        follower_username: &str,
        followee_id: Uuid,
    ) -> ServiceResult<bool> {
        let mut tx = self.pool.begin().await?;

        record_user(&mut *tx, follower_id, follower_username).await?;

        let inserted = sqlx::query_as::<_, (Uuid,)>(
            r#"
            INSERT INTO follow_users (id, fk_user_id, fk_follow_user_id, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (fk_user_id, fk_follow_user_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(follower_id)
        .bind(followee_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                ServiceError::NotFound(format!("user {}", followee_id))
            }
            other => ServiceError::Database(other),
        })?;

        tx.commit().await?;

        Ok(inserted.is_some())
    }

    /// Idempotent delete; returns true if a row was removed.
    pub async fn unfollow(&self, follower_id: Uuid, followee_id: Uuid) -> ServiceResult<bool> {
        let affected = sqlx::query(
            r#"
            DELETE FROM follow_users
            WHERE fk_user_id = $1 AND fk_follow_user_id = $2
            "#,
        )
        .bind(follower_id)
        .bind(followee_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }
}

#[async_trait]
impl FollowerStore for FollowRepository {
    async fn followers_of(&self, author_id: Uuid) -> ServiceResult<Vec<Uuid>> {
        let followers: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT fk_user_id
            FROM follow_users
            WHERE fk_follow_user_id = $1
            "#,
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(followers)
    }
}
