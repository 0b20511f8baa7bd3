use crate::db::store::FeedStore;
use crate::error::ServiceResult;
use crate::models::{FeedEntry, FeedItem, Reason};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Rows per INSERT statement; keeps bind parameters well under the
/// PostgreSQL limit of 65535.
const INSERT_CHUNK_SIZE: usize = 1_000;

#[derive(sqlx::FromRow)]
struct FeedRow {
    id: Uuid,
    fk_post_id: Uuid,
    reason: Json<Vec<Reason>>,
    created_at: DateTime<Utc>,
}

impl From<FeedRow> for FeedItem {
    fn from(row: FeedRow) -> Self {
        FeedItem {
            id: row.id,
            post_id: row.fk_post_id,
            reason: row.reason.0,
            created_at: row.created_at,
        }
    }
}

/// Repository for the `feeds` table
#[derive(Clone)]
pub struct FeedRepository {
    pool: PgPool,
}

impl FeedRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedStore for FeedRepository {
    async fn insert_batch(&self, entries: &[FeedEntry]) -> ServiceResult<u64> {
        if entries.is_empty() {
            return Ok(0);
        }

        // Single transaction: readers see the whole fan-out or nothing
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in entries.chunks(INSERT_CHUNK_SIZE) {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO feeds (id, fk_post_id, fk_user_id, reason) ");

            builder.push_values(chunk, |mut row, entry| {
                row.push_bind(Uuid::new_v4())
                    .push_bind(entry.post_id)
                    .push_bind(entry.user_id)
                    .push_bind(Json(entry.reasons.clone()));
            });

            inserted += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;

        Ok(inserted)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<FeedItem>> {
        let rows = sqlx::query_as::<_, FeedRow>(
            r#"
            SELECT id, fk_post_id, reason, created_at
            FROM feeds
            WHERE fk_user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FeedItem::from).collect())
    }
}
