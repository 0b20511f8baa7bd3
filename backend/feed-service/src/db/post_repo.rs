use crate::db::store::PostStore;
use crate::db::user_repo::record_user;
use crate::error::ServiceResult;
use crate::models::{Category, NewPost, Post, PostDetail, TagRef};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Look up a tag id by name, inserting the tag when it does not exist yet
pub(crate) async fn get_or_create_tag<'e, E>(executor: E, name: &str) -> Result<Uuid, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_scalar(
        r#"
        INSERT INTO tags (id, name)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_one(executor)
    .await
}

/// Repository for posts and their tag/category links
#[derive(Clone)]
pub struct PostRepository {
    pool: PgPool,
}

impl PostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostStore for PostRepository {
    async fn owned_category_ids(&self, user_id: Uuid) -> ServiceResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM categories
            WHERE fk_user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn resolve_tags(&self, names: &[String]) -> ServiceResult<Vec<TagRef>> {
        let mut tags = Vec::with_capacity(names.len());
        for name in names {
            let id = get_or_create_tag(&self.pool, name).await?;
            tags.push(TagRef {
                id,
                name: name.clone(),
            });
        }
        Ok(tags)
    }

    async fn create_post(&self, new_post: NewPost) -> ServiceResult<PostDetail> {
        let mut tx = self.pool.begin().await?;

        record_user(&mut *tx, new_post.author_id, &new_post.author_username).await?;

        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (
                id, fk_user_id, title, body, short_description, thumbnail,
                is_markdown, is_temp, url_slug, meta
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, fk_user_id, title, body, short_description, thumbnail,
                      is_markdown, is_temp, url_slug, meta, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_post.author_id)
        .bind(&new_post.title)
        .bind(&new_post.body)
        .bind(&new_post.short_description)
        .bind(&new_post.thumbnail)
        .bind(new_post.is_markdown)
        .bind(new_post.is_temp)
        .bind(&new_post.url_slug)
        .bind(&new_post.meta)
        .fetch_one(&mut *tx)
        .await?;

        for tag in &new_post.tags {
            sqlx::query(
                r#"
                INSERT INTO posts_tags (fk_post_id, fk_tag_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(post.id)
            .bind(tag.id)
            .execute(&mut *tx)
            .await?;
        }

        for category_id in &new_post.category_ids {
            sqlx::query(
                r#"
                INSERT INTO posts_categories (fk_post_id, fk_category_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(post.id)
            .bind(category_id)
            .execute(&mut *tx)
            .await?;
        }

        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT c.id, c.name, c.url_slug
            FROM categories c
            JOIN posts_categories pc ON pc.fk_category_id = c.id
            WHERE pc.fk_post_id = $1
            ORDER BY c.name
            "#,
        )
        .bind(post.id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(PostDetail {
            post,
            tags: new_post.tags.into_iter().map(|t| t.name).collect(),
            categories,
        })
    }
}
