//! Database access layer
//!
//! Store traits consumed by the fan-out pipeline and the publish path, plus
//! their PostgreSQL implementations and pool bootstrap.

pub mod feed_repo;
pub mod follow_repo;
pub mod post_repo;
pub mod store;
pub mod tag_follow_repo;
pub mod user_repo;

pub use feed_repo::FeedRepository;
pub use follow_repo::FollowRepository;
pub use post_repo::PostRepository;
pub use store::{FeedStore, FollowerStore, PostStore, TagSubscriberStore};
pub use tag_follow_repo::TagFollowRepository;

use crate::config::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// Create the PostgreSQL pool shared by all repositories
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Creating database pool"
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.url)
        .await
}

/// Apply pending schema migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
