use crate::error::ServiceResult;
use crate::models::{FeedEntry, FeedItem, NewPost, PostDetail, TagRef};
use async_trait::async_trait;
use uuid::Uuid;

/// Read side of the user follow graph
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FollowerStore: Send + Sync {
    /// Users following `author_id`
    async fn followers_of(&self, author_id: Uuid) -> ServiceResult<Vec<Uuid>>;
}

/// Read side of tag subscriptions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TagSubscriberStore: Send + Sync {
    /// Users subscribed to `tag_id`
    async fn subscribers_of(&self, tag_id: Uuid) -> ServiceResult<Vec<Uuid>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Persist all entries or none of them.
    /// Returns the number of rows written.
    async fn insert_batch(&self, entries: &[FeedEntry]) -> ServiceResult<u64>;

    /// Feed entries of a recipient, newest first
    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<FeedItem>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Ids of every category owned by `user_id`
    async fn owned_category_ids(&self, user_id: Uuid) -> ServiceResult<Vec<Uuid>>;

    /// Resolve tag names to ids, creating missing tags.
    /// Output order follows `names`.
    async fn resolve_tags(&self, names: &[String]) -> ServiceResult<Vec<TagRef>>;

    /// Persist the post together with its tag and category links
    async fn create_post(&self, post: NewPost) -> ServiceResult<PostDetail>;
}
