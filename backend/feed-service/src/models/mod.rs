use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a recipient receives a feed entry.
///
/// Serialized as `{"type": "USER", "value": "<username>"}` or
/// `{"type": "TAG", "value": "<tag name>"}`, which is the shape stored in
/// `feeds.reason` and returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "UPPERCASE")]
pub enum Reason {
    /// Recipient follows the author; holds the author's username
    User(String),
    /// Recipient subscribes to a tag on the post; holds the tag name
    Tag(String),
}

impl Reason {
    pub fn is_user(&self) -> bool {
        matches!(self, Reason::User(_))
    }
}

/// A tag attached to a post, resolved to its id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub id: Uuid,
    pub name: String,
}

/// Everything the fan-out pipeline needs about a freshly published post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedPost {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub tags: Vec<TagRef>,
}

/// One notification row for one recipient about one post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub reasons: Vec<Reason>,
}

/// Feed entry as read back by its recipient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: Uuid,
    pub post_id: Uuid,
    pub reason: Vec<Reason>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub url_slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    #[sqlx(rename = "fk_user_id")]
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub short_description: Option<String>,
    pub thumbnail: Option<String>,
    pub is_markdown: bool,
    pub is_temp: bool,
    pub url_slug: String,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post as returned by the publish endpoint, with its tags and categories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub tags: Vec<String>,
    pub categories: Vec<Category>,
}

/// Validated input for persisting a post
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub author_username: String,
    pub title: String,
    pub body: String,
    pub short_description: Option<String>,
    pub thumbnail: Option<String>,
    pub is_markdown: bool,
    pub is_temp: bool,
    pub url_slug: String,
    pub meta: serde_json::Value,
    pub tags: Vec<TagRef>,
    pub category_ids: Vec<Uuid>,
}
