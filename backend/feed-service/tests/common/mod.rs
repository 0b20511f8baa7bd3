//! In-memory stores shared by the integration tests.
//!
//! Each store can be told to fail or stall so that degraded and failed
//! fan-outs can be exercised without a database.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use feed_service::config::FanoutConfig;
use feed_service::db::{FeedStore, FollowerStore, PostStore, TagSubscriberStore};
use feed_service::error::{ServiceError, ServiceResult};
use feed_service::models::{
    Category, FeedEntry, FeedItem, NewPost, Post, PostDetail, PublishedPost, TagRef,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub fn tag(name: &str) -> TagRef {
    TagRef {
        id: Uuid::new_v4(),
        name: name.to_string(),
    }
}

pub fn published(author_id: Uuid, username: &str, tags: &[TagRef]) -> PublishedPost {
    PublishedPost {
        post_id: Uuid::new_v4(),
        author_id,
        author_username: username.to_string(),
        tags: tags.to_vec(),
    }
}

/// Short timeouts so stalled lookups resolve quickly in tests
pub fn fast_config() -> FanoutConfig {
    FanoutConfig {
        resolver_timeout_ms: 100,
        write_timeout_ms: 200,
        queue_capacity: 16,
        max_concurrency: 4,
        tag_lookup_concurrency: 4,
    }
}

/// Follow graph and tag subscriptions
#[derive(Default)]
pub struct InMemoryGraph {
    followers: Mutex<HashMap<Uuid, Vec<Uuid>>>,
    subscribers: Mutex<HashMap<Uuid, Vec<Uuid>>>,
    failing_tags: Mutex<HashSet<Uuid>>,
    stalled_tags: Mutex<HashSet<Uuid>>,
    fail_followers: AtomicBool,
    stall_followers: AtomicBool,
}

impl InMemoryGraph {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn follow(&self, follower: Uuid, author: Uuid) {
        self.followers
            .lock()
            .unwrap()
            .entry(author)
            .or_default()
            .push(follower);
    }

    pub fn subscribe(&self, subscriber: Uuid, tag: &TagRef) {
        self.subscribers
            .lock()
            .unwrap()
            .entry(tag.id)
            .or_default()
            .push(subscriber);
    }

    pub fn fail_tag(&self, tag: &TagRef) {
        self.failing_tags.lock().unwrap().insert(tag.id);
    }

    pub fn stall_tag(&self, tag: &TagRef) {
        self.stalled_tags.lock().unwrap().insert(tag.id);
    }

    pub fn fail_followers(&self) {
        self.fail_followers.store(true, Ordering::SeqCst);
    }

    pub fn stall_followers(&self) {
        self.stall_followers.store(true, Ordering::SeqCst);
    }
}

async fn stall() {
    tokio::time::sleep(Duration::from_secs(60)).await;
}

#[async_trait]
impl FollowerStore for InMemoryGraph {
    async fn followers_of(&self, author_id: Uuid) -> ServiceResult<Vec<Uuid>> {
        if self.stall_followers.load(Ordering::SeqCst) {
            stall().await;
        }
        if self.fail_followers.load(Ordering::SeqCst) {
            return Err(ServiceError::Internal("follow store unavailable".into()));
        }
        Ok(self
            .followers
            .lock()
            .unwrap()
            .get(&author_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl TagSubscriberStore for InMemoryGraph {
    async fn subscribers_of(&self, tag_id: Uuid) -> ServiceResult<Vec<Uuid>> {
        let stalled = self.stalled_tags.lock().unwrap().contains(&tag_id);
        if stalled {
            stall().await;
        }
        if self.failing_tags.lock().unwrap().contains(&tag_id) {
            return Err(ServiceError::Internal("tag store unavailable".into()));
        }
        Ok(self
            .subscribers
            .lock()
            .unwrap()
            .get(&tag_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Feed table with all-or-nothing batch semantics
#[derive(Default)]
pub struct InMemoryFeeds {
    rows: Mutex<Vec<(Uuid, FeedEntry)>>,
    fail_writes: AtomicBool,
    batches: AtomicUsize,
}

impl InMemoryFeeds {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn entries(&self) -> Vec<FeedEntry> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    pub fn entries_for(&self, user_id: Uuid) -> Vec<FeedEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect()
    }

    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedStore for InMemoryFeeds {
    async fn insert_batch(&self, entries: &[FeedEntry]) -> ServiceResult<u64> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ServiceError::Internal("feed store rejected batch".into()));
        }

        let mut rows = self.rows.lock().unwrap();
        rows.extend(entries.iter().map(|e| (Uuid::new_v4(), e.clone())));
        Ok(entries.len() as u64)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<FeedItem>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .rev()
            .filter(|(_, e)| e.user_id == user_id)
            .skip(offset as usize)
            .take(limit as usize)
            .map(|(id, e)| FeedItem {
                id: *id,
                post_id: e.post_id,
                reason: e.reasons.clone(),
                created_at: Utc::now(),
            })
            .collect())
    }
}

/// Posts, tags and categories kept in memory
#[derive(Default)]
pub struct InMemoryPosts {
    categories: Mutex<HashMap<Uuid, Vec<Category>>>,
    tags: Mutex<HashMap<String, Uuid>>,
    posts: Mutex<Vec<PostDetail>>,
}

impl InMemoryPosts {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_category(&self, owner: Uuid, name: &str) -> Uuid {
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            url_slug: name.to_lowercase(),
        };
        let id = category.id;
        self.categories
            .lock()
            .unwrap()
            .entry(owner)
            .or_default()
            .push(category);
        id
    }

    pub fn tag_id(&self, name: &str) -> Option<Uuid> {
        self.tags.lock().unwrap().get(name).copied()
    }

    pub fn posts(&self) -> Vec<PostDetail> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostStore for InMemoryPosts {
    async fn owned_category_ids(&self, user_id: Uuid) -> ServiceResult<Vec<Uuid>> {
        Ok(self
            .categories
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|cs| cs.iter().map(|c| c.id).collect())
            .unwrap_or_default())
    }

    async fn resolve_tags(&self, names: &[String]) -> ServiceResult<Vec<TagRef>> {
        let mut tags = self.tags.lock().unwrap();
        Ok(names
            .iter()
            .map(|name| TagRef {
                id: *tags.entry(name.clone()).or_insert_with(Uuid::new_v4),
                name: name.clone(),
            })
            .collect())
    }

    async fn create_post(&self, new_post: NewPost) -> ServiceResult<PostDetail> {
        let now = Utc::now();
        let categories = self
            .categories
            .lock()
            .unwrap()
            .get(&new_post.author_id)
            .map(|cs| {
                cs.iter()
                    .filter(|c| new_post.category_ids.contains(&c.id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let detail = PostDetail {
            post: Post {
                id: Uuid::new_v4(),
                user_id: new_post.author_id,
                title: new_post.title,
                body: new_post.body,
                short_description: new_post.short_description,
                thumbnail: new_post.thumbnail,
                is_markdown: new_post.is_markdown,
                is_temp: new_post.is_temp,
                url_slug: new_post.url_slug,
                meta: new_post.meta,
                created_at: now,
                updated_at: now,
            },
            tags: new_post.tags.into_iter().map(|t| t.name).collect(),
            categories,
        };

        self.posts.lock().unwrap().push(detail.clone());
        Ok(detail)
    }
}
