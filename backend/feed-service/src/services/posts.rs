use crate::db::PostStore;
use crate::error::{ServiceError, ServiceResult};
use crate::jobs::FanoutDispatcher;
use crate::middleware::AuthenticatedUser;
use crate::models::{NewPost, PostDetail, PublishedPost};
use crate::services::normalize::{escape_for_url, filter_unique, generate_slug_id, normalize_tags};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

/// Body of `POST /api/v1/posts`
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WritePostRequest {
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    #[validate(length(min = 1))]
    pub body: String,
    pub short_description: Option<String>,
    #[validate(url)]
    pub thumbnail: Option<String>,
    pub is_markdown: bool,
    pub is_temp: bool,
    pub meta: Option<serde_json::Value>,
    /// Category ids as sent by the client; checked against the author's own
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    #[validate(length(max = 130))]
    pub url_slug: Option<String>,
}

/// Writes posts and hands published ones to the fan-out queue
#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn PostStore>,
    dispatcher: FanoutDispatcher,
}

impl PostService {
    pub fn new(store: Arc<dyn PostStore>, dispatcher: FanoutDispatcher) -> Self {
        Self { store, dispatcher }
    }

    pub async fn write_post(
        &self,
        author: &AuthenticatedUser,
        req: WritePostRequest,
    ) -> ServiceResult<PostDetail> {
        req.validate()?;

        let meta = match req.meta {
            None => serde_json::json!({}),
            Some(value) if value.is_object() => value,
            Some(_) => {
                return Err(ServiceError::Validation("meta must be an object".to_string()))
            }
        };

        let tag_names = normalize_tags(&req.tags);
        let category_ids = parse_category_ids(&req.categories)?;

        let owned = self.store.owned_category_ids(author.id).await?;
        if let Some(invalid) = category_ids.iter().find(|id| !owned.contains(id)) {
            return Err(ServiceError::InvalidCategory(invalid.to_string()));
        }

        let tags = self.store.resolve_tags(&tag_names).await?;
        let url_slug = build_url_slug(&req.title, req.url_slug.as_deref());
        let is_temp = req.is_temp;

        let detail = self
            .store
            .create_post(NewPost {
                author_id: author.id,
                author_username: author.username.clone(),
                title: req.title,
                body: req.body,
                short_description: req.short_description,
                thumbnail: req.thumbnail,
                is_markdown: req.is_markdown,
                is_temp,
                url_slug,
                meta,
                tags: tags.clone(),
                category_ids,
            })
            .await?;

        info!(
            post_id = %detail.post.id,
            author_id = %author.id,
            is_temp,
            tags = tags.len(),
            "Post written"
        );

        if is_temp {
            debug!(post_id = %detail.post.id, "Draft post, skipping fan-out");
        } else {
            self.dispatcher.enqueue(PublishedPost {
                post_id: detail.post.id,
                author_id: author.id,
                author_username: author.username.clone(),
                tags,
            });
        }

        Ok(detail)
    }
}

/// Unique category ids; the first malformed one is reported as invalid
fn parse_category_ids(raw: &[String]) -> ServiceResult<Vec<Uuid>> {
    let ids = raw
        .iter()
        .map(|id| Uuid::parse_str(id).map_err(|_| ServiceError::InvalidCategory(id.clone())))
        .collect::<ServiceResult<Vec<Uuid>>>()?;
    Ok(filter_unique(&ids))
}

/// Escaped `requested` slug, or `title` plus a random id when none usable was given
fn build_url_slug(title: &str, requested: Option<&str>) -> String {
    if let Some(slug) = requested.map(escape_for_url).filter(|s| !s.is_empty()) {
        return slug;
    }

    let slug_id = generate_slug_id();
    let generated = escape_for_url(&format!("{} {}", title, slug_id));
    if generated.is_empty() {
        slug_id
    } else {
        generated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FanoutConfig;
    use crate::db::store::{
        MockFeedStore, MockFollowerStore, MockPostStore, MockTagSubscriberStore,
    };
    use crate::jobs::{channel, FanoutWorker};
    use crate::models::{Post, TagRef};
    use crate::services::fanout::FanoutService;

    fn author() -> AuthenticatedUser {
        AuthenticatedUser {
            id: Uuid::new_v4(),
            username: "velopert".into(),
        }
    }

    /// Dispatcher whose queue holds a single job, so a second enqueue
    /// reports whether the first slot was taken
    fn single_slot_dispatcher() -> (FanoutDispatcher, FanoutWorker) {
        let service = FanoutService::new(
            Arc::new(MockFollowerStore::new()),
            Arc::new(MockTagSubscriberStore::new()),
            Arc::new(MockFeedStore::new()),
            &FanoutConfig::default(),
        );
        let config = FanoutConfig {
            queue_capacity: 1,
            ..FanoutConfig::default()
        };
        channel(service, &config)
    }

    fn probe() -> PublishedPost {
        PublishedPost {
            post_id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            author_username: "probe".into(),
            tags: vec![],
        }
    }

    fn stored(new_post: NewPost) -> PostDetail {
        let now = chrono::Utc::now();
        PostDetail {
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
            categories: vec![],
        }
    }

    fn store_resolving_tags() -> MockPostStore {
        let mut store = MockPostStore::new();
        store.expect_owned_category_ids().returning(|_| Ok(vec![]));
        store.expect_resolve_tags().returning(|names| {
            Ok(names
                .iter()
                .map(|name| TagRef {
                    id: Uuid::new_v4(),
                    name: name.clone(),
                })
                .collect())
        });
        store
    }

    #[tokio::test]
    async fn test_published_post_is_enqueued() {
        let mut store = store_resolving_tags();
        store
            .expect_create_post()
            .times(1)
            .returning(|new_post| Ok(stored(new_post)));
        let (dispatcher, _worker) = single_slot_dispatcher();
        let service = PostService::new(Arc::new(store), dispatcher.clone());

        let detail = service.write_post(&author(), request()).await.unwrap();
        assert_eq!(detail.tags, vec!["rust".to_string()]);
        assert!(!dispatcher.enqueue(probe()));
    }

    #[tokio::test]
    async fn test_draft_post_is_not_enqueued() {
        let mut store = store_resolving_tags();
        store
            .expect_create_post()
            .returning(|new_post| Ok(stored(new_post)));
        let (dispatcher, _worker) = single_slot_dispatcher();
        let service = PostService::new(Arc::new(store), dispatcher.clone());

        let mut req = request();
        req.is_temp = true;
        service.write_post(&author(), req).await.unwrap();
        assert!(dispatcher.enqueue(probe()));
    }

    #[tokio::test]
    async fn test_foreign_category_is_rejected_before_writing() {
        let owned = Uuid::new_v4();
        let foreign = Uuid::new_v4();
        let mut store = MockPostStore::new();
        store
            .expect_owned_category_ids()
            .returning(move |_| Ok(vec![owned]));
        store.expect_resolve_tags().never();
        store.expect_create_post().never();
        let (dispatcher, _worker) = single_slot_dispatcher();
        let service = PostService::new(Arc::new(store), dispatcher);

        let mut req = request();
        req.categories = vec![owned.to_string(), foreign.to_string(), owned.to_string()];
        let err = service.write_post(&author(), req).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCategory(id) if id == foreign.to_string()));
    }

    #[tokio::test]
    async fn test_malformed_category_is_rejected_before_lookup() {
        let mut store = MockPostStore::new();
        store.expect_owned_category_ids().never();
        store.expect_create_post().never();
        let (dispatcher, _worker) = single_slot_dispatcher();
        let service = PostService::new(Arc::new(store), dispatcher);

        let mut req = request();
        req.categories = vec!["not-a-uuid".into()];
        let err = service.write_post(&author(), req).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCategory(id) if id == "not-a-uuid"));
    }

    #[test]
    fn test_category_ids_are_deduplicated() {
        let id = Uuid::new_v4();
        let raw = vec![id.to_string(), id.to_string()];
        assert_eq!(parse_category_ids(&raw).unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn test_tags_are_normalised_before_resolution() {
        let mut store = MockPostStore::new();
        store.expect_owned_category_ids().returning(|_| Ok(vec![]));
        store
            .expect_resolve_tags()
            .withf(|names: &[String]| names == ["react native".to_string(), "redux".to_string()])
            .times(1)
            .returning(|_| Ok(vec![]));
        store
            .expect_create_post()
            .returning(|new_post| Ok(stored(new_post)));
        let (dispatcher, _worker) = single_slot_dispatcher();
        let service = PostService::new(Arc::new(store), dispatcher);

        let mut req = request();
        req.tags = vec!["react-native".into(), "redux".into(), "react-native".into()];
        service.write_post(&author(), req).await.unwrap();
    }

    #[tokio::test]
    async fn test_meta_must_be_object() {
        let mut store = MockPostStore::new();
        store.expect_owned_category_ids().never();
        let (dispatcher, _worker) = single_slot_dispatcher();
        let service = PostService::new(Arc::new(store), dispatcher);

        let mut req = request();
        req.meta = Some(serde_json::json!([1, 2]));
        let err = service.write_post(&author(), req).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    fn request() -> WritePostRequest {
        serde_json::from_value(serde_json::json!({
            "title": "Hello velog",
            "body": "# first post",
            "isMarkdown": true,
            "isTemp": false,
            "categories": [],
            "tags": ["rust"],
        }))
        .unwrap()
    }

    #[test]
    fn test_request_uses_camel_case() {
        let req: WritePostRequest = serde_json::from_value(serde_json::json!({
            "title": "t",
            "body": "b",
            "shortDescription": "short",
            "thumbnail": null,
            "isMarkdown": false,
            "isTemp": true,
            "categories": [],
            "tags": [],
            "urlSlug": "custom-slug",
        }))
        .unwrap();

        assert_eq!(req.short_description.as_deref(), Some("short"));
        assert!(req.is_temp);
        assert_eq!(req.url_slug.as_deref(), Some("custom-slug"));
    }

    #[test]
    fn test_validation_limits() {
        assert!(request().validate().is_ok());

        let mut req = request();
        req.title = String::new();
        assert!(req.validate().is_err());

        let mut req = request();
        req.title = "x".repeat(121);
        assert!(req.validate().is_err());

        let mut req = request();
        req.thumbnail = Some("not a url".into());
        assert!(req.validate().is_err());

        let mut req = request();
        req.url_slug = Some("s".repeat(131));
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_url_slug_prefers_requested() {
        assert_eq!(build_url_slug("Title", Some("my custom slug")), "my-custom-slug");
    }

    #[test]
    fn test_url_slug_generated_from_title() {
        let slug = build_url_slug("Hello World", None);
        assert!(slug.starts_with("Hello-World-"));
        assert_eq!(slug.len(), "Hello-World-".len() + 8);

        let slug = build_url_slug("Hello", Some("!!!"));
        assert!(slug.starts_with("Hello-"));
    }
}
