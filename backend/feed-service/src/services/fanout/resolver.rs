use crate::db::{FollowerStore, TagSubscriberStore};
use crate::error::ServiceError;
use crate::metrics::fanout as metrics;
use crate::models::{PublishedPost, TagRef};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// A single lookup that could not produce recipients
#[derive(Debug, Error)]
pub enum LookupFailure {
    #[error("lookup failed: {0}")]
    Storage(#[from] ServiceError),

    #[error("lookup timed out after {0:?}")]
    TimedOut(Duration),
}

impl LookupFailure {
    fn cause(&self) -> &'static str {
        match self {
            LookupFailure::Storage(_) => "error",
            LookupFailure::TimedOut(_) => "timeout",
        }
    }
}

/// Recipients found for one post, before aggregation
#[derive(Debug, Default)]
pub struct ResolvedAudience {
    pub followers: Vec<Uuid>,
    /// One element per post tag, in the post's tag order
    pub tag_subscribers: Vec<(String, Vec<Uuid>)>,
    /// Lookups replaced by an empty result (`followers`, `tag:<name>`)
    pub degraded_sources: Vec<String>,
}

/// Runs the follower lookup and the per-tag lookups concurrently.
///
/// Every lookup is isolated: an error or timeout turns that one lookup into
/// an empty result and is logged; the others carry on. At most
/// `tag_concurrency` tag lookups hold a connection at once, and a lookup's
/// timeout starts when it is issued, not while it waits its turn.
#[derive(Clone)]
pub struct AudienceResolver {
    followers: Arc<dyn FollowerStore>,
    tag_subscribers: Arc<dyn TagSubscriberStore>,
    lookup_timeout: Duration,
    tag_concurrency: usize,
}

impl AudienceResolver {
    pub fn new(
        followers: Arc<dyn FollowerStore>,
        tag_subscribers: Arc<dyn TagSubscriberStore>,
        lookup_timeout: Duration,
        tag_concurrency: usize,
    ) -> Self {
        Self {
            followers,
            tag_subscribers,
            lookup_timeout,
            tag_concurrency: tag_concurrency.max(1),
        }
    }

    pub async fn resolve(&self, post: &PublishedPost) -> ResolvedAudience {
        let (followers, tags) = tokio::join!(
            self.resolve_followers(post.author_id),
            self.resolve_tag_subscribers(&post.tags),
        );

        let mut audience = ResolvedAudience::default();

        match followers {
            Ok(ids) => audience.followers = ids,
            Err(_) => audience.degraded_sources.push("followers".to_string()),
        }

        for (tag, result) in post.tags.iter().zip(tags) {
            match result {
                Ok(ids) => audience.tag_subscribers.push((tag.name.clone(), ids)),
                Err(_) => {
                    audience.degraded_sources.push(format!("tag:{}", tag.name));
                    audience.tag_subscribers.push((tag.name.clone(), Vec::new()));
                }
            }
        }

        audience
    }

    async fn resolve_followers(&self, author_id: Uuid) -> Result<Vec<Uuid>, LookupFailure> {
        let result = self
            .bounded(self.followers.followers_of(author_id))
            .await;

        if let Err(failure) = &result {
            warn!(
                %author_id,
                error = %failure,
                "Follower lookup failed, continuing fan-out without followers"
            );
            metrics::record_resolver_failure("followers", failure.cause());
        }

        result
    }

    async fn resolve_tag_subscribers(
        &self,
        tags: &[TagRef],
    ) -> Vec<Result<Vec<Uuid>, LookupFailure>> {
        let lookups: Vec<_> = tags
            .iter()
            .map(|tag| self.resolve_tag_subscriber(tag))
            .collect();

        stream::iter(lookups)
            .buffered(self.tag_concurrency)
            .collect()
            .await
    }

    async fn resolve_tag_subscriber(&self, tag: &TagRef) -> Result<Vec<Uuid>, LookupFailure> {
        let result = self
            .bounded(self.tag_subscribers.subscribers_of(tag.id))
            .await;

        if let Err(failure) = &result {
            warn!(
                tag_id = %tag.id,
                tag = %tag.name,
                error = %failure,
                "Tag subscriber lookup failed, continuing fan-out without this tag"
            );
            metrics::record_resolver_failure("tag", failure.cause());
        }

        result
    }

    async fn bounded<F>(&self, lookup: F) -> Result<Vec<Uuid>, LookupFailure>
    where
        F: Future<Output = Result<Vec<Uuid>, ServiceError>>,
    {
        match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(result) => result.map_err(LookupFailure::from),
            Err(_) => Err(LookupFailure::TimedOut(self.lookup_timeout)),
        }
    }
}
