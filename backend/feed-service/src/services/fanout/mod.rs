//! Feed fan-out
//!
//! Turns one published post into one feed entry per interested user:
//!
//! 1. `resolver`: followers of the author and subscribers of each tag,
//!    looked up concurrently with per-lookup failure isolation
//! 2. `aggregator`: one reason list per recipient
//! 3. `writer`: a single batch insert
//!
//! A run is single-shot. Nothing is retried and nothing is deduplicated
//! across runs: fanning out the same post twice writes two sets of entries.

pub mod aggregator;
pub mod resolver;
pub mod writer;

pub use aggregator::ReasonAggregator;
pub use resolver::{AudienceResolver, LookupFailure, ResolvedAudience};
pub use writer::FeedWriter;

use crate::config::FanoutConfig;
use crate::db::{FeedStore, FollowerStore, TagSubscriberStore};
use crate::error::ServiceError;
use crate::metrics::fanout as metrics;
use crate::models::PublishedPost;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, Instrument};
use uuid::Uuid;

/// Failure of the persistence step. Lookup failures never end up here.
#[derive(Debug, Error)]
pub enum FanoutError {
    #[error("batch write of {entries} feed entries failed: {source}")]
    BatchWrite {
        entries: usize,
        #[source]
        source: ServiceError,
    },

    #[error("batch write of {entries} feed entries timed out after {after:?}")]
    WriteTimedOut { entries: usize, after: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutStage {
    NotStarted,
    Resolving,
    Aggregating,
    Writing,
    Done,
    Failed,
}

impl FanoutStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FanoutStage::NotStarted => "not_started",
            FanoutStage::Resolving => "resolving",
            FanoutStage::Aggregating => "aggregating",
            FanoutStage::Writing => "writing",
            FanoutStage::Done => "done",
            FanoutStage::Failed => "failed",
        }
    }
}

impl fmt::Display for FanoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct FanoutReport {
    pub post_id: Uuid,
    pub stage: FanoutStage,
    pub recipients: usize,
    pub entries_written: u64,
    pub degraded_sources: Vec<String>,
}

impl FanoutReport {
    /// True when at least one lookup was replaced by an empty result
    pub fn is_degraded(&self) -> bool {
        !self.degraded_sources.is_empty()
    }
}

/// Tracks where a run is, for logs and stage timings
struct StageTracker {
    post_id: Uuid,
    stage: FanoutStage,
    entered_at: Instant,
}

impl StageTracker {
    fn new(post_id: Uuid) -> Self {
        Self {
            post_id,
            stage: FanoutStage::NotStarted,
            entered_at: Instant::now(),
        }
    }

    fn advance(&mut self, next: FanoutStage) {
        if self.stage != FanoutStage::NotStarted {
            metrics::record_stage_duration(self.stage.as_str(), self.entered_at.elapsed());
        }
        debug!(post_id = %self.post_id, from = %self.stage, to = %next, "Fan-out stage change");
        self.stage = next;
        self.entered_at = Instant::now();
    }
}

/// Resolve → aggregate → write for one published post
#[derive(Clone)]
pub struct FanoutService {
    resolver: AudienceResolver,
    writer: FeedWriter,
}

impl FanoutService {
    pub fn new(
        followers: Arc<dyn FollowerStore>,
        tag_subscribers: Arc<dyn TagSubscriberStore>,
        feeds: Arc<dyn FeedStore>,
        config: &FanoutConfig,
    ) -> Self {
        Self {
            resolver: AudienceResolver::new(
                followers,
                tag_subscribers,
                config.resolver_timeout(),
                config.tag_lookup_concurrency,
            ),
            writer: FeedWriter::new(feeds, config.write_timeout()),
        }
    }

    pub async fn run(&self, post: &PublishedPost) -> Result<FanoutReport, FanoutError> {
        let span = tracing::info_span!(
            "fanout",
            post_id = %post.post_id,
            author_id = %post.author_id,
            tags = post.tags.len()
        );

        self.run_stages(post).instrument(span).await
    }

    async fn run_stages(&self, post: &PublishedPost) -> Result<FanoutReport, FanoutError> {
        let started = Instant::now();
        let mut tracker = StageTracker::new(post.post_id);

        tracker.advance(FanoutStage::Resolving);
        let audience = self.resolver.resolve(post).await;

        tracker.advance(FanoutStage::Aggregating);
        let mut aggregator = ReasonAggregator::new(post.author_id, post.author_username.clone());
        aggregator.add_followers(&audience.followers);
        for (tag_name, subscribers) in &audience.tag_subscribers {
            aggregator.add_tag_subscribers(tag_name, subscribers);
        }
        let entries = aggregator.into_entries(post.post_id);
        let recipients = entries.len();

        tracker.advance(FanoutStage::Writing);
        let result = self.writer.write(&entries).await;

        let report = match result {
            Ok(written) => {
                tracker.advance(FanoutStage::Done);
                metrics::record_entries_written(written);
                Ok(FanoutReport {
                    post_id: post.post_id,
                    stage: FanoutStage::Done,
                    recipients,
                    entries_written: written,
                    degraded_sources: audience.degraded_sources,
                })
            }
            Err(e) => {
                tracker.advance(FanoutStage::Failed);
                Err(e)
            }
        };

        metrics::record_stage_duration("total", started.elapsed());
        report
    }
}
