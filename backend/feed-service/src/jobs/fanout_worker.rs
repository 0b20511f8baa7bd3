//! Background fan-out
//!
//! The publish handler hands finished posts to a [`FanoutDispatcher`] and
//! returns. A single [`FanoutWorker`] owns the receiving end of a bounded
//! queue and runs up to `max_concurrency` fan-outs at once. Outcomes go to
//! logs and `feed_fanout_runs_total`; nothing is reported back to the
//! publisher and nothing is retried.

use crate::config::FanoutConfig;
use crate::metrics::fanout as metrics;
use crate::models::PublishedPost;
use crate::services::fanout::{FanoutError, FanoutReport, FanoutService};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Create a connected dispatcher/worker pair
pub fn channel(service: FanoutService, config: &FanoutConfig) -> (FanoutDispatcher, FanoutWorker) {
    let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
    let worker = FanoutWorker {
        rx,
        service,
        limit: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
    };
    (FanoutDispatcher { tx }, worker)
}

/// Sending half, cheap to clone into request handlers
#[derive(Clone)]
pub struct FanoutDispatcher {
    tx: mpsc::Sender<PublishedPost>,
}

impl FanoutDispatcher {
    /// Queue a fan-out without waiting.
    ///
    /// Returns false when the job was dropped because the queue is full or
    /// the worker has stopped.
    pub fn enqueue(&self, post: PublishedPost) -> bool {
        match self.tx.try_send(post) {
            Ok(()) => true,
            Err(TrySendError::Full(post)) => {
                metrics::record_queue_dropped();
                tracing::error!(
                    post_id = %post.post_id,
                    author_id = %post.author_id,
                    "Fan-out queue full, dropping job"
                );
                false
            }
            Err(TrySendError::Closed(post)) => {
                metrics::record_queue_dropped();
                tracing::error!(
                    post_id = %post.post_id,
                    author_id = %post.author_id,
                    "Fan-out worker stopped, dropping job"
                );
                false
            }
        }
    }
}

pub struct FanoutWorker {
    rx: mpsc::Receiver<PublishedPost>,
    service: FanoutService,
    limit: Arc<Semaphore>,
}

impl FanoutWorker {
    /// Process jobs until every dispatcher is dropped, then wait for the
    /// jobs already started.
    pub async fn run(mut self) {
        tracing::info!(
            max_concurrency = self.limit.available_permits(),
            "Starting fan-out worker"
        );

        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                job = self.rx.recv() => {
                    let Some(post) = job else { break };
                    let Ok(permit) = self.limit.clone().acquire_owned().await else { break };
                    let service = self.service.clone();
                    in_flight.spawn(async move {
                        let _permit = permit;
                        let _ = execute(&service, &post).await;
                    });
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    log_join_error(joined);
                }
            }
        }

        let pending = in_flight.len();
        if pending > 0 {
            tracing::info!(pending, "Queue closed, draining in-flight fan-outs");
        }
        while let Some(joined) = in_flight.join_next().await {
            log_join_error(joined);
        }

        tracing::info!("Fan-out worker stopped");
    }
}

fn log_join_error(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        metrics::record_run("failed");
        tracing::error!(error = %e, "Fan-out task aborted");
    }
}

/// Run one fan-out and report its outcome to logs and metrics
pub async fn execute(
    service: &FanoutService,
    post: &PublishedPost,
) -> Result<FanoutReport, FanoutError> {
    let started = Instant::now();

    let result = service.run(post).await;
    match &result {
        Ok(report) if report.is_degraded() => {
            metrics::record_run("degraded");
            tracing::warn!(
                post_id = %report.post_id,
                recipients = report.recipients,
                entries_written = report.entries_written,
                degraded_sources = ?report.degraded_sources,
                duration_ms = started.elapsed().as_millis(),
                "Fan-out completed with degraded lookups"
            );
        }
        Ok(report) => {
            metrics::record_run("success");
            tracing::info!(
                post_id = %report.post_id,
                recipients = report.recipients,
                entries_written = report.entries_written,
                duration_ms = started.elapsed().as_millis(),
                "Fan-out completed"
            );
        }
        Err(e) => {
            metrics::record_run("failed");
            tracing::error!(
                post_id = %post.post_id,
                error = %e,
                duration_ms = started.elapsed().as_millis(),
                "Fan-out failed"
            );
        }
    }

    result
}
