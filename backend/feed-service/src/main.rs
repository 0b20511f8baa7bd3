use actix_web::{dev::Service, web, App, HttpServer};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feed_service::config::Config;
use feed_service::db::{
    self, FeedRepository, FeedStore, FollowRepository, PostRepository, TagFollowRepository,
};
use feed_service::handlers::{self, FeedHandlerState, FollowHandlerState, PostHandlerState};
use feed_service::jobs;
use feed_service::services::{FanoutService, PostService};

const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenvy::dotenv();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Structured JSON logging, RUST_LOG overrides LOG_LEVEL
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.app.log_level.clone().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .init();

    info!("Starting feed-service v{}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.env);

    let pool = match db::create_pool(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {:#}", e);
            eprintln!("ERROR: Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = db::run_migrations(&pool).await {
        tracing::error!("Database migration failed: {:#}", e);
        eprintln!("ERROR: Failed to run migrations: {}", e);
        std::process::exit(1);
    }
    info!("Database ready");

    let follow_repo = FollowRepository::new(pool.clone());
    let tag_follow_repo = TagFollowRepository::new(pool.clone());
    let feed_store: Arc<dyn FeedStore> = Arc::new(FeedRepository::new(pool.clone()));

    // Fan-out worker runs detached from request handling
    let fanout_service = FanoutService::new(
        Arc::new(follow_repo.clone()),
        Arc::new(tag_follow_repo.clone()),
        feed_store.clone(),
        &config.fanout,
    );
    let (dispatcher, worker) = jobs::channel(fanout_service, &config.fanout);
    let worker_handle = tokio::spawn(worker.run());
    info!(
        queue_capacity = config.fanout.queue_capacity,
        max_concurrency = config.fanout.max_concurrency,
        "Fan-out worker started"
    );

    let post_state = web::Data::new(PostHandlerState {
        posts: PostService::new(Arc::new(PostRepository::new(pool.clone())), dispatcher),
    });
    let feed_state = web::Data::new(FeedHandlerState { feeds: feed_store });
    let follow_state = web::Data::new(FollowHandlerState {
        users: follow_repo,
        tags: tag_follow_repo,
    });

    let bind_addr = format!("{}:{}", config.app.host, config.app.port);
    info!("HTTP server listening on {}", bind_addr);

    let http_server = HttpServer::new(move || {
        App::new()
            .app_data(post_state.clone())
            .app_data(feed_state.clone())
            .app_data(follow_state.clone())
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/api/v1/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(feed_service::metrics::serve_metrics))
            .wrap_fn(|req, srv| {
                let method = req.method().to_string();
                let path = req
                    .match_pattern()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| req.path().to_string());
                let start = Instant::now();

                let fut = srv.call(req);
                async move {
                    match fut.await {
                        Ok(res) => {
                            feed_service::metrics::observe_http_request(
                                &method,
                                &path,
                                res.status().as_u16(),
                                start.elapsed(),
                            );
                            Ok(res)
                        }
                        Err(err) => {
                            feed_service::metrics::observe_http_request(
                                &method,
                                &path,
                                500,
                                start.elapsed(),
                            );
                            Err(err)
                        }
                    }
                }
            })
            .configure(handlers::configure)
    })
    .bind(bind_addr)?
    .run()
    .await;

    // Dispatchers go away with the server; give the worker time to drain
    match tokio::time::timeout(WORKER_DRAIN_TIMEOUT, worker_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("Fan-out worker terminated abnormally: {}", e),
        Err(_) => tracing::warn!(
            "Fan-out worker still busy after {:?}, abandoning in-flight jobs",
            WORKER_DRAIN_TIMEOUT
        ),
    }
    info!("feed-service stopped");

    http_server
}
