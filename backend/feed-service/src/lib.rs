pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{ServiceError, ServiceResult};

pub use jobs::{FanoutDispatcher, FanoutWorker};
pub use models::{FeedEntry, PublishedPost, Reason, TagRef};
pub use services::{FanoutReport, FanoutService, PostService};
