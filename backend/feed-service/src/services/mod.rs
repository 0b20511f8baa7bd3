//! Service layer for feed-service
//!
//! - fanout: resolve, aggregate and persist feed entries for a published post
//! - posts: publish trigger (validation, tag resolution, enqueue fan-out)
//! - normalize: tag and slug helpers shared by posts and follows

pub mod fanout;
pub mod normalize;
pub mod posts;

pub use fanout::{FanoutError, FanoutReport, FanoutService, FanoutStage};
pub use posts::{PostService, WritePostRequest};
