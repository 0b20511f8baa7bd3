pub mod feeds;
pub mod follows;
pub mod posts;

pub use feeds::{list_feeds, FeedHandlerState, FeedQueryParams};
pub use follows::{follow_tag, follow_user, unfollow_tag, unfollow_user, FollowHandlerState};
pub use posts::{write_post, PostHandlerState};

use crate::error::ServiceError;
use actix_web::web;

/// Malformed JSON bodies answer like any other validation failure
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ServiceError::Validation(err.to_string()).into())
}

/// Mount every `/api/v1` route. State is registered by the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .app_data(json_config())
            .service(write_post)
            .service(list_feeds)
            .service(follow_user)
            .service(unfollow_user)
            .service(follow_tag)
            .service(unfollow_tag),
    );
}
