use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::db::FeedStore;
use crate::error::ServiceResult;
use crate::middleware::AuthenticatedUser;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct FeedQueryParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl FeedQueryParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

pub struct FeedHandlerState {
    pub feeds: Arc<dyn FeedStore>,
}

/// Feed entries of the caller, newest first
#[get("/feeds")]
pub async fn list_feeds(
    user: AuthenticatedUser,
    query: web::Query<FeedQueryParams>,
    state: web::Data<FeedHandlerState>,
) -> ServiceResult<HttpResponse> {
    let (limit, offset) = (query.limit(), query.offset());
    debug!(user_id = %user.id, limit, offset, "Listing feed");

    let items = state.feeds.list_for_user(user.id, limit, offset).await?;
    Ok(HttpResponse::Ok().json(items))
}
