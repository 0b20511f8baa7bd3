use actix_web::{delete, post, web, HttpResponse};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::db::{FollowRepository, TagFollowRepository};
use crate::error::{ServiceError, ServiceResult};
use crate::middleware::AuthenticatedUser;
use crate::services::normalize::normalize_tag;

pub struct FollowHandlerState {
    pub users: FollowRepository,
    pub tags: TagFollowRepository,
}

fn tag_from_path(raw: &str) -> ServiceResult<String> {
    let name = normalize_tag(raw);
    if name.is_empty() {
        return Err(ServiceError::Validation("tag name must not be empty".to_string()));
    }
    Ok(name)
}

#[post("/follows/users/{user_id}")]
pub async fn follow_user(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    state: web::Data<FollowHandlerState>,
) -> ServiceResult<HttpResponse> {
    let followee_id = path.into_inner();
    if followee_id == user.id {
        return Err(ServiceError::Validation("cannot follow yourself".to_string()));
    }

    let followed = state.users.follow(user.id, &user.username, followee_id).await?;
    if followed {
        info!(follower_id = %user.id, %followee_id, "User followed");
    }

    Ok(HttpResponse::Ok().json(json!({ "followed": followed })))
}

#[delete("/follows/users/{user_id}")]
pub async fn unfollow_user(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    state: web::Data<FollowHandlerState>,
) -> ServiceResult<HttpResponse> {
    let followee_id = path.into_inner();
    let unfollowed = state.users.unfollow(user.id, followee_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "unfollowed": unfollowed })))
}

#[post("/follows/tags/{tag_name}")]
pub async fn follow_tag(
    user: AuthenticatedUser,
    path: web::Path<String>,
    state: web::Data<FollowHandlerState>,
) -> ServiceResult<HttpResponse> {
    let tag_name = tag_from_path(&path)?;
    let followed = state.tags.subscribe(user.id, &user.username, &tag_name).await?;
    if followed {
        info!(user_id = %user.id, tag = %tag_name, "Tag followed");
    }

    Ok(HttpResponse::Ok().json(json!({ "followed": followed })))
}

#[delete("/follows/tags/{tag_name}")]
pub async fn unfollow_tag(
    user: AuthenticatedUser,
    path: web::Path<String>,
    state: web::Data<FollowHandlerState>,
) -> ServiceResult<HttpResponse> {
    let tag_name = tag_from_path(&path)?;
    let unfollowed = state.tags.unsubscribe(user.id, &tag_name).await?;

    Ok(HttpResponse::Ok().json(json!({ "unfollowed": unfollowed })))
}
