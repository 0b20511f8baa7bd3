use actix_web::{post, web, HttpResponse};

use crate::error::ServiceResult;
use crate::middleware::AuthenticatedUser;
use crate::services::{PostService, WritePostRequest};

pub struct PostHandlerState {
    pub posts: PostService,
}

/// Publish or save a post.
///
/// Responds once the post is stored. Fan-out for published posts is queued
/// and never delays or fails this response.
#[post("/posts")]
pub async fn write_post(
    user: AuthenticatedUser,
    body: web::Json<WritePostRequest>,
    state: web::Data<PostHandlerState>,
) -> ServiceResult<HttpResponse> {
    let detail = state.posts.write_post(&user, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail))
}
