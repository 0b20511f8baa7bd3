//! Caller identity
//!
//! Authentication happens upstream. The gateway forwards the verified user
//! as `X-User-Id` and `X-Username`; handlers take an [`AuthenticatedUser`]
//! argument and get 401 when either header is missing or malformed.

use actix_web::error::ErrorUnauthorized;
use actix_web::{dev::Payload, Error, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USERNAME_HEADER: &str = "X-Username";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
}

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl AuthenticatedUser {
    fn from_headers(req: &HttpRequest) -> Result<Self, Error> {
        let id = header(req, USER_ID_HEADER)
            .ok_or_else(|| ErrorUnauthorized("Missing user identity"))?;
        let id = Uuid::parse_str(id).map_err(|_| ErrorUnauthorized("Invalid user ID"))?;

        let username = header(req, USERNAME_HEADER)
            .ok_or_else(|| ErrorUnauthorized("Missing username"))?
            .to_string();

        Ok(Self { id, username })
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Self::from_headers(req))
    }
}
