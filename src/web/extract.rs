//! Request extractors that resolve the bearer token into a [`Principal`]
use crate::auth::Principal;
use crate::error::StorefrontError;
use crate::state::AppState;
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{FromRequest, HttpRequest, web};
use std::future::{Ready, ready};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub principal: Principal,
    pub token: String,
}

/// Like [`AuthenticatedUser`] but anonymous requests pass through as `None`.
/// A token that is present but invalid is still rejected.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<Principal>);

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn resolve(req: &HttpRequest, token: &str) -> Result<Principal, StorefrontError> {
    let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
        StorefrontError::Credential("application state is not registered".into())
    })?;
    state.accounts.authenticate(token)
}

impl FromRequest for AuthenticatedUser {
    type Error = StorefrontError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(token) = bearer_token(req) else {
            warn!(path = %req.path(), "missing bearer token");
            return ready(Err(StorefrontError::Unauthenticated));
        };
        ready(resolve(req, token).map(|principal| AuthenticatedUser {
            principal,
            token: token.to_string(),
        }))
    }
}

impl FromRequest for OptionalUser {
    type Error = StorefrontError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match bearer_token(req) {
            Some(token) => ready(resolve(req, token).map(|p| OptionalUser(Some(p)))),
            None => ready(Ok(OptionalUser(None))),
        }
    }
}
