use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::error::StorefrontError;
use crate::state::AppState;
use crate::web::extract::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[instrument(name = "handler::signup", skip(app_state, body), fields(email = %body.email))]
pub async fn signup_handler(
    app_state: web::Data<AppState>,
    body: web::Json<SignupRequest>,
) -> Result<HttpResponse, StorefrontError> {
    let user = app_state
        .accounts
        .signup(&body.name, &body.email, &body.password)?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "user": user })))
}

#[instrument(name = "handler::login", skip(app_state, body), fields(email = %body.email))]
pub async fn login_handler(
    app_state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, StorefrontError> {
    let grant = app_state.accounts.login(&body.email, &body.password)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "token": grant.token,
        "user": grant.user,
    })))
}

#[instrument(name = "handler::logout", skip(app_state, auth_user), fields(email = %auth_user.principal.email))]
pub async fn logout_handler(
    app_state: web::Data<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<HttpResponse, StorefrontError> {
    app_state.accounts.logout(&auth_user.token)?;
    info!("session closed");
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

pub async fn list_users_handler(
    app_state: web::Data<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<HttpResponse, StorefrontError> {
    let users = app_state.accounts.list_users(&auth_user.principal)?;
    Ok(HttpResponse::Ok().json(users))
}
