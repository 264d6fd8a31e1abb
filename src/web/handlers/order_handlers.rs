use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::parse_path_id;
use crate::checkout::OrderSubmission;
use crate::error::{StorefrontError, ValidationError};
use crate::order::OrderStatus;
use crate::state::AppState;
use crate::types::OrderId;
use crate::web::extract::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
}

pub async fn list_orders_handler(
    app_state: web::Data<AppState>,
    auth_user: AuthenticatedUser,
    query: web::Query<ListOrdersQuery>,
) -> Result<HttpResponse, StorefrontError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(ValidationError::InvalidStatus)?;
    let orders = app_state
        .storefront
        .list_orders(&auth_user.principal, status)?;
    Ok(HttpResponse::Ok().json(orders))
}

#[instrument(
    name = "handler::create_order",
    skip(app_state, auth_user, body),
    fields(email = %auth_user.principal.email, lines = body.items.len())
)]
pub async fn create_order_handler(
    app_state: web::Data<AppState>,
    auth_user: AuthenticatedUser,
    body: web::Json<OrderSubmission>,
) -> Result<HttpResponse, StorefrontError> {
    let order = app_state
        .storefront
        .place_order(&auth_user.principal, &body)?;
    Ok(HttpResponse::Created().json(order))
}

pub async fn get_order_handler(
    app_state: web::Data<AppState>,
    auth_user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, StorefrontError> {
    let id: OrderId = parse_path_id(&path, "order")?;
    let order = app_state.storefront.get_order(&auth_user.principal, &id)?;
    Ok(HttpResponse::Ok().json(order))
}

/// The buyer's library: orders with per-item unlock state.
pub async fn user_orders_handler(
    app_state: web::Data<AppState>,
    auth_user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, StorefrontError> {
    let view = app_state
        .storefront
        .entitlements_for(&auth_user.principal, &path)?;
    Ok(HttpResponse::Ok().json(view))
}

#[instrument(name = "handler::approve_order", skip(app_state, auth_user, path), fields(order_id = %path.as_str()))]
pub async fn approve_order_handler(
    app_state: web::Data<AppState>,
    auth_user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, StorefrontError> {
    let id: OrderId = parse_path_id(&path, "order")?;
    let order = app_state
        .storefront
        .approve_order(&auth_user.principal, &id)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "order": order })))
}

pub async fn stats_handler(
    app_state: web::Data<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<HttpResponse, StorefrontError> {
    let stats = app_state.storefront.stats(&auth_user.principal)?;
    Ok(HttpResponse::Ok().json(stats))
}
