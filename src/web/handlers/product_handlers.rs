use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use super::parse_path_id;
use crate::catalog::NewProduct;
use crate::error::StorefrontError;
use crate::state::AppState;
use crate::types::ProductId;
use crate::web::extract::{AuthenticatedUser, OptionalUser};

#[derive(Deserialize, Debug)]
pub struct ListProductsQuery {
    pub category: Option<String>,
}

#[instrument(name = "handler::list_products", skip(app_state, viewer))]
pub async fn list_products_handler(
    app_state: web::Data<AppState>,
    viewer: OptionalUser,
    query: web::Query<ListProductsQuery>,
) -> Result<HttpResponse, StorefrontError> {
    let products = app_state
        .storefront
        .list_products(viewer.0.as_ref(), query.category.as_deref())?;
    info!("Fetched {} products.", products.len());
    Ok(HttpResponse::Ok().json(products))
}

pub async fn get_product_handler(
    app_state: web::Data<AppState>,
    viewer: OptionalUser,
    path: web::Path<String>,
) -> Result<HttpResponse, StorefrontError> {
    let id: ProductId = parse_path_id(&path, "product")?;
    let product = app_state.storefront.get_product(viewer.0.as_ref(), &id)?;
    Ok(HttpResponse::Ok().json(product))
}

pub async fn create_product_handler(
    app_state: web::Data<AppState>,
    auth_user: AuthenticatedUser,
    body: web::Json<NewProduct>,
) -> Result<HttpResponse, StorefrontError> {
    let product = app_state
        .storefront
        .create_product(&auth_user.principal, body.into_inner())?;
    Ok(HttpResponse::Created().json(product))
}

pub async fn delete_product_handler(
    app_state: web::Data<AppState>,
    auth_user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, StorefrontError> {
    let id: ProductId = parse_path_id(&path, "product")?;
    app_state
        .storefront
        .delete_product(&auth_user.principal, &id)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
