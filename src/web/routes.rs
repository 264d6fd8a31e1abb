use actix_web::{HttpResponse, error::InternalError, web};
use serde_json::json;

use crate::state::AppState;
use crate::web::handlers::{auth_handlers, order_handlers, product_handlers, upload_handlers};

async fn health_check_handler() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Registers shared state, body limits and every route on an actix `App`.
pub fn configure_app(cfg: &mut web::ServiceConfig, state: AppState) {
    let max_upload = state.config.max_upload_bytes;

    cfg.app_data(web::Data::new(state))
        .app_data(web::PayloadConfig::new(max_upload))
        .app_data(web::JsonConfig::default().error_handler(|err, _req| {
            let body = json!({ "success": false, "error": err.to_string(), "retryable": false });
            InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
        }));
    configure_app_routes(cfg);
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/uploads/{name}",
        web::get().to(upload_handlers::serve_upload_handler),
    )
    .service(
        web::scope("/api")
            .route("/health", web::get().to(health_check_handler))
            // accounts
            .route("/signup", web::post().to(auth_handlers::signup_handler))
            .route("/login", web::post().to(auth_handlers::login_handler))
            .route("/logout", web::post().to(auth_handlers::logout_handler))
            .route("/users", web::get().to(auth_handlers::list_users_handler))
            // blobs
            .route("/upload", web::post().to(upload_handlers::upload_handler))
            .route(
                "/admin/stats",
                web::get().to(order_handlers::stats_handler),
            )
            .service(
                web::scope("/products")
                    .route(
                        "",
                        web::get().to(product_handlers::list_products_handler),
                    )
                    .route(
                        "",
                        web::post().to(product_handlers::create_product_handler),
                    )
                    .route(
                        "/{id}",
                        web::get().to(product_handlers::get_product_handler),
                    )
                    .route(
                        "/{id}",
                        web::delete().to(product_handlers::delete_product_handler),
                    ),
            )
            .service(
                web::scope("/orders")
                    .route("", web::get().to(order_handlers::list_orders_handler))
                    .route("", web::post().to(order_handlers::create_order_handler))
                    .route(
                        "/user/{email}",
                        web::get().to(order_handlers::user_orders_handler),
                    )
                    .route("/{id}", web::get().to(order_handlers::get_order_handler))
                    .route(
                        "/{id}/approve",
                        web::put().to(order_handlers::approve_order_handler),
                    ),
            ),
    );
}
