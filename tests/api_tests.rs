//! HTTP surface tests driven through actix's in-process test service

use actix_web::{App, http::StatusCode, test};
use serde_json::{Value, json};
use std::sync::Arc;
use storefront::{config::AppConfig, state::AppState, store::Store, web::configure_app};
use tempfile::{TempDir, tempdir};

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "correct horse battery staple";

fn test_state() -> anyhow::Result<(TempDir, AppState)> {
    let temp_dir = tempdir()?;
    let data_dir = temp_dir.path().join("api.db");
    let store = Store::open(&data_dir)?;
    let state = AppState::new(store, Arc::new(AppConfig::local(data_dir)));
    state.accounts.ensure_admin(ADMIN_EMAIL, ADMIN_PASSWORD)?;
    Ok((temp_dir, state))
}

macro_rules! init_app {
    ($state:expr) => {{
        let state = $state.clone();
        test::init_service(App::new().configure(move |cfg| configure_app(cfg, state))).await
    }};
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

#[actix_web::test]
async fn health_check_responds() -> anyhow::Result<()> {
    let (_dir, state) = test_state()?;
    let app = init_app!(state);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[actix_web::test]
async fn full_purchase_flow_over_http() -> anyhow::Result<()> {
    let (_dir, state) = test_state()?;
    let app = init_app!(state);

    // admin session
    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let admin_token = body["token"].as_str().unwrap_or_default().to_string();
    assert_eq!(body["user"]["role"], "admin");

    // buyer signs up and logs in
    let req = test::TestRequest::post()
        .uri("/api/signup")
        .set_json(json!({ "name": "Bea", "email": "Bea@Example.com", "password": "hunter22" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "email": "bea@example.com", "password": "hunter22" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let buyer_token = body["token"].as_str().unwrap_or_default().to_string();
    assert_eq!(body["user"]["role"], "user");

    // product image goes through the upload endpoint
    let req = test::TestRequest::post()
        .uri("/api/upload?filename=cover.PNG")
        .insert_header(bearer(&admin_token))
        .set_payload(b"\x89PNG fake image bytes".to_vec())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let image_url = body["url"].as_str().unwrap_or_default().to_string();
    let image_name = body["name"].as_str().unwrap_or_default().to_string();
    assert!(image_name.ends_with(".png"));

    let req = test::TestRequest::get()
        .uri(&format!("/uploads/{image_name}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").map(|v| v.as_bytes()),
        Some(&b"image/png"[..])
    );

    let req = test::TestRequest::post()
        .uri("/api/products")
        .insert_header(bearer(&admin_token))
        .set_json(json!({
            "name": "Stylised Foliage",
            "price_cents": 2500,
            "category": "3D Model",
            "image": image_url,
            "download_url": "https://files.example/foliage.zip",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let product: Value = test::read_body_json(resp).await;
    let product_id = product["id"].as_str().unwrap_or_default().to_string();
    assert!(product_id.starts_with("prod_"));

    // anonymous listing hides the deliverable
    let req = test::TestRequest::get()
        .uri("/api/products?category=3d%20model")
        .to_request();
    let listing: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listing.as_array().map(Vec::len), Some(1));
    assert!(listing[0].get("download_url").is_none());

    // buyer checks out with a receipt
    let req = test::TestRequest::post()
        .uri("/api/orders")
        .insert_header(bearer(&buyer_token))
        .set_json(json!({
            "items": [{
                "product_id": product_id,
                "name": "Stylised Foliage",
                "price_cents": 2500,
                "category": "3D Model",
                "image": image_url,
                "quantity": 2,
            }],
            "total_cents": 5000,
            "screenshot": "https://localhost/uploads/receipt.png",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: Value = test::read_body_json(resp).await;
    let order_id = order["id"].as_str().unwrap_or_default().to_string();
    assert_eq!(order["status"], "pending");
    assert_eq!(order["customer_email"], "bea@example.com");
    assert_eq!(order["total_cents"], 5000);
    assert!(order["items"][0].get("download_url").is_none());

    let req = test::TestRequest::get()
        .uri(&format!("/api/orders/{order_id}"))
        .insert_header(bearer(&buyer_token))
        .to_request();
    let fetched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched["status"], "pending");
    assert!(fetched["items"][0].get("download_url").is_none());

    let library_uri = "/api/orders/user/bea@example.com";
    let req = test::TestRequest::get()
        .uri(library_uri)
        .insert_header(bearer(&buyer_token))
        .to_request();
    let library: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(library["orders"][0]["items"][0]["download"]["state"], "locked");

    // the buyer cannot approve their own order
    let req = test::TestRequest::put()
        .uri(&format!("/api/orders/{order_id}/approve"))
        .insert_header(bearer(&buyer_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri(&format!("/api/orders/{order_id}/approve"))
        .insert_header(bearer(&admin_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["order"]["status"], "approved");

    let req = test::TestRequest::get()
        .uri(library_uri)
        .insert_header(bearer(&buyer_token))
        .to_request();
    let library: Value = test::call_and_read_body_json(&app, req).await;
    let item = &library["orders"][0]["items"][0];
    assert_eq!(item["download"]["state"], "unlocked");
    assert_eq!(item["download"]["url"], "https://files.example/foliage.zip");
    assert_eq!(library["orders"][0]["total_cents"], 5000);

    let req = test::TestRequest::get()
        .uri("/api/admin/stats")
        .insert_header(bearer(&admin_token))
        .to_request();
    let stats: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(stats["orders"], 1);
    assert_eq!(stats["pending_orders"], 0);
    assert_eq!(stats["approved_revenue_cents"], 5000);
    assert_eq!(stats["users"], 2);

    Ok(())
}

#[actix_web::test]
async fn errors_map_to_status_codes() -> anyhow::Result<()> {
    let (_dir, state) = test_state()?;
    let grant = state.accounts.login(ADMIN_EMAIL, ADMIN_PASSWORD)?;
    let app = init_app!(state);

    // no token at all
    let req = test::TestRequest::get().uri("/api/orders").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // a token that was never issued
    let req = test::TestRequest::get()
        .uri("/api/orders")
        .insert_header(bearer("deadbeef"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // unknown and malformed order ids
    for id in ["order_1qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqq", "not-an-id"] {
        let req = test::TestRequest::put()
            .uri(&format!("/api/orders/{id}/approve"))
            .insert_header(bearer(&grant.token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["retryable"], false);
    }

    // an order without payment proof
    let req = test::TestRequest::post()
        .uri("/api/orders")
        .insert_header(bearer(&grant.token))
        .set_json(json!({ "items": [], "total_cents": 0 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // malformed json body
    let req = test::TestRequest::post()
        .uri("/api/login")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{ not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // duplicate signup
    let signup = json!({ "name": "Admin", "email": ADMIN_EMAIL, "password": "x" });
    let req = test::TestRequest::post()
        .uri("/api/signup")
        .set_json(&signup)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // unknown status filter
    let req = test::TestRequest::get()
        .uri("/api/orders?status=shipped")
        .insert_header(bearer(&grant.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[actix_web::test]
async fn logout_invalidates_the_session() -> anyhow::Result<()> {
    let (_dir, state) = test_state()?;
    let grant = state.accounts.login(ADMIN_EMAIL, ADMIN_PASSWORD)?;
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(bearer(&grant.token))
        .to_request();
    let users: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(users.as_array().map(Vec::len), Some(1));
    assert!(users[0].get("password_hash").is_none());

    let req = test::TestRequest::post()
        .uri("/api/logout")
        .insert_header(bearer(&grant.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(bearer(&grant.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[actix_web::test]
async fn uploads_that_could_run_script_are_served_as_downloads() -> anyhow::Result<()> {
    let (_dir, state) = test_state()?;
    state.accounts.signup("Bea", "bea@example.com", "hunter22")?;
    let grant = state.accounts.login("bea@example.com", "hunter22")?;
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/upload?filename=receipt.svg")
        .insert_header(bearer(&grant.token))
        .set_payload(r#"<svg xmlns="http://www.w3.org/2000/svg"><script>alert(1)</script></svg>"#)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let name = body["name"].as_str().unwrap_or_default().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/uploads/{name}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert_eq!(
        headers.get("content-type").map(|v| v.as_bytes()),
        Some(&b"application/octet-stream"[..])
    );
    assert_eq!(
        headers.get("content-disposition").map(|v| v.as_bytes()),
        Some(&b"attachment"[..])
    );
    assert_eq!(
        headers.get("x-content-type-options").map(|v| v.as_bytes()),
        Some(&b"nosniff"[..])
    );

    // rasters stay inline but are never sniffed
    let req = test::TestRequest::post()
        .uri("/api/upload?filename=receipt.png")
        .insert_header(bearer(&grant.token))
        .set_payload(b"\x89PNG receipt".to_vec())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let name = body["name"].as_str().unwrap_or_default().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/uploads/{name}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(
        resp.headers().get("content-type").map(|v| v.as_bytes()),
        Some(&b"image/png"[..])
    );
    assert!(resp.headers().get("content-disposition").is_none());
    assert_eq!(
        resp.headers().get("x-content-type-options").map(|v| v.as_bytes()),
        Some(&b"nosniff"[..])
    );
    Ok(())
}
