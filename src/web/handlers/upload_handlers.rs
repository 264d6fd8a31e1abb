use actix_web::{HttpResponse, http::header, web};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::blob::{Disposition, disposition_for};
use crate::error::StorefrontError;
use crate::state::AppState;
use crate::web::extract::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct UploadQuery {
    #[serde(default)]
    pub filename: String,
}

#[instrument(name = "handler::upload", skip(app_state, auth_user, body), fields(email = %auth_user.principal.email, len = body.len()))]
pub async fn upload_handler(
    app_state: web::Data<AppState>,
    auth_user: AuthenticatedUser,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, StorefrontError> {
    let blob = app_state.blobs.put(&query.filename, &body)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "url": blob.url,
        "name": blob.name,
    })))
}

pub async fn serve_upload_handler(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, StorefrontError> {
    let bytes = app_state.blobs.get(&path)?;

    let mut response = HttpResponse::Ok();
    match disposition_for(&path) {
        Disposition::Inline(content_type) => {
            response.content_type(content_type);
        }
        Disposition::Attachment => {
            response
                .content_type("application/octet-stream")
                .insert_header((header::CONTENT_DISPOSITION, "attachment"));
        }
    }
    Ok(response
        .insert_header((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        // names are content hashes, so the bytes behind one never change
        .insert_header((header::CACHE_CONTROL, "public, max-age=31536000, immutable"))
        .body(bytes))
}
