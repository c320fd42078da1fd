//! CSV upload: parse users and append them to the work queue

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use userstream_ingest::parse_users_csv;

use super::{
    error::{AppError, AppResult},
    AppState,
};

/// Largest accepted upload body
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub enqueued: usize,
}

pub fn create_upload_router() -> Router<AppState> {
    Router::new().route(
        "/upload-csv",
        post(upload_csv).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    )
}

/// Enqueue every user in the CSV request body.
///
/// The whole file is validated before anything is enqueued, so a bad row
/// rejects the upload with 400 and leaves the queue untouched.
pub async fn upload_csv(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let users = parse_users_csv(&body)?;
    if users.is_empty() {
        return Err(AppError::bad_request("CSV contains no users"));
    }

    let enqueued = state.producer.enqueue_all(&users).await?;
    info!(enqueued, bytes = body.len(), "CSV upload enqueued");

    Ok((StatusCode::ACCEPTED, Json(UploadResponse { enqueued })))
}
