//! User read endpoints

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::warn;

use userstream_core::{
    models::{User, UserId},
    repository::UserFilter,
};

use super::{
    error::{AppError, AppResult},
    stream, AppState,
};

pub fn create_users_router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/stream", get(stream::user_stream))
        .route("/users/{id}", get(get_user))
}

/// All users matching the query-string filters, ordered by id.
///
/// `?last_name=Hopper&id=1&id=2` matches users named Hopper whose id is 1
/// or 2. No parameters returns every user.
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<Json<Vec<User>>> {
    let filter = UserFilter::from_pairs(params)?;
    let users = state.user_repository.find_filtered(&filter).await?;
    Ok(Json(users))
}

/// Single user by id, served from cache when possible
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<User>> {
    let user_id: UserId = id
        .parse()
        .map_err(|_| AppError::bad_request(format!("Invalid user id: {id}")))?;

    match state.user_cache.get(user_id).await {
        Ok(Some(user)) => return Ok(Json(user)),
        Ok(None) => {}
        Err(e) => warn!(user_id, error = %e, "User cache lookup failed, falling back to store"),
    }

    let user = state
        .user_repository
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;

    if let Err(e) = state.user_cache.put(&user).await {
        warn!(user_id, error = %e, "Failed to cache user");
    }

    Ok(Json(user))
}
