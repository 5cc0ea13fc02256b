//! API service routes

use std::future::Future;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use crate::{error::ApiError, models::User, state::AppState};

/// Deadline for one request's storage work. Expiry drops the in-flight
/// future, which rolls back any open transaction.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

async fn with_deadline<T>(
    fut: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    tokio::time::timeout(REQUEST_TIMEOUT, fut)
        .await
        .map_err(|_| ApiError::Timeout)?
}

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/user", get(get_users).post(create_user))
        .route(
            "/user/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/user/:id/family/:family_id", axum::routing::delete(delete_family));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", user_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "user-family-api"
    }))
}

/// List all users with nationality and families
pub async fn get_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = with_deadline(state.users.list()).await?;

    Ok(Json(users))
}

/// Create a user together with their family members
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<User>,
) -> Result<impl IntoResponse, ApiError> {
    with_deadline(state.users.create(&payload)).await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!("User created successfully")),
    ))
}

/// Get one user's detail by id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let user = with_deadline(state.users.detail(id)).await?;

    Ok(Json(user))
}

/// Update a user's scalar fields and upsert the supplied families
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(mut payload): Json<User>,
) -> Result<impl IntoResponse, ApiError> {
    payload.user_id = id;
    with_deadline(state.users.update(&payload)).await?;

    Ok(Json(json!("User updated successfully")))
}

/// Delete a user and all their family members
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    with_deadline(state.users.delete(id)).await?;

    Ok(Json(json!("User deleted successfully")))
}

/// Delete exactly one family member of a user
pub async fn delete_family(
    State(state): State<AppState>,
    Path((id, family_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, ApiError> {
    with_deadline(state.users.delete_family(id, family_id)).await?;

    Ok(Json(json!("family deleted successfully")))
}
