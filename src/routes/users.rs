use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::models::User;
use crate::router::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route(
            "/users/{id}",
            get(get_user)
                .post(create_user)
                .put(update_user)
                .delete(delete_user),
        )
}

async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, User>>, ApiError> {
    Ok(Json(state.store.get_map("users").await?))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user: Option<User> = state.store.get(&format!("users/{id}")).await?;
    user.map(Json)
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// Create with a client-chosen key (the auth provider's uid).
async fn create_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<User>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state
        .store
        .set(&format!("users/{id}"), &body.normalized())
        .await?;
    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    if !patch.is_object() {
        return Err(ApiError::validation("expected an object of fields"));
    }
    state.store.update(&format!("users/{id}"), patch).await?;
    Ok(Json(json!({"message": "User updated successfully"})))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.store.remove(&format!("users/{id}")).await?;
    Ok(Json(json!({"message": "User deleted successfully"})))
}
