use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::models::Cause;
use crate::router::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/causes", get(list_causes).post(create_cause))
        .route(
            "/causes/{id}",
            get(get_cause).put(update_cause).delete(delete_cause),
        )
}

async fn list_causes(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, Cause>>, ApiError> {
    Ok(Json(state.store.get_map("causes").await?))
}

async fn get_cause(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Cause>, ApiError> {
    let cause: Option<Cause> = state.store.get(&format!("causes/{id}")).await?;
    cause
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Cause not found"))
}

async fn create_cause(
    State(state): State<AppState>,
    Json(body): Json<Cause>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let id = state.store.push("causes", &body).await?;
    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

async fn update_cause(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    if !patch.is_object() {
        return Err(ApiError::validation("expected an object of fields"));
    }
    state.store.update(&format!("causes/{id}"), patch).await?;
    Ok(Json(json!({"message": "Cause updated successfully"})))
}

async fn delete_cause(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.store.remove(&format!("causes/{id}")).await?;
    Ok(Json(json!({"message": "Cause deleted successfully"})))
}
