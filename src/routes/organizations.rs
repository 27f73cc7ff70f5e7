use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::models::Organization;
use crate::router::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/organizations", get(list_organizations).post(create_organization))
        .route(
            "/organizations/{id}",
            get(get_organization)
                .put(update_organization)
                .delete(delete_organization),
        )
}

async fn list_organizations(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, Organization>>, ApiError> {
    Ok(Json(state.store.get_map("organizations").await?))
}

async fn get_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Organization>, ApiError> {
    let org: Option<Organization> = state.store.get(&format!("organizations/{id}")).await?;
    org.map(Json)
        .ok_or_else(|| ApiError::not_found("Organization not found"))
}

async fn create_organization(
    State(state): State<AppState>,
    Json(body): Json<Organization>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let id = state.store.push("organizations", &body).await?;
    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

async fn update_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    if !patch.is_object() {
        return Err(ApiError::validation("expected an object of fields"));
    }
    state
        .store
        .update(&format!("organizations/{id}"), patch)
        .await?;
    Ok(Json(json!({"message": "Organization updated successfully"})))
}

async fn delete_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.store.remove(&format!("organizations/{id}")).await?;
    Ok(Json(json!({"message": "Organization deleted successfully"})))
}
