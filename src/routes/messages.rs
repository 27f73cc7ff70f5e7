//! Notification inbox records. Bulk deletion looks records up by the
//! client-supplied `id` field, not the store key.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::models::Message;
use crate::router::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/eventmessages", get(list_messages).post(create_message))
        .route("/eventmessages/deleteall", delete(delete_all))
        .route("/eventmessages/{id}", get(get_message).put(update_message))
}

#[derive(Deserialize)]
struct MessagesQuery {
    user_id: Option<String>,
}

async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<BTreeMap<String, Message>>, ApiError> {
    let user_id = query
        .user_id
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::validation("user_id is required"))?;
    let messages: BTreeMap<String, Message> = state
        .store
        .query("messages", "userId", user_id.as_str())
        .await?;
    Ok(Json(messages))
}

async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    let message: Option<Message> = state.store.get(&format!("messages/{id}")).await?;
    message
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Message not found."))
}

async fn create_message(
    State(state): State<AppState>,
    Json(body): Json<Message>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let id = state.store.push("messages", &body).await?;
    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

async fn update_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    if !patch.is_object() {
        return Err(ApiError::validation("expected an object of fields"));
    }
    state.store.update(&format!("messages/{id}"), patch).await?;
    Ok(Json(json!({"message": "Message updated successfully"})))
}

/// Bulk delete. The body mirrors the inbox listing: a map of records, each
/// carrying the client-side `id` to delete by. Records without one are
/// skipped.
async fn delete_all(
    State(state): State<AppState>,
    Json(body): Json<BTreeMap<String, Message>>,
) -> Result<Json<Value>, ApiError> {
    for record in body.into_values() {
        let Some(client_id) = record.id.filter(|value| !value.is_empty()) else {
            continue;
        };
        let matches: BTreeMap<String, Value> = state
            .store
            .query_raw("messages", "id", client_id.as_str())
            .await?;
        for store_key in matches.into_keys() {
            state.store.remove(&format!("messages/{store_key}")).await?;
        }
    }
    Ok(Json(json!({})))
}
