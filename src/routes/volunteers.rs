use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::core::volunteers::JoinOutcome;
use crate::error::ApiError;
use crate::models::Volunteer;
use crate::router::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/volunteers", get(list_volunteers))
        .route("/volunteers/joinorg", post(join_org))
        .route("/volunteers/withdraw", post(withdraw))
        .route("/volunteers/{id}", get(get_volunteer))
}

#[derive(Deserialize)]
struct MembershipRequest {
    user_id: Option<String>,
    org_id: Option<String>,
}

impl MembershipRequest {
    fn into_parts(self) -> Result<(String, String), ApiError> {
        let user_id = self
            .user_id
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::validation("user_id is required"))?;
        let org_id = self
            .org_id
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::validation("org_id is required"))?;
        Ok((user_id, org_id))
    }
}

async fn list_volunteers(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let volunteers: BTreeMap<String, Volunteer> = state.store.get_map("volunteers").await?;
    if volunteers.is_empty() {
        return Err(ApiError::not_found("No volunteers found"));
    }
    Ok(Json(json!({
        "message": "Volunteers data retrieved successfully",
        "data": volunteers,
    })))
}

async fn get_volunteer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let volunteer: Option<Volunteer> = state.store.get(&format!("volunteers/{id}")).await?;
    match volunteer {
        Some(volunteer) => Ok(Json(json!({
            "message": "Volunteer data found",
            "data": volunteer,
        }))),
        None => Err(ApiError::not_found(format!(
            "No volunteer record found for ID: {id}"
        ))),
    }
}

async fn join_org(
    State(state): State<AppState>,
    Json(body): Json<MembershipRequest>,
) -> Result<Json<Value>, ApiError> {
    let (user_id, org_id) = body.into_parts()?;
    let outcome = state.volunteers.join_org(&user_id, &org_id).await?;
    let response = match outcome {
        JoinOutcome::AlreadyActive => json!({
            "message": format!("User ID {user_id} is already volunteering for Org ID {org_id}."),
        }),
        JoinOutcome::Reactivated(volunteer_id) => json!({
            "message": "Volunteer status updated to Active.",
            "volunteer_id": volunteer_id,
        }),
        JoinOutcome::Created(volunteer_id) => json!({
            "message": "Volunteer added successfully.",
            "volunteer_id": volunteer_id,
        }),
    };
    Ok(Json(response))
}

async fn withdraw(
    State(state): State<AppState>,
    Json(body): Json<MembershipRequest>,
) -> Result<Json<Value>, ApiError> {
    let (user_id, org_id) = body.into_parts()?;
    match state.volunteers.withdraw(&user_id, &org_id).await? {
        Some(_) => Ok(Json(json!({
            "message": format!("User ID {user_id} has withdrawn from Org ID {org_id}."),
        }))),
        None => Err(ApiError::not_found(format!(
            "No active volunteer record found for User ID {user_id} with Org ID {org_id}."
        ))),
    }
}
