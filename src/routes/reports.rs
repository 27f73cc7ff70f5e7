//! Read-only aggregation endpoints backed by `core::reports`.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::core::reports::{
    self, EventWithShifts, ShiftDetail, ShiftRollup, VolunteerHistory,
};
use crate::error::ApiError;
use crate::router::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/uservolunteeringreport", get(user_volunteering_report))
        .route("/orgupcomingevents", get(org_upcoming_events))
        .route("/geteventandshiftforapproval", get(approval_report))
        .route("/myupcomingevents", get(my_upcoming_events))
        .route("/userinterestevents", get(interest_events))
}

#[derive(Deserialize)]
struct UserReportQuery {
    user_id: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn user_volunteering_report(
    State(state): State<AppState>,
    Query(query): Query<UserReportQuery>,
) -> Result<Json<BTreeMap<String, VolunteerHistory>>, ApiError> {
    let user_id = query
        .user_id
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::validation("user_id is required"))?;
    Ok(Json(
        reports::user_volunteering_report(
            &state.store,
            &user_id,
            query.start_date.as_deref(),
            query.end_date.as_deref(),
        )
        .await?,
    ))
}

#[derive(Deserialize)]
struct OrgReportQuery {
    org_user_id: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn org_upcoming_events(
    State(state): State<AppState>,
    Query(query): Query<OrgReportQuery>,
) -> Result<Json<BTreeMap<String, EventWithShifts<ShiftRollup>>>, ApiError> {
    let org_user_id = query
        .org_user_id
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::validation("org_user_id is required"))?;
    Ok(Json(
        reports::org_upcoming_report(
            &state.store,
            &org_user_id,
            query.start_date.as_deref(),
            query.end_date.as_deref(),
        )
        .await?,
    ))
}

async fn approval_report(
    State(state): State<AppState>,
    Query(query): Query<OrgReportQuery>,
) -> Result<Json<BTreeMap<String, EventWithShifts<ShiftRollup>>>, ApiError> {
    let org_user_id = query
        .org_user_id
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::validation("orgUserId is required"))?;
    Ok(Json(
        reports::approval_report(&state.store, &org_user_id).await?,
    ))
}

#[derive(Deserialize)]
struct MyUpcomingQuery {
    user_id: Option<String>,
    volunteer_id: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn my_upcoming_events(
    State(state): State<AppState>,
    Query(query): Query<MyUpcomingQuery>,
) -> Result<Json<BTreeMap<String, EventWithShifts<ShiftDetail>>>, ApiError> {
    let user_id = query
        .user_id
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::validation("user_id is required"))?;
    Ok(Json(
        reports::my_upcoming_events(
            &state.store,
            &state.volunteers,
            &user_id,
            query.volunteer_id.as_deref().filter(|value| !value.is_empty()),
            query.start_date.as_deref(),
            query.end_date.as_deref(),
        )
        .await?,
    ))
}

#[derive(Deserialize)]
struct InterestQuery {
    #[serde(rename = "userId")]
    user_id: Option<String>,
    #[serde(rename = "currentDate")]
    current_date: Option<String>,
}

async fn interest_events(
    State(state): State<AppState>,
    Query(query): Query<InterestQuery>,
) -> Result<Json<BTreeMap<String, EventWithShifts<ShiftDetail>>>, ApiError> {
    let user_id = query
        .user_id
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::validation("userId is required"))?;
    Ok(Json(
        reports::interest_events(&state.store, &user_id, query.current_date.as_deref()).await?,
    ))
}
