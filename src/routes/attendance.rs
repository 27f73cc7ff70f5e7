//! Check-in records: the per-event report, check-in creation, and the bulk
//! approve/reject pass.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::core::{dates, reports};
use crate::error::ApiError;
use crate::models::Attendance;
use crate::router::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/attendance", get(event_report))
        .route("/attendance/checkin", post(check_in))
        .route("/attendance/approve", put(approve))
}

#[derive(Deserialize)]
struct EventReportQuery {
    event_id: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn event_report(
    State(state): State<AppState>,
    Query(query): Query<EventReportQuery>,
) -> Result<Json<BTreeMap<String, reports::AttendanceRow>>, ApiError> {
    let event_id = query
        .event_id
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::validation("event_id is required"))?;
    Ok(Json(
        reports::event_attendance_report(
            &state.store,
            &event_id,
            query.start_date.as_deref(),
            query.end_date.as_deref(),
        )
        .await?,
    ))
}

async fn check_in(
    State(state): State<AppState>,
    Json(mut attendance): Json<Attendance>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if attendance.event_id.is_empty()
        || attendance.user_id.is_empty()
        || attendance.event_date.is_empty()
    {
        return Err(ApiError::validation(
            "event_id, user_id, and event_date are required",
        ));
    }

    // Event dates are stored at day granularity.
    let event_day = dates::parse_when(&attendance.event_date)
        .ok_or_else(|| ApiError::validation("event_date is not a valid date"))?;
    attendance.event_date = event_day.format("%Y-%m-%d").to_string();

    let id = state.store.push("attendances", &attendance).await?;

    let mut created = serde_json::to_value(&attendance).unwrap_or_else(|_| json!({}));
    if let Some(map) = created.as_object_mut() {
        map.insert("id".to_string(), json!(id));
    }
    Ok((StatusCode::CREATED, Json(created)))
}

/// One approval decision, echoing the report row it came from plus the
/// decision fields.
#[derive(Deserialize)]
struct AttendanceDecision {
    attendance_status: Option<String>,
    approved_by_approver_id: Option<String>,
    #[serde(default)]
    hours_approved: f64,
    #[serde(default)]
    hours_rejected: f64,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

async fn approve(
    State(state): State<AppState>,
    Json(decisions): Json<BTreeMap<String, AttendanceDecision>>,
) -> Result<Json<Value>, ApiError> {
    if decisions.is_empty() {
        return Err(ApiError::validation("Attendance data is required"));
    }

    // Validate the whole batch before touching any record, so a malformed
    // entry cannot strand a half-applied batch.
    for (id, decision) in &decisions {
        let status = decision.attendance_status.as_deref();
        if !matches!(status, Some("approved") | Some("rejected")) {
            return Err(ApiError::validation(format!(
                "Invalid attendance_status for attendance with ID {id}. It must be 'approved' or 'rejected'."
            )));
        }
        if decision
            .approved_by_approver_id
            .as_deref()
            .is_none_or(str::is_empty)
        {
            return Err(ApiError::validation(format!(
                "Attendance with ID {id} must have attendance_status and approved_by_approver_id"
            )));
        }
    }

    // Applied sequentially; a store failure aborts the remainder and the
    // earlier updates stay.
    for (id, decision) in decisions {
        let existing: Option<Attendance> = state
            .store
            .get(&format!("attendances/{id}"))
            .await
            .map_err(|err| ApiError::partial("attendance approval batch", err))?;
        if existing.is_none() {
            return Err(ApiError::partial(
                "attendance approval batch",
                format!("Attendance record with ID {id} not found"),
            ));
        }

        let approver = decision.approved_by_approver_id.clone().unwrap_or_default();
        let mut patch = decision.rest;
        match decision.attendance_status.as_deref() {
            Some("approved") => {
                patch.insert("attendance_status".into(), json!("approved"));
                patch.insert("hours_approved".into(), json!(decision.hours_approved));
                patch.insert("approved_by_approver_id".into(), json!(approver));
            }
            _ => {
                patch.insert("attendance_status".into(), json!("rejected"));
                patch.insert("hours_rejected".into(), json!(decision.hours_rejected));
                patch.insert("rejected_by_approver_id".into(), json!(approver));
            }
        }

        state
            .store
            .update(&format!("attendances/{id}"), Value::Object(patch))
            .await
            .map_err(|err| ApiError::partial("attendance approval batch", err))?;
    }

    Ok(Json(json!({
        "message": "Attendance records processed successfully"
    })))
}
