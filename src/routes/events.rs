//! Event and shift CRUD plus the event-with-shifts rollup endpoints.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::core::{dates, reports};
use crate::error::ApiError;
use crate::models::{Event, OrgRole, OrgUser, Organization, Shift};
use crate::notify::{NotificationData, topic_for};
use crate::router::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/events-with-shifts", get(events_with_shifts))
        .route(
            "/events/events-with-shifts/{event_id}",
            get(event_with_shifts),
        )
        .route("/events/shifts", post(create_shift))
        .route(
            "/events/shifts/{shift_id}",
            put(update_shift).delete(delete_shift),
        )
        .route("/events/cancel/{event_id}", put(cancel_event))
        .route(
            "/events/{event_id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/events/{event_id}/shifts", get(list_event_shifts))
}

#[derive(Deserialize)]
struct EventsFilter {
    org_user_id: Option<String>,
    org_id: Option<String>,
}

/// The event creator must hold the Admin role for the event's org.
async fn validate_org_admin(
    state: &AppState,
    org_user_id: &str,
    org_id: &str,
) -> Result<(), ApiError> {
    let org: Option<Organization> = state.store.get(&format!("organizations/{org_id}")).await?;
    if org.is_none() {
        return Err(ApiError::validation("Invalid organization ID."));
    }

    let org_user: Option<OrgUser> = state.store.get(&format!("org_users/{org_user_id}")).await?;
    let org_user = org_user.ok_or_else(|| ApiError::not_found("Organization user not found."))?;

    if org_user.organization_id != org_id || org_user.role_in_org != Some(OrgRole::Admin) {
        return Err(ApiError::Forbidden(
            "User does not have admin role for this organization.".to_string(),
        ));
    }
    Ok(())
}

async fn list_events(
    State(state): State<AppState>,
    Query(filter): Query<EventsFilter>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let events: BTreeMap<String, Event> = if let Some(org_user_id) = filter.org_user_id.as_deref() {
        state.store.query("events", "created_by", org_user_id).await?
    } else if let Some(org_id) = filter.org_id.as_deref() {
        state.store.query("events", "org_id", org_id).await?
    } else {
        state.store.get_map("events").await?
    };

    let formatted = events
        .into_iter()
        .map(|(event_id, mut event)| {
            event.event_id = Some(event_id.clone());
            json!({"event_id": event_id, "event": event})
        })
        .collect();
    Ok(Json(formatted))
}

async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let event: Option<Event> = state.store.get(&format!("events/{event_id}")).await?;
    let mut event = event.ok_or_else(|| ApiError::not_found("Event not found"))?;
    event.event_id = Some(event_id.clone());
    Ok(Json(json!({"event_id": event_id, "event": event})))
}

#[derive(Deserialize)]
struct CreateEventRequest {
    parent_org: Option<String>,
    org_name: Option<String>,
    #[serde(default)]
    shifts: Vec<Shift>,
    #[serde(flatten)]
    event: Event,
}

async fn create_event(
    State(state): State<AppState>,
    Json(body): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let org_user_id = body
        .event
        .org_user_id
        .clone()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::validation("org_user_id is required"))?;
    if body.event.org_id.is_empty() {
        return Err(ApiError::validation("org_id is required"));
    }
    validate_org_admin(&state, &org_user_id, &body.event.org_id).await?;

    let now = dates::now_iso();
    let mut event = body.event;
    event.created_at = Some(now.clone());
    event.updated_at = Some(now.clone());
    event.created_by = Some(org_user_id.clone());
    event.updated_by = Some(org_user_id.clone());

    let event_id = state.store.push("events", &event).await?;
    // The key is duplicated into the record for client convenience.
    state
        .store
        .update(&format!("events/{event_id}"), json!({"event_id": event_id}))
        .await?;
    event.event_id = Some(event_id.clone());

    let mut shift_views = Vec::new();
    for mut shift in body.shifts {
        shift.event_id = event_id.clone();
        shift.created_at = Some(now.clone());
        shift.updated_at = Some(now.clone());
        shift.created_by = Some(org_user_id.clone());
        shift.updated_by = Some(org_user_id.clone());
        let shift_id = state.store.push("shifts", &shift).await?;
        let mut view = serde_json::to_value(&shift).unwrap_or_else(|_| json!({}));
        if let Some(map) = view.as_object_mut() {
            map.insert("shift_id".to_string(), json!(shift_id));
        }
        shift_views.push(view);
    }

    // Announce to the parent-org topic. Best-effort: the event exists
    // either way.
    if let Some(parent_org) = body.parent_org.as_deref().filter(|value| !value.is_empty()) {
        let org_name = body.org_name.as_deref().unwrap_or("Unknown Organization");
        let title = format!("Exciting New Opportunity with {org_name}!");
        let message = format!(
            "A new event has been organized by {org_name}. The event \"{}\" is happening on {}. Register now and make a difference!",
            event.title, event.start_date
        );
        let data = NotificationData {
            user_id: "allusers".to_string(),
            event_id: event_id.clone(),
            receiver: "allusers".to_string(),
        }
        .into_payload(&title, &message);

        if let Err(err) = state
            .notifier
            .send_to_topic(&topic_for(parent_org), &title, &message, data)
            .await
        {
            tracing::error!("failed to announce event {event_id}: {err}");
        }
    }

    let mut response = Map::new();
    response.insert(
        event_id,
        json!({"event": event, "shifts": shift_views}),
    );
    Ok((StatusCode::CREATED, Json(Value::Object(response))))
}

async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<BTreeMap<String, reports::EventWithShifts<reports::ShiftDetail>>>, ApiError> {
    let Some(fields) = body.as_object() else {
        return Err(ApiError::validation("expected an object of fields"));
    };
    let org_user_id = fields
        .get("org_user_id")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::validation("org_user_id is required"))?;
    let org_id = fields
        .get("org_id")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::validation("org_id is required"))?;
    validate_org_admin(&state, org_user_id, org_id).await?;

    let existing: Option<Event> = state.store.get(&format!("events/{event_id}")).await?;
    if existing.is_none() {
        return Err(ApiError::not_found("Event not found."));
    }

    // Shift updates ride along in the body; split them out of the event
    // patch.
    let mut patch: Map<String, Value> = fields.clone();
    let shifts = patch.remove("shifts");
    state
        .store
        .update(&format!("events/{event_id}"), Value::Object(patch))
        .await?;

    if let Some(Value::Array(shifts)) = shifts {
        for shift in shifts {
            let Some(mut shift) = shift.as_object().cloned() else {
                continue;
            };
            let shift_id = match shift.remove("shift_id") {
                Some(Value::String(shift_id)) => shift_id,
                _ => continue,
            };
            state
                .store
                .update(&format!("shifts/{shift_id}"), Value::Object(shift))
                .await?;
        }
    }

    Ok(Json(
        reports::event_with_shifts(&state.store, &event_id).await?,
    ))
}

async fn cancel_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<BTreeMap<String, reports::EventWithShifts<reports::ShiftDetail>>>, ApiError> {
    let existing: Option<Event> = state.store.get(&format!("events/{event_id}")).await?;
    if existing.is_none() {
        return Err(ApiError::not_found("Event not found."));
    }

    state
        .store
        .update(&format!("events/{event_id}"), json!({"event_status": "canceled"}))
        .await?;

    Ok(Json(
        reports::event_with_shifts(&state.store, &event_id).await?,
    ))
}

async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let existing: Option<Event> = state.store.get(&format!("events/{event_id}")).await?;
    if existing.is_none() {
        return Err(ApiError::not_found("Event not found."));
    }

    // Shifts go first so a failure cannot orphan them behind a deleted
    // event.
    let shifts: BTreeMap<String, Shift> = state
        .store
        .query("shifts", "event_id", event_id.as_str())
        .await?;
    for shift_id in shifts.into_keys() {
        state.store.remove(&format!("shifts/{shift_id}")).await?;
    }
    state.store.remove(&format!("events/{event_id}")).await?;

    Ok(Json(json!({
        "message": "Event and associated shifts deleted successfully"
    })))
}

async fn events_with_shifts(
    State(state): State<AppState>,
    Query(filter): Query<EventsFilter>,
) -> Result<Json<BTreeMap<String, reports::EventWithShifts<reports::ShiftRollup>>>, ApiError> {
    Ok(Json(
        reports::events_with_shifts(
            &state.store,
            filter.org_user_id.as_deref(),
            filter.org_id.as_deref(),
        )
        .await?,
    ))
}

async fn event_with_shifts(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<BTreeMap<String, reports::EventWithShifts<reports::ShiftDetail>>>, ApiError> {
    Ok(Json(
        reports::event_with_shifts(&state.store, &event_id).await?,
    ))
}

async fn list_event_shifts(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<BTreeMap<String, Shift>>, ApiError> {
    let shifts: BTreeMap<String, Shift> = state
        .store
        .query("shifts", "event_id", event_id.as_str())
        .await?;
    Ok(Json(shifts))
}

async fn create_shift(
    State(state): State<AppState>,
    Json(mut shift): Json<Shift>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if shift.event_id.is_empty() {
        return Err(ApiError::validation("event_id is required"));
    }
    let now = dates::now_iso();
    shift.created_at = Some(now.clone());
    shift.updated_at = Some(now);
    let shift_id = state.store.push("shifts", &shift).await?;
    Ok((StatusCode::CREATED, Json(json!({"id": shift_id}))))
}

async fn update_shift(
    State(state): State<AppState>,
    Path(shift_id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    if !patch.is_object() {
        return Err(ApiError::validation("expected an object of fields"));
    }
    let existing: Option<Shift> = state.store.get(&format!("shifts/{shift_id}")).await?;
    if existing.is_none() {
        return Err(ApiError::not_found("Shift not found."));
    }
    state.store.update(&format!("shifts/{shift_id}"), patch).await?;
    Ok(Json(json!({"message": "Shift updated successfully"})))
}

async fn delete_shift(
    State(state): State<AppState>,
    Path(shift_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let existing: Option<Shift> = state.store.get(&format!("shifts/{shift_id}")).await?;
    if existing.is_none() {
        return Err(ApiError::not_found("Shift not found."));
    }
    state.store.remove(&format!("shifts/{shift_id}")).await?;
    Ok(Json(json!({"message": "Shift deleted successfully"})))
}
