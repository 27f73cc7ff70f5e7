//! The event signup endpoint: validates the request, hands the desired
//! shift set to the reconciler, then schedules the day-before reminder.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::core::signup;
use crate::error::ApiError;
use crate::models::{Event, Organization, Shift, User};
use crate::reminders;
use crate::router::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/eventsignup", post(event_signup))
}

#[derive(Deserialize)]
struct SelectedShift {
    shift_id: Option<String>,
}

#[derive(Deserialize)]
struct EventSignupRequest {
    user_id: Option<String>,
    org_id: Option<String>,
    event_id: Option<String>,
    #[serde(default)]
    selected_shift_ids: Vec<SelectedShift>,
}

async fn event_signup(
    State(state): State<AppState>,
    Json(body): Json<EventSignupRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user_id = body
        .user_id
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::validation("user_id is required"))?;
    let org_id = body
        .org_id
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::validation("org_id is required"))?;
    let event_id = body
        .event_id
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::validation("event_id is required"))?;

    let org: Option<Organization> = state.store.get(&format!("organizations/{org_id}")).await?;
    if org.is_none() {
        return Err(ApiError::validation("Invalid organization ID."));
    }

    let user: Option<User> = state.store.get(&format!("users/{user_id}")).await?;
    if user.is_none() {
        return Err(ApiError::not_found("User not found."));
    }

    let event: Option<Event> = state.store.get(&format!("events/{event_id}")).await?;
    let event = event.ok_or_else(|| ApiError::validation("Invalid event ID."))?;
    if event.title.is_empty() || event.start_date.is_empty() {
        return Err(ApiError::validation("Event time or title is missing"));
    }

    // Every selected shift must belong to the event being signed up for.
    let mut desired_shifts = Vec::with_capacity(body.selected_shift_ids.len());
    for selected in body.selected_shift_ids {
        let shift_id = selected
            .shift_id
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::validation("shift_id is required for every selected shift"))?;
        let shift: Option<Shift> = state.store.get(&format!("shifts/{shift_id}")).await?;
        let belongs = shift.is_some_and(|shift| shift.event_id == event_id);
        if !belongs {
            return Err(ApiError::validation(format!(
                "Shift ID {shift_id} does not belong to Event ID {event_id}."
            )));
        }
        desired_shifts.push(shift_id);
    }

    let volunteer_id = signup::reconcile(
        &state.store,
        &state.volunteers,
        &user_id,
        &org_id,
        &event_id,
        &desired_shifts,
    )
    .await?;

    // Reminder scheduling is best-effort and never fails the signup.
    reminders::schedule_event_reminder(
        state.store.clone(),
        state.notifier.clone(),
        user_id,
        event.title,
        event.start_date,
        event_id,
        state.config.reminder_hour,
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Signups created/updated successfully",
            "volunteer_id": volunteer_id,
        })),
    ))
}
