//! Direct push dispatch and one-shot reminder scheduling.

use std::collections::BTreeMap;

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::reminders;
use crate::router::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications/send", post(send_notification))
        .route("/scheduleReminder", post(schedule_reminder))
}

#[derive(Deserialize)]
struct SendNotificationRequest {
    #[serde(rename = "receiverToken")]
    receiver_token: Option<String>,
    title: Option<String>,
    body: Option<String>,
}

async fn send_notification(
    State(state): State<AppState>,
    Json(request): Json<SendNotificationRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (Some(token), Some(title), Some(body)) =
        (request.receiver_token, request.title, request.body)
    else {
        return Err(ApiError::validation(
            "All fields are required: receiverToken, title, and body.",
        ));
    };

    let dispatch_id = state
        .notifier
        .send(&token, &title, &body, BTreeMap::new())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Notification sent successfully",
            "response": dispatch_id,
        })),
    ))
}

#[derive(Deserialize)]
struct ScheduleReminderRequest {
    #[serde(rename = "userId")]
    user_id: Option<String>,
    #[serde(rename = "eventTitle")]
    event_title: Option<String>,
    #[serde(rename = "eventTime")]
    event_time: Option<String>,
    #[serde(rename = "eventId")]
    event_id: Option<String>,
}

async fn schedule_reminder(
    State(state): State<AppState>,
    Json(request): Json<ScheduleReminderRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(user_id), Some(event_title), Some(event_time), Some(event_id)) = (
        request.user_id,
        request.event_title,
        request.event_time,
        request.event_id,
    ) else {
        return Err(ApiError::validation(
            "userId, eventTitle, eventTime, and eventId are required",
        ));
    };

    reminders::schedule_event_reminder(
        state.store.clone(),
        state.notifier.clone(),
        user_id,
        event_title,
        event_time,
        event_id,
        state.config.reminder_hour,
    );

    Ok(Json(json!({"message": "Reminder scheduled successfully"})))
}
