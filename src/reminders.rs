//! One-shot event reminders: the day before an event starts, the signed-up
//! user gets a push saying it is happening in 24 hours.
//!
//! Scheduling is fire-and-forget. Every failure on this path is logged and
//! swallowed; a reminder that cannot be scheduled or delivered must never
//! fail the signup that requested it.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::core::dates;
use crate::models::User;
use crate::notify::{NotificationData, Notifier};
use crate::store::Store;

pub fn schedule_event_reminder(
    store: Store,
    notifier: Arc<dyn Notifier>,
    user_id: String,
    event_title: String,
    event_time: String,
    event_id: String,
    reminder_hour: u32,
) {
    let Some(event_start) = dates::parse_when(&event_time) else {
        warn!(event_id = %event_id, "unparseable event time, reminder not scheduled");
        return;
    };
    let Some(reminder_at) = event_start
        .date()
        .pred_opt()
        .and_then(|day| day.and_hms_opt(reminder_hour, 0, 0))
    else {
        warn!(event_id = %event_id, "could not derive reminder instant");
        return;
    };

    let Ok(delay) = (reminder_at - dates::now()).to_std() else {
        warn!(event_id = %event_id, "reminder time already passed, skipping");
        return;
    };

    info!(user_id = %user_id, event_id = %event_id, at = %reminder_at, "scheduled event reminder");
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(err) =
            send_event_reminder(&store, notifier.as_ref(), &user_id, &event_title, &event_id).await
        {
            error!(user_id = %user_id, event_id = %event_id, "failed to send event reminder: {err}");
        }
    });
}

async fn send_event_reminder(
    store: &Store,
    notifier: &dyn Notifier,
    user_id: &str,
    event_title: &str,
    event_id: &str,
) -> anyhow::Result<()> {
    let user: Option<User> = store.get(&format!("users/{user_id}")).await?;
    let token = user
        .and_then(|user| user.token)
        .ok_or_else(|| anyhow::anyhow!("no device token on record for user {user_id}"))?;

    let title = "Upcoming event reminder from VolunHub";
    let body = format!("Reminder: The event '{event_title}' is happening in 24 hours!");
    let data = NotificationData {
        user_id: user_id.to_string(),
        event_id: event_id.to_string(),
        receiver: user_id.to_string(),
    }
    .into_payload(title, &body);

    notifier.send(&token, title, &body, data).await?;
    Ok(())
}
