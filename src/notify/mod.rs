//! Push-notification dispatch. The rest of the crate talks to the
//! [`Notifier`] trait; the FCM implementation lives in [`fcm`], and a
//! logging stand-in covers deployments without push credentials.

pub mod fcm;

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("push request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("push service returned status {status}: {detail}")]
    Rejected {
        status: reqwest::StatusCode,
        detail: String,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver to a single device. Returns the dispatch id assigned by the
    /// push service.
    async fn send(
        &self,
        device_token: &str,
        title: &str,
        body: &str,
        data: BTreeMap<String, String>,
    ) -> Result<String, NotifyError>;

    /// Deliver to every device subscribed to a topic.
    async fn send_to_topic(
        &self,
        topic: &str,
        title: &str,
        body: &str,
        data: BTreeMap<String, String>,
    ) -> Result<String, NotifyError>;

    async fn subscribe(&self, device_token: &str, topic: &str) -> Result<(), NotifyError>;
}

/// Data payload attached to every push message; the mobile client mirrors
/// it into its local notification inbox.
#[derive(Debug, Clone)]
pub struct NotificationData {
    pub user_id: String,
    pub event_id: String,
    pub receiver: String,
}

impl NotificationData {
    pub fn into_payload(self, title: &str, body: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("id".to_string(), Uuid::new_v4().to_string()),
            ("userId".to_string(), self.user_id),
            ("eventId".to_string(), self.event_id),
            ("title".to_string(), title.to_string()),
            ("message".to_string(), body.to_string()),
            ("isRead".to_string(), "false".to_string()),
            ("source".to_string(), "VolunHub".to_string()),
            ("receiver".to_string(), self.receiver),
        ])
    }
}

/// Topic names come from the parent-org grouping key; the push service
/// forbids whitespace in topic names.
pub fn topic_for(parent_org: &str) -> String {
    parent_org.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Stand-in used when push credentials are not configured: logs the intent
/// and reports success so primary operations proceed unaffected.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(
        &self,
        _device_token: &str,
        title: &str,
        _body: &str,
        _data: BTreeMap<String, String>,
    ) -> Result<String, NotifyError> {
        tracing::warn!("push delivery disabled; dropping device message: {title}");
        Ok("disabled".to_string())
    }

    async fn send_to_topic(
        &self,
        topic: &str,
        title: &str,
        _body: &str,
        _data: BTreeMap<String, String>,
    ) -> Result<String, NotifyError> {
        tracing::warn!("push delivery disabled; dropping topic message to {topic}: {title}");
        Ok("disabled".to_string())
    }

    async fn subscribe(&self, _device_token: &str, topic: &str) -> Result<(), NotifyError> {
        tracing::warn!("push delivery disabled; skipping subscription to {topic}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_replace_whitespace() {
        assert_eq!(
            topic_for("Green Lake  School District"),
            "Green_Lake_School_District"
        );
    }

    #[test]
    fn payload_carries_inbox_fields() {
        let data = NotificationData {
            user_id: "u1".into(),
            event_id: "e1".into(),
            receiver: "u1".into(),
        }
        .into_payload("Title", "Body");

        assert_eq!(data["userId"], "u1");
        assert_eq!(data["eventId"], "e1");
        assert_eq!(data["isRead"], "false");
        assert_eq!(data["source"], "VolunHub");
        assert!(!data["id"].is_empty());
    }
}
