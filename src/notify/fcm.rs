//! FCM HTTP v1 dispatcher. Authentication uses a pre-issued OAuth bearer
//! token from the environment; minting tokens from a service account is a
//! deployment concern, not this service's.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Notifier, NotifyError};

pub struct FcmClient {
    http: Client,
    project_id: String,
    bearer_token: String,
}

impl FcmClient {
    pub fn new(project_id: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            project_id: project_id.into(),
            bearer_token: bearer_token.into(),
        }
    }

    async fn dispatch(&self, message: Value) -> Result<String, NotifyError> {
        #[derive(Deserialize)]
        struct SendResponse {
            name: String,
        }

        let url = format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.project_id
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.bearer_token)
            .json(&json!({"message": message}))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, detail });
        }
        Ok(response.json::<SendResponse>().await?.name)
    }
}

#[async_trait]
impl Notifier for FcmClient {
    async fn send(
        &self,
        device_token: &str,
        title: &str,
        body: &str,
        data: BTreeMap<String, String>,
    ) -> Result<String, NotifyError> {
        self.dispatch(json!({
            "token": device_token,
            "notification": {"title": title, "body": body},
            "data": data,
        }))
        .await
    }

    async fn send_to_topic(
        &self,
        topic: &str,
        title: &str,
        body: &str,
        data: BTreeMap<String, String>,
    ) -> Result<String, NotifyError> {
        self.dispatch(json!({
            "topic": topic,
            "notification": {"title": title, "body": body},
            "data": data,
        }))
        .await
    }

    async fn subscribe(&self, device_token: &str, topic: &str) -> Result<(), NotifyError> {
        // Topic relationships go through the instance-id API rather than
        // the messages endpoint.
        let url = format!("https://iid.googleapis.com/iid/v1/{device_token}/rel/topics/{topic}");
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.bearer_token)
            .header("access_token_auth", "true")
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, detail });
        }
        Ok(())
    }
}
