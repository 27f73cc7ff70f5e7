//! REST adapter for the hosted realtime document database.
//!
//! Every node is addressable as `{base}/{path}.json`; filtered reads go
//! through `orderBy`/`equalTo`/`startAt`/`endAt`/`limitToFirst` query
//! parameters whose values are JSON literals.

use std::collections::BTreeMap;

use async_trait::async_trait;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{Backend, StoreError};

pub struct FirebaseBackend {
    http: Client,
    base_url: String,
    auth: Option<String>,
}

impl FirebaseBackend {
    pub fn new(base_url: impl Into<String>, auth: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            base_url,
            auth,
        }
    }

    fn node_url(&self, path: &str) -> String {
        let mut url = format!("{}/{}.json", self.base_url, path);
        if let Some(auth) = &self.auth {
            url.push_str(&format!("?auth={auth}"));
        }
        url
    }

    fn filtered_url(&self, collection: &str, params: &[(&str, String)]) -> String {
        let mut url = format!("{}/{}.json", self.base_url, collection);
        let mut separator = '?';
        for (name, value) in params {
            url.push(separator);
            separator = '&';
            url.push_str(name);
            url.push('=');
            url.push_str(&utf8_percent_encode(value, NON_ALPHANUMERIC).to_string());
        }
        if let Some(auth) = &self.auth {
            url.push(separator);
            url.push_str(&format!("auth={auth}"));
        }
        url
    }

    async fn read(&self, url: String) -> Result<Value, StoreError> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(StoreError::Status(response.status()));
        }
        Ok(response.json().await?)
    }

    async fn write(&self, request: reqwest::RequestBuilder) -> Result<(), StoreError> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(StoreError::Status(response.status()));
        }
        Ok(())
    }
}

/// Query parameter values are JSON literals; strings arrive quoted.
fn json_literal(value: &Value) -> String {
    value.to_string()
}

fn into_map(value: Value) -> BTreeMap<String, Value> {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    }
}

#[async_trait]
impl Backend for FirebaseBackend {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let value = self.read(self.node_url(path)).await?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn set(&self, path: &str, record: &Value) -> Result<(), StoreError> {
        self.write(self.http.put(self.node_url(path)).json(record))
            .await
    }

    async fn update(&self, path: &str, patch: &Value) -> Result<(), StoreError> {
        self.write(self.http.patch(self.node_url(path)).json(patch))
            .await
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.write(self.http.delete(self.node_url(path))).await
    }

    async fn push(&self, collection: &str, record: &Value) -> Result<String, StoreError> {
        #[derive(Deserialize)]
        struct PushResponse {
            name: String,
        }

        let response = self
            .http
            .post(self.node_url(collection))
            .json(record)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(StoreError::Status(response.status()));
        }
        Ok(response.json::<PushResponse>().await?.name)
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<BTreeMap<String, Value>, StoreError> {
        let url = self.filtered_url(
            collection,
            &[
                ("orderBy", format!("\"{field}\"")),
                ("equalTo", json_literal(value)),
            ],
        );
        Ok(into_map(self.read(url).await?))
    }

    async fn query_range(
        &self,
        collection: &str,
        field: &str,
        start: Option<&Value>,
        end: Option<&Value>,
        limit: Option<usize>,
    ) -> Result<BTreeMap<String, Value>, StoreError> {
        let mut params = vec![("orderBy", format!("\"{field}\""))];
        if let Some(start) = start {
            params.push(("startAt", json_literal(start)));
        }
        if let Some(end) = end {
            params.push(("endAt", json_literal(end)));
        }
        if let Some(limit) = limit {
            params.push(("limitToFirst", limit.to_string()));
        }
        Ok(into_map(self.read(self.filtered_url(collection, &params)).await?))
    }
}
