//! Access to the document-tree database.
//!
//! [`Backend`] is the raw, value-typed interface a concrete store has to
//! provide: single-record CRUD on slash-separated paths plus equality and
//! range queries on an indexed child field. [`Store`] wraps a backend and
//! adds the typed helpers the rest of the crate works with, so records are
//! decoded (and absent fields defaulted) in exactly one place.

pub mod firebase;
pub mod memory;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("database returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to decode record at {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Raw store operations. No transactions, no conditional writes; every
/// write is unconditional last-writer-wins.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, path: &str, record: &Value) -> Result<(), StoreError>;

    /// Shallow merge into the record at `path`; a null value deletes the
    /// corresponding child.
    async fn update(&self, path: &str, patch: &Value) -> Result<(), StoreError>;

    async fn remove(&self, path: &str) -> Result<(), StoreError>;

    /// Store `record` under a freshly generated key within `collection` and
    /// return the key. Generated keys sort in creation order.
    async fn push(&self, collection: &str, record: &Value) -> Result<String, StoreError>;

    /// Equality match on an indexed child field.
    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<BTreeMap<String, Value>, StoreError>;

    /// Inclusive range match on an indexed child field, optionally capped
    /// to the first `limit` records in field order.
    async fn query_range(
        &self,
        collection: &str,
        field: &str,
        start: Option<&Value>,
        end: Option<&Value>,
        limit: Option<usize>,
    ) -> Result<BTreeMap<String, Value>, StoreError>;
}

/// Shared, typed handle to the store. Cheap to clone; components receive
/// one explicitly rather than reaching for process-global state.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn Backend>,
}

impl Store {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, StoreError> {
        match self.backend.get(path).await? {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| StoreError::Decode {
                    path: path.to_string(),
                    source,
                }),
        }
    }

    pub async fn get_raw(&self, path: &str) -> Result<Option<Value>, StoreError> {
        self.backend.get(path).await
    }

    /// Fetch an entire collection as a typed map. Empty and absent
    /// collections both come back as an empty map.
    pub async fn get_map<T: DeserializeOwned>(
        &self,
        collection: &str,
    ) -> Result<BTreeMap<String, T>, StoreError> {
        match self.backend.get(collection).await? {
            None => Ok(BTreeMap::new()),
            Some(value) => decode_collection(collection, value),
        }
    }

    pub async fn set<T: Serialize>(&self, path: &str, record: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(record).map_err(StoreError::Encode)?;
        self.backend.set(path, &value).await
    }

    pub async fn update(&self, path: &str, patch: Value) -> Result<(), StoreError> {
        self.backend.update(path, &patch).await
    }

    pub async fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.backend.remove(path).await
    }

    pub async fn push<T: Serialize>(
        &self,
        collection: &str,
        record: &T,
    ) -> Result<String, StoreError> {
        let value = serde_json::to_value(record).map_err(StoreError::Encode)?;
        self.backend.push(collection, &value).await
    }

    pub async fn query<T: DeserializeOwned>(
        &self,
        collection: &str,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<BTreeMap<String, T>, StoreError> {
        let value = value.into();
        let raw = self.backend.query(collection, field, &value).await?;
        decode_map(collection, raw)
    }

    pub async fn query_raw(
        &self,
        collection: &str,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<BTreeMap<String, Value>, StoreError> {
        let value = value.into();
        self.backend.query(collection, field, &value).await
    }

    pub async fn query_range<T: DeserializeOwned>(
        &self,
        collection: &str,
        field: &str,
        start: Option<Value>,
        end: Option<Value>,
        limit: Option<usize>,
    ) -> Result<BTreeMap<String, T>, StoreError> {
        let raw = self
            .backend
            .query_range(collection, field, start.as_ref(), end.as_ref(), limit)
            .await?;
        decode_map(collection, raw)
    }
}

fn decode_collection<T: DeserializeOwned>(
    collection: &str,
    value: Value,
) -> Result<BTreeMap<String, T>, StoreError> {
    match value {
        Value::Null => Ok(BTreeMap::new()),
        Value::Object(map) => decode_map(collection, map.into_iter().collect()),
        other => Err(StoreError::Decode {
            path: collection.to_string(),
            source: <serde_json::Error as serde::de::Error>::custom(format!(
                "expected an object, got {other}"
            )),
        }),
    }
}

fn decode_map<T: DeserializeOwned>(
    collection: &str,
    raw: BTreeMap<String, Value>,
) -> Result<BTreeMap<String, T>, StoreError> {
    raw.into_iter()
        .map(|(key, value)| {
            let path = format!("{collection}/{key}");
            serde_json::from_value(value)
                .map(|record| (key, record))
                .map_err(|source| StoreError::Decode { path, source })
        })
        .collect()
}
