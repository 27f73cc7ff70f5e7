//! In-memory store backend: a process-local JSON tree mirroring the layout
//! of the hosted database. Backs every test and doubles as a zero-setup
//! development store.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{self, AtomicU64};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{Backend, StoreError};

#[derive(Default)]
pub struct MemoryBackend {
    root: Mutex<Map<String, Value>>,
    next_key: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|part| !part.is_empty()).collect()
}

fn lookup<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = segments(path).into_iter();
    let mut node = root.get(parts.next()?)?;
    for part in parts {
        node = node.as_object()?.get(part)?;
    }
    Some(node)
}

/// Walk to the parent object of `path`, creating intermediate objects, and
/// return it together with the final key. Empty paths yield nothing.
fn parent_entry<'a>(
    root: &'a mut Map<String, Value>,
    path: &str,
) -> Option<(&'a mut Map<String, Value>, String)> {
    let mut parts = segments(path);
    let last = parts.pop()?;
    let mut node = root;
    for part in parts {
        let child = node
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !child.is_object() {
            *child = Value::Object(Map::new());
        }
        let Value::Object(map) = child else {
            return None;
        };
        node = map;
    }
    Some((node, last.to_string()))
}

/// The hosted store never persists nulls: writing one deletes the child.
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, child)| !child.is_null())
                .map(|(key, child)| (key, strip_nulls(child)))
                .collect(),
        ),
        other => other,
    }
}

/// Query-order comparison for indexed field values: numbers numerically,
/// strings lexicographically, everything else unordered.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64().partial_cmp(&b.as_f64()),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn collection_entries(root: &Map<String, Value>, collection: &str) -> Vec<(String, Value)> {
    match lookup(root, collection) {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        _ => Vec::new(),
    }
}

fn lock(backend: &MemoryBackend) -> std::sync::MutexGuard<'_, Map<String, Value>> {
    backend.root.lock().expect("memory store mutex poisoned")
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let root = lock(self);
        Ok(lookup(&root, path).filter(|value| !value.is_null()).cloned())
    }

    async fn set(&self, path: &str, record: &Value) -> Result<(), StoreError> {
        let mut root = lock(self);
        if let Some((parent, key)) = parent_entry(&mut root, path) {
            parent.insert(key, strip_nulls(record.clone()));
        }
        Ok(())
    }

    async fn update(&self, path: &str, patch: &Value) -> Result<(), StoreError> {
        let mut root = lock(self);
        let Some((parent, key)) = parent_entry(&mut root, path) else {
            return Ok(());
        };
        let target = parent
            .entry(key)
            .or_insert_with(|| Value::Object(Map::new()));
        if !target.is_object() {
            *target = Value::Object(Map::new());
        }
        if let (Value::Object(target), Value::Object(patch)) = (target, patch) {
            for (field, value) in patch {
                if value.is_null() {
                    target.remove(field);
                } else {
                    target.insert(field.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        let mut root = lock(self);
        if let Some((parent, key)) = parent_entry(&mut root, path) {
            parent.remove(&key);
        }
        Ok(())
    }

    async fn push(&self, collection: &str, record: &Value) -> Result<String, StoreError> {
        let n = self.next_key.fetch_add(1, atomic::Ordering::Relaxed);
        let key = format!("-K{n:012}");
        let mut root = lock(self);
        if let Some((parent, last)) = parent_entry(&mut root, &format!("{collection}/{key}")) {
            parent.insert(last, strip_nulls(record.clone()));
        }
        Ok(key)
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<BTreeMap<String, Value>, StoreError> {
        let root = lock(self);
        Ok(collection_entries(&root, collection)
            .into_iter()
            .filter(|(_, record)| record.get(field).unwrap_or(&Value::Null) == value)
            .collect())
    }

    async fn query_range(
        &self,
        collection: &str,
        field: &str,
        start: Option<&Value>,
        end: Option<&Value>,
        limit: Option<usize>,
    ) -> Result<BTreeMap<String, Value>, StoreError> {
        let root = lock(self);
        let mut matched: Vec<(String, Value)> = collection_entries(&root, collection)
            .into_iter()
            .filter(|(_, record)| {
                let field_value = record.get(field).unwrap_or(&Value::Null);
                let after_start = start.is_none_or(|bound| {
                    matches!(
                        compare(field_value, bound),
                        Some(Ordering::Greater | Ordering::Equal)
                    )
                });
                let before_end = end.is_none_or(|bound| {
                    matches!(
                        compare(field_value, bound),
                        Some(Ordering::Less | Ordering::Equal)
                    )
                });
                after_start && before_end
            })
            .collect();
        // limitToFirst applies in field order, not key order.
        matched.sort_by(|(a_key, a), (b_key, b)| {
            let a_field = a.get(field).unwrap_or(&Value::Null);
            let b_field = b.get(field).unwrap_or(&Value::Null);
            compare(a_field, b_field)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a_key.cmp(b_key))
        });
        if let Some(limit) = limit {
            matched.truncate(limit);
        }
        Ok(matched.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn set_get_remove_navigate_paths() {
        let store = MemoryBackend::new();
        store
            .set("users/u1", &json!({"email": "a@b.org"}))
            .await
            .unwrap();

        let record = store.get("users/u1").await.unwrap().unwrap();
        assert_eq!(record["email"], "a@b.org");
        assert!(store.get("users/missing").await.unwrap().is_none());

        store.remove("users/u1").await.unwrap();
        assert!(store.get("users/u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_drops_null_fields() {
        let store = MemoryBackend::new();
        store
            .set("users/u1", &json!({"email": null, "role": "Volunteer"}))
            .await
            .unwrap();

        let record = store.get("users/u1").await.unwrap().unwrap();
        assert!(record.get("email").is_none());
        assert_eq!(record["role"], "Volunteer");
    }

    #[tokio::test]
    async fn update_merges_and_null_deletes() {
        let store = MemoryBackend::new();
        store
            .set("volunteers/v1", &json!({"status": "Active", "note": "x"}))
            .await
            .unwrap();
        store
            .update(
                "volunteers/v1",
                &json!({"status": "withdrawal", "note": null}),
            )
            .await
            .unwrap();

        let record = store.get("volunteers/v1").await.unwrap().unwrap();
        assert_eq!(record["status"], "withdrawal");
        assert!(record.get("note").is_none());
    }

    #[tokio::test]
    async fn push_keys_sort_in_creation_order() {
        let store = MemoryBackend::new();
        let first = store.push("signups", &json!({"n": 1})).await.unwrap();
        let second = store.push("signups", &json!({"n": 2})).await.unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn query_matches_on_indexed_field() {
        let store = MemoryBackend::new();
        store
            .set("signups/s1", &json!({"volunteer_id": "v1"}))
            .await
            .unwrap();
        store
            .set("signups/s2", &json!({"volunteer_id": "v2"}))
            .await
            .unwrap();

        let hits = store
            .query("signups", "volunteer_id", &json!("v1"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits.contains_key("s1"));

        let empty = store
            .query("signups", "volunteer_id", &json!("v9"))
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn query_range_is_inclusive_and_limited() {
        let store = MemoryBackend::new();
        for (key, date) in [
            ("e1", "2025-01-01T00:00:00.000Z"),
            ("e2", "2025-02-01T00:00:00.000Z"),
            ("e3", "2025-03-01T00:00:00.000Z"),
        ] {
            store
                .set(&format!("events/{key}"), &json!({"start_date": date}))
                .await
                .unwrap();
        }

        let hits = store
            .query_range(
                "events",
                "start_date",
                Some(&json!("2025-01-01T00:00:00.000Z")),
                Some(&json!("2025-02-01T00:00:00.000Z")),
                None,
            )
            .await
            .unwrap();
        assert_eq!(
            hits.keys().collect::<Vec<_>>(),
            vec![&"e1".to_string(), &"e2".to_string()]
        );

        let capped = store
            .query_range("events", "start_date", None, None, Some(2))
            .await
            .unwrap();
        assert_eq!(capped.len(), 2);
        assert!(capped.contains_key("e1") && capped.contains_key("e2"));
    }
}
