//! Signup reconciliation: given the full set of shifts a volunteer wants
//! for one event, compute and apply the minimal create/touch/withdraw diff
//! against the signups already on record.
//!
//! Reconciliation is idempotent on membership: running it twice with the
//! same desired set changes nothing but `updated_at` stamps. It is not
//! atomic; the store offers no multi-record transactions, so a mid-batch
//! failure leaves earlier writes applied.

use std::collections::BTreeMap;

use serde_json::json;

use crate::core::dates;
use crate::core::volunteers::VolunteerResolver;
use crate::error::ApiError;
use crate::models::Signup;
use crate::store::{Store, StoreError};

/// Reconcile `desired_shifts` for one (user, org, event). Shift ids are
/// assumed to be pre-validated against the event. Returns the volunteer
/// record key the signups hang off.
pub async fn reconcile(
    store: &Store,
    volunteers: &VolunteerResolver,
    user_id: &str,
    org_id: &str,
    event_id: &str,
    desired_shifts: &[String],
) -> Result<String, ApiError> {
    let volunteer_id = volunteers.resolve_or_create(user_id, org_id).await?;

    // Non-withdrawn signups for this event, keyed by shift.
    let signups: BTreeMap<String, Signup> = store
        .query("signups", "volunteer_id", volunteer_id.as_str())
        .await?;
    let mut existing: BTreeMap<String, String> = signups
        .into_iter()
        .filter(|(_, signup)| signup.event_id == event_id && !signup.withdrawal)
        .map(|(key, signup)| (signup.shift_id, key))
        .collect();

    let now = dates::now_iso();

    for shift_id in desired_shifts {
        match existing.remove(shift_id) {
            // Already signed up: touch the stamp, membership unchanged.
            Some(signup_id) => {
                store
                    .update(&format!("signups/{signup_id}"), json!({"updated_at": now}))
                    .await
                    .map_err(partial)?;
            }
            None => {
                let signup = Signup {
                    volunteer_id: volunteer_id.clone(),
                    event_id: event_id.to_string(),
                    shift_id: shift_id.clone(),
                    sign_up_date_time: Some(now.clone()),
                    withdrawal: false,
                    withdrawal_date_time: None,
                    created_at: Some(now.clone()),
                    updated_at: Some(now.clone()),
                };
                store.push("signups", &signup).await.map_err(partial)?;
            }
        }
    }

    // Whatever the volunteer no longer wants is withdrawn, never deleted.
    for signup_id in existing.into_values() {
        store
            .update(
                &format!("signups/{signup_id}"),
                json!({"withdrawal": true, "withdrawal_date_time": now}),
            )
            .await
            .map_err(partial)?;
    }

    Ok(volunteer_id)
}

fn partial(source: StoreError) -> ApiError {
    ApiError::partial("event signup reconciliation", source)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::store::memory::MemoryBackend;
    use crate::store::{Backend, StoreError};

    use super::*;

    fn setup() -> (Store, VolunteerResolver) {
        let store = Store::new(Arc::new(MemoryBackend::new()));
        let resolver = VolunteerResolver::new(store.clone());
        (store, resolver)
    }

    async fn active_shifts(store: &Store, volunteer_id: &str, event_id: &str) -> BTreeSet<String> {
        let signups: BTreeMap<String, Signup> = store
            .query("signups", "volunteer_id", volunteer_id)
            .await
            .unwrap();
        signups
            .into_values()
            .filter(|signup| signup.event_id == event_id && !signup.withdrawal)
            .map(|signup| signup.shift_id)
            .collect()
    }

    fn shifts(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[tokio::test]
    async fn creates_volunteer_and_signups() {
        let (store, resolver) = setup();
        let volunteer_id = reconcile(&store, &resolver, "u1", "org1", "e1", &shifts(&["a", "b"]))
            .await
            .unwrap();

        assert_eq!(
            active_shifts(&store, &volunteer_id, "e1").await,
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );
    }

    #[tokio::test]
    async fn repeat_reconcile_is_idempotent_on_membership() {
        let (store, resolver) = setup();
        let desired = shifts(&["a", "b"]);
        let volunteer_id = reconcile(&store, &resolver, "u1", "org1", "e1", &desired)
            .await
            .unwrap();
        let again = reconcile(&store, &resolver, "u1", "org1", "e1", &desired)
            .await
            .unwrap();
        assert_eq!(volunteer_id, again);

        // No duplicates: two signup records total, both still active.
        let signups: BTreeMap<String, Signup> = store
            .query("signups", "volunteer_id", volunteer_id.as_str())
            .await
            .unwrap();
        assert_eq!(signups.len(), 2);
        assert!(signups.values().all(|signup| !signup.withdrawal));
    }

    #[tokio::test]
    async fn transition_leaves_exactly_the_new_set() {
        let (store, resolver) = setup();
        let volunteer_id = reconcile(&store, &resolver, "u1", "org1", "e1", &shifts(&["a", "b"]))
            .await
            .unwrap();

        let signups_before: BTreeMap<String, Signup> = store
            .query("signups", "volunteer_id", volunteer_id.as_str())
            .await
            .unwrap();
        let kept_key = signups_before
            .iter()
            .find(|(_, signup)| signup.shift_id == "b")
            .map(|(key, _)| key.clone())
            .unwrap();

        reconcile(&store, &resolver, "u1", "org1", "e1", &shifts(&["b", "c"]))
            .await
            .unwrap();

        assert_eq!(
            active_shifts(&store, &volunteer_id, "e1").await,
            BTreeSet::from(["b".to_string(), "c".to_string()])
        );

        // The kept signup retained its identity rather than being recreated.
        let kept: Signup = store
            .get(&format!("signups/{kept_key}"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.shift_id, "b");
        assert!(!kept.withdrawal);

        // The dropped shift was withdrawn in place, with a stamp.
        let signups_after: BTreeMap<String, Signup> = store
            .query("signups", "volunteer_id", volunteer_id.as_str())
            .await
            .unwrap();
        let withdrawn: Vec<Signup> = signups_after
            .into_values()
            .filter(|signup| signup.withdrawal)
            .collect();
        assert_eq!(withdrawn.len(), 1);
        assert_eq!(withdrawn[0].shift_id, "a");
        assert!(withdrawn[0].withdrawal_date_time.is_some());
    }

    #[tokio::test]
    async fn empty_desired_set_withdraws_everything() {
        let (store, resolver) = setup();
        let volunteer_id = reconcile(&store, &resolver, "u1", "org1", "e1", &shifts(&["a", "b"]))
            .await
            .unwrap();

        reconcile(&store, &resolver, "u1", "org1", "e1", &[])
            .await
            .unwrap();
        assert!(active_shifts(&store, &volunteer_id, "e1").await.is_empty());
    }

    #[tokio::test]
    async fn other_events_are_untouched() {
        let (store, resolver) = setup();
        let volunteer_id = reconcile(&store, &resolver, "u1", "org1", "e1", &shifts(&["a"]))
            .await
            .unwrap();
        reconcile(&store, &resolver, "u1", "org1", "e2", &shifts(&["x"]))
            .await
            .unwrap();

        // Clearing e2 must not withdraw the e1 signup.
        reconcile(&store, &resolver, "u1", "org1", "e2", &[])
            .await
            .unwrap();
        assert_eq!(
            active_shifts(&store, &volunteer_id, "e1").await,
            BTreeSet::from(["a".to_string()])
        );
    }

    /// Backend that starts failing once its write allowance is spent;
    /// reads always succeed.
    struct FlakyBackend {
        inner: MemoryBackend,
        writes_left: AtomicI64,
    }

    impl FlakyBackend {
        fn charge(&self) -> Result<(), StoreError> {
            if self.writes_left.fetch_sub(1, Ordering::SeqCst) <= 0 {
                return Err(StoreError::Status(
                    reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                ));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Backend for FlakyBackend {
        async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
            self.inner.get(path).await
        }
        async fn set(&self, path: &str, record: &Value) -> Result<(), StoreError> {
            self.charge()?;
            self.inner.set(path, record).await
        }
        async fn update(&self, path: &str, patch: &Value) -> Result<(), StoreError> {
            self.charge()?;
            self.inner.update(path, patch).await
        }
        async fn remove(&self, path: &str) -> Result<(), StoreError> {
            self.charge()?;
            self.inner.remove(path).await
        }
        async fn push(&self, collection: &str, record: &Value) -> Result<String, StoreError> {
            self.charge()?;
            self.inner.push(collection, record).await
        }
        async fn query(
            &self,
            collection: &str,
            field: &str,
            value: &Value,
        ) -> Result<BTreeMap<String, Value>, StoreError> {
            self.inner.query(collection, field, value).await
        }
        async fn query_range(
            &self,
            collection: &str,
            field: &str,
            start: Option<&Value>,
            end: Option<&Value>,
            limit: Option<usize>,
        ) -> Result<BTreeMap<String, Value>, StoreError> {
            self.inner
                .query_range(collection, field, start, end, limit)
                .await
        }
    }

    #[tokio::test]
    async fn mid_batch_failure_keeps_earlier_writes() {
        // Allowance covers the volunteer create and the first signup; the
        // second signup write fails.
        let store = Store::new(Arc::new(FlakyBackend {
            inner: MemoryBackend::new(),
            writes_left: AtomicI64::new(2),
        }));
        let resolver = VolunteerResolver::new(store.clone());

        let err = reconcile(&store, &resolver, "u1", "org1", "e1", &shifts(&["a", "b"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Partial { .. }));

        // The first signup survived; nothing rolled it back.
        let signups: BTreeMap<String, Signup> = store.get_map("signups").await.unwrap();
        assert_eq!(signups.len(), 1);
        assert_eq!(signups.values().next().unwrap().shift_id, "a");
    }
}
