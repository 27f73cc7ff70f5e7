//! Find-or-create handling for volunteer records, the join entity between
//! a user and an organization.
//!
//! Invariant: at most one record with `status = Active` exists per
//! (user_id, org_id) pair. The store has no conditional write, so the
//! upsert serializes through a process-wide lock; concurrent instances of
//! the service can still race, which is accepted at current write volumes.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;

use crate::core::dates;
use crate::error::ApiError;
use crate::models::{Volunteer, VolunteerStatus};
use crate::store::Store;

#[derive(Clone)]
pub struct VolunteerResolver {
    store: Store,
    upsert_lock: Arc<Mutex<()>>,
}

/// What an org-join upsert did.
#[derive(Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    AlreadyActive,
    Reactivated(String),
    Created(String),
}

impl VolunteerResolver {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            upsert_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Key of the Active volunteer record for (user, org), creating one
    /// when none exists.
    pub async fn resolve_or_create(&self, user_id: &str, org_id: &str) -> Result<String, ApiError> {
        let _guard = self.upsert_lock.lock().await;
        if let Some((key, _)) = self.find_active(user_id, org_id).await? {
            return Ok(key);
        }
        let volunteer = Volunteer {
            user_id: user_id.to_string(),
            org_id: org_id.to_string(),
            status: VolunteerStatus::Active,
            org_sign_update_time: Some(dates::now_iso()),
            org_withdrawal_date_time: None,
        };
        Ok(self.store.push("volunteers", &volunteer).await?)
    }

    pub async fn find_active(
        &self,
        user_id: &str,
        org_id: &str,
    ) -> Result<Option<(String, Volunteer)>, ApiError> {
        let volunteers: BTreeMap<String, Volunteer> =
            self.store.query("volunteers", "user_id", user_id).await?;
        Ok(volunteers
            .into_iter()
            .find(|(_, volunteer)| {
                volunteer.org_id == org_id && volunteer.status == VolunteerStatus::Active
            }))
    }

    /// Every volunteer record a user holds, across organizations and
    /// regardless of status.
    pub async fn all_for_user(
        &self,
        user_id: &str,
    ) -> Result<BTreeMap<String, Volunteer>, ApiError> {
        Ok(self.store.query("volunteers", "user_id", user_id).await?)
    }

    /// Keys of the user's Active volunteer identities.
    pub async fn active_for_user(&self, user_id: &str) -> Result<Vec<String>, ApiError> {
        Ok(self
            .all_for_user(user_id)
            .await?
            .into_iter()
            .filter(|(_, volunteer)| volunteer.status == VolunteerStatus::Active)
            .map(|(key, _)| key)
            .collect())
    }

    /// Org-join upsert: a withdrawn record for the same pair is flipped
    /// back to Active rather than duplicated.
    pub async fn join_org(&self, user_id: &str, org_id: &str) -> Result<JoinOutcome, ApiError> {
        let _guard = self.upsert_lock.lock().await;
        let volunteers: BTreeMap<String, Volunteer> =
            self.store.query("volunteers", "user_id", user_id).await?;

        let mut withdrawn_key = None;
        for (key, volunteer) in &volunteers {
            if volunteer.org_id != org_id {
                continue;
            }
            if volunteer.status == VolunteerStatus::Active {
                return Ok(JoinOutcome::AlreadyActive);
            }
            withdrawn_key = Some(key.clone());
        }

        if let Some(key) = withdrawn_key {
            self.store
                .update(
                    &format!("volunteers/{key}"),
                    json!({
                        "status": VolunteerStatus::Active,
                        "org_sign_update_time": dates::now_iso(),
                        "org_withdrawal_date_time": null,
                    }),
                )
                .await?;
            return Ok(JoinOutcome::Reactivated(key));
        }

        let volunteer = Volunteer {
            user_id: user_id.to_string(),
            org_id: org_id.to_string(),
            status: VolunteerStatus::Active,
            org_sign_update_time: Some(dates::now_iso()),
            org_withdrawal_date_time: None,
        };
        Ok(JoinOutcome::Created(
            self.store.push("volunteers", &volunteer).await?,
        ))
    }

    /// Flip the Active record for (user, org) to withdrawal. Returns the
    /// record key, or `None` when there was nothing to withdraw.
    pub async fn withdraw(&self, user_id: &str, org_id: &str) -> Result<Option<String>, ApiError> {
        let Some((key, _)) = self.find_active(user_id, org_id).await? else {
            return Ok(None);
        };
        self.store
            .update(
                &format!("volunteers/{key}"),
                json!({
                    "status": VolunteerStatus::Withdrawal,
                    "org_withdrawal_date_time": dates::now_iso(),
                }),
            )
            .await?;
        Ok(Some(key))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::store::memory::MemoryBackend;

    use super::*;

    fn resolver() -> VolunteerResolver {
        VolunteerResolver::new(Store::new(Arc::new(MemoryBackend::new())))
    }

    #[tokio::test]
    async fn resolve_or_create_is_stable_across_calls() {
        let resolver = resolver();
        let first = resolver.resolve_or_create("u1", "org1").await.unwrap();
        let second = resolver.resolve_or_create("u1", "org1").await.unwrap();
        assert_eq!(first, second);

        let actives = resolver.active_for_user("u1").await.unwrap();
        assert_eq!(actives, vec![first]);
    }

    #[tokio::test]
    async fn distinct_orgs_get_distinct_records() {
        let resolver = resolver();
        let a = resolver.resolve_or_create("u1", "org1").await.unwrap();
        let b = resolver.resolve_or_create("u1", "org2").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn join_reactivates_a_withdrawn_record() {
        let resolver = resolver();
        let key = resolver.resolve_or_create("u1", "org1").await.unwrap();
        resolver.withdraw("u1", "org1").await.unwrap();

        match resolver.join_org("u1", "org1").await.unwrap() {
            JoinOutcome::Reactivated(reused) => assert_eq!(reused, key),
            other => panic!("expected reactivation, got {other:?}"),
        }
        // Still exactly one active record for the pair.
        assert_eq!(resolver.active_for_user("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn join_short_circuits_when_already_active() {
        let resolver = resolver();
        resolver.resolve_or_create("u1", "org1").await.unwrap();
        assert_eq!(
            resolver.join_org("u1", "org1").await.unwrap(),
            JoinOutcome::AlreadyActive
        );
    }

    #[tokio::test]
    async fn withdraw_without_active_record_is_a_noop() {
        let resolver = resolver();
        assert_eq!(resolver.withdraw("u1", "org1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn withdraw_stamps_the_record() {
        let resolver = resolver();
        let key = resolver.resolve_or_create("u1", "org1").await.unwrap();
        resolver.withdraw("u1", "org1").await.unwrap();

        let stored: Volunteer = resolver
            .store
            .get(&format!("volunteers/{key}"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, VolunteerStatus::Withdrawal);
        assert!(stored.org_withdrawal_date_time.is_some());
    }
}
