//! Home-organization lookup and assignment. Responses here use the
//! camelCase field names the mobile client's profile screens expect.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::models::{OrgUser, Organization, User, UserRole};
use crate::notify::topic_for;
use crate::router::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/userhomeorg/{id}/check-homeorg", get(check_home_org))
        .route("/userhomeorg/{id}", get(get_home_org))
        .route("/setuserhomeorg/{user_id}", put(set_home_org))
}

async fn load_user(state: &AppState, user_id: &str) -> Result<User, ApiError> {
    let user: Option<User> = state.store.get(&format!("users/{user_id}")).await?;
    user.ok_or_else(|| ApiError::not_found("User not found"))
}

async fn check_home_org(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user = load_user(&state, &user_id).await?;

    let org_id = user
        .school_home_org_id
        .clone()
        .filter(|org_id| !org_id.trim().is_empty())
        .ok_or_else(|| ApiError::validation("Invalid or missing school home org"))?;

    let org: Option<Organization> = state.store.get(&format!("organizations/{org_id}")).await?;
    let org = org.ok_or_else(|| ApiError::not_found("Organization not found"))?;

    Ok(Json(json!({
        "userId": user_id,
        "username": user.full_name(),
        "orgId": org_id,
        "role": user.role,
        "orgName": org.name,
    })))
}

async fn get_home_org(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user = load_user(&state, &user_id).await?;

    let org_id = user
        .school_home_org_id
        .clone()
        .filter(|org_id| !org_id.trim().is_empty());
    let Some(org_id) = org_id else {
        // No home org on record yet; the client treats this as "pick one".
        return Ok(Json(json!({
            "userId": user_id,
            "username": user.full_name(),
            "orgId": null,
            "role": null,
            "orgName": null,
            "userRoleInOrg": null,
            "userIdInOrg": null,
            "parentOrg": null,
        })));
    };

    let org: Option<Organization> = state.store.get(&format!("organizations/{org_id}")).await?;

    // Organization-role users also surface their org_users entry so the
    // client knows whether they administer the org.
    let mut role_in_org = None;
    let mut org_user_id = None;
    if user.role == Some(UserRole::Organization) {
        let entries: BTreeMap<String, OrgUser> = state
            .store
            .query("org_users", "user_id", user_id.as_str())
            .await?;
        if entries.is_empty() {
            return Err(ApiError::not_found("User not found in org_users"));
        }
        let entry = entries
            .into_iter()
            .find(|(_, entry)| entry.organization_id == org_id)
            .ok_or_else(|| {
                ApiError::not_found(format!(
                    "No role found for user {user_id} in organization {org_id}"
                ))
            })?;
        role_in_org = entry.1.role_in_org;
        org_user_id = Some(entry.0);
    }

    Ok(Json(json!({
        "userId": user_id,
        "username": user.full_name(),
        "orgId": org_id,
        "role": user.role,
        "orgName": org.as_ref().map(|org| org.name.clone()),
        "userRoleInOrg": role_in_org,
        "userIdInOrg": org_user_id,
        "parentOrg": org.and_then(|org| org.parent_org),
    })))
}

#[derive(Deserialize)]
struct SetHomeOrgRequest {
    #[serde(rename = "orgId")]
    org_id: Option<String>,
    role: Option<String>,
    #[serde(rename = "createdAt")]
    created_at: Option<String>,
    #[serde(rename = "createdBy")]
    created_by: Option<String>,
    #[serde(rename = "orgRole")]
    org_role: Option<String>,
}

async fn set_home_org(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<SetHomeOrgRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(org_id), Some(role), Some(created_at), Some(created_by)) =
        (body.org_id, body.role, body.created_at, body.created_by)
    else {
        return Err(ApiError::validation(
            "Missing required fields in request body",
        ));
    };

    let role = match role.as_str() {
        "Volunteer" => UserRole::Volunteer,
        "Organization" => UserRole::Organization,
        _ => return Err(ApiError::validation("Invalid role")),
    };

    let org: Option<Organization> = state.store.get(&format!("organizations/{org_id}")).await?;
    let org = org.ok_or_else(|| ApiError::not_found("Organization not found"))?;
    let user = load_user(&state, &user_id).await?;

    state
        .store
        .update(
            &format!("users/{user_id}"),
            json!({"school_home_org_id": org_id, "role": role}),
        )
        .await?;

    let mut role_in_org = None;
    match role {
        UserRole::Organization => {
            let org_role = match body.org_role.as_deref() {
                Some("Admin") => "Admin",
                Some("General") => "General",
                _ => return Err(ApiError::validation("Invalid organization role")),
            };
            role_in_org = Some(org_role);
            upsert_org_user(&state, &user_id, &org_id, org_role, &created_at, &created_by).await?;
        }
        UserRole::Volunteer => {
            state.volunteers.resolve_or_create(&user_id, &org_id).await?;

            // Topic subscription is best-effort; a push hiccup must not
            // fail the role change.
            if let (Some(parent_org), Some(token)) = (org.parent_org.as_deref(), user.token.as_deref())
            {
                if let Err(err) = state
                    .notifier
                    .subscribe(token, &topic_for(parent_org))
                    .await
                {
                    tracing::error!("failed to subscribe device to org topic: {err}");
                }
            }
        }
    }

    Ok(Json(json!({
        "userId": user_id,
        "username": user.full_name(),
        "orgId": org_id,
        "role": role,
        "orgName": org.name,
        "user_role_in_Org": role_in_org,
    })))
}

/// At most one org_users entry per (user, organization) pair, maintained
/// by query-then-upsert.
async fn upsert_org_user(
    state: &AppState,
    user_id: &str,
    org_id: &str,
    org_role: &str,
    created_at: &str,
    created_by: &str,
) -> Result<(), ApiError> {
    let entries: BTreeMap<String, OrgUser> = state
        .store
        .query("org_users", "user_id", user_id)
        .await?;
    let existing = entries
        .into_iter()
        .find(|(_, entry)| entry.organization_id == org_id);

    match existing {
        Some((entry_id, _)) => {
            state
                .store
                .update(
                    &format!("org_users/{entry_id}"),
                    json!({
                        "updated_at": created_at,
                        "updated_by": created_by,
                        "user_role_in_Org": org_role,
                    }),
                )
                .await?;
        }
        None => {
            state
                .store
                .push(
                    "org_users",
                    &json!({
                        "created_at": created_at,
                        "created_by": created_by,
                        "organization_id": org_id,
                        "updated_at": created_at,
                        "updated_by": created_by,
                        "user_id": user_id,
                        "user_role_in_Org": org_role,
                    }),
                )
                .await?;
        }
    }
    Ok(())
}
