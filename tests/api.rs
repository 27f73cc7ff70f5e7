//! End-to-end checks against the assembled router: status codes, response
//! shapes, and the guarded surface, all backed by the in-memory store.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use volunhub::config::Config;
use volunhub::notify::{Notifier, NotifyError};
use volunhub::router::{AppState, create_router};
use volunhub::store::Store;
use volunhub::store::memory::MemoryBackend;

/// Captures every dispatch instead of talking to a push service.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        device_token: &str,
        title: &str,
        _body: &str,
        _data: BTreeMap<String, String>,
    ) -> Result<String, NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((device_token.to_string(), title.to_string()));
        Ok("projects/test/messages/1".to_string())
    }

    async fn send_to_topic(
        &self,
        topic: &str,
        title: &str,
        _body: &str,
        _data: BTreeMap<String, String>,
    ) -> Result<String, NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((format!("topic:{topic}"), title.to_string()));
        Ok("projects/test/messages/2".to_string())
    }

    async fn subscribe(&self, _device_token: &str, _topic: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

fn test_config() -> Config {
    Config {
        port: 0,
        rust_log: "info".into(),
        database_url: "http://localhost".into(),
        database_auth: None,
        jwt_secret: "test-secret".into(),
        api_key: "test-api-key".into(),
        service_username: "volu".into(),
        service_password: "friend".into(),
        service_user_id: "1008".into(),
        fcm_project_id: None,
        fcm_bearer_token: None,
        reminder_hour: 9,
    }
}

fn setup() -> (Router, AppState) {
    let store = Store::new(Arc::new(MemoryBackend::new()));
    let state = AppState::new(
        store,
        Arc::new(RecordingNotifier::default()),
        test_config(),
    );
    (create_router(state.clone()), state)
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

async fn seed(state: &AppState, path: &str, record: Value) {
    state.store.set(path, &record).await.unwrap();
}

async fn seed_signup_fixture(state: &AppState) {
    seed(
        state,
        "organizations/org1",
        json!({"name": "Bothell High", "parent_org": "Green Lake District"}),
    )
    .await;
    seed(
        state,
        "users/u1",
        json!({"First Name": "Ada", "Last Name": "Lovelace", "token": "device-1"}),
    )
    .await;
    seed(
        state,
        "events/e1",
        json!({
            "title": "Park cleanup",
            "org_id": "org1",
            "org_user_id": "ou1",
            "start_date": "2099-06-01T09:00:00.000Z",
        }),
    )
    .await;
    seed(state, "shifts/sa", json!({"event_id": "e1", "name": "Morning"})).await;
    seed(state, "shifts/sb", json!({"event_id": "e1", "name": "Afternoon"})).await;
}

#[tokio::test]
async fn login_issues_token_and_rejects_bad_credentials() {
    let (app, _) = setup();

    let (status, body) = call(
        &app,
        send_json("POST", "/auth", &json!({"username": "volu", "password": "friend"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["auth"], true);
    assert!(body["token"].as_str().is_some_and(|token| !token.is_empty()));

    let (status, body) = call(
        &app,
        send_json("POST", "/auth", &json!({"username": "volu", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["auth"], false);
}

#[tokio::test]
async fn volunteers_router_is_guarded() {
    let (app, _) = setup();

    // No API key at all.
    let (status, _) = call(&app, get("/volunteers")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // API key but no bearer token.
    let request = Request::builder()
        .uri("/volunteers")
        .header("x-api-key", "test-api-key")
        .body(Body::empty())
        .unwrap();
    let (status, _) = call(&app, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Full credentials reach the handler (which 404s on the empty store).
    let (_, login) = call(
        &app,
        send_json("POST", "/auth", &json!({"username": "volu", "password": "friend"})),
    )
    .await;
    let token = login["token"].as_str().unwrap().to_string();
    let request = Request::builder()
        .uri("/volunteers")
        .header("x-api-key", "test-api-key")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No volunteers found");
}

#[tokio::test]
async fn event_signup_round_trip() {
    let (app, state) = setup();
    seed_signup_fixture(&state).await;

    let payload = json!({
        "user_id": "u1",
        "org_id": "org1",
        "event_id": "e1",
        "selected_shift_ids": [{"shift_id": "sa"}, {"shift_id": "sb"}],
    });
    let (status, body) = call(&app, send_json("POST", "/eventsignup", &payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    let volunteer_id = body["volunteer_id"].as_str().unwrap().to_string();

    // Same request again: no duplicates, same volunteer.
    let (status, body) = call(&app, send_json("POST", "/eventsignup", &payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["volunteer_id"], volunteer_id.as_str());

    let signups: BTreeMap<String, Value> = state.store.get_map("signups").await.unwrap();
    assert_eq!(signups.len(), 2);

    // Dropping a shift withdraws it but keeps the record.
    let narrowed = json!({
        "user_id": "u1",
        "org_id": "org1",
        "event_id": "e1",
        "selected_shift_ids": [{"shift_id": "sa"}],
    });
    let (status, _) = call(&app, send_json("POST", "/eventsignup", &narrowed)).await;
    assert_eq!(status, StatusCode::CREATED);

    let signups: BTreeMap<String, Value> = state.store.get_map("signups").await.unwrap();
    assert_eq!(signups.len(), 2);
    let withdrawn: Vec<_> = signups
        .values()
        .filter(|signup| signup["withdrawal"] == true)
        .collect();
    assert_eq!(withdrawn.len(), 1);
    assert_eq!(withdrawn[0]["shift_id"], "sb");
}

#[tokio::test]
async fn event_signup_validates_references() {
    let (app, state) = setup();
    seed_signup_fixture(&state).await;

    // Unknown organization.
    let (status, body) = call(
        &app,
        send_json(
            "POST",
            "/eventsignup",
            &json!({
                "user_id": "u1", "org_id": "nope", "event_id": "e1",
                "selected_shift_ids": [{"shift_id": "sa"}],
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid organization ID.");

    // Unknown user is a 404, not a 400.
    let (status, _) = call(
        &app,
        send_json(
            "POST",
            "/eventsignup",
            &json!({
                "user_id": "ghost", "org_id": "org1", "event_id": "e1",
                "selected_shift_ids": [{"shift_id": "sa"}],
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Shift from another event.
    seed(&state, "shifts/other", json!({"event_id": "e2", "name": "X"})).await;
    let (status, body) = call(
        &app,
        send_json(
            "POST",
            "/eventsignup",
            &json!({
                "user_id": "u1", "org_id": "org1", "event_id": "e1",
                "selected_shift_ids": [{"shift_id": "other"}],
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Shift ID other does not belong to Event ID e1."
    );
}

#[tokio::test]
async fn empty_inbox_is_an_empty_object() {
    let (app, _) = setup();
    let (status, body) = call(&app, get("/eventmessages?user_id=u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn report_endpoints_validate_required_params() {
    let (app, _) = setup();

    let (status, body) = call(&app, get("/uservolunteeringreport")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "user_id is required");

    let (status, _) = call(&app, get("/orgupcomingevents")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, get("/userinterestevents")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Missing user behind a valid query is a 404.
    let (status, _) = call(&app, get("/userinterestevents?userId=ghost")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_crud_round_trip() {
    let (app, _) = setup();

    let (status, body) = call(
        &app,
        send_json(
            "POST",
            "/users/u1",
            &json!({"First Name": "Ada", "Last Name": "Lovelace", "email": ""}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], "u1");

    let (status, body) = call(&app, get("/users/u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["First Name"], "Ada");
    // Empty strings were normalized away at the boundary.
    assert!(body.get("email").is_none());

    let (status, _) = call(
        &app,
        send_json("PUT", "/users/u1", &json!({"school_home_org_id": "org1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, get("/users/u1")).await;
    assert_eq!(body["school_home_org_id"], "org1");

    let (status, _) = call(
        &app,
        Request::builder()
            .method("DELETE")
            .uri("/users/u1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, get("/users/u1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn attendance_checkin_feeds_the_event_report() {
    let (app, _) = setup();

    let (status, body) = call(
        &app,
        send_json(
            "POST",
            "/attendance/checkin",
            &json!({
                "event_id": "e1",
                "user_id": "u1",
                "event_date": "2025-03-01T15:00:00.000Z",
                "event_name": "Park cleanup",
                "hours_attended": 2.5,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    // Timestamp was normalized to a day.
    assert_eq!(body["event_date"], "2025-03-01");
    assert_eq!(body["attendance_status"], "pending");
    let attendance_id = body["id"].as_str().unwrap().to_string();

    let (status, report) = call(&app, get("/attendance?event_id=e1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report[&attendance_id]["hours_attended"], 2.5);

    // Out-of-range filter empties the report without erroring.
    let (status, report) = call(
        &app,
        get("/attendance?event_id=e1&start_date=2026-01-01"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report, json!({}));

    // Approve the record and watch the status flip.
    let (status, _) = call(
        &app,
        send_json(
            "PUT",
            "/attendance/approve",
            &json!({
                &attendance_id: {
                    "attendance_status": "approved",
                    "approved_by_approver_id": "ou1",
                    "hours_approved": 2.5,
                }
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, report) = call(&app, get("/attendance?event_id=e1")).await;
    assert_eq!(report[&attendance_id]["attendance_status"], "approved");
    assert_eq!(report[&attendance_id]["hours_approved"], 2.5);
}

#[tokio::test]
async fn attendance_checkin_requires_core_fields() {
    let (app, _) = setup();
    let (status, body) = call(
        &app,
        send_json("POST", "/attendance/checkin", &json!({"event_id": "e1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "event_id, user_id, and event_date are required");
}

#[tokio::test]
async fn message_bulk_delete_matches_on_client_ids() {
    let (app, state) = setup();
    seed(
        &state,
        "messages/m1",
        json!({"id": "client-1", "userId": "u1", "title": "A"}),
    )
    .await;
    seed(
        &state,
        "messages/m2",
        json!({"id": "client-2", "userId": "u1", "title": "B"}),
    )
    .await;

    let (status, body) = call(&app, get("/eventmessages?user_id=u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_object().unwrap().len(), 2);

    let (status, _) = call(
        &app,
        send_json(
            "DELETE",
            "/eventmessages/deleteall",
            &json!({"m1": {"id": "client-1", "userId": "u1"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, get("/eventmessages?user_id=u1")).await;
    let remaining = body.as_object().unwrap();
    assert_eq!(remaining.len(), 1);
    assert!(remaining.contains_key("m2"));
}

#[tokio::test]
async fn org_rollups_flow_through_the_http_surface() {
    let (app, state) = setup();
    seed_signup_fixture(&state).await;
    seed(
        &state,
        "org_users/ou1",
        json!({"user_id": "admin1", "organization_id": "org1", "user_role_in_Org": "Admin"}),
    )
    .await;

    // One signup on shift sa.
    let (status, _) = call(
        &app,
        send_json(
            "POST",
            "/eventsignup",
            &json!({
                "user_id": "u1", "org_id": "org1", "event_id": "e1",
                "selected_shift_ids": [{"shift_id": "sa"}],
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(&app, get("/orgupcomingevents?org_user_id=ou1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["e1"]["event"]["total_signups"], 1);
    assert_eq!(body["e1"]["event"]["org_name"], "Bothell High");

    // The my-upcoming view only lists the signed-up shift.
    let (status, body) = call(&app, get("/myupcomingevents?user_id=u1")).await;
    assert_eq!(status, StatusCode::OK);
    let shifts = body["e1"]["shifts"].as_array().unwrap();
    assert_eq!(shifts.len(), 1);
    assert_eq!(shifts[0]["shift_id"], "sa");
}

#[tokio::test]
async fn event_create_requires_an_org_admin() {
    let (app, state) = setup();
    seed_signup_fixture(&state).await;
    seed(
        &state,
        "org_users/general1",
        json!({"user_id": "u9", "organization_id": "org1", "user_role_in_Org": "General"}),
    )
    .await;

    let payload = json!({
        "title": "Food drive",
        "org_id": "org1",
        "org_user_id": "general1",
        "start_date": "2099-08-01T09:00:00.000Z",
        "shifts": [{"name": "Sorting"}],
    });
    let (status, _) = call(&app, send_json("POST", "/events", &payload)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    seed(
        &state,
        "org_users/admin1",
        json!({"user_id": "u8", "organization_id": "org1", "user_role_in_Org": "Admin"}),
    )
    .await;
    let payload = json!({
        "title": "Food drive",
        "org_id": "org1",
        "org_user_id": "admin1",
        "start_date": "2099-08-01T09:00:00.000Z",
        "shifts": [{"name": "Sorting"}],
    });
    let (status, body) = call(&app, send_json("POST", "/events", &payload)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (event_id, entry) = body.as_object().unwrap().iter().next().unwrap();
    assert_eq!(entry["event"]["title"], "Food drive");
    assert_eq!(entry["shifts"][0]["event_id"], event_id.as_str());
}
