use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use serde_json::json;

use crate::auth;
use crate::router::AppState;

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/auth", post(login))
}

async fn login(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> impl IntoResponse {
    if body.username != state.config.service_username
        || body.password != state.config.service_password
    {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"auth": false, "message": "Invalid credentials"})),
        );
    }

    match auth::generate_token(&state.config.jwt_secret, &state.config.service_user_id) {
        Ok(token) => (StatusCode::OK, Json(json!({"auth": true, "token": token}))),
        Err(err) => {
            tracing::error!("failed to issue token: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"auth": false, "message": "Error generating token"})),
            )
        }
    }
}
