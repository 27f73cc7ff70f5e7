use std::sync::Arc;

use axum::{Router, middleware};
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth;
use crate::config::Config;
use crate::core::volunteers::VolunteerResolver;
use crate::notify::Notifier;
use crate::routes;
use crate::store::Store;

/// Shared per-request context. Every collaborator is an explicit handle;
/// nothing module-global.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub notifier: Arc<dyn Notifier>,
    pub volunteers: VolunteerResolver,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Store, notifier: Arc<dyn Notifier>, config: Config) -> Self {
        Self {
            volunteers: VolunteerResolver::new(store.clone()),
            store,
            notifier,
            config: Arc::new(config),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    // The volunteer and organization routers sit behind the API key and
    // JWT checks; everything else matches the open surface.
    let guarded = Router::new()
        .merge(routes::volunteers::router())
        .merge(routes::organizations::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_jwt,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .merge(auth::router::router())
        .merge(routes::users::router())
        .merge(routes::causes::router())
        .merge(routes::home_org::router())
        .merge(routes::events::router())
        .merge(routes::signup::router())
        .merge(routes::attendance::router())
        .merge(routes::reports::router())
        .merge(routes::messages::router())
        .merge(routes::notifications::router())
        .merge(guarded)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
