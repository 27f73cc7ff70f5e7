use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use volunhub::config::Config;
use volunhub::notify::{DisabledNotifier, Notifier, fcm::FcmClient};
use volunhub::router::{AppState, create_router, shutdown_signal};
use volunhub::store::{Store, firebase::FirebaseBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.rust_log.clone()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = Store::new(Arc::new(FirebaseBackend::new(
        &config.database_url,
        config.database_auth.clone(),
    )));

    let notifier: Arc<dyn Notifier> = match (&config.fcm_project_id, &config.fcm_bearer_token) {
        (Some(project_id), Some(token)) => Arc::new(FcmClient::new(project_id, token)),
        _ => {
            tracing::warn!("FCM credentials not configured; push delivery disabled");
            Arc::new(DisabledNotifier)
        }
    };

    let port = config.port;
    let app = create_router(AppState::new(store, notifier, config));

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
