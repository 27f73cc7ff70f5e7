use std::env;

/// Runtime configuration, loaded once at startup. A `.env` file is honored
/// when present so local development matches the deployed environment.
#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Base URL of the realtime document database, e.g.
    /// `https://volunhub-default-rtdb.firebaseio.com`.
    pub database_url: String,
    /// Optional database auth token appended to every REST call.
    pub database_auth: Option<String>,
    pub jwt_secret: String,
    pub api_key: String,
    pub service_username: String,
    pub service_password: String,
    /// User id embedded in tokens issued to the service login.
    pub service_user_id: String,
    pub fcm_project_id: Option<String>,
    pub fcm_bearer_token: Option<String>,
    /// Hour of day (UTC) at which day-before event reminders fire.
    pub reminder_hour: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let port = env::var("PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(3000);
        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "debug".into());
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL is not set in .env file");
        let database_auth = env::var("DATABASE_AUTH_TOKEN").ok();
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET should be provided");
        let api_key = env::var("API_KEY").expect("API_KEY should be provided");
        let service_username =
            env::var("SERVICE_USERNAME").expect("SERVICE_USERNAME should be provided");
        let service_password =
            env::var("SERVICE_PASSWORD").expect("SERVICE_PASSWORD should be provided");
        let service_user_id =
            env::var("SERVICE_USER_ID").expect("SERVICE_USER_ID should be provided");
        let fcm_project_id = env::var("FCM_PROJECT_ID").ok();
        let fcm_bearer_token = env::var("FCM_BEARER_TOKEN").ok();
        let reminder_hour = env::var("REMINDER_HOUR")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(9);

        Ok(Self {
            port,
            rust_log,
            database_url,
            database_auth,
            jwt_secret,
            api_key,
            service_username,
            service_password,
            service_user_id,
            fcm_project_id,
            fcm_bearer_token,
            reminder_hour,
        })
    }
}
