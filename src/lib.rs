pub mod auth;
pub mod config;
pub mod db;
pub mod entries;
pub mod error;
pub mod roster;
pub mod stats;

use std::sync::Arc;
use std::time::Duration;
use actix_web::{error::QueryPayloadError, web, HttpRequest, HttpResponse};

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{AuthGateway, AuthenticatedUser, LoginAssertion, SessionToken, TelegramVerifier, TokenService};
pub use db::{DbOperations, EntryStore, User, UserStore};
pub use roster::RosterService;

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Extractor failures get the same JSON error body as handler failures.
fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::ValidationError(err.to_string()).into()
}

/// Registers every HTTP route on an actix app.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(query_error))
        .route("/health", web::get().to(health_check))
        .route("/auth/telegram", web::get().to(auth::handlers::telegram_login))
        .route("/me", web::get().to(auth::handlers::me))
        .route("/entry", web::post().to(entries::handlers::create_entry))
        .route("/entries/history", web::get().to(entries::handlers::history));
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub auth: Arc<AuthGateway>,
    pub users: Arc<dyn UserStore>,
    pub entries: Arc<dyn EntryStore>,
}

impl AppState {
    /// Connects to Postgres, applies migrations and builds the services.
    pub async fn new(config: Settings) -> Result<Self> {
        let db = DbOperations::new_with_options(
            &config.database.url,
            config.database.max_connections,
            Duration::from_secs(config.database.acquire_timeout_secs),
        )
        .await?;
        db.run_migrations().await?;

        let db = Arc::new(db);
        Ok(Self::with_stores(config, db.clone(), db))
    }

    pub fn with_stores(
        config: Settings,
        users: Arc<dyn UserStore>,
        entries: Arc<dyn EntryStore>,
    ) -> Self {
        let auth = AuthGateway::new(&config.auth, users.clone());

        Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
            users,
            entries,
        }
    }

    pub fn roster(&self) -> RosterService {
        RosterService::new(self.users.clone())
    }
}
