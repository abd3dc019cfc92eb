use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast;

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod router;
mod services;
mod store;

use auth::rate_limit::RateLimitState;
use config::{Config, StoreBackend};
use handlers::ws::LogChange;
use services::submit_guard::SubmitGuard;
use store::{LogStore, MemoryStore, PgStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub logs: Arc<dyn LogStore>,
    pub users: Arc<dyn UserStore>,
    pub config: Arc<Config>,
    pub events: broadcast::Sender<LogChange>,
    pub rate_limiter: RateLimitState,
    pub submit_guard: SubmitGuard,
}

impl AppState {
    pub fn new(config: Config, logs: Arc<dyn LogStore>, users: Arc<dyn UserStore>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            logs,
            users,
            config: Arc::new(config),
            events,
            rate_limiter: RateLimitState::default(),
            submit_guard: SubmitGuard::new(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "steadly_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Config::from_env().context("Invalid configuration")?;

    let state = match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .clone()
                .context("DATABASE_URL must be set when STORE_BACKEND=postgres")?;
            let pool = db::create_pool(&url)
                .await
                .context("Failed to connect to database")?;
            db::migrate(&pool)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations applied");

            let store = Arc::new(PgStore::new(pool));
            AppState::new(config, store.clone(), store)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; logs are lost on restart");
            let store = Arc::new(MemoryStore::new());
            AppState::new(config, store.clone(), store)
        }
    };

    state.rate_limiter.spawn_pruner();

    let addr = state.config.listen_addr();
    let app = router::build(state)?;

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    // Connect info feeds the auth rate limiter.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
