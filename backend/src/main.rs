use axum::{
    Router,
    http::Method,
    routing::get,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod automation;
mod config;
mod database;
mod error;
mod handlers;
mod services;

pub use error::{ApiError, ApiResult, AppError};

use automation::{
    ActionExecutor, AssignmentBalancer, Dispatcher, LeadStore, PgLeadStore, WorkflowRepository,
};
use services::audit::AuditLogger;
use services::users::PgUserDirectory;
use services::zingbot::ZingbotClient;

pub struct AppState {
    pub db_pool: sqlx::PgPool,
    pub repository: WorkflowRepository,
    pub dispatcher: Arc<Dispatcher>,
    pub audit: Arc<AuditLogger>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info,sqlx=warn".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env()?;
    let db_pool = database::create_pool(&config.database_url).await?;

    database::migrate(&db_pool).await?;

    let store = Arc::new(PgLeadStore::new(db_pool.clone()));
    let users = Arc::new(PgUserDirectory::new(db_pool.clone()));

    let balancer = Arc::new(AssignmentBalancer::new());
    match store.load_cursors().await {
        Ok(cursors) => balancer.preload(cursors),
        Err(err) => tracing::warn!("round-robin cursors unavailable, starting fresh: {err}"),
    }

    if !config.zingbot.is_configured() {
        tracing::warn!("Zingbot credentials missing, flow actions will fail");
    }
    let zingbot = ZingbotClient::new(&config.zingbot);

    let executor = Arc::new(ActionExecutor::new(
        store.clone(),
        users,
        balancer,
        zingbot,
        Duration::from_secs(config.engine.webhook_timeout_secs),
    ));

    let repository = WorkflowRepository::new(db_pool.clone());
    let audit = Arc::new(AuditLogger::new(db_pool.clone()));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(repository.clone()),
        executor,
        audit.clone(),
        Duration::from_secs(config.engine.run_deadline_secs),
    ));

    let app_state = Arc::new(AppState { db_pool, repository, dispatcher, audit });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(|| async { "LeadHub Automation API v1.0.0" }))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1/workflows", handlers::workflow_routes())
        .nest("/api/v1/events", handlers::event_routes())
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;
    tracing::info!("Server running on {}", config.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
