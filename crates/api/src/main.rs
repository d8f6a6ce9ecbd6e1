//! SkyCast API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use skycast_common::config::AppConfig;
use skycast_common::db;
use skycast_common::redis_pool::create_redis_pool;
use skycast_notifier::forecast::ForecastClient;
use skycast_notifier::users::UserClient;
use skycast_notifier::NotificationService;
use skycast_queue::{DurableQueue, RedisBroker};
use skycast_scheduler::validator::LookupValidator;
use skycast_scheduler::{PgScheduleStore, ScheduleService};

use skycast_api::routes::create_router;
use skycast_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("skycast_api=debug,skycast_scheduler=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting SkyCast API server...");

    let config = AppConfig::from_env()?;

    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Database pool created");

    let redis = create_redis_pool(&config.redis_url).await?;
    tracing::info!("Redis connection established");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    let users = Arc::new(UserClient::new(http.clone(), &config.user_service_url));
    let forecast = Arc::new(ForecastClient::new(http.clone(), &config.forecast_service_url));
    let notifications = Arc::new(NotificationService::from_config(
        users.clone(),
        forecast.clone(),
        &config,
        http,
    )?);

    let schedules = Arc::new(ScheduleService::new(
        Arc::new(LookupValidator::new(users, forecast)),
        Arc::new(PgScheduleStore::new(pool)),
        notifications.clone(),
    ));
    let notification_queue =
        DurableQueue::new(Arc::new(RedisBroker::new(redis, &config.notification_queue)));

    // Build application state
    let state = AppState::new(schedules, notifications, notification_queue);

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Received shutdown signal, stopping gracefully...");
        })
        .await?;

    Ok(())
}
