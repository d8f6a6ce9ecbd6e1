//! SkyCast worker: recovery job plus the schedule and notification consumers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use skycast_common::config::AppConfig;
use skycast_common::db;
use skycast_common::redis_pool::create_redis_pool;
use skycast_notifier::forecast::ForecastClient;
use skycast_notifier::users::UserClient;
use skycast_notifier::NotificationService;
use skycast_queue::{Consumer, DurableQueue, RedisBroker};
use skycast_scheduler::lease::{PollerLease, RedisLease, SingleInstanceLease};
use skycast_scheduler::validator::LookupValidator;
use skycast_scheduler::{PgScheduleStore, RecoveryJob, SchedulePublisher, ScheduleService, ScheduleStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("skycast_scheduler=info,skycast_queue=info,skycast_notifier=info")
        }))
        .json()
        .init();

    tracing::info!("SkyCast worker starting...");

    let config = AppConfig::from_env()?;

    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(&pool).await?;

    let redis = create_redis_pool(&config.redis_url).await?;
    tracing::info!("Redis connection established");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    // Collaborators
    let users = Arc::new(UserClient::new(http.clone(), &config.user_service_url));
    let forecast = Arc::new(ForecastClient::new(http.clone(), &config.forecast_service_url));
    let notifications = Arc::new(NotificationService::from_config(
        users.clone(),
        forecast.clone(),
        &config,
        http,
    )?);

    let store: Arc<dyn ScheduleStore> = Arc::new(PgScheduleStore::new(pool));
    let schedules = Arc::new(ScheduleService::new(
        Arc::new(LookupValidator::new(users, forecast)),
        store.clone(),
        notifications.clone(),
    ));

    // Queues
    let schedule_queue = DurableQueue::new(Arc::new(RedisBroker::new(
        redis.clone(),
        &config.schedule_queue,
    )));
    let notification_queue = DurableQueue::new(Arc::new(RedisBroker::new(
        redis.clone(),
        &config.notification_queue,
    )));

    let lease: Arc<dyn PollerLease> = if config.poller_lease_enabled {
        Arc::new(RedisLease::new(
            redis,
            &config.schedule_queue,
            config.job_interval() * 2,
        ))
    } else {
        tracing::warn!("Poller lease disabled; run a single worker to avoid duplicate dispatch");
        Arc::new(SingleInstanceLease)
    };

    let publisher = Arc::new(SchedulePublisher::new(store.clone(), schedule_queue.clone()));
    let job = RecoveryJob::new(store, publisher, lease, config.job_interval());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut workers = Consumer::new(schedule_queue, schedules)
        .with_instance(&config.worker_instance)
        .with_poll_interval(config.queue_poll_interval())
        .start(config.schedule_consumers, shutdown_rx.clone())
        .await?;
    workers.extend(
        Consumer::new(notification_queue, notifications)
            .with_instance(&config.worker_instance)
            .with_poll_interval(config.queue_poll_interval())
            .start(config.notification_consumers, shutdown_rx.clone())
            .await?,
    );

    let job_handle = tokio::spawn(async move { job.run(shutdown_rx).await });

    tracing::info!(consumers = workers.len(), "SkyCast worker running");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal, stopping gracefully...");

    // Receivers may already be gone if every task exited
    let _ = shutdown_tx.send(true);

    job_handle.await?;
    for worker in workers {
        worker.await?;
    }

    tracing::info!("SkyCast worker stopped.");
    Ok(())
}
