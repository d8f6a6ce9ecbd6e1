use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string (durable queues and poller lease)
    pub redis_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Port the HTTP API binds to (default: 8081)
    pub api_port: u16,

    /// Queue carrying due schedules (default: "schedules")
    pub schedule_queue: String,

    /// Queue carrying pre-rendered notification requests (default: "notifications")
    pub notification_queue: String,

    /// Number of schedule consumer workers (default: 1)
    pub schedule_consumers: usize,

    /// Number of notification consumer workers (default: 1)
    pub notification_consumers: usize,

    /// Recovery job period in seconds; also the lookahead window (default: 60)
    pub job_interval_secs: u64,

    /// How long an idle consumer worker sleeps before pulling again (default: 250)
    pub queue_poll_interval_ms: u64,

    /// Whether the recovery job must hold the Redis poller lease to arm timers
    pub poller_lease_enabled: bool,

    /// Base URL of the user service
    pub user_service_url: String,

    /// Base URL of the forecast provider
    pub forecast_service_url: String,

    /// Base URL of the web notification API; the web channel is only registered when set
    pub web_notification_api_url: Option<String>,

    /// Resend API key for email delivery
    pub resend_api_key: Option<String>,

    /// Email sender address
    pub email_from: Option<String>,

    /// Channel used when a due schedule is turned into a notification (default: "web")
    pub default_channel: String,

    /// Timeout applied to every outgoing HTTP request (default: 10)
    pub http_timeout_secs: u64,

    /// Identity of this worker process, part of every consumer name. Must stay
    /// the same across restarts and differ between live instances
    /// (default: `$HOSTNAME`, else "local")
    pub worker_instance: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let config = Self {
            database_url: var("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            redis_url: var("REDIS_URL")
                .unwrap_or_else(|| "redis://localhost:6379".to_string()),
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            api_port: var("API_PORT")
                .unwrap_or_else(|| "8081".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("API_PORT must be a valid port number"))?,
            schedule_queue: var("SCHEDULE_QUEUE")
                .unwrap_or_else(|| "schedules".to_string()),
            notification_queue: var("NOTIFICATION_QUEUE")
                .unwrap_or_else(|| "notifications".to_string()),
            schedule_consumers: var("SCHEDULE_CONSUMERS")
                .unwrap_or_else(|| "1".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SCHEDULE_CONSUMERS must be a valid usize"))?,
            notification_consumers: var("NOTIFICATION_CONSUMERS")
                .unwrap_or_else(|| "1".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("NOTIFICATION_CONSUMERS must be a valid usize"))?,
            job_interval_secs: var("JOB_INTERVAL_SECS")
                .unwrap_or_else(|| "60".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("JOB_INTERVAL_SECS must be a valid u64"))?,
            queue_poll_interval_ms: var("QUEUE_POLL_INTERVAL_MS")
                .unwrap_or_else(|| "250".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("QUEUE_POLL_INTERVAL_MS must be a valid u64"))?,
            poller_lease_enabled: var("POLLER_LEASE_ENABLED")
                .unwrap_or_else(|| "true".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("POLLER_LEASE_ENABLED must be true or false"))?,
            user_service_url: var("USER_SERVICE_URL")
                .unwrap_or_else(|| "http://localhost:8080".to_string()),
            forecast_service_url: var("FORECAST_SERVICE_URL")
                .unwrap_or_else(|| "http://localhost:8084".to_string()),
            web_notification_api_url: var("WEB_NOTIFICATION_API_URL"),
            resend_api_key: var("RESEND_API_KEY"),
            email_from: var("EMAIL_FROM"),
            default_channel: var("DEFAULT_CHANNEL")
                .unwrap_or_else(|| "web".to_string()),
            http_timeout_secs: var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HTTP_TIMEOUT_SECS must be a valid u64"))?,
            worker_instance: var("WORKER_INSTANCE_ID")
                .or_else(|| var("HOSTNAME"))
                .unwrap_or_else(|| "local".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot drive the workers.
    fn validate(&self) -> anyhow::Result<()> {
        if self.job_interval_secs == 0 {
            anyhow::bail!("JOB_INTERVAL_SECS must be greater than zero");
        }
        if self.queue_poll_interval_ms == 0 {
            anyhow::bail!("QUEUE_POLL_INTERVAL_MS must be greater than zero");
        }
        if self.worker_instance.trim().is_empty() {
            anyhow::bail!("WORKER_INSTANCE_ID must not be empty");
        }
        Ok(())
    }

    /// Recovery job period as a `Duration`.
    pub fn job_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.job_interval_secs)
    }

    /// Consumer idle sleep as a `Duration`.
    pub fn queue_poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.queue_poll_interval_ms)
    }
}
