/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Time given to background work on shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = env_u64("REQUEST_TIMEOUT_SECS", 30);
        let shutdown_timeout_secs = env_u64("SHUTDOWN_TIMEOUT_SECS", 30);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
        }
    }
}

/// As-code synchronization settings.
#[derive(Debug, Clone)]
pub struct AsCodeConfig {
    /// Base URL of the repositories service.
    pub repositories_service_url: String,
    pub operation_cache_ttl_secs: u64,
    pub reconcile_poll_interval_ms: u64,
    pub reconcile_max_attempts: u32,
    pub max_background_tasks: usize,
}

impl AsCodeConfig {
    /// | Env Var                      | Default                  |
    /// |------------------------------|--------------------------|
    /// | `REPOSITORIES_SERVICE_URL`   | `http://localhost:8084`  |
    /// | `OPERATION_CACHE_TTL_SECS`   | `600`                    |
    /// | `RECONCILE_POLL_INTERVAL_MS` | `1000`                   |
    /// | `RECONCILE_MAX_ATTEMPTS`     | `60`                     |
    /// | `MAX_BACKGROUND_TASKS`       | `32`                     |
    pub fn from_env() -> Self {
        let repositories_service_url = std::env::var("REPOSITORIES_SERVICE_URL")
            .unwrap_or_else(|_| "http://localhost:8084".into());

        let reconcile_max_attempts: u32 = std::env::var("RECONCILE_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("RECONCILE_MAX_ATTEMPTS must be a valid u32");

        let max_background_tasks: usize = std::env::var("MAX_BACKGROUND_TASKS")
            .unwrap_or_else(|_| "32".into())
            .parse()
            .expect("MAX_BACKGROUND_TASKS must be a valid usize");

        Self {
            repositories_service_url,
            operation_cache_ttl_secs: env_u64("OPERATION_CACHE_TTL_SECS", 600),
            reconcile_poll_interval_ms: env_u64("RECONCILE_POLL_INTERVAL_MS", 1000),
            reconcile_max_attempts,
            max_background_tasks,
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .map(|v| {
            v.parse()
                .unwrap_or_else(|_| panic!("{name} must be a valid u64"))
        })
        .unwrap_or(default)
}
