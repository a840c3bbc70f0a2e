use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

/// Where users, metadata and sessions are persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    /// PostgreSQL for records, Redis for sessions, the filesystem for ciphertext.
    Postgres,
    /// Everything in process memory. Nothing survives a restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => anyhow::bail!("Unknown STORAGE_BACKEND '{}' (expected postgres or memory)", other),
        }
    }
}

/// The application's configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Which persistence backend to run against.
    pub backend: StorageBackend,
    /// The URL of the PostgreSQL database. Required for the postgres backend.
    pub database_url: Option<String>,
    /// The URL of the Redis server.
    pub redis_url: String,
    /// Root directory of the ciphertext content stores.
    pub content_dir: PathBuf,
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Lifetime of a session in hours.
    pub session_ttl_hours: i64,
    /// Lifetime of a shared link when the uploader does not choose one.
    pub default_share_ttl_hours: i64,
    /// Upper bound on a shared link's lifetime.
    pub max_share_ttl_hours: i64,
    /// Maximum accepted request body in bytes.
    pub max_upload_bytes: usize,
    /// Prefix of the share links handed back to uploaders.
    pub share_link_base: String,
    /// Origin the browser frontend is served from.
    pub frontend_origin: String,
    /// Burst size of the credential endpoint rate limiter. Zero disables it.
    pub auth_rate_limit_burst: u32,
    /// Seconds after which one unit of the credential rate limit is replenished.
    pub auth_rate_limit_period_secs: u64,
    /// Interval of the expired shared link purge job.
    pub share_gc_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            database_url: None,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            content_dir: PathBuf::from("storage"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            session_ttl_hours: 24,
            default_share_ttl_hours: 24,
            max_share_ttl_hours: 168,
            max_upload_bytes: 100 * 1024 * 1024,
            share_link_base: "http://localhost:5173/share".to_string(),
            frontend_origin: "http://localhost:5173".to_string(),
            auth_rate_limit_burst: 10,
            auth_rate_limit_period_secs: 6,
            share_gc_interval_secs: 3600,
        }
    }
}

/// Reads `key` and parses it, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", key)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let backend = match env::var("STORAGE_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => StorageBackend::Postgres,
        };

        let database_url = env::var("DATABASE_URL").ok();
        if backend == StorageBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when STORAGE_BACKEND=postgres");
        }

        let config = Self {
            backend,
            database_url,
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            content_dir: env::var("CONTENT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.content_dir),
            bind_addr: env_or("BIND_ADDR", defaults.bind_addr)?,
            session_ttl_hours: env_or("SESSION_TTL_HOURS", defaults.session_ttl_hours)?,
            default_share_ttl_hours: env_or("DEFAULT_SHARE_TTL_HOURS", defaults.default_share_ttl_hours)?,
            max_share_ttl_hours: env_or("MAX_SHARE_TTL_HOURS", defaults.max_share_ttl_hours)?,
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            share_link_base: env::var("SHARE_LINK_BASE").unwrap_or(defaults.share_link_base),
            frontend_origin: env::var("FRONTEND_ORIGIN").unwrap_or(defaults.frontend_origin),
            auth_rate_limit_burst: env_or("AUTH_RATE_LIMIT_BURST", defaults.auth_rate_limit_burst)?,
            auth_rate_limit_period_secs: env_or(
                "AUTH_RATE_LIMIT_PERIOD_SECS",
                defaults.auth_rate_limit_period_secs,
            )?,
            share_gc_interval_secs: env_or("SHARE_GC_INTERVAL_SECS", defaults.share_gc_interval_secs)?,
        };

        if config.session_ttl_hours <= 0 {
            anyhow::bail!("SESSION_TTL_HOURS must be positive");
        }

        if config.default_share_ttl_hours <= 0
            || config.default_share_ttl_hours > config.max_share_ttl_hours
        {
            anyhow::bail!("DEFAULT_SHARE_TTL_HOURS must be between 1 and MAX_SHARE_TTL_HOURS");
        }

        if config.share_gc_interval_secs == 0 {
            anyhow::bail!("SHARE_GC_INTERVAL_SECS must be positive");
        }

        if config.auth_rate_limit_burst > 0 && config.auth_rate_limit_period_secs == 0 {
            anyhow::bail!("AUTH_RATE_LIMIT_PERIOD_SECS must be positive when rate limiting is on");
        }

        Ok(config)
    }
}
