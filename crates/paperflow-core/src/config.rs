//! Configuration module
//!
//! Environment-driven configuration for the API server, storage backends,
//! the automation engine client, and the execution monitor.

use std::env;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_FILE_SIZE_MB: usize = 25;
const ENGINE_REQUEST_TIMEOUT_SECS: u64 = 30;
const MONITOR_POLL_INTERVAL_MS: u64 = 1000;
const MONITOR_TIMEOUT_SECS: u64 = 600;
const NOTIFY_STEP_SECS: u64 = 30;

/// Storage backend selection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Local,
}

impl StorageBackend {
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "s3" => Some(StorageBackend::S3),
            "local" => Some(StorageBackend::Local),
            _ => None,
        }
    }
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,

    // Database
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,

    // Storage
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,

    // Upload limits
    pub max_file_size_bytes: usize,

    // Automation engine
    pub engine_webhook_url: Option<String>,
    pub engine_api_url: Option<String>,
    pub engine_api_key: Option<String>,
    pub engine_request_timeout_secs: u64,

    // Execution monitor
    pub monitor_poll_interval_ms: u64,
    pub monitor_timeout_secs: u64,

    // Notification relay
    pub notify_url: Option<String>,
    pub notify_step_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_FILE_SIZE_MB);

        let storage_backend = env::var("STORAGE_BACKEND")
            .ok()
            .and_then(|s| StorageBackend::from_str_opt(&s))
            .unwrap_or(StorageBackend::Local);

        Ok(Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            engine_webhook_url: env::var("ENGINE_WEBHOOK_URL").ok(),
            engine_api_url: env::var("ENGINE_API_URL").ok(),
            engine_api_key: env::var("ENGINE_API_KEY").ok(),
            engine_request_timeout_secs: env::var("ENGINE_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| ENGINE_REQUEST_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(ENGINE_REQUEST_TIMEOUT_SECS),
            monitor_poll_interval_ms: env::var("MONITOR_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| MONITOR_POLL_INTERVAL_MS.to_string())
                .parse()
                .unwrap_or(MONITOR_POLL_INTERVAL_MS),
            monitor_timeout_secs: env::var("MONITOR_TIMEOUT_SECS")
                .unwrap_or_else(|_| MONITOR_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(MONITOR_TIMEOUT_SECS),
            notify_url: env::var("NOTIFY_URL").ok(),
            notify_step_secs: env::var("NOTIFY_STEP_SECS")
                .unwrap_or_else(|_| NOTIFY_STEP_SECS.to_string())
                .parse()
                .unwrap_or(NOTIFY_STEP_SECS),
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!("S3_BUCKET must be set for the s3 backend"));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set for the local backend"
                    ));
                }
            }
        }
        if self.monitor_poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("MONITOR_POLL_INTERVAL_MS must be > 0"));
        }
        Ok(())
    }
}
