//! Runtime configuration, resolved from the environment at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::pipeline::extraction::gemini::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_POLL_DEADLINE, DEFAULT_POLL_INTERVAL,
};
use crate::pipeline::QueueConfig;

pub const APP_NAME: &str = "Bidbox";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the application data directory (~/Bidbox/).
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(APP_NAME)
}

pub fn default_log_filter() -> &'static str {
    "info,bidbox=debug"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}

/// Where raw proposal files live.
#[derive(Debug, Clone)]
pub enum StorageMode {
    /// Filesystem-backed store (local runs).
    Local { root: PathBuf },
    /// Hosted bucket store over HTTP.
    Http {
        base_url: String,
        bucket: String,
        api_key: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub storage: StorageMode,
    pub poll_interval: Duration,
    pub poll_deadline: Duration,
    pub queue: QueueConfig,
    pub scan_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let gemini_api_key = require_var("GEMINI_API_KEY")?;

        let storage = match non_empty_var("BIDBOX_STORAGE_URL") {
            Some(base_url) => StorageMode::Http {
                base_url,
                bucket: non_empty_var("BIDBOX_STORAGE_BUCKET")
                    .unwrap_or_else(|| "proposals".to_string()),
                api_key: require_var("BIDBOX_STORAGE_KEY")?,
            },
            None => StorageMode::Local {
                root: non_empty_var("BIDBOX_STORAGE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| app_data_dir().join("blobs")),
            },
        };

        let bind_raw =
            non_empty_var("BIDBOX_BIND").unwrap_or_else(|| "127.0.0.1:8080".to_string());
        let bind_addr = bind_raw
            .parse()
            .map_err(|_| ConfigError::InvalidVar {
                name: "BIDBOX_BIND",
                value: bind_raw.clone(),
            })?;

        Ok(Self {
            db_path: non_empty_var("BIDBOX_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|| app_data_dir().join("bidbox.db")),
            bind_addr,
            gemini_api_key,
            gemini_model: non_empty_var("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base_url: non_empty_var("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            storage,
            poll_interval: duration_var("BIDBOX_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL)?,
            poll_deadline: duration_var("BIDBOX_POLL_DEADLINE_SECS", DEFAULT_POLL_DEADLINE)?,
            queue: QueueConfig {
                workers: usize_var("BIDBOX_WORKERS", 3)?,
                capacity: usize_var("BIDBOX_QUEUE_CAPACITY", 64)?,
            },
            scan_interval: duration_var("BIDBOX_SCAN_INTERVAL_SECS", Duration::from_secs(15))?,
        })
    }
}

fn non_empty_var(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    non_empty_var(name).ok_or(ConfigError::MissingVar(name))
}

fn duration_var(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match non_empty_var(name) {
        Some(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidVar { name, value: raw }),
        None => Ok(default),
    }
}

fn usize_var(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    match non_empty_var(name) {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidVar { name, value: raw }),
        None => Ok(default),
    }
}
