// SPDX-License-Identifier: GPL-3.0-only
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::store::ServiceUserParams;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Medusa backend base URL
    pub medusa_backend_url: String,

    /// Shared secret used to sign status signals sent to Medusa
    #[serde(default)]
    pub signal_secret: Option<String>,

    /// SQLite database path for the content store
    pub store_db_path: PathBuf,

    /// Local API bind address (e.g., "127.0.0.1:1337")
    pub local_api_bind: SocketAddr,

    /// Minimum seconds between two completed syncs
    pub sync_interval_secs: u64,

    /// Seconds between scheduled syncs, 0 disables the timer
    #[serde(default = "default_sync_schedule_secs")]
    pub sync_schedule_secs: u64,

    /// Health probe policy used before any call to Medusa
    #[serde(default)]
    pub readiness: ReadinessConfig,

    /// Service account provisioned for Medusa
    #[serde(default)]
    pub service_user: ServiceUserParams,

    /// Content types that accept seed data, in `api::<name>.<name>` form
    #[serde(default = "default_content_types")]
    pub content_types: Vec<String>,

    /// Flush every application content type before the first sync
    #[serde(default)]
    pub purge_on_startup: bool,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_secs: u64,
}

impl ReadinessConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 250,
            max_backoff_ms: 5_000,
            timeout_secs: 60,
        }
    }
}

fn default_sync_schedule_secs() -> u64 {
    3600
}

fn default_content_types() -> Vec<String> {
    [
        "fulfillment-provider",
        "payment-provider",
        "region",
        "shipping-option",
        "shipping-profile",
        "product",
        "store",
    ]
    .iter()
    .map(|name| format!("api::{name}.{name}"))
    .collect()
}

impl Config {
    /// Load configuration from TOML file with environment variable overrides
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("MEDUSA_BRIDGE_CONFIG")
            .unwrap_or_else(|_| "config.toml".to_string());

        let mut config: Config = if std::path::Path::new(&config_path).exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            toml::from_str(&contents)?
        } else {
            Config::default()
        };

        if let Ok(val) = std::env::var("MEDUSA_BACKEND_URL") {
            config.medusa_backend_url = val;
        }
        if let Ok(val) = std::env::var("MEDUSA_STRAPI_SECRET") {
            config.signal_secret = Some(val);
        }
        if let Ok(val) = std::env::var("MEDUSA_BRIDGE_DB_PATH") {
            config.store_db_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("MEDUSA_BRIDGE_BIND") {
            config.local_api_bind = SocketAddr::from_str(&val)?;
        }
        if let Ok(val) = std::env::var("MEDUSA_BRIDGE_SYNC_INTERVAL_SECS") {
            config.sync_interval_secs = val.parse()?;
        }
        if let Ok(val) = std::env::var("MEDUSA_BRIDGE_SYNC_SCHEDULE_SECS") {
            config.sync_schedule_secs = val.parse()?;
        }
        if let Ok(val) = std::env::var("MEDUSA_BRIDGE_LOG_LEVEL") {
            config.log_level = val;
        }
        if let Ok(val) = std::env::var("MEDUSA_BRIDGE_LOG_JSON") {
            config.log_json = val.parse()?;
        }
        if let Ok(val) = std::env::var("MEDUSA_BRIDGE_PURGE_ON_STARTUP") {
            config.purge_on_startup = val.parse()?;
        }

        url::Url::parse(&config.medusa_backend_url)?;

        Ok(config)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn sync_schedule(&self) -> Option<Duration> {
        (self.sync_schedule_secs > 0).then(|| Duration::from_secs(self.sync_schedule_secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            medusa_backend_url: String::from("http://localhost:9000"),
            signal_secret: None,
            store_db_path: PathBuf::from("content.db"),
            local_api_bind: SocketAddr::from(([127, 0, 0, 1], 1337)),
            sync_interval_secs: 300, // 5 minutes
            sync_schedule_secs: default_sync_schedule_secs(),
            readiness: ReadinessConfig::default(),
            service_user: ServiceUserParams::default(),
            content_types: default_content_types(),
            purge_on_startup: false,
            log_level: String::from("info"),
            log_json: false,
        }
    }
}
