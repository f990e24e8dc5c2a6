//! Configuration for verify-gateway.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Address the HTTP server listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Base URL of the downstream verification backend.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Path to the SQLite key store.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Hotkey of the bootstrap admin credential.
    #[serde(default = "default_admin_hotkey")]
    pub admin_hotkey: String,

    /// Key value of the bootstrap admin credential (empty = skip bootstrap).
    #[serde(default)]
    pub admin_api_key: String,

    /// Timeout for a single backend verification call, in seconds.
    #[serde(default = "default_verify_timeout")]
    pub verify_timeout_secs: u64,

    /// How long a verification response stays cached, in minutes.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_minutes: u64,

    /// Interval between cache sweeps, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub cache_sweep_interval_secs: u64,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Model identifier -> backend routing header value.
    #[serde(default = "default_routes")]
    pub routes: HashMap<String, String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            backend_url: default_backend_url(),
            db_path: default_db_path(),
            admin_hotkey: default_admin_hotkey(),
            admin_api_key: String::new(),
            verify_timeout_secs: default_verify_timeout(),
            cache_ttl_minutes: default_cache_ttl(),
            cache_sweep_interval_secs: default_sweep_interval(),
            log_level: default_log_level(),
            routes: default_routes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    ([0, 0, 0, 0], 8080).into()
}

fn default_backend_url() -> String {
    "http://haproxy".to_string()
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "verify-gateway")
        .map(|dirs| dirs.data_dir().join("api_keys.db"))
        .unwrap_or_else(|| PathBuf::from("api_keys.db"))
}

fn default_admin_hotkey() -> String {
    "admin".to_string()
}

const fn default_verify_timeout() -> u64 {
    120
}

const fn default_cache_ttl() -> u64 {
    72
}

const fn default_sweep_interval() -> u64 {
    300 // 5 minutes
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_routes() -> HashMap<String, String> {
    let mut routes = HashMap::new();
    routes.insert("deepseek-ai/DeepSeek-R1".to_string(), "r1".to_string());
    routes.insert("deepseek-ai/DeepSeek-V3".to_string(), "v3".to_string());
    routes
}

impl GatewayConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &std::path::Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Backend verification call timeout.
    #[must_use]
    pub fn verify_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.verify_timeout_secs)
    }

    /// TTL applied to cached verification responses.
    #[must_use]
    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_ttl_minutes * 60)
    }

    /// Interval between periodic cache sweeps.
    #[must_use]
    pub fn cache_sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_sweep_interval_secs)
    }
}
