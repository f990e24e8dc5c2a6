//! Command-line interface definition.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use verify_gateway::GatewayConfig;

/// API gateway that authenticates, deduplicates, and routes
/// inference-verification requests.
#[derive(Parser, Debug)]
#[command(name = "verify-gateway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Address to listen on.
    #[arg(long, short, env = "GATEWAY_BIND_ADDR")]
    pub bind_addr: Option<SocketAddr>,

    /// Base URL of the verification backend.
    #[arg(long, env = "GATEWAY_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Path to the SQLite key store.
    #[arg(long, env = "GATEWAY_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Hotkey of the bootstrap admin credential.
    #[arg(long, env = "GATEWAY_ADMIN_HOTKEY")]
    pub admin_hotkey: Option<String>,

    /// Key value of the bootstrap admin credential.
    #[arg(long, env = "GATEWAY_ADMIN_API_KEY")]
    pub admin_api_key: Option<String>,

    /// Backend verification call timeout, in seconds.
    #[arg(long, env = "GATEWAY_VERIFY_TIMEOUT_SECS")]
    pub verify_timeout_secs: Option<u64>,

    /// Cache TTL for verification responses, in minutes.
    #[arg(long, env = "GATEWAY_CACHE_TTL_MINUTES")]
    pub cache_ttl_minutes: Option<u64>,

    /// Log level.
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Path to configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Convert CLI arguments into a `GatewayConfig`.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be loaded.
    pub fn into_config(self) -> color_eyre::Result<GatewayConfig> {
        // Start with default config or load from file
        let mut config = if let Some(ref path) = self.config {
            GatewayConfig::from_file(path)?
        } else {
            GatewayConfig::default()
        };

        // Override with CLI arguments
        if let Some(bind_addr) = self.bind_addr {
            config.bind_addr = bind_addr;
        }
        if let Some(backend_url) = self.backend_url {
            config.backend_url = backend_url;
        }
        if let Some(db_path) = self.db_path {
            config.db_path = db_path;
        }
        if let Some(admin_hotkey) = self.admin_hotkey {
            config.admin_hotkey = admin_hotkey;
        }
        if let Some(admin_api_key) = self.admin_api_key {
            config.admin_api_key = admin_api_key;
        }
        if let Some(timeout) = self.verify_timeout_secs {
            config.verify_timeout_secs = timeout;
        }
        if let Some(ttl) = self.cache_ttl_minutes {
            config.cache_ttl_minutes = ttl;
        }
        config.log_level = self.log_level;

        Ok(config)
    }
}
