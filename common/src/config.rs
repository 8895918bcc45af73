// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use config::{Config as ConfigFile, File, Environment};

use crate::models::session::DEFAULT_SESSION_TTL_SECS;

/// Central configuration for the auth server and the gate
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bind address of the auth server
    pub auth_server_addr: String,
    /// Base URL the gate uses to reach the auth server
    pub auth_server_url: String,

    pub session: SessionConfig,
    pub chain: ChainConfig,
    pub handoff: HandoffConfig,
    pub rate_limit: RateLimitConfig,

    // Signing page served to the popup
    pub static_files: StaticFilesConfig,

    pub identity_provider: Option<IdentityProviderConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub ttl_secs: i64,
}

impl SessionConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_secs)
    }
}

/// The single chain and contract the gate checks ownership against
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub contract_address: String,
    pub oracle_timeout_secs: u64,
    pub indexer: Option<IndexerConfig>,
}

impl ChainConfig {
    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }
}

/// Credentials for the NFT indexing API alternative to JSON-RPC
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexerConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoffConfig {
    /// Interval between `GET /api/auth/check` polls
    pub server_poll_interval_ms: u64,
    /// Interval between relay storage scans
    pub relay_poll_interval_ms: u64,
    /// Upper bound for any polling loop
    pub poll_ceiling_secs: u64,
}

impl HandoffConfig {
    pub fn server_poll_interval(&self) -> Duration {
        Duration::from_millis(self.server_poll_interval_ms)
    }

    pub fn relay_poll_interval(&self) -> Duration {
        Duration::from_millis(self.relay_poll_interval_ms)
    }

    pub fn poll_ceiling(&self) -> Duration {
        Duration::from_secs(self.poll_ceiling_secs)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_secs: u64,
    /// Path prefixes subject to the limit
    pub paths: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub path: String,
    pub index: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenAlgorithm {
    /// ECDSA P-256, `key` is a PEM public key
    Es256,
    /// HMAC SHA-256, `key` is the shared secret
    Hs256,
}

/// Issuer of wallet-bound identity tokens accepted as an alternative proof
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityProviderConfig {
    pub issuer: String,
    pub audience: String,
    pub algorithm: TokenAlgorithm,
    pub key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_server_addr: "0.0.0.0:8000".to_string(),
            auth_server_url: "http://127.0.0.1:8000".to_string(),
            session: SessionConfig::default(),
            chain: ChainConfig::default(),
            handoff: HandoffConfig::default(),
            rate_limit: RateLimitConfig::default(),
            static_files: StaticFilesConfig::default(),
            identity_provider: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_SESSION_TTL_SECS,
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            name: "arbitrum".to_string(),
            chain_id: 42161,
            rpc_url: "https://arb1.arbitrum.io/rpc".to_string(),
            contract_address: "0xF4820467171695F4d2760614C77503147A9CB1E8".to_string(),
            oracle_timeout_secs: 8,
            indexer: None,
        }
    }
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            server_poll_interval_ms: 2000,
            relay_poll_interval_ms: 250,
            poll_ceiling_secs: 300,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window_secs: 60,
            paths: vec!["/api/auth/save".to_string()],
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            path: "./templates".to_string(),
            index: "index.html".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let config = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // e.g. GATE__CHAIN__RPC_URL
            .add_source(Environment::with_prefix("GATE").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load from files, falling back to flat environment variables
    pub fn from_env() -> Self {
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            },
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");
                Self::from_flat_env()
            }
        }
    }

    fn from_flat_env() -> Self {
        let defaults = Self::default();

        let indexer = match (env::var("INDEXER_BASE_URL"), env::var("INDEXER_API_KEY")) {
            (Ok(base_url), Ok(api_key)) => Some(IndexerConfig { base_url, api_key }),
            _ => None,
        };

        Self {
            auth_server_addr: env_or("AUTH_SERVER_ADDR", defaults.auth_server_addr),
            auth_server_url: env_or("AUTH_SERVER_URL", defaults.auth_server_url),
            session: SessionConfig {
                ttl_secs: env_parse("SESSION_TTL_SECS", defaults.session.ttl_secs),
            },
            chain: ChainConfig {
                name: env_or("CHAIN_NAME", defaults.chain.name),
                chain_id: env_parse("CHAIN_ID", defaults.chain.chain_id),
                rpc_url: env_or("CHAIN_RPC_URL", defaults.chain.rpc_url),
                contract_address: env_or("NFT_CONTRACT_ADDRESS", defaults.chain.contract_address),
                oracle_timeout_secs: env_parse("ORACLE_TIMEOUT_SECS", defaults.chain.oracle_timeout_secs),
                indexer,
            },
            handoff: HandoffConfig {
                server_poll_interval_ms: env_parse("SERVER_POLL_INTERVAL_MS", defaults.handoff.server_poll_interval_ms),
                relay_poll_interval_ms: env_parse("RELAY_POLL_INTERVAL_MS", defaults.handoff.relay_poll_interval_ms),
                poll_ceiling_secs: env_parse("POLL_CEILING_SECS", defaults.handoff.poll_ceiling_secs),
            },
            rate_limit: RateLimitConfig {
                max_requests: env_parse("RATE_LIMIT_MAX_REQUESTS", defaults.rate_limit.max_requests),
                window_secs: env_parse("RATE_LIMIT_WINDOW_SECS", defaults.rate_limit.window_secs),
                paths: defaults.rate_limit.paths,
            },
            static_files: StaticFilesConfig {
                path: env_or("STATIC_FILES_PATH", defaults.static_files.path),
                index: env_or("STATIC_FILES_INDEX", defaults.static_files.index),
            },
            identity_provider: None,
        }
    }
}

fn env_or(name: &str, default: String) -> String {
    env::var(name).unwrap_or(default)
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
