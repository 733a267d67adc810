//! Server configuration module
//!
//! Handles loading and parsing of server configuration from files and environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the configuration file
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Server name displayed to players
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// World server port (TCP)
    #[serde(default = "default_game_port")]
    pub game_port: u16,

    /// Maximum number of players
    #[serde(default = "default_max_players")]
    pub max_players: u32,

    /// Path to the item catalog (JSON)
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Redis configuration (derived cache)
    #[serde(default)]
    pub redis: RedisConfig,

    /// Economy rules
    #[serde(default)]
    pub economy: EconomyConfig,

    /// Development mode flag (in-memory store, any username logs in)
    #[serde(default)]
    pub dev_mode: bool,

    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database host
    #[serde(default = "default_db_host")]
    pub host: String,

    /// Database port
    #[serde(default = "default_db_port")]
    pub port: u16,

    /// Database name
    #[serde(default = "default_db_name")]
    pub database: String,

    /// Database username
    #[serde(default = "default_db_user")]
    pub username: String,

    /// Database password
    #[serde(default)]
    pub password: String,

    /// Maximum connection pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub url: String,
}

/// Economy rules applied by the acquisition engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Refuse acquisitions the player cannot pay for
    #[serde(default = "default_true")]
    pub enforce_balance: bool,

    /// Stack cap for puffle care items
    #[serde(default = "default_puffle_care_cap")]
    pub puffle_care_cap: u32,

    /// Stack cap for furniture that does not define its own
    #[serde(default = "default_furniture_cap")]
    pub furniture_cap: u32,
}

// Default value functions
fn default_server_name() -> String {
    "Waddle".to_string()
}

fn default_game_port() -> u16 {
    9875
}

fn default_max_players() -> u32 {
    500
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("./data/catalog.json")
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_name() -> String {
    "waddle".to_string()
}

fn default_db_user() -> String {
    "waddle".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_true() -> bool {
    true
}

fn default_puffle_care_cap() -> u32 {
    100
}

fn default_furniture_cap() -> u32 {
    100
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            database: default_db_name(),
            username: default_db_user(),
            password: String::new(),
            pool_size: default_pool_size(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            enforce_balance: default_true(),
            puffle_care_cap: default_puffle_care_cap(),
            furniture_cap: default_furniture_cap(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("config/server.toml"),
            server_name: default_server_name(),
            game_port: default_game_port(),
            max_players: default_max_players(),
            catalog_path: default_catalog_path(),
            database: DatabaseConfig::default(),
            redis: RedisConfig::default(),
            economy: EconomyConfig::default(),
            dev_mode: false,
            debug: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from file and environment variables
    pub async fn load() -> Result<Self> {
        // Determine config path from environment or use default
        let config_path = env::var("WADDLE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/server.toml"));

        let mut config = if config_path.exists() {
            let content = tokio::fs::read_to_string(&config_path)
                .await
                .with_context(|| {
                    format!("Failed to read config file: {}", config_path.display())
                })?;

            Self::from_toml(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            Self::default()
        };

        config.config_path = config_path;

        // Override with environment variables
        config.apply_env_overrides();

        config.validate()?;

        Ok(config)
    }

    /// Default log filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info,waddle_server=debug"
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("WADDLE_SERVER_NAME") {
            self.server_name = val;
        }
        if let Ok(val) = env::var("WADDLE_GAME_PORT") {
            if let Ok(port) = val.parse() {
                self.game_port = port;
            }
        }
        if let Ok(val) = env::var("WADDLE_MAX_PLAYERS") {
            if let Ok(max) = val.parse() {
                self.max_players = max;
            }
        }
        if let Ok(val) = env::var("WADDLE_CATALOG_PATH") {
            self.catalog_path = PathBuf::from(val);
        }
        if let Ok(val) = env::var("WADDLE_DEV_MODE") {
            self.dev_mode = val.to_lowercase() == "true" || val == "1";
        }
        if let Ok(val) = env::var("WADDLE_DEBUG") {
            self.debug = val.to_lowercase() == "true" || val == "1";
        }

        // Database overrides (WADDLE_DATABASE_* takes precedence over PG*)
        if let Ok(val) = env::var("PGHOST") {
            self.database.host = val;
        }
        if let Ok(val) = env::var("WADDLE_DATABASE_HOST") {
            self.database.host = val;
        }
        if let Ok(val) = env::var("WADDLE_DATABASE_PORT") {
            if let Ok(port) = val.parse() {
                self.database.port = port;
            }
        }
        if let Ok(val) = env::var("WADDLE_DATABASE_NAME") {
            self.database.database = val;
        }
        if let Ok(val) = env::var("WADDLE_DATABASE_USER") {
            self.database.username = val;
        }
        if let Ok(val) = env::var("PGPASSWORD") {
            self.database.password = val;
        }
        if let Ok(val) = env::var("WADDLE_DATABASE_PASSWORD") {
            self.database.password = val;
        }

        if let Ok(val) = env::var("WADDLE_REDIS_URL") {
            self.redis.url = val;
        }

        if let Ok(val) = env::var("WADDLE_ENFORCE_BALANCE") {
            self.economy.enforce_balance = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.game_port == 0 {
            anyhow::bail!("Game port must be non-zero");
        }

        // Max players must be reasonable
        if self.max_players == 0 || self.max_players > 10000 {
            anyhow::bail!("Max players must be between 1 and 10000");
        }

        if self.economy.puffle_care_cap == 0 || self.economy.furniture_cap == 0 {
            anyhow::bail!("Stack caps must be at least 1");
        }

        Ok(())
    }

    /// Get the database connection URL
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.database.username,
            self.database.password,
            self.database.host,
            self.database.port,
            self.database.database
        )
    }
}
