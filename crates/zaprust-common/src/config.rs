//! Configuration for ZapRust

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Messaging bridge transport configuration
    #[serde(default)]
    pub transport: TransportConfig,

    /// Status job scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Campaign processor configuration
    #[serde(default)]
    pub campaigns: CampaignConfig,

    /// Media storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// API port
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: Option<String>,

    /// Maximum connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

/// Messaging bridge transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Base URL of the bridge sidecar
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,

    /// Shared secret for webhook signature verification
    #[serde(default = "default_webhook_secret")]
    pub webhook_secret: String,

    /// Request timeout in seconds for bridge commands
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bridge_url: default_bridge_url(),
            webhook_secret: default_webhook_secret(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_bridge_url() -> String {
    "http://localhost:3010".to_string()
}

fn default_webhook_secret() -> String {
    "zaprust-dev-secret".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// Status job scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Tick interval in seconds
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// How long a job waits for an inline reconnect to become ready
    #[serde(default = "default_ready_wait_secs")]
    pub ready_wait_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            ready_wait_secs: default_ready_wait_secs(),
        }
    }
}

fn default_tick_secs() -> u64 {
    60
}

fn default_ready_wait_secs() -> u64 {
    5
}

/// Campaign processor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Delay between drain cycles in seconds
    #[serde(default = "default_cycle_secs")]
    pub cycle_secs: u64,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            cycle_secs: default_cycle_secs(),
        }
    }
}

fn default_cycle_secs() -> u64 {
    5
}

/// Media storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding uploaded media files
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_dir: default_media_dir(),
        }
    }
}

fn default_media_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from environment and file
    ///
    /// `ZAPRUST_CONFIG` overrides the search path; `DATABASE_URL` overrides
    /// the database URL from the file.
    pub fn load() -> crate::Result<Self> {
        let mut config = if let Ok(path) = std::env::var("ZAPRUST_CONFIG") {
            Self::from_file(std::path::Path::new(&path))?
        } else {
            let paths = [
                std::path::PathBuf::from("./zaprust.toml"),
                std::path::PathBuf::from("/etc/zaprust/zaprust.toml"),
            ];

            let mut loaded = None;
            for path in paths {
                if path.exists() {
                    loaded = Some(Self::from_file(&path)?);
                    break;
                }
            }

            match loaded {
                Some(config) => config,
                None => toml::from_str("").map_err(|e| {
                    crate::Error::Config(format!("Failed to build default config: {}", e))
                })?,
            }
        };

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = Some(url);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.scheduler.tick_secs, 60);
        assert_eq!(config.scheduler.ready_wait_secs, 5);
        assert_eq!(config.campaigns.cycle_secs, 5);
        assert_eq!(config.transport.bridge_url, "http://localhost:3010");
        assert!(config.database.url.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[server]
port = 8080

[database]
url = "postgres://localhost/zaprust"
max_connections = 10

[transport]
bridge_url = "http://bridge:3010"
webhook_secret = "s3cret"

[scheduler]
tick_secs = 30
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(
            config.database.url.as_deref(),
            Some("postgres://localhost/zaprust")
        );
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.transport.webhook_secret, "s3cret");
        assert_eq!(config.scheduler.tick_secs, 30);
        assert_eq!(config.campaigns.cycle_secs, 5);
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zaprust.toml");
        std::fs::write(&path, "[server]\nport = 4000\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.logging.level, "info");
    }
}
