//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3001").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Public base URL of this deployment (e.g., "https://app.example.com").
    /// The base URL's origin is always allowed to submit tracking events.
    pub base_url: String,
    /// Optional comma/semicolon-separated list of regex patterns for
    /// additionally allowed origins (e.g., `^https://.*\.example\.com$`).
    /// Patterns are matched against the raw Origin header value.
    #[serde(default)]
    pub allowed_origins: Option<String>,
    /// Enable the periodic full refresh of the site cache and allow list
    /// (default: true).
    #[serde(default = "default_auto_refresh_enabled")]
    pub auto_refresh_enabled: bool,
    /// Interval in seconds between full refreshes (default: 300).
    /// Only used if auto_refresh_enabled is true.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

fn default_bind() -> String {
    "127.0.0.1:3001".to_string()
}

fn default_auto_refresh_enabled() -> bool {
    true
}

fn default_refresh_interval_secs() -> u64 {
    300 // 5 minutes
}

impl ServerConfig {
    /// Get the refresh interval as a Duration.
    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh_interval_secs)
    }

    /// Split the configured allowed-origin pattern list into individual
    /// pattern strings. Accepts both comma and semicolon delimiters.
    pub fn allowed_origin_patterns(&self) -> Vec<String> {
        self.allowed_origins
            .as_deref()
            .unwrap_or("")
            .split([',', ';'])
            .map(str::trim)
            .filter(|pattern| !pattern.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Validate server configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("server.base_url must not be empty".to_string());
        }

        // Zero would cause tokio::time::interval to panic in the refresh loop.
        if self.auto_refresh_enabled && self.refresh_interval_secs == 0 {
            return Err(
                "server.refresh_interval_secs cannot be 0 when auto_refresh_enabled is true. \
                 Use a value >= 1 second or disable auto refresh."
                    .to_string(),
            );
        }

        Ok(())
    }
}

/// PostgreSQL SSL mode configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PgSslMode {
    /// Disable SSL/TLS entirely.
    Disable,
    /// Prefer SSL/TLS but allow unencrypted connections (default).
    #[default]
    Prefer,
    /// Require SSL/TLS for all connections.
    Require,
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database (recommended for testing and small deployments only).
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
    /// PostgreSQL database.
    Postgres {
        /// Connection URL (optional if using individual fields).
        /// Takes precedence over individual fields if both are provided.
        url: Option<String>,
        /// Database host (e.g., "localhost" or "db.example.com").
        host: Option<String>,
        /// Database port (default: 5432).
        #[serde(default = "default_pg_port")]
        port: Option<u16>,
        /// Database username.
        username: Option<String>,
        /// Database password.
        /// WARNING: Prefer WAYPOST_METADATA__PASSWORD env var over storing in config.
        password: Option<String>,
        /// Database name.
        database: Option<String>,
        /// SSL mode for connections.
        ssl_mode: Option<PgSslMode>,
        /// Maximum connections in the pool.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Statement timeout in milliseconds (prevents hung queries).
        #[serde(default = "default_statement_timeout_ms")]
        statement_timeout_ms: Option<u64>,
    },
}

fn default_max_connections() -> u32 {
    10
}

fn default_pg_port() -> Option<u16> {
    Some(5432)
}

fn default_statement_timeout_ms() -> Option<u64> {
    Some(30000) // 30 seconds
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/waypost.db"),
        }
    }
}

impl MetadataConfig {
    /// Validate metadata configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            MetadataConfig::Sqlite { .. } => Ok(()),
            MetadataConfig::Postgres {
                url,
                host,
                database,
                ..
            } => match (url.as_ref(), host.as_ref(), database.as_ref()) {
                (Some(_), _, _) => Ok(()),
                (None, Some(_), Some(_)) => Ok(()),
                (None, None, _) => {
                    Err("postgres config requires either 'url' or 'host' + 'database'".to_string())
                }
                (None, Some(_), None) => Err(
                    "postgres config requires 'database' when using individual fields".to_string(),
                ),
            },
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl AppConfig {
    /// Validate the complete configuration. Returns the first error found.
    pub fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.metadata.validate()?;
        Ok(())
    }

    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses SQLite metadata and a fixed base URL.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig {
                bind: default_bind(),
                base_url: "https://app.example.com".to_string(),
                allowed_origins: None,
                auto_refresh_enabled: false,
                refresh_interval_secs: default_refresh_interval_secs(),
            },
            metadata: MetadataConfig::default(),
        }
    }
}
