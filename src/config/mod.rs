//! Configuration management for the acompanar backend
//!
//! Configuration loads from environment variables (prefix `ACOMP_`) with
//! sane defaults, or from a TOML file where deployments prefer one.
//! `validate()` runs before anything connects.

use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::matching::AuditPolicy;
use crate::models::TransitionKind;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub matching: MatchingConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: SocketAddr,
    pub enable_cors: bool,
    pub enable_request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".parse().expect("default bind address"),
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub postgres_url: String,

    /// Maximum pool size
    pub pool_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            postgres_url: String::from("postgresql://localhost/acompanar"),
            pool_size: 10,
        }
    }
}

/// Match-run policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Transition kinds that get a persisted history record. The
    /// long-standing default audits REASIGNADO only.
    pub transiciones_auditadas: Vec<TransitionKind>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            transiciones_auditadas: vec![TransitionKind::Reasignado],
        }
    }
}

impl MatchingConfig {
    pub fn audit_policy(&self) -> AuditPolicy {
        AuditPolicy::new(self.transiciones_auditadas.clone())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let bind_address = match std::env::var("ACOMP_BIND_ADDRESS") {
            Ok(raw) => raw
                .parse::<SocketAddr>()
                .with_context(|| format!("invalid ACOMP_BIND_ADDRESS '{raw}'"))?,
            Err(_) => ServerConfig::default().bind_address,
        };

        let enable_cors = env_bool("ACOMP_ENABLE_CORS", true);
        let enable_request_logging = env_bool("ACOMP_REQUEST_LOGGING", true);

        let postgres_url = std::env::var("POSTGRES_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .unwrap_or_else(|_| DatabaseConfig::default().postgres_url);

        let pool_size = std::env::var("ACOMP_POOL_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(10);

        let transiciones_auditadas = match std::env::var("ACOMP_AUDITED_TRANSITIONS") {
            Ok(raw) => parse_transition_list(&raw)?,
            Err(_) => MatchingConfig::default().transiciones_auditadas,
        };

        let level = std::env::var("ACOMP_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));
        let format = std::env::var("ACOMP_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        let config = Self {
            server: ServerConfig {
                bind_address,
                enable_cors,
                enable_request_logging,
            },
            database: DatabaseConfig {
                postgres_url,
                pool_size,
            },
            matching: MatchingConfig {
                transiciones_auditadas,
            },
            logging: LoggingConfig { level, format },
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file; missing keys fall back to
    /// defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants before anything connects
    pub fn validate(&self) -> Result<()> {
        if self.database.pool_size == 0 {
            bail!("database.pool_size must be at least 1");
        }
        if self.database.postgres_url.is_empty() {
            bail!("database.postgres_url must not be empty");
        }
        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => bail!("logging.format must be 'text' or 'json', got '{other}'"),
        }
        Ok(())
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(default)
}

fn parse_transition_list(raw: &str) -> Result<Vec<TransitionKind>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            TransitionKind::from_str(s)
                .map_err(|e| anyhow::anyhow!("invalid ACOMP_AUDITED_TRANSITIONS entry: {e}"))
        })
        .collect()
}
