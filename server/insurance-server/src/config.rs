//! Server configuration
//!
//! Sources, lowest precedence first: built-in defaults, the optional YAML
//! file, then `INSURANCE__`-prefixed environment variables
//! (`INSURANCE__DATABASE__URL`, `INSURANCE__SERVER__PORT`, ...).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use database_layer::DatabaseConfig;
use logger_redacted::LoggerConfig;
use serde::Deserialize;
use thiserror::Error;

pub const ENV_PREFIX: &str = "INSURANCE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete server configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpConfig,
    pub database: DatabaseConfig,
    pub uploads: UploadConfig,
    pub logging: LoggerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Apply pending migrations before serving
    pub run_migrations: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            run_migrations: true,
        }
    }
}

/// Provider logo uploads
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory logos are written to
    pub directory: PathBuf,
    /// URL prefix stored in `logo_location` and served statically
    pub public_prefix: String,
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("uploads"),
            public_prefix: "/uploads".to_string(),
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Load from `path` (skipped when missing) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path.filter(|p| p.exists()) {
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid("database.url must be set".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        let prefix = self.uploads.public_prefix.trim_end_matches('/');
        if !prefix.starts_with('/') {
            return Err(ConfigError::Invalid(
                "uploads.public_prefix must be an absolute path below '/'".to_string(),
            ));
        }
        if self.uploads.max_bytes == 0 {
            return Err(ConfigError::Invalid(
                "uploads.max_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
