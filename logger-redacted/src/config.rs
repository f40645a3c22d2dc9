// Logger configuration
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Default level when `RUST_LOG` is not set
    pub log_level: String,
    /// Emit one JSON object per event instead of human-readable lines
    pub json: bool,
    pub redaction_enabled: bool,
    /// Replace redacted values with a short hash so entries can be correlated
    pub hash_for_correlation: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            redaction_enabled: true,
            hash_for_correlation: true,
        }
    }
}

impl LoggerConfig {
    /// Filter directives used when `RUST_LOG` is absent
    pub fn default_directives(&self) -> String {
        format!(
            "insurance_server={level},insurance_service={level},database_layer={level},tower_http=info,sqlx=warn,hyper=info",
            level = self.log_level
        )
    }
}
