//! Logging with PHI redaction
//!
//! Installs the process-wide `tracing` subscriber and offers a redactor for
//! free text that may carry protected health information before it is logged.
//! Recipient search terms are the usual offender: they hold names and
//! medical-assistance numbers typed by staff.
//!
//! # Detected data types
//!
//! - **Email addresses**: `user@example.com` → `EMAIL[hash]`
//! - **Phone numbers**: `(555) 123-4567` → `PHONE[hash]`
//! - **Medical-assistance numbers**: bare runs of 8–12 digits → `MA[hash]`
//!
//! With `hash_for_correlation` disabled, values are replaced by fixed masks.

pub mod config;
pub mod redactor;

pub use config::*;
pub use redactor::*;

use std::sync::OnceLock;
use thiserror::Error;
use tracing_subscriber::{fmt::time::ChronoUtc, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static REDACTOR: OnceLock<Option<PiiRedactor>> = OnceLock::new();

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Install the global subscriber and redactor
///
/// `RUST_LOG` takes precedence over [`LoggerConfig::log_level`].
pub fn init(config: &LoggerConfig) -> Result<(), LoggerError> {
    let redactor = config.redaction_enabled.then(|| {
        PiiRedactor::new(RedactionConfig {
            hash_for_correlation: config.hash_for_correlation,
            ..RedactionConfig::default()
        })
    });
    // A second init keeps the first redactor; the subscriber error below reports it
    let _ = REDACTOR.set(redactor);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directives()));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if config.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_line_number(true),
            )
            .try_init()
    };

    result.map_err(|e| LoggerError::AlreadyInitialized(e.to_string()))
}

/// Redact `text` with the installed redactor
///
/// Before [`init`] runs, the default redactor is applied so nothing slips
/// through during startup.
pub fn redact(text: &str) -> String {
    match REDACTOR.get() {
        Some(Some(redactor)) => redactor.redact(text),
        Some(None) => text.to_string(),
        None => PiiRedactor::default().redact(text),
    }
}
