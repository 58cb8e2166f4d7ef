//! Logging for NextMarket with credential redaction
//!
//! Two pieces:
//!
//! - [`init_tracing`] installs the process-wide `tracing` subscriber
//!   (env-filter, RFC 3339 UTC timestamps, human or JSON output).
//! - [`SecretRedactor`] scrubs credentials out of free-form text before it is
//!   logged or echoed to a client: database DSN passwords, S3 presigned-URL
//!   signatures and credentials, AWS access key ids, bearer tokens.
//!
//! # Example
//!
//! ```rust,no_run
//! use logger_redacted::{init_tracing, redact, LoggerConfig};
//!
//! init_tracing(&LoggerConfig::default()).ok();
//! let message = redact("connect postgres://app:hunter2@db:5432/market failed");
//! assert!(!message.contains("hunter2"));
//! ```

pub mod config;
pub mod redactor;

pub use config::*;
pub use redactor::*;

use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level when set.
///
/// # Errors
///
/// Returns [`LoggerError::Init`] when a global subscriber is already installed.
pub fn init_tracing(config: &LoggerConfig) -> Result<(), LoggerError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directives()));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if config.json {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_level(true),
            )
            .try_init()
    };

    result.map_err(|e| LoggerError::Init(e.to_string()))
}
