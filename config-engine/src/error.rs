use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    SourceNotFound(String),

    #[error("Configuration parsing failed: {0}")]
    ParseError(String),

    #[error("Default configuration could not be serialized: {0}")]
    DefaultsError(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => Self::SourceNotFound(key),
            other => Self::ParseError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
