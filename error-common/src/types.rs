use thiserror::Error;

/// Process-level error for NextMarket binaries
#[derive(Error, Debug)]
pub enum MarketError {
    /// Network communication errors (bind, accept)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server runtime errors
    #[error("Server error: {0}")]
    ServerError(String),

    /// Database operation errors
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Object storage errors
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal system errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Wrapped external errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MarketError {
    /// Process exit code for this error, distinguishing misconfiguration from runtime failure
    pub fn exit_code(&self) -> i32 {
        match self {
            MarketError::ConfigError(_) => 78,
            MarketError::NetworkError(_) => 69,
            MarketError::DatabaseError(_) | MarketError::StorageError(_) => 75,
            _ => 1,
        }
    }
}

/// Result type alias for NextMarket operations
pub type Result<T> = std::result::Result<T, MarketError>;

/// Log an error with the context it was raised in
pub fn log_error(context: &str, error: &MarketError) {
    tracing::error!(
        context = context,
        error = %error,
        "NextMarket error occurred"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(MarketError::ConfigError("bad".into()).exit_code(), 78);
        assert_eq!(MarketError::NetworkError("bind".into()).exit_code(), 69);
        assert_eq!(MarketError::DatabaseError("down".into()).exit_code(), 75);
        assert_eq!(MarketError::ServerError("boom".into()).exit_code(), 1);
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: MarketError = anyhow::anyhow!("wrapped").into();
        assert_eq!(err.to_string(), "wrapped");
    }
}
