//! Server configuration
//!
//! Built once in `main` from compiled defaults, an optional TOML file and
//! `NEXTMARKET__SECTION__KEY` environment variables, then handed to every
//! component constructor.

use std::path::Path;

use config_engine::{ConfigLoader, Result as ConfigResult};
use database_layer::DatabaseSettings;
use logger_redacted::LoggerConfig;
use plugins_registry_api::RegistryConfig;
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "NEXTMARKET";
pub const DEFAULT_CONFIG_FILE: &str = "nextmarket.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS; credentials are allowed so wildcards are not
    pub cors_origins: Vec<String>,
    /// Upper bound on request bodies, uploads included
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
            ],
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

/// S3-compatible object storage (MinIO in development)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub use_path_style: bool,
    /// Create the bucket at startup when it does not exist
    pub create_bucket: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9000".to_string(),
            region: "us-east-1".to_string(),
            bucket: "next-market-plugins".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            use_path_style: true,
            create_bucket: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub storage: StorageSettings,
    pub registry: RegistryConfig,
    pub logging: LoggerConfig,
}

impl MarketConfig {
    /// Load the layered configuration
    ///
    /// An explicit `path` must exist; without one `nextmarket.toml` in the
    /// working directory is used when present.
    ///
    /// # Errors
    ///
    /// A missing explicit file, an unreadable source, or values that do not
    /// fit the configuration types.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let loader = ConfigLoader::new(ENV_PREFIX).list_key("server.cors_origins");
        let loader = match path {
            Some(path) => loader.file(path),
            None => loader.optional_file(DEFAULT_CONFIG_FILE),
        };
        loader.load()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
