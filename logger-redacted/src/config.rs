// Logger configuration
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Default level for workspace crates when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl LoggerConfig {
    /// Filter directives used when `RUST_LOG` is not set
    pub fn default_directives(&self) -> String {
        let level = &self.level;
        format!(
            "nextmarket_server={level},plugins_registry_api={level},database_layer={level},\
             config_engine={level},tower_http=info,sqlx=warn,hyper=info,aws_config=warn,\
             aws_smithy_runtime=warn"
        )
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
