use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Registry behavior settings, the `[registry]` section of the server config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Versions kept per plugin when it is first created
    pub default_retention: i32,
    /// Lifetime of presigned artifact download URLs
    pub presign_ttl_secs: u64,
    /// Public prefix under which stored files (icons) are served
    pub icon_url_prefix: String,
    /// Public prefix of the plugin API, used to build version download URLs
    pub download_url_prefix: String,
    /// Publisher recorded on uploads; the default organization when unset
    pub publisher_id: Option<i64>,
}

impl RegistryConfig {
    pub fn presign_ttl(&self) -> Duration {
        Duration::from_secs(self.presign_ttl_secs)
    }

    /// Retention never drops below one version
    pub fn effective_retention(&self) -> i32 {
        self.default_retention.max(1)
    }

    pub fn icon_url(&self, icon_key: &str) -> String {
        format!("{}/{}", self.icon_url_prefix.trim_end_matches('/'), icon_key)
    }

    pub fn download_url(&self, plugin_id: i64, version: &str) -> String {
        format!(
            "{}/{plugin_id}/versions/{version}/download",
            self.download_url_prefix.trim_end_matches('/')
        )
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_retention: 10,
            presign_ttl_secs: 24 * 60 * 60,
            icon_url_prefix: "/api/v1/files".to_string(),
            download_url_prefix: "/api/v1/plugins".to_string(),
            publisher_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_urls() {
        let config = RegistryConfig::default();
        assert_eq!(config.icon_url("icons/demo.png"), "/api/v1/files/icons/demo.png");
        assert_eq!(
            config.download_url(4, "1.0.0"),
            "/api/v1/plugins/4/versions/1.0.0/download"
        );
        assert_eq!(config.presign_ttl(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_retention_floor() {
        let config = RegistryConfig {
            default_retention: 0,
            ..Default::default()
        };
        assert_eq!(config.effective_retention(), 1);
    }
}
