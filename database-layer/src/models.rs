//! Row types
//!
//! Enum columns are stored as text and parsed on the way out, so a row with an
//! unknown tier or channel surfaces as a decode error rather than a panic.

use chrono::{DateTime, Utc};
use plugins_registry_api::{Organization, Plugin, PluginVersion};
use serde_json::Value;
use sqlx::FromRow;

use crate::error::DatabaseError;

/// Column list shared by every plugin query
pub(crate) const PLUGIN_COLUMNS: &str = "id, npm_package_name, display_name, description, type, \
     visibility, source, latest_version, icon_url, icon_key, backend_install_guide, upstream_url, \
     max_versions_retention, publisher_id, keywords, download_count, verified_publisher, \
     created_at, updated_at";

pub(crate) const VERSION_COLUMNS: &str = "id, plugin_id, version, readme_content, config_schema, \
     config_values, object_key, download_url, file_size, checksum, channel, download_count, \
     security_scan_result, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct OrganizationRow {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Organization {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PluginRow {
    pub id: i64,
    pub npm_package_name: String,
    pub display_name: String,
    pub description: String,
    #[sqlx(rename = "type")]
    pub tier: String,
    pub visibility: String,
    pub source: String,
    pub latest_version: Option<String>,
    pub icon_url: Option<String>,
    pub icon_key: Option<String>,
    pub backend_install_guide: Option<String>,
    pub upstream_url: Option<String>,
    pub max_versions_retention: i32,
    pub publisher_id: i64,
    pub keywords: String,
    pub download_count: i64,
    pub verified_publisher: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PluginRow> for Plugin {
    type Error = DatabaseError;

    fn try_from(row: PluginRow) -> Result<Self, Self::Error> {
        Ok(Plugin {
            id: row.id,
            npm_package_name: row.npm_package_name,
            display_name: row.display_name,
            description: row.description,
            tier: row.tier.parse().map_err(DatabaseError::Decode)?,
            visibility: row.visibility.parse().map_err(DatabaseError::Decode)?,
            source: row.source.parse().map_err(DatabaseError::Decode)?,
            latest_version: row.latest_version,
            icon_url: row.icon_url,
            icon_key: row.icon_key,
            backend_install_guide: row.backend_install_guide,
            upstream_url: row.upstream_url,
            max_versions_retention: row.max_versions_retention,
            publisher_id: row.publisher_id,
            keywords: row.keywords,
            download_count: row.download_count,
            verified_publisher: row.verified_publisher,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct VersionRow {
    pub id: i64,
    pub plugin_id: i64,
    pub version: String,
    pub readme_content: Option<String>,
    pub config_schema: Value,
    pub config_values: Option<Value>,
    pub object_key: String,
    pub download_url: String,
    pub file_size: i64,
    pub checksum: String,
    pub channel: String,
    pub download_count: i64,
    pub security_scan_result: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<VersionRow> for PluginVersion {
    type Error = DatabaseError;

    fn try_from(row: VersionRow) -> Result<Self, Self::Error> {
        Ok(PluginVersion {
            id: row.id,
            plugin_id: row.plugin_id,
            version: row.version,
            readme_content: row.readme_content,
            config_schema: row.config_schema,
            config_values: row.config_values,
            object_key: row.object_key,
            download_url: row.download_url,
            file_size: row.file_size,
            checksum: row.checksum,
            channel: row.channel.parse().map_err(DatabaseError::Decode)?,
            download_count: row.download_count,
            security_scan_result: row.security_scan_result,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugins_registry_api::{PluginTier, ReleaseChannel};
    use serde_json::json;

    fn plugin_row(tier: &str) -> PluginRow {
        PluginRow {
            id: 1,
            npm_package_name: "demo".to_string(),
            display_name: "demo".to_string(),
            description: String::new(),
            tier: tier.to_string(),
            visibility: "public".to_string(),
            source: "remote_proxy".to_string(),
            latest_version: Some("1.0.0".to_string()),
            icon_url: None,
            icon_key: None,
            backend_install_guide: None,
            upstream_url: None,
            max_versions_retention: 10,
            publisher_id: 1,
            keywords: "a,b".to_string(),
            download_count: 0,
            verified_publisher: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_plugin_row_conversion() {
        let plugin = Plugin::try_from(plugin_row("enterprise")).unwrap();
        assert_eq!(plugin.tier, PluginTier::Enterprise);
        assert_eq!(plugin.latest_version.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_unknown_enum_text_is_decode_error() {
        assert!(matches!(
            Plugin::try_from(plugin_row("paid")),
            Err(DatabaseError::Decode(_))
        ));
    }

    #[test]
    fn test_version_row_conversion() {
        let row = VersionRow {
            id: 3,
            plugin_id: 1,
            version: "2.0.0-beta.1".to_string(),
            readme_content: None,
            config_schema: json!({"required": ["token"]}),
            config_values: None,
            object_key: "plugins/demo/2.0.0-beta.1/demo-2.0.0-beta.1.tgz".to_string(),
            download_url: String::new(),
            file_size: 10,
            checksum: "ab".to_string(),
            channel: "beta".to_string(),
            download_count: 0,
            security_scan_result: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let version = PluginVersion::try_from(row).unwrap();
        assert_eq!(version.channel, ReleaseChannel::Beta);
        assert_eq!(version.config_schema, json!({"required": ["token"]}));
    }
}
