//! Registry records
//!
//! Field names serialize in snake_case, matching the REST payloads the web
//! console consumes. Schema and configuration documents are kept as
//! [`serde_json::Value`] and only interpreted by [`crate::schema`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type PluginId = i64;
pub type VersionId = i64;
pub type OrganizationId = i64;

/// Name of the organization that owns uploads until real publisher identity exists
pub const DEFAULT_ORGANIZATION_NAME: &str = "Default Organization";

/// Commercial tier declared by the package manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginTier {
    #[default]
    Free,
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// Where the plugin's artifacts come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginOrigin {
    #[default]
    Local,
    RemoteProxy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseChannel {
    #[default]
    Stable,
    Beta,
}

macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("unknown {} '{}'", stringify!($ty), other)),
                }
            }
        }
    };
}

text_enum!(PluginTier { Free => "free", Enterprise => "enterprise" });
text_enum!(Visibility { Public => "public", Private => "private" });
text_enum!(PluginOrigin { Local => "local", RemoteProxy => "remote_proxy" });
text_enum!(ReleaseChannel { Stable => "stable", Beta => "beta" });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    pub id: PluginId,
    /// Unique and immutable once created
    pub npm_package_name: String,
    pub display_name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub tier: PluginTier,
    pub visibility: Visibility,
    pub source: PluginOrigin,
    pub latest_version: Option<String>,
    pub icon_url: Option<String>,
    /// Blob key of the icon behind `icon_url`
    #[serde(skip_serializing)]
    pub icon_key: Option<String>,
    pub backend_install_guide: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_url: Option<String>,
    pub max_versions_retention: i32,
    pub publisher_id: OrganizationId,
    /// Comma-joined manifest keywords
    pub keywords: String,
    pub download_count: i64,
    pub verified_publisher: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginVersion {
    pub id: VersionId,
    pub plugin_id: PluginId,
    pub version: String,
    pub readme_content: Option<String>,
    pub config_schema: Value,
    pub config_values: Option<Value>,
    /// Blob key of the artifact, recorded at upload time
    #[serde(skip_serializing, default)]
    pub object_key: String,
    pub download_url: String,
    pub file_size: i64,
    /// Lowercase hex SHA-256 of the uploaded archive
    pub checksum: String,
    pub channel: ReleaseChannel,
    pub download_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_scan_result: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a plugin's first upload
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlugin {
    pub npm_package_name: String,
    pub display_name: String,
    pub description: String,
    pub tier: PluginTier,
    pub visibility: Visibility,
    pub source: PluginOrigin,
    pub max_versions_retention: i32,
    pub publisher_id: OrganizationId,
    pub keywords: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPluginVersion {
    pub plugin_id: PluginId,
    pub version: String,
    pub readme_content: Option<String>,
    pub config_schema: Value,
    pub object_key: String,
    pub download_url: String,
    pub file_size: i64,
    pub checksum: String,
    pub channel: ReleaseChannel,
}

/// Plugin with its publisher and, for detail views, its versions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginDetail {
    #[serde(flatten)]
    pub plugin: Plugin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<Organization>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<PluginVersion>,
}

/// Repository-level filter for listing and search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginQuery {
    pub tier: Option<PluginTier>,
    /// Case-insensitive substring over package name, description and keywords
    pub keyword: Option<String>,
    pub offset: i64,
    pub limit: i64,
}

impl PluginQuery {
    /// Whether `plugin` passes the tier and keyword filters
    pub fn matches(&self, plugin: &Plugin) -> bool {
        if let Some(tier) = self.tier {
            if plugin.tier != tier {
                return false;
            }
        }
        match &self.keyword {
            Some(keyword) => {
                let needle = keyword.to_lowercase();
                plugin.npm_package_name.to_lowercase().contains(&needle)
                    || plugin.description.to_lowercase().contains(&needle)
                    || plugin.keywords.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// One-based page request, clamped to sane bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// A page of results plus the unpaginated match count
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

/// Stored schema and values of one version
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigDocument {
    pub plugin_id: PluginId,
    pub version_id: VersionId,
    pub version: String,
    pub schema: Value,
    pub values: Option<Value>,
}

/// Time-limited link to a version's artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadLink {
    pub url: String,
    pub expires_in_secs: u64,
    pub version: String,
    pub file_size: i64,
    pub checksum: String,
}
