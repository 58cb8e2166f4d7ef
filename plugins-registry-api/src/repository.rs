use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::models::{
    NewPlugin, NewPluginVersion, Organization, OrganizationId, Plugin, PluginId, PluginQuery,
    PluginVersion, VersionId,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),

    /// A uniqueness constraint rejected the write
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Repository backend error: {0}")]
    Backend(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Record store for plugins, their versions and publishers
///
/// Lookups return `Ok(None)` for absent rows; `Err` always means the store
/// itself failed. Deletes are permanent.
#[async_trait]
pub trait PluginRepository: Send + Sync {
    async fn ping(&self) -> RepositoryResult<()>;

    async fn find_plugin(&self, id: PluginId) -> RepositoryResult<Option<Plugin>>;

    async fn find_plugin_by_name(&self, name: &str) -> RepositoryResult<Option<Plugin>>;

    /// Insert a plugin; a taken package name is a `UniqueViolation`
    async fn create_plugin(&self, plugin: NewPlugin) -> RepositoryResult<Plugin>;

    /// Persist latest version, icon and install guide
    async fn update_plugin(&self, plugin: &Plugin) -> RepositoryResult<Plugin>;

    /// Remove the plugin and every version row
    async fn delete_plugin(&self, id: PluginId) -> RepositoryResult<()>;

    /// Matching plugins ordered by id, plus the unpaginated match count
    async fn list_plugins(&self, query: &PluginQuery) -> RepositoryResult<(Vec<Plugin>, i64)>;

    async fn find_version(
        &self,
        plugin_id: PluginId,
        version: &str,
    ) -> RepositoryResult<Option<PluginVersion>>;

    async fn find_version_by_id(
        &self,
        plugin_id: PluginId,
        version_id: VersionId,
    ) -> RepositoryResult<Option<PluginVersion>>;

    async fn list_versions(&self, plugin_id: PluginId) -> RepositoryResult<Vec<PluginVersion>>;

    /// Insert a version; an existing (plugin, version) pair is a `UniqueViolation`
    async fn create_version(&self, version: NewPluginVersion) -> RepositoryResult<PluginVersion>;

    async fn delete_version(&self, version_id: VersionId) -> RepositoryResult<()>;

    /// Overwrite the stored configuration values of a version
    async fn save_config_values(
        &self,
        version_id: VersionId,
        values: &Value,
    ) -> RepositoryResult<()>;

    /// Bump the download counters of a plugin and one of its versions
    async fn record_download(
        &self,
        plugin_id: PluginId,
        version_id: VersionId,
    ) -> RepositoryResult<()>;

    async fn find_organization(
        &self,
        id: OrganizationId,
    ) -> RepositoryResult<Option<Organization>>;

    /// Find the organization by name, creating it when absent
    async fn ensure_organization(&self, name: &str) -> RepositoryResult<Organization>;
}
