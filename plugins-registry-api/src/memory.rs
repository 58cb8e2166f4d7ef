//! In-memory [`PluginRepository`] for development and testing
//!
//! Enforces the same uniqueness rules as the Postgres schema (package name,
//! `(plugin_id, version)`, organization name) and can be told to fail a given
//! operation, which is how the pipeline's partial-failure behavior is tested.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::models::{
    NewPlugin, NewPluginVersion, Organization, OrganizationId, Plugin, PluginId, PluginQuery,
    PluginVersion, VersionId,
};
use crate::repository::{PluginRepository, RepositoryError, RepositoryResult};

/// Repository operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoOperation {
    Ping,
    FindPlugin,
    CreatePlugin,
    UpdatePlugin,
    DeletePlugin,
    ListPlugins,
    FindVersion,
    ListVersions,
    CreateVersion,
    DeleteVersion,
    SaveConfig,
    RecordDownload,
    EnsureOrganization,
}

#[derive(Debug, Default)]
struct MemoryState {
    plugins: BTreeMap<PluginId, Plugin>,
    versions: BTreeMap<VersionId, PluginVersion>,
    organizations: BTreeMap<OrganizationId, Organization>,
    next_plugin_id: PluginId,
    next_version_id: VersionId,
    next_organization_id: OrganizationId,
    failures: HashMap<RepoOperation, RepositoryError>,
}

impl MemoryState {
    fn check(&self, operation: RepoOperation) -> RepositoryResult<()> {
        match self.failures.get(&operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn insert_version(&mut self, new: NewPluginVersion, created_at: DateTime<Utc>) -> PluginVersion {
        self.next_version_id += 1;
        let version = PluginVersion {
            id: self.next_version_id,
            plugin_id: new.plugin_id,
            version: new.version,
            readme_content: new.readme_content,
            config_schema: new.config_schema,
            config_values: None,
            object_key: new.object_key,
            download_url: new.download_url,
            file_size: new.file_size,
            checksum: new.checksum,
            channel: new.channel,
            download_count: 0,
            security_scan_result: None,
            created_at,
            updated_at: created_at,
        };
        self.versions.insert(version.id, version.clone());
        version
    }
}

#[derive(Clone, Default)]
pub struct InMemoryPluginRepository {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryPluginRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call of `operation` fail with `error`
    pub async fn fail_on(&self, operation: RepoOperation, error: RepositoryError) {
        self.state.write().await.failures.insert(operation, error);
    }

    pub async fn clear_failures(&self) {
        self.state.write().await.failures.clear();
    }

    /// Insert a version row directly with a chosen creation time, bypassing validation
    pub async fn seed_version(
        &self,
        version: NewPluginVersion,
        created_at: DateTime<Utc>,
    ) -> PluginVersion {
        self.state.write().await.insert_version(version, created_at)
    }

    pub async fn plugin_count(&self) -> usize {
        self.state.read().await.plugins.len()
    }

    pub async fn version_count(&self) -> usize {
        self.state.read().await.versions.len()
    }
}

#[async_trait]
impl PluginRepository for InMemoryPluginRepository {
    async fn ping(&self) -> RepositoryResult<()> {
        self.state.read().await.check(RepoOperation::Ping)
    }

    async fn find_plugin(&self, id: PluginId) -> RepositoryResult<Option<Plugin>> {
        let state = self.state.read().await;
        state.check(RepoOperation::FindPlugin)?;
        Ok(state.plugins.get(&id).cloned())
    }

    async fn find_plugin_by_name(&self, name: &str) -> RepositoryResult<Option<Plugin>> {
        let state = self.state.read().await;
        state.check(RepoOperation::FindPlugin)?;
        Ok(state
            .plugins
            .values()
            .find(|p| p.npm_package_name == name)
            .cloned())
    }

    async fn create_plugin(&self, new: NewPlugin) -> RepositoryResult<Plugin> {
        let mut state = self.state.write().await;
        state.check(RepoOperation::CreatePlugin)?;
        if state
            .plugins
            .values()
            .any(|p| p.npm_package_name == new.npm_package_name)
        {
            return Err(RepositoryError::UniqueViolation(format!(
                "plugin {} already exists",
                new.npm_package_name
            )));
        }

        state.next_plugin_id += 1;
        let now = Utc::now();
        let plugin = Plugin {
            id: state.next_plugin_id,
            npm_package_name: new.npm_package_name,
            display_name: new.display_name,
            description: new.description,
            tier: new.tier,
            visibility: new.visibility,
            source: new.source,
            latest_version: None,
            icon_url: None,
            icon_key: None,
            backend_install_guide: None,
            upstream_url: None,
            max_versions_retention: new.max_versions_retention,
            publisher_id: new.publisher_id,
            keywords: new.keywords,
            download_count: 0,
            verified_publisher: false,
            created_at: now,
            updated_at: now,
        };
        state.plugins.insert(plugin.id, plugin.clone());
        Ok(plugin)
    }

    async fn update_plugin(&self, plugin: &Plugin) -> RepositoryResult<Plugin> {
        let mut state = self.state.write().await;
        state.check(RepoOperation::UpdatePlugin)?;
        let stored = state
            .plugins
            .get_mut(&plugin.id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Plugin {}", plugin.id)))?;

        stored.latest_version.clone_from(&plugin.latest_version);
        stored.icon_url.clone_from(&plugin.icon_url);
        stored.icon_key.clone_from(&plugin.icon_key);
        stored
            .backend_install_guide
            .clone_from(&plugin.backend_install_guide);
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_plugin(&self, id: PluginId) -> RepositoryResult<()> {
        let mut state = self.state.write().await;
        state.check(RepoOperation::DeletePlugin)?;
        if state.plugins.remove(&id).is_none() {
            return Err(RepositoryError::NotFound(format!("Plugin {id}")));
        }
        state.versions.retain(|_, v| v.plugin_id != id);
        Ok(())
    }

    async fn list_plugins(&self, query: &PluginQuery) -> RepositoryResult<(Vec<Plugin>, i64)> {
        let state = self.state.read().await;
        state.check(RepoOperation::ListPlugins)?;
        let matching: Vec<&Plugin> = state.plugins.values().filter(|p| query.matches(p)).collect();
        let total = i64::try_from(matching.len()).unwrap_or(i64::MAX);
        let offset = usize::try_from(query.offset).unwrap_or(0);
        let limit = usize::try_from(query.limit).unwrap_or(0);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok((items, total))
    }

    async fn find_version(
        &self,
        plugin_id: PluginId,
        version: &str,
    ) -> RepositoryResult<Option<PluginVersion>> {
        let state = self.state.read().await;
        state.check(RepoOperation::FindVersion)?;
        Ok(state
            .versions
            .values()
            .find(|v| v.plugin_id == plugin_id && v.version == version)
            .cloned())
    }

    async fn find_version_by_id(
        &self,
        plugin_id: PluginId,
        version_id: VersionId,
    ) -> RepositoryResult<Option<PluginVersion>> {
        let state = self.state.read().await;
        state.check(RepoOperation::FindVersion)?;
        Ok(state
            .versions
            .get(&version_id)
            .filter(|v| v.plugin_id == plugin_id)
            .cloned())
    }

    async fn list_versions(&self, plugin_id: PluginId) -> RepositoryResult<Vec<PluginVersion>> {
        let state = self.state.read().await;
        state.check(RepoOperation::ListVersions)?;
        Ok(state
            .versions
            .values()
            .filter(|v| v.plugin_id == plugin_id)
            .cloned()
            .collect())
    }

    async fn create_version(&self, new: NewPluginVersion) -> RepositoryResult<PluginVersion> {
        let mut state = self.state.write().await;
        state.check(RepoOperation::CreateVersion)?;
        if !state.plugins.contains_key(&new.plugin_id) {
            return Err(RepositoryError::NotFound(format!("Plugin {}", new.plugin_id)));
        }
        if state
            .versions
            .values()
            .any(|v| v.plugin_id == new.plugin_id && v.version == new.version)
        {
            return Err(RepositoryError::UniqueViolation(format!(
                "version {} already exists for plugin {}",
                new.version, new.plugin_id
            )));
        }
        Ok(state.insert_version(new, Utc::now()))
    }

    async fn delete_version(&self, version_id: VersionId) -> RepositoryResult<()> {
        let mut state = self.state.write().await;
        state.check(RepoOperation::DeleteVersion)?;
        state
            .versions
            .remove(&version_id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(format!("Version {version_id}")))
    }

    async fn save_config_values(
        &self,
        version_id: VersionId,
        values: &Value,
    ) -> RepositoryResult<()> {
        let mut state = self.state.write().await;
        state.check(RepoOperation::SaveConfig)?;
        let version = state
            .versions
            .get_mut(&version_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Version {version_id}")))?;
        version.config_values = Some(values.clone());
        version.updated_at = Utc::now();
        Ok(())
    }

    async fn record_download(
        &self,
        plugin_id: PluginId,
        version_id: VersionId,
    ) -> RepositoryResult<()> {
        let mut state = self.state.write().await;
        state.check(RepoOperation::RecordDownload)?;
        if !state
            .versions
            .get(&version_id)
            .is_some_and(|v| v.plugin_id == plugin_id)
        {
            return Err(RepositoryError::NotFound(format!("Version {version_id}")));
        }
        let plugin = state
            .plugins
            .get_mut(&plugin_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Plugin {plugin_id}")))?;
        plugin.download_count += 1;
        let version = state
            .versions
            .get_mut(&version_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Version {version_id}")))?;
        version.download_count += 1;
        Ok(())
    }

    async fn find_organization(
        &self,
        id: OrganizationId,
    ) -> RepositoryResult<Option<Organization>> {
        Ok(self.state.read().await.organizations.get(&id).cloned())
    }

    async fn ensure_organization(&self, name: &str) -> RepositoryResult<Organization> {
        let mut state = self.state.write().await;
        state.check(RepoOperation::EnsureOrganization)?;
        if let Some(existing) = state.organizations.values().find(|o| o.name == name) {
            return Ok(existing.clone());
        }
        state.next_organization_id += 1;
        let now = Utc::now();
        let organization = Organization {
            id: state.next_organization_id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        state
            .organizations
            .insert(organization.id, organization.clone());
        Ok(organization)
    }
}
