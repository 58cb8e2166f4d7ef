//! Plugin service: the upload pipeline and the operations around it

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, instrument, warn};

use crate::archive::extract_package;
use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::models::{
    ConfigDocument, DownloadLink, NewPlugin, NewPluginVersion, Organization, OrganizationId, Page,
    PageRequest, Plugin, PluginDetail, PluginId, PluginOrigin, PluginQuery, PluginTier,
    PluginVersion, ReleaseChannel, VersionId, Visibility, DEFAULT_ORGANIZATION_NAME,
};
use crate::repository::{PluginRepository, RepositoryError};
use crate::retention::RetentionPruner;
use crate::schema::{self, ConfigSchema};
use crate::storage::{
    artifact_key, icon_content_type, icon_key, BlobStore, StoredObject, ARTIFACT_CONTENT_TYPE,
};
use crate::versioning::{compare_versions, parse_version};

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadOutcome {
    pub plugin: Plugin,
    pub version: PluginVersion,
    /// Version strings removed by retention
    pub pruned: Vec<String>,
}

pub struct PluginService {
    repository: Arc<dyn PluginRepository>,
    blobs: Arc<dyn BlobStore>,
    config: RegistryConfig,
    /// Default organization id, resolved once
    default_publisher: OnceCell<OrganizationId>,
}

impl PluginService {
    pub fn new(
        repository: Arc<dyn PluginRepository>,
        blobs: Arc<dyn BlobStore>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            repository,
            blobs,
            config,
            default_publisher: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Publisher id for uploads: the configured override or the default organization
    ///
    /// The default organization is ensured on first use and its id reused after.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Persistence`] when the organization cannot be ensured.
    pub async fn resolve_publisher(&self) -> RegistryResult<OrganizationId> {
        if let Some(id) = self.config.publisher_id {
            return Ok(id);
        }
        self.default_publisher
            .get_or_try_init(|| async {
                self.repository
                    .ensure_organization(DEFAULT_ORGANIZATION_NAME)
                    .await
                    .map(|organization| organization.id)
                    .map_err(persistence("ensure default organization"))
            })
            .await
            .copied()
    }

    /// # Errors
    ///
    /// [`RegistryError::Persistence`] when the record store is unreachable.
    pub async fn health_check(&self) -> RegistryResult<()> {
        self.repository
            .ping()
            .await
            .map_err(persistence("ping record store"))
    }

    /// Ingest one package archive
    ///
    /// Parsing, version and schema checks run before anything is written. The
    /// plugin record created for a new package name is kept even if a later
    /// step fails. A failed version insert removes the artifact it just
    /// uploaded unless the insert lost a race for the same version, in which
    /// case the object at that key belongs to the winner. A failed pointer
    /// update leaves the committed version in place. Icon upload and pruning
    /// failures are logged only. When retention removes the uploaded version
    /// itself, `latest_version` moves to the highest surviving version.
    ///
    /// # Errors
    ///
    /// `Parse`, `InvalidVersion`, `Schema`, `DuplicateVersion`, `Storage` or
    /// `Persistence` per the failing step.
    #[instrument(skip(self, archive), fields(size = archive.len()))]
    pub async fn upload_plugin(
        &self,
        archive: Vec<u8>,
        publisher_id: OrganizationId,
    ) -> RegistryResult<UploadOutcome> {
        let parsed = extract_package(Cursor::new(archive.as_slice()))?;
        let name = parsed.manifest.name.clone();
        let version = parsed.manifest.version.clone();

        parse_version(&version)?;
        let config_schema = parsed.config_schema()?;

        info!(plugin = %name, version = %version, "Upload accepted");

        let mut plugin = match self
            .repository
            .find_plugin_by_name(&name)
            .await
            .map_err(persistence("look up plugin"))?
        {
            Some(existing) => existing,
            None => {
                self.create_plugin(NewPlugin {
                    npm_package_name: name.clone(),
                    display_name: name.clone(),
                    description: parsed.manifest.description.clone(),
                    tier: parsed.tier(),
                    visibility: Visibility::Public,
                    source: PluginOrigin::Local,
                    max_versions_retention: self.config.effective_retention(),
                    publisher_id,
                    keywords: parsed.keywords_joined(),
                })
                .await?
            }
        };

        // Fast path only; the unique constraint on insert is authoritative
        if self
            .repository
            .find_version(plugin.id, &version)
            .await
            .map_err(persistence("look up version"))?
            .is_some()
        {
            return Err(RegistryError::DuplicateVersion {
                package: name,
                version,
            });
        }

        let object_key = artifact_key(&name, &version);
        let file_size = i64::try_from(archive.len()).unwrap_or(i64::MAX);
        let checksum = hex::encode(Sha256::digest(&archive));
        self.blobs
            .put(&object_key, archive, ARTIFACT_CONTENT_TYPE)
            .await
            .map_err(|e| RegistryError::Storage(format!("failed to upload plugin file: {e}")))?;
        info!(plugin = %name, version = %version, key = %object_key, "Artifact stored");

        let mut stored_icon: Option<(String, String)> = None;
        if let Some(icon) = &parsed.icon {
            let key = icon_key(&name, &icon.extension);
            match self
                .blobs
                .put(&key, icon.data.clone(), icon_content_type(&icon.extension))
                .await
            {
                Ok(()) => stored_icon = Some((self.config.icon_url(&key), key)),
                Err(e) => {
                    warn!(plugin = %name, key = %key, error = %e, "Icon upload failed, continuing without icon");
                }
            }
        }

        let created = self
            .repository
            .create_version(NewPluginVersion {
                plugin_id: plugin.id,
                version: version.clone(),
                readme_content: parsed.readme.clone(),
                config_schema,
                object_key: object_key.clone(),
                download_url: self.config.download_url(plugin.id, &version),
                file_size,
                checksum,
                channel: ReleaseChannel::Stable,
            })
            .await;

        let created = match created {
            Ok(created) => created,
            Err(RepositoryError::UniqueViolation(_)) => {
                warn!(plugin = %name, version = %version, "Lost concurrent upload of the same version");
                return Err(RegistryError::DuplicateVersion {
                    package: name,
                    version,
                });
            }
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&object_key).await {
                    error!(
                        plugin = %name,
                        version = %version,
                        key = %object_key,
                        error = %cleanup,
                        "Compensating artifact delete failed"
                    );
                } else {
                    info!(plugin = %name, version = %version, key = %object_key, "Compensated: artifact removed");
                }
                return Err(RegistryError::Persistence(format!(
                    "failed to create version: {e}"
                )));
            }
        };

        plugin.latest_version = Some(version.clone());
        if let Some((url, key)) = stored_icon {
            plugin.icon_url = Some(url);
            plugin.icon_key = Some(key);
        }
        if let Some(guide) = parsed
            .manifest
            .backend_install_doc
            .as_ref()
            .filter(|g| !g.is_empty())
        {
            plugin.backend_install_guide = Some(guide.clone());
        }
        let mut plugin = self
            .repository
            .update_plugin(&plugin)
            .await
            .map_err(persistence("update plugin"))?;

        let pruned: Vec<String> =
            match RetentionPruner::new(self.repository.as_ref(), self.blobs.as_ref())
                .prune(plugin.id, plugin.max_versions_retention)
                .await
            {
                Ok(removed) => removed.into_iter().map(|v| v.version).collect(),
                Err(e) => {
                    warn!(plugin = %name, error = %e, "Failed to prune old versions");
                    Vec::new()
                }
            };
        if let Err(e) = self.repoint_latest(&mut plugin, &pruned).await {
            warn!(plugin = %name, error = %e, "Failed to move latest version off a pruned version");
        }

        Ok(UploadOutcome {
            plugin,
            version: created,
            pruned,
        })
    }

    async fn create_plugin(&self, new: NewPlugin) -> RegistryResult<Plugin> {
        let name = new.npm_package_name.clone();
        match self.repository.create_plugin(new).await {
            Ok(plugin) => {
                info!(plugin = %plugin.npm_package_name, plugin_id = plugin.id, "Plugin created");
                Ok(plugin)
            }
            // Another upload created it first
            Err(RepositoryError::UniqueViolation(_)) => self
                .repository
                .find_plugin_by_name(&name)
                .await
                .map_err(persistence("look up plugin"))?
                .ok_or_else(|| RegistryError::Persistence(format!("plugin {name} vanished after conflict"))),
            Err(e) => Err(RegistryError::Persistence(format!(
                "failed to create plugin: {e}"
            ))),
        }
    }

    /// Run retention for one plugin outside the upload path
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown plugin, `Persistence` when records cannot be removed.
    pub async fn prune_versions(&self, plugin_id: PluginId) -> RegistryResult<Vec<String>> {
        let mut plugin = self.require_plugin(plugin_id).await?;
        let removed: Vec<String> =
            RetentionPruner::new(self.repository.as_ref(), self.blobs.as_ref())
                .prune(plugin.id, plugin.max_versions_retention)
                .await?
                .into_iter()
                .map(|v| v.version)
                .collect();
        self.repoint_latest(&mut plugin, &removed).await?;
        Ok(removed)
    }

    /// Point `latest_version` at the highest surviving version when retention
    /// removed the one it named
    async fn repoint_latest(&self, plugin: &mut Plugin, removed: &[String]) -> RegistryResult<()> {
        let Some(latest) = plugin.latest_version.as_ref() else {
            return Ok(());
        };
        if !removed.contains(latest) {
            return Ok(());
        }
        let survivors = self
            .repository
            .list_versions(plugin.id)
            .await
            .map_err(persistence("list versions"))?;
        let successor = survivors
            .iter()
            .max_by(|a, b| compare_versions(a, b))
            .map(|v| v.version.clone());
        info!(
            plugin = %plugin.npm_package_name,
            from = %latest,
            to = successor.as_deref().unwrap_or("none"),
            "Latest version pruned, repointing"
        );
        plugin.latest_version = successor;
        *plugin = self
            .repository
            .update_plugin(plugin)
            .await
            .map_err(persistence("update plugin"))?;
        Ok(())
    }

    /// # Errors
    ///
    /// `Persistence` when the listing query fails.
    pub async fn list_plugins(
        &self,
        page: PageRequest,
        tier: Option<PluginTier>,
    ) -> RegistryResult<Page<PluginDetail>> {
        self.query_page(
            PluginQuery {
                tier,
                keyword: None,
                offset: page.offset(),
                limit: page.limit(),
            },
            page,
        )
        .await
    }

    /// Case-insensitive substring search over name, description and keywords
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for a blank keyword, `Persistence` when the query fails.
    pub async fn search_plugins(
        &self,
        keyword: &str,
        page: PageRequest,
    ) -> RegistryResult<Page<PluginDetail>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(RegistryError::InvalidRequest(
                "search keyword is required".to_string(),
            ));
        }
        self.query_page(
            PluginQuery {
                tier: None,
                keyword: Some(keyword.to_string()),
                offset: page.offset(),
                limit: page.limit(),
            },
            page,
        )
        .await
    }

    async fn query_page(
        &self,
        query: PluginQuery,
        page: PageRequest,
    ) -> RegistryResult<Page<PluginDetail>> {
        let (plugins, total) = self
            .repository
            .list_plugins(&query)
            .await
            .map_err(persistence("list plugins"))?;

        let mut publishers: HashMap<OrganizationId, Option<Organization>> = HashMap::new();
        let mut items = Vec::with_capacity(plugins.len());
        for plugin in plugins {
            let publisher = match publishers.get(&plugin.publisher_id) {
                Some(cached) => cached.clone(),
                None => {
                    let found = self.publisher_of(&plugin).await?;
                    publishers.insert(plugin.publisher_id, found.clone());
                    found
                }
            };
            items.push(PluginDetail {
                plugin,
                publisher,
                versions: Vec::new(),
            });
        }

        Ok(Page {
            items,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    /// Plugin with publisher and versions, newest version first
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub async fn get_plugin(&self, id: PluginId) -> RegistryResult<PluginDetail> {
        let plugin = self.require_plugin(id).await?;
        self.detail(plugin).await
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown package name.
    pub async fn get_plugin_by_name(&self, name: &str) -> RegistryResult<PluginDetail> {
        let plugin = self
            .repository
            .find_plugin_by_name(name)
            .await
            .map_err(persistence("look up plugin"))?
            .ok_or_else(|| RegistryError::NotFound(format!("Plugin {name}")))?;
        self.detail(plugin).await
    }

    async fn detail(&self, plugin: Plugin) -> RegistryResult<PluginDetail> {
        let publisher = self.publisher_of(&plugin).await?;
        let mut versions = self
            .repository
            .list_versions(plugin.id)
            .await
            .map_err(persistence("list versions"))?;
        versions.sort_by(|a, b| compare_versions(b, a));
        Ok(PluginDetail {
            plugin,
            publisher,
            versions,
        })
    }

    async fn publisher_of(&self, plugin: &Plugin) -> RegistryResult<Option<Organization>> {
        self.repository
            .find_organization(plugin.publisher_id)
            .await
            .map_err(persistence("look up publisher"))
    }

    async fn require_plugin(&self, id: PluginId) -> RegistryResult<Plugin> {
        self.repository
            .find_plugin(id)
            .await
            .map_err(persistence("look up plugin"))?
            .ok_or_else(|| RegistryError::NotFound(format!("Plugin {id}")))
    }

    async fn require_version(
        &self,
        plugin_id: PluginId,
        version_id: VersionId,
    ) -> RegistryResult<PluginVersion> {
        self.repository
            .find_version_by_id(plugin_id, version_id)
            .await
            .map_err(persistence("look up version"))?
            .ok_or_else(|| RegistryError::NotFound("Plugin version".to_string()))
    }

    /// Validate `values` against the version's schema and store them
    ///
    /// Replaces any previously stored values.
    ///
    /// # Errors
    ///
    /// `NotFound`, `SchemaMissing`, `Schema`, `Validation`, `InvalidRequest`
    /// for a non-object body, or `Persistence`.
    pub async fn save_config(
        &self,
        plugin_id: PluginId,
        version_id: VersionId,
        values: Value,
    ) -> RegistryResult<()> {
        let version = self.require_version(plugin_id, version_id).await?;
        if schema::is_absent(&version.config_schema) {
            return Err(RegistryError::SchemaMissing);
        }
        let Value::Object(submitted) = &values else {
            return Err(RegistryError::InvalidRequest(
                "configuration values must be a JSON object".to_string(),
            ));
        };

        ConfigSchema::from_value(&version.config_schema)?.validate(submitted)?;

        self.repository
            .save_config_values(version.id, &values)
            .await
            .map_err(persistence("save config"))?;
        info!(plugin_id, version = %version.version, fields = submitted.len(), "Config saved");
        Ok(())
    }

    /// Stored schema and values of a version
    ///
    /// # Errors
    ///
    /// `NotFound` when the (plugin, version) pair does not exist.
    pub async fn get_config(
        &self,
        plugin_id: PluginId,
        version_id: VersionId,
    ) -> RegistryResult<ConfigDocument> {
        let version = self.require_version(plugin_id, version_id).await?;
        Ok(ConfigDocument {
            plugin_id,
            version_id: version.id,
            version: version.version,
            schema: version.config_schema,
            values: version.config_values,
        })
    }

    /// Permanently delete a plugin, its versions and their blobs
    ///
    /// One blob delete per version using its stored key, then one for the
    /// icon when the plugin has one. Blob failures are logged and do not stop
    /// record deletion.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `Persistence` when records cannot be removed.
    #[instrument(skip(self))]
    pub async fn delete_plugin(&self, id: PluginId) -> RegistryResult<()> {
        let plugin = self.require_plugin(id).await?;
        let versions = self
            .repository
            .list_versions(id)
            .await
            .map_err(persistence("list versions"))?;

        let mut blob_failures = 0usize;
        for version in &versions {
            if let Err(e) = self.blobs.delete(&version.object_key).await {
                blob_failures += 1;
                warn!(
                    plugin = %plugin.npm_package_name,
                    version = %version.version,
                    key = %version.object_key,
                    error = %e,
                    "Failed to delete artifact"
                );
            }
        }
        if let Some(key) = &plugin.icon_key {
            if let Err(e) = self.blobs.delete(key).await {
                blob_failures += 1;
                warn!(plugin = %plugin.npm_package_name, key = %key, error = %e, "Failed to delete icon");
            }
        }

        self.repository
            .delete_plugin(id)
            .await
            .map_err(persistence("delete plugin"))?;

        info!(
            plugin = %plugin.npm_package_name,
            versions = versions.len(),
            blob_failures,
            "Plugin deleted"
        );
        Ok(())
    }

    /// Presigned artifact URL; counts the download
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown plugin or version, `Storage` when signing fails.
    pub async fn download(&self, plugin_id: PluginId, version: &str) -> RegistryResult<DownloadLink> {
        let plugin = self.require_plugin(plugin_id).await?;
        let record = self
            .repository
            .find_version(plugin.id, version)
            .await
            .map_err(persistence("look up version"))?
            .ok_or_else(|| {
                RegistryError::NotFound(format!("Version {version} of {}", plugin.npm_package_name))
            })?;

        let ttl = self.config.presign_ttl();
        let url = self
            .blobs
            .presigned_download_url(&record.object_key, ttl)
            .await
            .map_err(|e| RegistryError::Storage(format!("failed to presign download: {e}")))?;

        if let Err(e) = self.repository.record_download(plugin.id, record.id).await {
            warn!(plugin = %plugin.npm_package_name, version = %record.version, error = %e, "Failed to count download");
        }
        debug!(plugin = %plugin.npm_package_name, version = %record.version, "Download link issued");

        Ok(DownloadLink {
            url,
            expires_in_secs: ttl.as_secs(),
            version: record.version,
            file_size: record.file_size,
            checksum: record.checksum,
        })
    }

    /// Read a stored icon by file name, e.g. `demo-plugin.png`
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for names that escape the icon prefix, `NotFound` for
    /// missing objects, `Storage` for backend failures.
    pub async fn fetch_icon(&self, file: &str) -> RegistryResult<StoredObject> {
        if file.is_empty() || file.starts_with('/') || file.split('/').any(|seg| seg == "..") {
            return Err(RegistryError::InvalidRequest(format!(
                "invalid icon path '{file}'"
            )));
        }
        Ok(self.blobs.get(&format!("icons/{file}")).await?)
    }
}

fn persistence(action: &'static str) -> impl Fn(RepositoryError) -> RegistryError {
    move |e| match e {
        RepositoryError::NotFound(what) => RegistryError::NotFound(what),
        other => RegistryError::Persistence(format!("failed to {action}: {other}")),
    }
}
