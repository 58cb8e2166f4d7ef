//! Version retention
//!
//! A plugin keeps at most `max_versions_retention` versions. After each
//! upload the oldest excess versions (by
//! [`compare_versions`](crate::versioning::compare_versions)) are removed
//! together with their artifacts.

use tracing::{info, warn};

use crate::error::RegistryResult;
use crate::models::{PluginId, PluginVersion};
use crate::repository::PluginRepository;
use crate::storage::BlobStore;
use crate::versioning::sort_oldest_first;

/// The versions to remove so that at most `max_retained` remain, oldest first
pub fn select_for_pruning(mut versions: Vec<PluginVersion>, max_retained: usize) -> Vec<PluginVersion> {
    if versions.len() <= max_retained {
        return Vec::new();
    }
    let excess = versions.len() - max_retained;
    sort_oldest_first(&mut versions);
    versions.truncate(excess);
    versions
}

pub struct RetentionPruner<'a> {
    repository: &'a dyn PluginRepository,
    blobs: &'a dyn BlobStore,
}

impl<'a> RetentionPruner<'a> {
    pub fn new(repository: &'a dyn PluginRepository, blobs: &'a dyn BlobStore) -> Self {
        Self { repository, blobs }
    }

    /// Remove the oldest versions of `plugin_id` beyond `max_retained`
    ///
    /// Returns the removed versions. Artifact deletion failures are logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Listing or record deletion failures, as [`crate::RegistryError::Persistence`].
    pub async fn prune(
        &self,
        plugin_id: PluginId,
        max_retained: i32,
    ) -> RegistryResult<Vec<PluginVersion>> {
        let limit = usize::try_from(max_retained.max(1)).unwrap_or(1);
        let versions = self.repository.list_versions(plugin_id).await?;
        let doomed = select_for_pruning(versions, limit);

        for version in &doomed {
            self.repository.delete_version(version.id).await?;
            if let Err(e) = self.blobs.delete(&version.object_key).await {
                warn!(
                    plugin_id,
                    version = %version.version,
                    key = %version.object_key,
                    error = %e,
                    "Failed to delete pruned artifact"
                );
            }
        }

        if !doomed.is_empty() {
            info!(
                plugin_id,
                removed = doomed.len(),
                retained = limit,
                "Pruned old plugin versions"
            );
        }
        Ok(doomed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryPluginRepository, RepoOperation};
    use crate::models::{NewPlugin, NewPluginVersion, PluginOrigin, PluginTier, ReleaseChannel, Visibility};
    use crate::repository::RepositoryError;
    use crate::storage::{InMemoryBlobStore, ARTIFACT_CONTENT_TYPE};
    use crate::versioning::compare_versions;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use serde_json::json;

    async fn plugin_with_versions(
        repo: &InMemoryPluginRepository,
        blobs: &InMemoryBlobStore,
        versions: &[&str],
    ) -> PluginId {
        let plugin = repo
            .create_plugin(NewPlugin {
                npm_package_name: "p".to_string(),
                display_name: "p".to_string(),
                description: String::new(),
                tier: PluginTier::Free,
                visibility: Visibility::Public,
                source: PluginOrigin::Local,
                max_versions_retention: 10,
                publisher_id: 1,
                keywords: String::new(),
            })
            .await
            .unwrap();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        // Seed newest first so insertion order disagrees with precedence
        for (i, version) in versions.iter().rev().enumerate() {
            let key = format!("plugins/p/{version}/p-{version}.tgz");
            blobs.put(&key, vec![0], ARTIFACT_CONTENT_TYPE).await.unwrap();
            repo.seed_version(
                NewPluginVersion {
                    plugin_id: plugin.id,
                    version: (*version).to_string(),
                    readme_content: None,
                    config_schema: json!({}),
                    object_key: key,
                    download_url: String::new(),
                    file_size: 1,
                    checksum: String::new(),
                    channel: ReleaseChannel::Stable,
                },
                base + Duration::seconds(i as i64),
            )
            .await;
        }
        plugin.id
    }

    #[tokio::test]
    async fn test_prunes_two_lowest_of_twelve() {
        let repo = InMemoryPluginRepository::new();
        let blobs = InMemoryBlobStore::new();
        let names: Vec<String> = (0..12).map(|minor| format!("1.{minor}.0")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let plugin_id = plugin_with_versions(&repo, &blobs, &refs).await;

        let removed = RetentionPruner::new(&repo, &blobs).prune(plugin_id, 10).await.unwrap();
        let removed: Vec<&str> = removed.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(removed, vec!["1.0.0", "1.1.0"]);

        let remaining = repo.list_versions(plugin_id).await.unwrap();
        assert_eq!(remaining.len(), 10);
        let min = remaining
            .iter()
            .map(|v| semver::Version::parse(&v.version).unwrap())
            .min()
            .unwrap();
        assert_eq!(min, semver::Version::new(1, 2, 0));

        assert!(!blobs.contains("plugins/p/1.0.0/p-1.0.0.tgz").await);
        assert!(!blobs.contains("plugins/p/1.1.0/p-1.1.0.tgz").await);
        assert!(blobs.contains("plugins/p/1.2.0/p-1.2.0.tgz").await);
    }

    #[tokio::test]
    async fn test_within_limit_is_noop() {
        let repo = InMemoryPluginRepository::new();
        let blobs = InMemoryBlobStore::new();
        let plugin_id = plugin_with_versions(&repo, &blobs, &["1.0.0", "2.0.0"]).await;

        let removed = RetentionPruner::new(&repo, &blobs).prune(plugin_id, 2).await.unwrap();
        assert!(removed.is_empty());
        assert!(blobs.delete_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_blob_failure_does_not_stop_pruning() {
        let repo = InMemoryPluginRepository::new();
        let blobs = InMemoryBlobStore::new();
        let plugin_id = plugin_with_versions(&repo, &blobs, &["1.0.0", "1.1.0", "1.2.0"]).await;
        blobs.fail_deletes_under("plugins/").await;

        let removed = RetentionPruner::new(&repo, &blobs).prune(plugin_id, 1).await.unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(repo.list_versions(plugin_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_record_deletion_failure_propagates() {
        let repo = InMemoryPluginRepository::new();
        let blobs = InMemoryBlobStore::new();
        let plugin_id = plugin_with_versions(&repo, &blobs, &["1.0.0", "1.1.0"]).await;
        repo.fail_on(
            RepoOperation::DeleteVersion,
            RepositoryError::Backend("lock timeout".to_string()),
        )
        .await;

        let result = RetentionPruner::new(&repo, &blobs).prune(plugin_id, 1).await;
        assert!(result.is_err());
        assert_eq!(repo.list_versions(plugin_id).await.unwrap().len(), 2);
    }

    proptest! {
        #[test]
        fn prop_selection_removes_exact_excess(count in 0usize..30, max in 1usize..15) {
            let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            let versions: Vec<PluginVersion> = (0..count)
                .map(|i| PluginVersion {
                    id: i as i64,
                    plugin_id: 1,
                    version: format!("0.{}.0", count - i),
                    readme_content: None,
                    config_schema: json!({}),
                    config_values: None,
                    object_key: String::new(),
                    download_url: String::new(),
                    file_size: 0,
                    checksum: String::new(),
                    channel: ReleaseChannel::Stable,
                    download_count: 0,
                    security_scan_result: None,
                    created_at: base,
                    updated_at: base,
                })
                .collect();

            let selected = select_for_pruning(versions.clone(), max);
            prop_assert_eq!(selected.len(), count.saturating_sub(max));

            // Every removed version ranks below every kept one
            for removed in &selected {
                for kept in versions.iter().filter(|v| !selected.iter().any(|s| s.id == v.id)) {
                    prop_assert!(compare_versions(removed, kept).is_lt());
                }
            }
        }
    }
}
