//! Upload pipeline against in-memory collaborators, including the partial
//! failure states the pipeline deliberately leaves behind.

mod common;

use common::{build_archive, manifest, package, package_with_icon, Harness};
use plugins_registry_api::{
    artifact_key, PluginRepository, PluginTier, RegistryConfig, RegistryError, RepoOperation,
    RepositoryError,
};
use serde_json::json;
use sha2::{Digest, Sha256};

#[tokio::test]
async fn test_fresh_upload_creates_plugin_and_version() {
    let h = Harness::new().await;
    let archive = package(&manifest("weather-widget", "1.0.0"));
    let expected_checksum = hex::encode(Sha256::digest(&archive));
    let size = archive.len() as i64;

    let outcome = h.service.upload_plugin(archive, h.publisher).await.unwrap();

    assert_eq!(h.repo.plugin_count().await, 1);
    assert_eq!(h.repo.version_count().await, 1);
    assert_eq!(outcome.plugin.latest_version.as_deref(), Some("1.0.0"));
    assert_eq!(outcome.plugin.npm_package_name, "weather-widget");
    assert_eq!(outcome.plugin.display_name, "weather-widget");
    assert_eq!(outcome.plugin.keywords, "market,demo");
    assert_eq!(outcome.plugin.tier, PluginTier::Free);
    assert_eq!(outcome.plugin.max_versions_retention, 10);
    assert_eq!(outcome.plugin.publisher_id, h.publisher);

    let version = outcome.version;
    assert_eq!(version.object_key, artifact_key("weather-widget", "1.0.0"));
    assert_eq!(version.file_size, size);
    assert_eq!(version.checksum, expected_checksum);
    assert_eq!(
        version.download_url,
        format!("/api/v1/plugins/{}/versions/1.0.0/download", outcome.plugin.id)
    );
    assert_eq!(version.config_schema, json!({}));
    assert!(h.blobs.contains(&version.object_key).await);
}

#[tokio::test]
async fn test_invalid_versions_rejected_without_side_effects() {
    let h = Harness::new().await;
    for raw in ["v1.0", "latest", "1.0", ""] {
        let err = h
            .service
            .upload_plugin(package(&manifest("bad-version", raw)), h.publisher)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidVersion { .. }), "{raw}: {err}");
    }
    assert_eq!(h.repo.plugin_count().await, 0);
    assert!(h.blobs.operations().await.is_empty());
}

#[tokio::test]
async fn test_duplicate_version_rejected() {
    let h = Harness::new().await;
    h.upload("dup", "1.0.0").await;

    let err = h
        .service
        .upload_plugin(package(&manifest("dup", "1.0.0")), h.publisher)
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::DuplicateVersion { ref version, .. } if version == "1.0.0"));
    assert_eq!(h.repo.version_count().await, 1);
}

#[tokio::test]
async fn test_second_version_moves_latest_pointer() {
    let h = Harness::new().await;
    let first = h.upload("pointer", "1.0.0").await;
    let second = h.upload("pointer", "1.1.0").await;

    assert_eq!(first.plugin.id, second.plugin.id);
    assert_eq!(second.plugin.latest_version.as_deref(), Some("1.1.0"));
    assert_eq!(h.repo.plugin_count().await, 1);
    assert_eq!(h.repo.version_count().await, 2);
}

#[tokio::test]
async fn test_icon_readme_and_install_guide() {
    let h = Harness::new().await;
    let outcome = h
        .service
        .upload_plugin(package_with_icon("iconic", "0.1.0"), h.publisher)
        .await
        .unwrap();

    assert_eq!(outcome.plugin.icon_url.as_deref(), Some("/api/v1/files/icons/iconic.png"));
    assert_eq!(outcome.plugin.icon_key.as_deref(), Some("icons/iconic.png"));
    assert_eq!(outcome.plugin.backend_install_guide.as_deref(), Some("helm install demo"));
    assert_eq!(outcome.version.readme_content.as_deref(), Some("# Readme"));

    let icon = h.service.fetch_icon("iconic.png").await.unwrap();
    assert_eq!(icon.content_type, "image/png");
    assert_eq!(icon.data, b"\x89PNG\r\n");
}

#[tokio::test]
async fn test_icon_upload_failure_is_not_fatal() {
    let h = Harness::new().await;
    h.blobs.fail_puts_under("icons/").await;

    let outcome = h
        .service
        .upload_plugin(package_with_icon("iconless", "0.1.0"), h.publisher)
        .await
        .unwrap();

    assert!(outcome.plugin.icon_url.is_none());
    assert!(outcome.plugin.icon_key.is_none());
    assert_eq!(h.repo.version_count().await, 1);
}

#[tokio::test]
async fn test_enterprise_tier_and_schema_recorded() {
    let h = Harness::new().await;
    let mut m = manifest("corp-sso", "2.0.0");
    m["type"] = json!("enterprise");
    m["nextMarketConfig"] = json!({"required": ["tenant"]});

    let outcome = h.service.upload_plugin(package(&m), h.publisher).await.unwrap();
    assert_eq!(outcome.plugin.tier, PluginTier::Enterprise);
    assert_eq!(outcome.version.config_schema, json!({"required": ["tenant"]}));
}

#[tokio::test]
async fn test_non_object_schema_rejected_before_any_write() {
    let h = Harness::new().await;
    let mut m = manifest("bad-schema", "1.0.0");
    m["nextMarketConfig"] = json!("not a schema");

    let err = h.service.upload_plugin(package(&m), h.publisher).await.unwrap_err();
    assert!(matches!(err, RegistryError::Schema(_)));
    assert_eq!(h.repo.plugin_count().await, 0);
    assert!(h.blobs.operations().await.is_empty());
}

#[tokio::test]
async fn test_malformed_archives() {
    let h = Harness::new().await;

    let err = h
        .service
        .upload_plugin(b"plain bytes".to_vec(), h.publisher)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Parse(_)));

    let err = h
        .service
        .upload_plugin(build_archive(&[("README.md", b"no manifest")]), h.publisher)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Parse(_)));
    assert_eq!(h.repo.plugin_count().await, 0);
}

#[tokio::test]
async fn test_lookup_failure_is_persistence_error() {
    let h = Harness::new().await;
    h.repo
        .fail_on(RepoOperation::FindPlugin, RepositoryError::Backend("pool exhausted".into()))
        .await;

    let err = h
        .service
        .upload_plugin(package(&manifest("x", "1.0.0")), h.publisher)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Persistence(_)));
    assert!(!err.is_client_fault());
    assert!(h.blobs.operations().await.is_empty());
}

#[tokio::test]
async fn test_artifact_storage_failure_leaves_phantom_plugin() {
    let h = Harness::new().await;
    h.blobs.fail_puts_under("plugins/").await;

    let err = h
        .service
        .upload_plugin(package(&manifest("phantom", "1.0.0")), h.publisher)
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::Storage(_)));
    // The plugin row created in step 3 is not rolled back
    let plugin = h.repo.find_plugin_by_name("phantom").await.unwrap().unwrap();
    assert!(plugin.latest_version.is_none());
    assert_eq!(h.repo.version_count().await, 0);
}

#[tokio::test]
async fn test_version_insert_failure_compensates_artifact() {
    let h = Harness::new().await;
    h.repo
        .fail_on(RepoOperation::CreateVersion, RepositoryError::Backend("deadlock".into()))
        .await;

    let err = h
        .service
        .upload_plugin(package(&manifest("compensated", "1.0.0")), h.publisher)
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::Persistence(_)));
    let key = artifact_key("compensated", "1.0.0");
    assert!(!h.blobs.contains(&key).await);
    assert_eq!(h.blobs.delete_calls().await, vec![key]);
    // Phantom plugin with no versions
    assert_eq!(h.repo.plugin_count().await, 1);
    assert_eq!(h.repo.version_count().await, 0);
}

#[tokio::test]
async fn test_lost_race_keeps_winner_artifact() {
    let h = Harness::new().await;
    h.repo
        .fail_on(
            RepoOperation::CreateVersion,
            RepositoryError::UniqueViolation("plugin_versions_plugin_id_version_key".into()),
        )
        .await;

    let err = h
        .service
        .upload_plugin(package(&manifest("raced", "1.0.0")), h.publisher)
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::DuplicateVersion { .. }));
    assert!(h.blobs.contains(&artifact_key("raced", "1.0.0")).await);
    assert!(h.blobs.delete_calls().await.is_empty());
}

#[tokio::test]
async fn test_pointer_update_failure_leaves_committed_version() {
    let h = Harness::new().await;
    h.upload("stale", "1.0.0").await;
    h.repo
        .fail_on(RepoOperation::UpdatePlugin, RepositoryError::Backend("connection reset".into()))
        .await;

    let err = h
        .service
        .upload_plugin(package(&manifest("stale", "1.1.0")), h.publisher)
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::Persistence(_)));
    let plugin = h.repo.find_plugin_by_name("stale").await.unwrap().unwrap();
    assert_eq!(plugin.latest_version.as_deref(), Some("1.0.0"));
    assert!(h.repo.find_version(plugin.id, "1.1.0").await.unwrap().is_some());
}

#[tokio::test]
async fn test_pruning_failure_is_not_fatal() {
    let h = Harness::new().await;
    h.repo
        .fail_on(RepoOperation::ListVersions, RepositoryError::Backend("timeout".into()))
        .await;

    let outcome = h
        .service
        .upload_plugin(package(&manifest("unpruned", "1.0.0")), h.publisher)
        .await
        .unwrap();
    assert!(outcome.pruned.is_empty());
    assert_eq!(outcome.plugin.latest_version.as_deref(), Some("1.0.0"));
}

#[tokio::test]
async fn test_retention_runs_after_upload() {
    let h = Harness::with_config(RegistryConfig {
        default_retention: 3,
        ..Default::default()
    })
    .await;

    for version in ["1.0.0", "1.1.0", "1.2.0"] {
        assert!(h.upload("kept", version).await.pruned.is_empty());
    }
    let outcome = h.upload("kept", "1.3.0").await;

    assert_eq!(outcome.pruned, vec!["1.0.0".to_string()]);
    assert_eq!(h.repo.version_count().await, 3);
    assert!(!h.blobs.contains(&artifact_key("kept", "1.0.0")).await);
    assert!(h.blobs.contains(&artifact_key("kept", "1.3.0")).await);
}

#[tokio::test]
async fn test_pruned_upload_moves_latest_to_survivor() {
    let h = Harness::with_config(RegistryConfig {
        default_retention: 2,
        ..Default::default()
    })
    .await;
    h.upload("backport", "2.0.0").await;
    h.upload("backport", "3.0.0").await;

    // The lowest version is the one retention drops
    let outcome = h.upload("backport", "1.0.0").await;

    assert_eq!(outcome.pruned, vec!["1.0.0".to_string()]);
    assert_eq!(outcome.plugin.latest_version.as_deref(), Some("3.0.0"));
    let stored = h.repo.find_plugin_by_name("backport").await.unwrap().unwrap();
    assert_eq!(stored.latest_version.as_deref(), Some("3.0.0"));
    assert!(h.repo.find_version(stored.id, "1.0.0").await.unwrap().is_none());
    assert!(h.service.download(stored.id, "3.0.0").await.is_ok());
}
