//! Shared fixtures: in-process package archives and a wired service

#![allow(dead_code)]

use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;
use plugins_registry_api::{
    InMemoryBlobStore, InMemoryPluginRepository, PluginService, RegistryConfig,
};
use serde_json::{json, Value};

/// Build a `.tgz` with entries under `package/`
pub fn build_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("package/{path}"), *data)
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn manifest(name: &str, version: &str) -> Value {
    json!({
        "name": name,
        "version": version,
        "description": format!("{name} plugin"),
        "keywords": ["market", "demo"],
    })
}

/// Archive containing just `package.json`
pub fn package(manifest: &Value) -> Vec<u8> {
    let body = serde_json::to_vec(manifest).unwrap();
    build_archive(&[("package.json", &body)])
}

/// Archive with manifest, README and a PNG icon
pub fn package_with_icon(name: &str, version: &str) -> Vec<u8> {
    let mut manifest = manifest(name, version);
    manifest["icon"] = json!("icon.png");
    manifest["backendInstallDoc"] = json!("helm install demo");
    let body = serde_json::to_vec(&manifest).unwrap();
    build_archive(&[
        ("package.json", &body),
        ("README.md", b"# Readme"),
        ("icon.png", b"\x89PNG\r\n"),
    ])
}

pub struct Harness {
    pub repo: InMemoryPluginRepository,
    pub blobs: InMemoryBlobStore,
    pub service: PluginService,
    pub publisher: i64,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(RegistryConfig::default()).await
    }

    pub async fn with_config(config: RegistryConfig) -> Self {
        let repo = InMemoryPluginRepository::new();
        let blobs = InMemoryBlobStore::new();
        let service = PluginService::new(
            Arc::new(repo.clone()),
            Arc::new(blobs.clone()),
            config,
        );
        let publisher = service.resolve_publisher().await.unwrap();
        Self {
            repo,
            blobs,
            service,
            publisher,
        }
    }

    pub async fn upload(&self, name: &str, version: &str) -> plugins_registry_api::UploadOutcome {
        self.service
            .upload_plugin(package(&manifest(name, version)), self.publisher)
            .await
            .unwrap()
    }
}
