//! Plugin registry core for NextMarket
//!
//! Turns uploaded NPM-style package archives into registry state:
//!
//! - **Archive extraction**: `package.json`, README and icon out of a `.tgz`
//! - **Versioning**: strict SemVer parsing and oldest-first ordering
//! - **Ingestion**: find-or-create plugin, store artifact and icon, record the
//!   version, move the latest pointer, prune
//! - **Retention**: keep at most `max_versions_retention` versions per plugin
//! - **Config validation**: check submitted settings against the schema a
//!   plugin ships in `nextMarketConfig`
//!
//! Persistence and object storage are reached through the
//! [`PluginRepository`] and [`BlobStore`] traits. In-memory implementations
//! of both live here; Postgres and S3 implementations live in
//! `database-layer` and the server.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use plugins_registry_api::{
//!     InMemoryBlobStore, InMemoryPluginRepository, PluginService, RegistryConfig,
//! };
//!
//! # async fn run(archive: Vec<u8>) -> Result<(), plugins_registry_api::RegistryError> {
//! let service = PluginService::new(
//!     Arc::new(InMemoryPluginRepository::new()),
//!     Arc::new(InMemoryBlobStore::new()),
//!     RegistryConfig::default(),
//! );
//!
//! let publisher = service.resolve_publisher().await?;
//! let outcome = service.upload_plugin(archive, publisher).await?;
//! println!("{} is now at {:?}", outcome.plugin.npm_package_name, outcome.plugin.latest_version);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod memory;
pub mod models;
pub mod repository;
pub mod retention;
pub mod schema;
pub mod service;
pub mod storage;
pub mod versioning;

pub use archive::{
    extract_package, extract_package_limited, PackageIcon, PackageManifest, ParsedPackage,
};
pub use config::RegistryConfig;
pub use error::{RegistryError, RegistryResult};
pub use memory::{InMemoryPluginRepository, RepoOperation};
pub use models::*;
pub use repository::{PluginRepository, RepositoryError, RepositoryResult};
pub use retention::{select_for_pruning, RetentionPruner};
pub use schema::ConfigSchema;
pub use service::{PluginService, UploadOutcome};
pub use storage::{
    artifact_key, icon_content_type, icon_key, BlobOperation, BlobResult, BlobStore,
    BlobStoreError, InMemoryBlobStore, StoredObject, ARTIFACT_CONTENT_TYPE,
};
pub use versioning::{compare_versions, parse_version};
