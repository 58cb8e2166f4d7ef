//! # Database Layer
//!
//! PostgreSQL persistence for the NextMarket registry:
//!
//! - [`DatabasePool`]: pooled connections with health checks
//! - [`PgPluginRepository`]: the [`plugins_registry_api::PluginRepository`]
//!   implementation backed by `plugins`, `plugin_versions` and `organizations`
//! - [`run_migrations`]: embedded schema migrations
//!
//! ```no_run
//! use database_layer::{DatabasePool, DatabaseSettings, PgPluginRepository};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = DatabasePool::new(&DatabaseSettings::default()).await?;
//! database_layer::run_migrations(pool.pool()).await?;
//! let repository = PgPluginRepository::new(&pool);
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod migrations;
pub mod models;
pub mod plugin_repository;

pub use connection::{DatabasePool, DatabaseSettings};
pub use error::{repository_error, DatabaseError, DatabaseResult};
pub use migrations::{ensure_default_organization, run_migrations};
pub use plugin_repository::PgPluginRepository;
