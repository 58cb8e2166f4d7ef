//! Schema migrations
//!
//! SQL lives under `migrations/` and is embedded at compile time.

use plugins_registry_api::{Organization, DEFAULT_ORGANIZATION_NAME};
use sqlx::PgPool;
use tracing::info;

use crate::error::DatabaseResult;
use crate::plugin_repository::upsert_organization;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Apply pending migrations
///
/// # Errors
///
/// `MigrationError` when a migration fails or the applied history diverges.
pub async fn run_migrations(pool: &PgPool) -> DatabaseResult<()> {
    MIGRATOR.run(pool).await?;
    info!(
        migrations = MIGRATOR.iter().count(),
        "Database migrations applied"
    );
    Ok(())
}

/// Make sure the organization that owns anonymous uploads exists
///
/// # Errors
///
/// Query failures, or a row that does not decode.
pub async fn ensure_default_organization(pool: &PgPool) -> DatabaseResult<Organization> {
    let organization = upsert_organization(pool, DEFAULT_ORGANIZATION_NAME).await?;
    info!(organization_id = organization.id, "Default organization ready");
    Ok(organization)
}
