//! Postgres-backed [`PluginRepository`]

use async_trait::async_trait;
use plugins_registry_api::{
    NewPlugin, NewPluginVersion, Organization, OrganizationId, Plugin, PluginId, PluginQuery,
    PluginRepository, PluginVersion, RepositoryError, RepositoryResult, VersionId,
};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::connection::DatabasePool;
use crate::error::{repository_error, DatabaseError};
use crate::models::{OrganizationRow, PluginRow, VersionRow, PLUGIN_COLUMNS, VERSION_COLUMNS};

fn decode<R, T>(row: R) -> RepositoryResult<T>
where
    T: TryFrom<R, Error = DatabaseError>,
{
    T::try_from(row).map_err(RepositoryError::from)
}

fn decode_all<R, T>(rows: Vec<R>) -> RepositoryResult<Vec<T>>
where
    T: TryFrom<R, Error = DatabaseError>,
{
    rows.into_iter().map(decode).collect()
}

/// `ILIKE` pattern matching `keyword` anywhere, with wildcards in the keyword escaped
fn contains_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Insert the organization named `name`, or return the existing row
pub(crate) async fn upsert_organization(
    pool: &PgPool,
    name: &str,
) -> Result<Organization, sqlx::Error> {
    let row: OrganizationRow = sqlx::query_as(
        r#"
        INSERT INTO organizations (name)
        VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id, name, created_at, updated_at
        "#,
    )
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(Organization::from(row))
}

#[derive(Clone)]
pub struct PgPluginRepository {
    pool: PgPool,
}

impl PgPluginRepository {
    pub fn new(pool: &DatabasePool) -> Self {
        Self {
            pool: pool.pool().clone(),
        }
    }
}

#[async_trait]
impl PluginRepository for PgPluginRepository {
    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(repository_error)?;
        Ok(())
    }

    async fn find_plugin(&self, id: PluginId) -> RepositoryResult<Option<Plugin>> {
        let sql = format!("SELECT {PLUGIN_COLUMNS} FROM plugins WHERE id = $1");
        let row: Option<PluginRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(repository_error)?;
        row.map(decode).transpose()
    }

    async fn find_plugin_by_name(&self, name: &str) -> RepositoryResult<Option<Plugin>> {
        let sql = format!("SELECT {PLUGIN_COLUMNS} FROM plugins WHERE npm_package_name = $1");
        let row: Option<PluginRow> = sqlx::query_as(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(repository_error)?;
        row.map(decode).transpose()
    }

    async fn create_plugin(&self, plugin: NewPlugin) -> RepositoryResult<Plugin> {
        let sql = format!(
            r#"
            INSERT INTO plugins (
                npm_package_name, display_name, description, type, visibility, source,
                max_versions_retention, publisher_id, keywords
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PLUGIN_COLUMNS}
            "#
        );
        let row: PluginRow = sqlx::query_as(&sql)
            .bind(&plugin.npm_package_name)
            .bind(&plugin.display_name)
            .bind(&plugin.description)
            .bind(plugin.tier.as_str())
            .bind(plugin.visibility.as_str())
            .bind(plugin.source.as_str())
            .bind(plugin.max_versions_retention)
            .bind(plugin.publisher_id)
            .bind(&plugin.keywords)
            .fetch_one(&self.pool)
            .await
            .map_err(repository_error)?;

        info!(plugin_id = row.id, name = %row.npm_package_name, "Created plugin");
        decode(row)
    }

    async fn update_plugin(&self, plugin: &Plugin) -> RepositoryResult<Plugin> {
        let sql = format!(
            r#"
            UPDATE plugins
            SET latest_version = $2,
                icon_url = $3,
                icon_key = $4,
                backend_install_guide = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PLUGIN_COLUMNS}
            "#
        );
        let row: Option<PluginRow> = sqlx::query_as(&sql)
            .bind(plugin.id)
            .bind(&plugin.latest_version)
            .bind(&plugin.icon_url)
            .bind(&plugin.icon_key)
            .bind(&plugin.backend_install_guide)
            .fetch_optional(&self.pool)
            .await
            .map_err(repository_error)?;

        match row {
            Some(row) => decode(row),
            None => Err(RepositoryError::NotFound(format!("Plugin {}", plugin.id))),
        }
    }

    async fn delete_plugin(&self, id: PluginId) -> RepositoryResult<()> {
        // Version rows go with the plugin through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM plugins WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(repository_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Plugin {id}")));
        }
        info!(plugin_id = id, "Deleted plugin");
        Ok(())
    }

    async fn list_plugins(&self, query: &PluginQuery) -> RepositoryResult<(Vec<Plugin>, i64)> {
        let tier = query.tier.map(|t| t.as_str());
        let pattern = query.keyword.as_deref().map(contains_pattern);
        let filter = r#"
            WHERE ($1::TEXT IS NULL OR type = $1)
              AND ($2::TEXT IS NULL
                   OR npm_package_name ILIKE $2
                   OR description ILIKE $2
                   OR keywords ILIKE $2)
        "#;

        let count_sql = format!("SELECT COUNT(*) FROM plugins {filter}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(tier)
            .bind(pattern.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(repository_error)?;

        let page_sql = format!(
            "SELECT {PLUGIN_COLUMNS} FROM plugins {filter} ORDER BY id OFFSET $3 LIMIT $4"
        );
        let rows: Vec<PluginRow> = sqlx::query_as(&page_sql)
            .bind(tier)
            .bind(pattern.as_deref())
            .bind(query.offset)
            .bind(query.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(repository_error)?;

        debug!(total, returned = rows.len(), "Listed plugins");
        Ok((decode_all(rows)?, total))
    }

    async fn find_version(
        &self,
        plugin_id: PluginId,
        version: &str,
    ) -> RepositoryResult<Option<PluginVersion>> {
        let sql = format!(
            "SELECT {VERSION_COLUMNS} FROM plugin_versions WHERE plugin_id = $1 AND version = $2"
        );
        let row: Option<VersionRow> = sqlx::query_as(&sql)
            .bind(plugin_id)
            .bind(version)
            .fetch_optional(&self.pool)
            .await
            .map_err(repository_error)?;
        row.map(decode).transpose()
    }

    async fn find_version_by_id(
        &self,
        plugin_id: PluginId,
        version_id: VersionId,
    ) -> RepositoryResult<Option<PluginVersion>> {
        let sql = format!(
            "SELECT {VERSION_COLUMNS} FROM plugin_versions WHERE id = $1 AND plugin_id = $2"
        );
        let row: Option<VersionRow> = sqlx::query_as(&sql)
            .bind(version_id)
            .bind(plugin_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(repository_error)?;
        row.map(decode).transpose()
    }

    async fn list_versions(&self, plugin_id: PluginId) -> RepositoryResult<Vec<PluginVersion>> {
        let sql =
            format!("SELECT {VERSION_COLUMNS} FROM plugin_versions WHERE plugin_id = $1 ORDER BY id");
        let rows: Vec<VersionRow> = sqlx::query_as(&sql)
            .bind(plugin_id)
            .fetch_all(&self.pool)
            .await
            .map_err(repository_error)?;
        decode_all(rows)
    }

    async fn create_version(&self, version: NewPluginVersion) -> RepositoryResult<PluginVersion> {
        let sql = format!(
            r#"
            INSERT INTO plugin_versions (
                plugin_id, version, readme_content, config_schema, object_key,
                download_url, file_size, checksum, channel
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {VERSION_COLUMNS}
            "#
        );
        let row: VersionRow = sqlx::query_as(&sql)
            .bind(version.plugin_id)
            .bind(&version.version)
            .bind(&version.readme_content)
            .bind(&version.config_schema)
            .bind(&version.object_key)
            .bind(&version.download_url)
            .bind(version.file_size)
            .bind(&version.checksum)
            .bind(version.channel.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(repository_error)?;

        info!(
            plugin_id = row.plugin_id,
            version = %row.version,
            version_id = row.id,
            "Created plugin version"
        );
        decode(row)
    }

    async fn delete_version(&self, version_id: VersionId) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM plugin_versions WHERE id = $1")
            .bind(version_id)
            .execute(&self.pool)
            .await
            .map_err(repository_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Version {version_id}")));
        }
        debug!(version_id, "Deleted plugin version");
        Ok(())
    }

    async fn save_config_values(
        &self,
        version_id: VersionId,
        values: &Value,
    ) -> RepositoryResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE plugin_versions
            SET config_values = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(version_id)
        .bind(values)
        .execute(&self.pool)
        .await
        .map_err(repository_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Version {version_id}")));
        }
        Ok(())
    }

    async fn record_download(
        &self,
        plugin_id: PluginId,
        version_id: VersionId,
    ) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await.map_err(repository_error)?;

        let bumped = sqlx::query(
            r#"
            UPDATE plugin_versions
            SET download_count = download_count + 1
            WHERE id = $1 AND plugin_id = $2
            "#,
        )
        .bind(version_id)
        .bind(plugin_id)
        .execute(&mut *tx)
        .await
        .map_err(repository_error)?;

        if bumped.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Version {version_id}")));
        }

        sqlx::query("UPDATE plugins SET download_count = download_count + 1 WHERE id = $1")
            .bind(plugin_id)
            .execute(&mut *tx)
            .await
            .map_err(repository_error)?;

        tx.commit().await.map_err(repository_error)?;
        Ok(())
    }

    async fn find_organization(
        &self,
        id: OrganizationId,
    ) -> RepositoryResult<Option<Organization>> {
        let row: Option<OrganizationRow> = sqlx::query_as(
            "SELECT id, name, created_at, updated_at FROM organizations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(repository_error)?;
        Ok(row.map(Organization::from))
    }

    async fn ensure_organization(&self, name: &str) -> RepositoryResult<Organization> {
        upsert_organization(&self.pool, name)
            .await
            .map_err(repository_error)
    }
}
