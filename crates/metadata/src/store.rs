//! Site metadata store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{NewSite, SiteRow};
use crate::repos::SiteRepo;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;

/// Combined site metadata store trait.
#[async_trait]
pub trait MetadataStore: SiteRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based site metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection avoids
            // persistent "database is locked" failures under test/axum concurrency.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

impl From<std::io::Error> for MetadataError {
    fn from(e: std::io::Error) -> Self {
        MetadataError::Config(e.to_string())
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SiteRepo for SqliteStore {
    async fn create_site(&self, site: &NewSite) -> MetadataResult<SiteRow> {
        let now = OffsetDateTime::now_utc();
        let row = sqlx::query_as::<_, SiteRow>(
            r#"
            INSERT INTO sites (name, public, salt_user_ids, block_bots, domains, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&site.name)
        .bind(site.public)
        .bind(site.salt_user_ids)
        .bind(site.block_bots)
        .bind(SiteRow::encode_domains(&site.domains))
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_site(&self, site_id: i64) -> MetadataResult<Option<SiteRow>> {
        let row = sqlx::query_as::<_, SiteRow>("SELECT * FROM sites WHERE site_id = ?")
            .bind(site_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_sites(&self) -> MetadataResult<Vec<SiteRow>> {
        let rows = sqlx::query_as::<_, SiteRow>("SELECT * FROM sites ORDER BY site_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update_site(&self, site: &SiteRow) -> MetadataResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sites
            SET name = ?, public = ?, salt_user_ids = ?, block_bots = ?, domains = ?, updated_at = ?
            WHERE site_id = ?
            "#,
        )
        .bind(&site.name)
        .bind(site.public)
        .bind(site.salt_user_ids)
        .bind(site.block_bots)
        .bind(&site.domains)
        .bind(site.updated_at)
        .bind(site.site_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!("site {}", site.site_id)));
        }
        Ok(())
    }

    async fn delete_site(&self, site_id: i64) -> MetadataResult<()> {
        let result = sqlx::query("DELETE FROM sites WHERE site_id = ?")
            .bind(site_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!("site {site_id}")));
        }
        Ok(())
    }
}

/// SQL schema for SQLite.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS sites (
    site_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    public INTEGER NOT NULL DEFAULT 0,
    salt_user_ids INTEGER NOT NULL DEFAULT 0,
    block_bots INTEGER NOT NULL DEFAULT 1,
    domains TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;
