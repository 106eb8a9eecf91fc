//! PostgreSQL-based site metadata store implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{NewSite, SiteRow};
use crate::repos::SiteRepo;
use crate::store::MetadataStore;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use time::OffsetDateTime;
use waypost_core::config::PgSslMode;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sites (
    site_id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    public BOOLEAN NOT NULL DEFAULT FALSE,
    salt_user_ids BOOLEAN NOT NULL DEFAULT FALSE,
    block_bots BOOLEAN NOT NULL DEFAULT TRUE,
    domains TEXT NOT NULL DEFAULT '[]',
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)
"#;

fn postgres_schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

/// PostgreSQL-based site metadata store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn from_url(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    /// Create a new PostgreSQL store from individual connection parameters.
    ///
    /// This allows credentials to be passed separately, enabling better
    /// secret management (e.g., passwords via environment variables).
    #[allow(clippy::too_many_arguments)]
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = username {
            opts = opts.username(user);
        }

        if let Some(pass) = password {
            opts = opts.password(pass);
        }

        if let Some(mode) = ssl_mode {
            let sqlx_mode = match mode {
                PgSslMode::Disable => SqlxPgSslMode::Disable,
                PgSslMode::Prefer => SqlxPgSslMode::Prefer,
                PgSslMode::Require => SqlxPgSslMode::Require,
            };
            opts = opts.ssl_mode(sqlx_mode);
        }

        // Log connection info without password
        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            ssl_mode = ?ssl_mode,
            "Connecting to PostgreSQL"
        );

        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    async fn connect(
        mut opts: PgConnectOptions,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        // Set statement_timeout if configured to prevent hung queries from
        // stalling the refresh loop.
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{}ms", timeout_ms))]);
            tracing::info!("PostgreSQL statement_timeout set to {}ms", timeout_ms);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for PostgresStore {
    async fn migrate(&self) -> MetadataResult<()> {
        // PostgreSQL doesn't allow multiple statements in a single prepared
        // statement, so the schema is split and executed statement by statement.
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SiteRepo for PostgresStore {
    async fn create_site(&self, site: &NewSite) -> MetadataResult<SiteRow> {
        let now = OffsetDateTime::now_utc();
        let row = sqlx::query_as::<_, SiteRow>(
            r#"
            INSERT INTO sites (name, public, salt_user_ids, block_bots, domains, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
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
        let row = sqlx::query_as::<_, SiteRow>("SELECT * FROM sites WHERE site_id = $1")
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
            SET name = $1, public = $2, salt_user_ids = $3, block_bots = $4, domains = $5, updated_at = $6
            WHERE site_id = $7
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
        let result = sqlx::query("DELETE FROM sites WHERE site_id = $1")
            .bind(site_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!("site {site_id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_splits_into_statements() {
        let statements = postgres_schema_statements(POSTGRES_SCHEMA);
        assert_eq!(statements.len(), 1);
        assert!(statements[0].starts_with("CREATE TABLE"));
    }
}
