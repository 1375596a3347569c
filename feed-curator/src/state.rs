use std::path::Path;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::{debug, error, info};

use crate::types::{CuratorError, ProcessingRecord, ProcessingStatus, Result};

/// Durable per-URL processing ledger.
///
/// A row for a URL means the URL has been handled, whatever its status.
/// Lookups fail open and writes swallow errors so a storage hiccup never
/// aborts a run.
#[derive(Clone)]
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    /// Open (or create) the database file, creating its parent directory.
    pub async fn connect(db_file: &Path) -> Result<Self> {
        if let Some(dir) = db_file.parent() {
            if !dir.as_os_str().is_empty() && !tokio::fs::try_exists(dir).await? {
                tokio::fs::create_dir_all(dir).await?;
                info!("Created directory for database: {}", dir.display());
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_file)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        info!("State database initialized at {}", db_file.display());
        Ok(store)
    }

    /// Ephemeral store for tests. A single pooled connection keeps the
    /// in-memory database alive for the store's lifetime.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Create the ledger table if needed. Never touches existing rows.
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS processed_articles (
                url TEXT PRIMARY KEY,
                processed_at TEXT NOT NULL,
                status TEXT NOT NULL,
                title TEXT,
                filter_result TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn is_processed(&self, url: &str) -> bool {
        let found = sqlx::query("SELECT 1 FROM processed_articles WHERE url = ?1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await;

        match found {
            Ok(row) => row.is_some(),
            Err(e) => {
                error!("Database error while checking URL {}: {}", url, e);
                false
            }
        }
    }

    pub async fn mark_status(
        &self,
        url: &str,
        status: ProcessingStatus,
        title: Option<&str>,
        filter_result: Option<&str>,
    ) {
        let processed_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let written = sqlx::query(
            r#"
            INSERT INTO processed_articles (url, processed_at, status, title, filter_result)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(url) DO UPDATE SET
                processed_at = excluded.processed_at,
                status = excluded.status,
                title = excluded.title,
                filter_result = excluded.filter_result
            "#,
        )
        .bind(url)
        .bind(&processed_at)
        .bind(status.as_str())
        .bind(title)
        .bind(filter_result)
        .execute(&self.pool)
        .await;

        match written {
            Ok(_) => debug!("Marked article '{}' with status '{}'", url, status),
            Err(e) => error!("Database error marking status '{}' for {}: {}", status, url, e),
        }
    }

    pub async fn record(&self, url: &str) -> Result<Option<ProcessingRecord>> {
        let row = sqlx::query(
            "SELECT url, processed_at, status, title, filter_result FROM processed_articles WHERE url = ?1",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status: String = row.try_get("status")?;
        let status = ProcessingStatus::from_str(&status)
            .map_err(|e| CuratorError::Parse(e.to_string()))?;

        Ok(Some(ProcessingRecord {
            url: row.try_get("url")?,
            processed_at: row.try_get("processed_at")?,
            status,
            title: row.try_get("title")?,
            filter_result: row.try_get("filter_result")?,
        }))
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM processed_articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }

    /// Row count per status, most frequent first.
    pub async fn status_counts(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS total
            FROM processed_articles
            GROUP BY status
            ORDER BY total DESC, status ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<(String, i64)> {
                Ok((row.try_get("status")?, row.try_get("total")?))
            })
            .collect()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
