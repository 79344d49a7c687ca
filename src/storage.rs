use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;
use std::str::FromStr;

use crate::config::DatabaseConfig;
use crate::models::{DocumentFormat, NewTrackedItem, Status, TrackedItem};
use crate::utils::error::{AppError, Result};

/// What an `upsert_many` call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl UpsertSummary {
    pub fn mutations(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Persistence for tracked items, keyed by name.
#[async_trait]
pub trait Store: Send + Sync {
    /// Every item in insertion order.
    async fn get_all(&self) -> Result<Vec<TrackedItem>>;

    async fn get_by_name(&self, name: &str) -> Result<Option<TrackedItem>>;

    /// Inserts unknown names as unavailable with no price. Known names are
    /// overwritten only when url, provider or recipients differ, and an
    /// overwrite never touches price or status.
    async fn upsert_many(&self, items: &[NewTrackedItem]) -> Result<UpsertSummary>;

    async fn update_price_and_status(&self, name: &str, price: Option<f64>, status: Status)
        -> Result<()>;

    async fn close(&self);
}

#[derive(Debug, FromRow)]
struct TrackedItemRow {
    name: String,
    url: String,
    provider: String,
    format: DocumentFormat,
    price: Option<f64>,
    status: Status,
    recipients: String,
    threshold: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TrackedItemRow> for TrackedItem {
    type Error = AppError;

    fn try_from(row: TrackedItemRow) -> Result<Self> {
        Ok(TrackedItem {
            recipients: serde_json::from_str(&row.recipients)?,
            name: row.name,
            url: row.url,
            provider: row.provider,
            format: row.format,
            price: row.price,
            status: row.status,
            threshold: row.threshold,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_ITEMS: &str = "SELECT name, url, provider, format, price, status, recipients, threshold, created_at, updated_at FROM tracked_items";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database file and applies migrations.
    pub async fn open(config: &DatabaseConfig) -> Result<Self> {
        let path = Path::new(&config.path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Single-connection in-memory store; every connection to `:memory:`
    /// would otherwise see its own empty database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Deletes the database file. A missing file is an error.
    pub async fn destroy(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        tokio::fs::remove_file(path).await?;

        for suffix in ["-wal", "-shm"] {
            let mut sidecar = path.as_os_str().to_owned();
            sidecar.push(suffix);
            if tokio::fs::try_exists(&sidecar).await.unwrap_or(false) {
                tokio::fs::remove_file(&sidecar).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_all(&self) -> Result<Vec<TrackedItem>> {
        let rows: Vec<TrackedItemRow> = sqlx::query_as(&format!("{} ORDER BY rowid", SELECT_ITEMS))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TrackedItem::try_from).collect()
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<TrackedItem>> {
        let row: Option<TrackedItemRow> = sqlx::query_as(&format!("{} WHERE name = ?", SELECT_ITEMS))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TrackedItem::try_from).transpose()
    }

    async fn upsert_many(&self, items: &[NewTrackedItem]) -> Result<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        let mut tx = self.pool.begin().await?;

        for item in items {
            let existing: Option<TrackedItemRow> =
                sqlx::query_as(&format!("{} WHERE name = ?", SELECT_ITEMS))
                    .bind(&item.name)
                    .fetch_optional(&mut *tx)
                    .await?;
            let existing = existing.map(TrackedItem::try_from).transpose()?;
            let recipients = serde_json::to_string(&item.recipients)?;
            let now = Utc::now();

            match existing {
                None => {
                    let tracked = item.clone().into_tracked(now);
                    sqlx::query(
                        "INSERT INTO tracked_items (name, url, provider, format, price, status, recipients, threshold, created_at, updated_at) \
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    )
                    .bind(&tracked.name)
                    .bind(&tracked.url)
                    .bind(&tracked.provider)
                    .bind(tracked.format)
                    .bind(tracked.price)
                    .bind(tracked.status)
                    .bind(&recipients)
                    .bind(tracked.threshold)
                    .bind(tracked.created_at)
                    .bind(tracked.updated_at)
                    .execute(&mut *tx)
                    .await?;

                    tracing::info!(item = %tracked.name, provider = %tracked.provider, "Tracking new product");
                    summary.inserted += 1;
                }
                Some(stored) if item.differs_from(&stored) => {
                    sqlx::query(
                        "UPDATE tracked_items SET url = ?, provider = ?, format = ?, recipients = ?, threshold = ?, updated_at = ? \
                         WHERE name = ?",
                    )
                    .bind(&item.url)
                    .bind(&item.provider)
                    .bind(item.format)
                    .bind(&recipients)
                    .bind(item.threshold)
                    .bind(now)
                    .bind(&item.name)
                    .execute(&mut *tx)
                    .await?;

                    tracing::warn!(item = %item.name, "Product was updated; overwriting stored routing");
                    summary.updated += 1;
                }
                Some(stored) => {
                    if stored.threshold != item.threshold || stored.format != item.format {
                        tracing::debug!(
                            item = %item.name,
                            stored_threshold = ?stored.threshold,
                            threshold = ?item.threshold,
                            stored_format = %stored.format,
                            format = %item.format,
                            "Threshold or format changed without a routing change; keeping stored values"
                        );
                    }
                    summary.unchanged += 1;
                }
            }
        }

        tx.commit().await?;
        Ok(summary)
    }

    async fn update_price_and_status(
        &self,
        name: &str,
        price: Option<f64>,
        status: Status,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE tracked_items SET price = ?, status = ?, updated_at = ? WHERE name = ?",
        )
        .bind(price)
        .bind(status)
        .bind(Utc::now())
        .bind(name)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound {
                resource: format!("tracked item '{}'", name),
            });
        }
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
