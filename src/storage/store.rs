use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};
use crate::storage::{migrations, sqlite};
use crate::types::{DownloadStats, NewCvDownload, NewPageView, StatsResponse, ViewStats};
use deadpool_sqlite::Pool;
use rusqlite::params;
use std::collections::BTreeMap;

/// Storage handle shared by ingest and reporting. `pool` is `None` when
/// no database path is configured; callers consult `is_available`
/// instead of probing connectivity per request.
pub struct Store {
    pool: Option<Pool>,
}

impl Store {
    pub fn connect(config: &DatabaseConfig) -> Result<Self, deadpool_sqlite::CreatePoolError> {
        match &config.path {
            Some(path) => Ok(Self {
                pool: Some(sqlite::create_pool(path)?),
            }),
            None => {
                tracing::warn!("database.path not set, events will not be recorded");
                Ok(Self { pool: None })
            }
        }
    }

    /// Handle with no backing database, for unconfigured runs and tests.
    pub fn disabled() -> Self {
        Self { pool: None }
    }

    pub fn from_pool(pool: Pool) -> Self {
        Self { pool: Some(pool) }
    }

    pub fn is_available(&self) -> bool {
        self.pool.is_some()
    }

    /// Apply pragmas and run migrations. No-op when disabled.
    pub async fn init(&self) -> AppResult<()> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        let conn = pool
            .get()
            .await
            .map_err(|e| AppError::Internal(format!("pool error: {e}")))?;
        conn.interact(|conn| {
            sqlite::apply_pragmas(conn)?;
            migrations::run_migrations(conn)
        })
        .await??;
        Ok(())
    }

    fn pool(&self) -> AppResult<&Pool> {
        self.pool
            .as_ref()
            .ok_or_else(|| AppError::Internal("storage not configured".to_string()))
    }

    /// Append a page view. `viewed_at` is assigned here, at insert time.
    pub async fn insert_page_view(&self, view: NewPageView) -> AppResult<()> {
        let conn = self
            .pool()?
            .get()
            .await
            .map_err(|e| AppError::Internal(format!("pool error: {e}")))?;
        conn.interact(move |conn| {
            let viewed_at = chrono::Utc::now().timestamp_millis();
            conn.execute(
                "INSERT INTO page_views (
                    page_path, session_hash, ip_address, user_agent,
                    referer, viewed_at, session_id, duration_seconds
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)",
                params![
                    view.page_path,
                    view.session_hash,
                    view.ip_address,
                    view.user_agent,
                    view.referer,
                    viewed_at,
                    view.session_id.map(|id| id.to_string()),
                ],
            )?;
            Ok::<_, rusqlite::Error>(())
        })
        .await??;
        Ok(())
    }

    /// Append a CV download. `country`/`city` stay NULL until a
    /// geolocation enrichment step exists.
    pub async fn insert_cv_download(&self, download: NewCvDownload) -> AppResult<()> {
        let conn = self
            .pool()?
            .get()
            .await
            .map_err(|e| AppError::Internal(format!("pool error: {e}")))?;
        conn.interact(move |conn| {
            let downloaded_at = chrono::Utc::now().timestamp_millis();
            conn.execute(
                "INSERT INTO cv_downloads (
                    session_hash, ip_address, user_agent, referer,
                    downloaded_at, country, city
                ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, NULL)",
                params![
                    download.session_hash,
                    download.ip_address,
                    download.user_agent,
                    download.referer,
                    downloaded_at,
                ],
            )?;
            Ok::<_, rusqlite::Error>(())
        })
        .await??;
        Ok(())
    }

    /// Full-scan aggregate counts over both event logs. NULL-country
    /// downloads count toward the total but not the breakdown.
    pub async fn collect_stats(&self) -> AppResult<StatsResponse> {
        if !self.is_available() {
            return Ok(StatsResponse::zeroed());
        }
        let conn = self
            .pool()?
            .get()
            .await
            .map_err(|e| AppError::Internal(format!("pool error: {e}")))?;

        let stats = conn
            .interact(|conn| {
                let downloads_total: i64 =
                    conn.query_row("SELECT COUNT(*) FROM cv_downloads", [], |row| row.get(0))?;

                let mut by_country = BTreeMap::new();
                let mut stmt = conn.prepare(
                    "SELECT country, COUNT(*) FROM cv_downloads
                     WHERE country IS NOT NULL GROUP BY country",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?;
                for row in rows {
                    let (country, count) = row?;
                    by_country.insert(country, count);
                }

                let views_total: i64 =
                    conn.query_row("SELECT COUNT(*) FROM page_views", [], |row| row.get(0))?;

                let mut by_page = BTreeMap::new();
                let mut stmt = conn.prepare(
                    "SELECT page_path, COUNT(*) FROM page_views GROUP BY page_path",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?;
                for row in rows {
                    let (page, count) = row?;
                    by_page.insert(page, count);
                }

                Ok::<_, rusqlite::Error>(StatsResponse {
                    cv_downloads: DownloadStats {
                        total: downloads_total,
                        by_country,
                    },
                    page_views: ViewStats {
                        total: views_total,
                        by_page,
                    },
                })
            })
            .await??;

        Ok(stats)
    }

    /// Connectivity probe for the health endpoint.
    pub async fn ping(&self) -> bool {
        match &self.pool {
            Some(pool) => match pool.get().await {
                Ok(conn) => matches!(
                    conn.interact(|conn| conn.execute_batch("SELECT 1")).await,
                    Ok(Ok(()))
                ),
                Err(_) => false,
            },
            None => false,
        }
    }
}
