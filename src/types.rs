use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Reporting window. Only `all` is implemented; the other values are
/// accepted on the wire but currently report all-time counts.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
    #[default]
    All,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::All => "all",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    #[serde(default)]
    pub period: Period,
}

/// POST /track/page-view body. Request metadata (client address,
/// user-agent, referer) comes from headers, not the body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewBody {
    pub page_path: Option<String>,
    pub session_id: Option<Uuid>,
}

/// Page view record as handed to the storage layer. `viewed_at` is
/// assigned at insert time, not here.
#[derive(Debug, Clone)]
pub struct NewPageView {
    pub page_path: String,
    pub session_hash: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub session_id: Option<Uuid>,
}

/// CV download record. `country`/`city` are reserved for geolocation
/// enrichment and are written as NULL; no enrichment step exists.
#[derive(Debug, Clone)]
pub struct NewCvDownload {
    pub session_hash: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

/// Outcome of a best-effort tracking attempt. Logged by the handler,
/// never surfaced to the caller.
#[derive(Debug)]
pub enum TrackOutcome {
    Tracked,
    Skipped(&'static str),
    Failed(String),
}

#[derive(Debug, Serialize)]
pub struct DownloadStats {
    pub total: i64,
    pub by_country: BTreeMap<String, i64>,
}

#[derive(Debug, Serialize)]
pub struct ViewStats {
    pub total: i64,
    pub by_page: BTreeMap<String, i64>,
}

/// GET /analytics/stats response. The shape is identical whether the
/// store is unavailable, empty, or populated.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub cv_downloads: DownloadStats,
    pub page_views: ViewStats,
}

impl StatsResponse {
    pub fn zeroed() -> Self {
        Self {
            cv_downloads: DownloadStats {
                total: 0,
                by_country: BTreeMap::new(),
            },
            page_views: ViewStats {
                total: 0,
                by_page: BTreeMap::new(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub db_configured: bool,
    pub db_ok: bool,
}
