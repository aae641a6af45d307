use crate::error::{AppError, AppResult, LoggedJson};
use crate::query::cache::StatsCache;
use crate::session::session_hash;
use crate::storage::store::Store;
use crate::types::{NewCvDownload, NewPageView, PageViewBody, TrackOutcome};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

pub struct IngestState {
    pub store: Arc<Store>,
    pub stats_cache: Arc<StatsCache>,
}

/// Request metadata pulled from headers, never from the body.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

impl RequestMeta {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip: client_ip(headers),
            user_agent: header_str(headers, "user-agent"),
            referer: header_str(headers, "referer"),
        }
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// First hop of x-forwarded-for, falling back to x-real-ip.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }
    header_str(headers, "x-real-ip")
}

/// POST /track/page-view - Record a page view. Best-effort: storage
/// problems are logged, the caller always gets success.
pub async fn track_page_view(
    State(state): State<Arc<IngestState>>,
    headers: HeaderMap,
    LoggedJson(body): LoggedJson<PageViewBody>,
) -> AppResult<Json<serde_json::Value>> {
    let page_path = match body.page_path {
        Some(p) if !p.trim().is_empty() => p,
        _ => return Err(AppError::Validation("pagePath is required".to_string())),
    };

    let meta = RequestMeta::from_headers(&headers);
    let outcome = record_page_view(&state, page_path, body.session_id, meta).await;
    log_outcome("page_view", &outcome);

    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /track/cv-download - Record a CV download. No required body.
pub async fn track_cv_download(
    State(state): State<Arc<IngestState>>,
    headers: HeaderMap,
) -> AppResult<Json<serde_json::Value>> {
    let meta = RequestMeta::from_headers(&headers);
    let outcome = record_cv_download(&state, meta).await;
    log_outcome("cv_download", &outcome);

    Ok(Json(serde_json::json!({ "success": true })))
}

async fn record_page_view(
    state: &IngestState,
    page_path: String,
    session_id: Option<Uuid>,
    meta: RequestMeta,
) -> TrackOutcome {
    if !state.store.is_available() {
        return TrackOutcome::Skipped("storage not configured");
    }

    let view = NewPageView {
        session_hash: session_hash(meta.ip.as_deref(), meta.user_agent.as_deref()),
        page_path,
        ip_address: meta.ip,
        user_agent: meta.user_agent,
        referer: meta.referer,
        session_id,
    };

    match state.store.insert_page_view(view).await {
        Ok(()) => {
            state.stats_cache.invalidate_all();
            TrackOutcome::Tracked
        }
        Err(e) => TrackOutcome::Failed(e.to_string()),
    }
}

async fn record_cv_download(state: &IngestState, meta: RequestMeta) -> TrackOutcome {
    if !state.store.is_available() {
        return TrackOutcome::Skipped("storage not configured");
    }

    let download = NewCvDownload {
        session_hash: session_hash(meta.ip.as_deref(), meta.user_agent.as_deref()),
        ip_address: meta.ip,
        user_agent: meta.user_agent,
        referer: meta.referer,
    };

    match state.store.insert_cv_download(download).await {
        Ok(()) => {
            state.stats_cache.invalidate_all();
            TrackOutcome::Tracked
        }
        Err(e) => TrackOutcome::Failed(e.to_string()),
    }
}

fn log_outcome(kind: &str, outcome: &TrackOutcome) {
    match outcome {
        TrackOutcome::Tracked => tracing::debug!(kind = %kind, "event recorded"),
        TrackOutcome::Skipped(reason) => {
            tracing::warn!(kind = %kind, reason = %reason, "event not recorded")
        }
        TrackOutcome::Failed(error) => {
            tracing::error!(kind = %kind, error = %error, "event write failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_client_ip_forwarded_first_hop() {
        let h = headers(&[("x-forwarded-for", "203.0.113.9, 10.0.0.1, 10.0.0.2")]);
        assert_eq!(client_ip(&h).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_client_ip_real_ip_fallback() {
        let h = headers(&[("x-real-ip", "198.51.100.4")]);
        assert_eq!(client_ip(&h).as_deref(), Some("198.51.100.4"));
    }

    #[test]
    fn test_client_ip_absent() {
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn test_request_meta_from_headers() {
        let h = headers(&[
            ("x-forwarded-for", "203.0.113.9"),
            ("user-agent", "Mozilla/5.0"),
            ("referer", "https://example.com/"),
        ]);
        let meta = RequestMeta::from_headers(&h);
        assert_eq!(meta.ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(meta.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(meta.referer.as_deref(), Some("https://example.com/"));
    }
}
