use crate::error::{AppError, AppResult};
use crate::query::cache::StatsCache;
use crate::storage::store::Store;
use crate::types::{HealthResponse, Period, StatsParams, StatsResponse};
use axum::extract::{Query, State};
use axum::Json;
use std::sync::Arc;

pub struct QueryState {
    pub store: Arc<Store>,
    pub stats_cache: Arc<StatsCache>,
}

/// GET /analytics/stats - Aggregate counts over both event logs.
/// An unavailable store answers 200 with the zeroed shape.
pub async fn stats(
    State(state): State<Arc<QueryState>>,
    Query(params): Query<StatsParams>,
) -> AppResult<Json<serde_json::Value>> {
    let period = params.period;
    if period != Period::All {
        // Period filtering is not implemented; every window reports
        // all-time counts.
        tracing::debug!(period = %period, "period filter not implemented, returning all-time stats");
    }

    if !state.store.is_available() {
        let zeroed = serde_json::to_value(StatsResponse::zeroed())
            .map_err(|e| AppError::Internal(format!("serialize: {e}")))?;
        return Ok(Json(zeroed));
    }

    let key = period.as_str();
    if let Some(cached) = state.stats_cache.get(key) {
        let val: serde_json::Value = serde_json::from_str(&cached)
            .map_err(|e| AppError::Internal(format!("cache deserialize: {e}")))?;
        return Ok(Json(val));
    }

    let result = state.store.collect_stats().await?;
    let value = serde_json::to_value(&result)
        .map_err(|e| AppError::Internal(format!("serialize: {e}")))?;
    state.stats_cache.insert(key.to_string(), value.to_string());

    Ok(Json(value))
}

/// GET /health - Health check. An unconfigured database is a valid
/// steady state, not degraded.
pub async fn health(State(state): State<Arc<QueryState>>) -> Json<HealthResponse> {
    let db_configured = state.store.is_available();
    let db_ok = state.store.ping().await;

    Json(HealthResponse {
        status: if db_ok || !db_configured {
            "ok".into()
        } else {
            "degraded".into()
        },
        db_configured,
        db_ok,
    })
}
