use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::alerts::AlertStore;
use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::error::AppError;
use crate::types::{AlertIdentity, AlertRecord};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<AlertStore>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/alerts", get(get_alerts))
        .route("/alerts/:id", get(get_alert))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub session_active: bool,
    pub last_cycle_at_ns: u64,
    pub cycles_ok: u64,
    pub cycles_failed: u64,
    pub alerts_sent: u64,
    pub alerts_tracked: usize,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LatencyResponse {
    pub samples: u64,
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let h = &state.health;
    Json(HealthResponse {
        status: "ok",
        session_active: h.session_active(),
        last_cycle_at_ns: h.last_cycle_at_ns(),
        cycles_ok: h.cycles_ok(),
        cycles_failed: h.cycles_failed(),
        alerts_sent: h.alerts_sent(),
        alerts_tracked: state.store.len(),
    })
}

async fn get_alerts(State(state): State<ApiState>) -> Json<Vec<AlertRecord>> {
    Json(state.store.all())
}

async fn get_alert(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<AlertRecord>, AppError> {
    AlertIdentity::from_token(&id)
        .and_then(|identity| state.store.get(&identity))
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("alert {id}")))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let (p50_ms, p95_ms, p99_ms) = state.latency.percentiles();
    Json(LatencyResponse {
        samples: state.latency.len(),
        p50_ms,
        p95_ms,
        p99_ms,
    })
}
