use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use smspit_store::StoreStats;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message_count: usize,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub store: StoreStats,
    pub websocket_clients: usize,
}

/// GET /health, GET /api/v1/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message_count: state.store.len().await,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /api/v1/stats
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let store = state.store.stats(Utc::now()).await;
    let websocket_clients = state.broadcaster.subscriber_count().await;

    Json(StatsResponse {
        store,
        websocket_clients,
    })
}
