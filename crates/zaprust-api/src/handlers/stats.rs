//! Dashboard stats handler

use axum::{extract::State, http::StatusCode, Json};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use zaprust_storage::{AccountRepository, ActivityLog, ActivityLogRepository};

use crate::state::AppState;

const RECENT_ACTIVITY_LIMIT: i64 = 10;

/// Aggregate dashboard numbers
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_accounts: i64,
    pub connected_accounts: i64,
    pub sends_today: i64,
    pub errors_last_24h: i64,
    pub recent_activity: Vec<ActivityLog>,
}

/// Aggregate counters for the dashboard
///
/// GET /api/v1/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, StatusCode> {
    let accounts = AccountRepository::new(state.db_pool.pool().clone());
    let logs = ActivityLogRepository::new(state.db_pool.pool().clone());

    let stats = accounts.stats().await.map_err(|e| {
        error!("Failed to load account stats: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    let errors = logs
        .count_errors_since(Utc::now() - Duration::hours(24))
        .await
        .map_err(|e| {
            error!("Failed to count errors: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    let recent = logs.recent(RECENT_ACTIVITY_LIMIT).await.map_err(|e| {
        error!("Failed to load recent activity: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(StatsResponse {
        total_accounts: stats.total,
        connected_accounts: stats.connected,
        sends_today: stats.sends_today,
        errors_last_24h: errors,
        recent_activity: recent,
    }))
}
