//! Activity log handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;
use zaprust_storage::{ActivityLog, ActivityLogRepository};

use crate::state::AppState;

/// Query parameters for listing activity
#[derive(Debug, Deserialize)]
pub struct ListActivityQuery {
    pub account_id: Option<Uuid>,
    pub campaign_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// List activity entries, newest first
///
/// GET /api/v1/activity
pub async fn list_activity(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListActivityQuery>,
) -> Result<Json<Vec<ActivityLog>>, StatusCode> {
    let repo = ActivityLogRepository::new(state.db_pool.pool().clone());
    let entries = repo
        .list(
            query.account_id,
            query.campaign_id,
            query.limit.clamp(1, 500),
            query.offset.max(0),
        )
        .await
        .map_err(|e| {
            error!("Failed to list activity: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(entries))
}
