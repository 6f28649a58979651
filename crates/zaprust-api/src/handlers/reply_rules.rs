//! Reply rule handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;
use zaprust_common::Error;
use zaprust_storage::{
    AccountRepository, CreateReplyRule, ReplyRule, ReplyRuleRepository, UpdateReplyRule,
};

use crate::state::AppState;

/// Error response
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

fn respond(e: Error) -> (StatusCode, Json<ErrorResponse>) {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            error: e.code().to_string(),
            message: e.to_string(),
        }),
    )
}

/// Query parameters for listing rules
#[derive(Debug, Deserialize)]
pub struct ListRulesQuery {
    pub account_id: Uuid,
}

/// List an account's reply rules by priority
///
/// GET /api/v1/reply-rules?account_id=...
pub async fn list_reply_rules(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListRulesQuery>,
) -> Result<Json<Vec<ReplyRule>>, (StatusCode, Json<ErrorResponse>)> {
    let repo = ReplyRuleRepository::new(state.db_pool.pool().clone());
    let rules = repo.list_by_account(query.account_id).await.map_err(|e| {
        error!("Failed to list reply rules: {}", e);
        respond(Error::Database(e.to_string()))
    })?;
    Ok(Json(rules))
}

/// Create a reply rule
///
/// POST /api/v1/reply-rules
pub async fn create_reply_rule(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateReplyRule>,
) -> Result<(StatusCode, Json<ReplyRule>), (StatusCode, Json<ErrorResponse>)> {
    if input.trigger_text.trim().is_empty() {
        return Err(respond(Error::Validation(
            "Trigger text is required".to_string(),
        )));
    }
    if input.response.trim().is_empty() {
        return Err(respond(Error::Validation(
            "Response text is required".to_string(),
        )));
    }
    if input.delay_secs.unwrap_or(0) < 0 {
        return Err(respond(Error::Validation(
            "Reply delay must be non-negative".to_string(),
        )));
    }

    let accounts = AccountRepository::new(state.db_pool.pool().clone());
    let account_exists = accounts
        .get(input.account_id)
        .await
        .map_err(|e| respond(Error::Database(e.to_string())))?
        .is_some();
    if !account_exists {
        return Err(respond(Error::NotFound(format!(
            "Account {} not found",
            input.account_id
        ))));
    }

    let repo = ReplyRuleRepository::new(state.db_pool.pool().clone());
    let rule = repo.create(input).await.map_err(|e| {
        error!("Failed to create reply rule: {}", e);
        respond(Error::Database(e.to_string()))
    })?;

    info!(rule = %rule.name.as_deref().unwrap_or(""), "Reply rule created");
    Ok((StatusCode::CREATED, Json(rule)))
}

/// Update a reply rule
///
/// PUT /api/v1/reply-rules/:id
pub async fn update_reply_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateReplyRule>,
) -> Result<Json<ReplyRule>, (StatusCode, Json<ErrorResponse>)> {
    if input.delay_secs.unwrap_or(0) < 0 {
        return Err(respond(Error::Validation(
            "Reply delay must be non-negative".to_string(),
        )));
    }

    let repo = ReplyRuleRepository::new(state.db_pool.pool().clone());
    let rule = repo
        .update(id, input)
        .await
        .map_err(|e| {
            error!("Failed to update reply rule: {}", e);
            respond(Error::Database(e.to_string()))
        })?
        .ok_or_else(|| respond(Error::NotFound(format!("Reply rule {} not found", id))))?;
    Ok(Json(rule))
}

/// Flip a rule between active and inactive
///
/// POST /api/v1/reply-rules/:id/toggle
pub async fn toggle_reply_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReplyRule>, (StatusCode, Json<ErrorResponse>)> {
    let repo = ReplyRuleRepository::new(state.db_pool.pool().clone());
    let rule = repo
        .get(id)
        .await
        .map_err(|e| respond(Error::Database(e.to_string())))?
        .ok_or_else(|| respond(Error::NotFound(format!("Reply rule {} not found", id))))?;

    repo.set_active(id, !rule.is_active).await.map_err(|e| {
        error!("Failed to toggle reply rule: {}", e);
        respond(Error::Database(e.to_string()))
    })?;

    let fresh = repo
        .get(id)
        .await
        .map_err(|e| respond(Error::Database(e.to_string())))?
        .ok_or_else(|| respond(Error::NotFound(format!("Reply rule {} not found", id))))?;
    Ok(Json(fresh))
}

/// Delete a reply rule
///
/// DELETE /api/v1/reply-rules/:id
pub async fn delete_reply_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let repo = ReplyRuleRepository::new(state.db_pool.pool().clone());
    let deleted = repo.delete(id).await.map_err(|e| {
        error!("Failed to delete reply rule: {}", e);
        respond(Error::Database(e.to_string()))
    })?;
    if !deleted {
        return Err(respond(Error::NotFound(format!(
            "Reply rule {} not found",
            id
        ))));
    }
    Ok(StatusCode::NO_CONTENT)
}
