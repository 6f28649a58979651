//! Campaign handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;
use zaprust_common::types::PhoneNumber;
use zaprust_common::Error;
use zaprust_storage::{
    AccountRepository, Campaign, CampaignItemCounts, CampaignItemRepository, CampaignRepository,
    CampaignStatus, CreateCampaign, CreateCampaignItem,
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

/// One recipient row in a create request
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignItemInput {
    pub phone: String,
    pub name: Option<String>,
}

/// Request body for creating a campaign with its recipients
#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub account_id: Uuid,
    pub name: String,
    pub message_template: String,
    pub media_path: Option<String>,
    pub min_interval: Option<i32>,
    pub max_interval: Option<i32>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub items: Vec<CampaignItemInput>,
}

/// Campaign plus queue counts
#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub pending: i64,
    pub sent: i64,
    pub failed: i64,
    pub total: i64,
}

impl CampaignResponse {
    fn with_counts(campaign: Campaign, counts: CampaignItemCounts) -> Self {
        Self {
            campaign,
            pending: counts.pending,
            sent: counts.sent,
            failed: counts.failed,
            total: counts.total(),
        }
    }
}

/// Create response, including how many recipient rows were dropped
#[derive(Debug, Serialize)]
pub struct CreateCampaignResponse {
    #[serde(flatten)]
    pub campaign: CampaignResponse,
    pub skipped: usize,
}

/// Normalize raw recipient rows, dropping entries without usable digits
fn normalize_items(items: Vec<CampaignItemInput>) -> (Vec<CreateCampaignItem>, usize) {
    let mut valid = Vec::with_capacity(items.len());
    let mut skipped = 0;
    for item in items {
        match PhoneNumber::parse(&item.phone) {
            Some(phone) => valid.push(CreateCampaignItem {
                phone: phone.digits,
                name: item.name.filter(|n| !n.trim().is_empty()),
            }),
            None => skipped += 1,
        }
    }
    (valid, skipped)
}

/// List campaigns, newest first
///
/// GET /api/v1/campaigns
pub async fn list_campaigns(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Campaign>>, (StatusCode, Json<ErrorResponse>)> {
    let repo = CampaignRepository::new(state.db_pool.pool().clone());
    let campaigns = repo.list().await.map_err(|e| {
        error!("Failed to list campaigns: {}", e);
        respond(Error::Database(e.to_string()))
    })?;
    Ok(Json(campaigns))
}

/// Create a campaign and import its recipients in one request
///
/// POST /api/v1/campaigns
pub async fn create_campaign(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<CreateCampaignResponse>), (StatusCode, Json<ErrorResponse>)> {
    if input.name.trim().is_empty() {
        return Err(respond(Error::Validation(
            "Campaign name is required".to_string(),
        )));
    }
    if input.message_template.trim().is_empty() {
        return Err(respond(Error::Validation(
            "Message template is required".to_string(),
        )));
    }
    if input.items.is_empty() {
        return Err(respond(Error::Validation(
            "At least one recipient is required".to_string(),
        )));
    }
    if let (Some(min), Some(max)) = (input.min_interval, input.max_interval) {
        if min < 0 || max < 0 || min > max {
            return Err(respond(Error::Validation(
                "Interval bounds must be non-negative with min <= max".to_string(),
            )));
        }
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

    let (valid, skipped) = normalize_items(input.items);
    if valid.is_empty() {
        return Err(respond(Error::Validation(
            "No recipient has a usable phone number".to_string(),
        )));
    }

    let campaigns = CampaignRepository::new(state.db_pool.pool().clone());
    let items = CampaignItemRepository::new(state.db_pool.pool().clone());

    let campaign = campaigns
        .create(CreateCampaign {
            account_id: input.account_id,
            name: input.name,
            message_template: input.message_template,
            media_path: input.media_path,
            min_interval: input.min_interval,
            max_interval: input.max_interval,
            scheduled_at: input.scheduled_at,
        })
        .await
        .map_err(|e| {
            error!("Failed to create campaign: {}", e);
            respond(Error::Database(e.to_string()))
        })?;

    let imported = items.create_many(campaign.id, valid).await.map_err(|e| {
        error!("Failed to import recipients: {}", e);
        respond(Error::Database(e.to_string()))
    })?;

    info!(
        campaign = %campaign.name,
        imported,
        skipped,
        "Campaign created"
    );

    let counts = items.counts(campaign.id).await.unwrap_or_default();
    Ok((
        StatusCode::CREATED,
        Json(CreateCampaignResponse {
            campaign: CampaignResponse::with_counts(campaign, counts),
            skipped,
        }),
    ))
}

/// Get one campaign with its queue counts
///
/// GET /api/v1/campaigns/:id
pub async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CampaignResponse>, (StatusCode, Json<ErrorResponse>)> {
    let campaigns = CampaignRepository::new(state.db_pool.pool().clone());
    let items = CampaignItemRepository::new(state.db_pool.pool().clone());

    let campaign = campaigns
        .get(id)
        .await
        .map_err(|e| respond(Error::Database(e.to_string())))?
        .ok_or_else(|| respond(Error::NotFound(format!("Campaign {} not found", id))))?;
    let counts = items
        .counts(id)
        .await
        .map_err(|e| respond(Error::Database(e.to_string())))?;

    Ok(Json(CampaignResponse::with_counts(campaign, counts)))
}

/// Flip a campaign between running and paused
///
/// POST /api/v1/campaigns/:id/toggle
pub async fn toggle_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CampaignResponse>, (StatusCode, Json<ErrorResponse>)> {
    let campaigns = CampaignRepository::new(state.db_pool.pool().clone());
    let items = CampaignItemRepository::new(state.db_pool.pool().clone());

    let campaign = campaigns
        .get(id)
        .await
        .map_err(|e| respond(Error::Database(e.to_string())))?
        .ok_or_else(|| respond(Error::NotFound(format!("Campaign {} not found", id))))?;

    let status = campaign.status_enum().ok_or_else(|| {
        respond(Error::Internal(format!(
            "Campaign {} has an invalid status",
            id
        )))
    })?;
    let next = match status {
        CampaignStatus::Pending | CampaignStatus::Scheduled | CampaignStatus::Paused => {
            CampaignStatus::Running
        }
        CampaignStatus::Running => CampaignStatus::Paused,
        CampaignStatus::Completed => {
            return Err(respond(Error::Conflict(
                "Campaign is already completed".to_string(),
            )))
        }
    };

    if next == CampaignStatus::Running {
        // a manual resume also lifts any auto-pause hold
        state.paused.clear(id);
    }
    campaigns.update_status(id, next).await.map_err(|e| {
        error!("Failed to toggle campaign: {}", e);
        respond(Error::Database(e.to_string()))
    })?;
    info!(campaign = %campaign.name, status = %next, "Campaign toggled");

    let fresh = campaigns
        .get(id)
        .await
        .map_err(|e| respond(Error::Database(e.to_string())))?
        .ok_or_else(|| respond(Error::NotFound(format!("Campaign {} not found", id))))?;
    let counts = items.counts(id).await.unwrap_or_default();
    Ok(Json(CampaignResponse::with_counts(fresh, counts)))
}

/// Delete a campaign that is not currently running
///
/// DELETE /api/v1/campaigns/:id
pub async fn delete_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let campaigns = CampaignRepository::new(state.db_pool.pool().clone());
    let campaign = campaigns
        .get(id)
        .await
        .map_err(|e| respond(Error::Database(e.to_string())))?
        .ok_or_else(|| respond(Error::NotFound(format!("Campaign {} not found", id))))?;

    if campaign.status_enum() == Some(CampaignStatus::Running) {
        return Err(respond(Error::Conflict(
            "Pause the campaign before deleting it".to_string(),
        )));
    }

    let deleted = campaigns.delete_not_running(id).await.map_err(|e| {
        error!("Failed to delete campaign: {}", e);
        respond(Error::Database(e.to_string()))
    })?;
    if !deleted {
        return Err(respond(Error::Conflict(
            "Campaign could not be deleted".to_string(),
        )));
    }

    info!(campaign = %campaign.name, "Campaign deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn input(phone: &str, name: Option<&str>) -> CampaignItemInput {
        CampaignItemInput {
            phone: phone.to_string(),
            name: name.map(str::to_string),
        }
    }

    #[test]
    fn drops_rows_without_usable_digits() {
        let (valid, skipped) = normalize_items(vec![
            input("+55 (11) 99999-0000", Some("Maria")),
            input("abc", None),
            input("", Some("Nobody")),
        ]);

        assert_eq!(valid.len(), 1);
        assert_eq!(skipped, 2);
        assert_eq!(valid[0].phone, "5511999990000");
        assert_eq!(valid[0].name.as_deref(), Some("Maria"));
    }

    #[test]
    fn blank_names_become_none() {
        let (valid, skipped) = normalize_items(vec![input("123", Some("  "))]);
        assert_eq!(skipped, 0);
        assert_eq!(valid[0].name, None);
    }
}
