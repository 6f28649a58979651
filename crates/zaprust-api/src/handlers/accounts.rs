//! Account handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;
use zaprust_common::Error;
use zaprust_storage::{Account, AccountRepository, CreateAccount, UpdateAccountSettings};

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

/// Account with derived quota info
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    #[serde(flatten)]
    pub account: Account,
    pub remaining_today: Option<i32>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        let remaining_today = (account.daily_limit > 0)
            .then(|| (account.daily_limit - account.daily_count).max(0));
        Self {
            account,
            remaining_today,
        }
    }
}

/// Session state message
#[derive(Debug, Serialize)]
pub struct SessionStateResponse {
    pub status: String,
}

/// Pending provisioning challenge
#[derive(Debug, Serialize)]
pub struct QrResponse {
    pub qr: String,
}

/// List all accounts
///
/// GET /api/v1/accounts
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AccountResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let repo = AccountRepository::new(state.db_pool.pool().clone());
    let accounts = repo.list().await.map_err(|e| {
        error!("Failed to list accounts: {}", e);
        respond(Error::Database(e.to_string()))
    })?;
    Ok(Json(accounts.into_iter().map(AccountResponse::from).collect()))
}

/// Register a new account
///
/// POST /api/v1/accounts
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateAccount>,
) -> Result<(StatusCode, Json<AccountResponse>), (StatusCode, Json<ErrorResponse>)> {
    if input.name.trim().is_empty() {
        return Err(respond(Error::Validation(
            "Account name is required".to_string(),
        )));
    }
    if let (Some(min), Some(max)) = (input.min_delay, input.max_delay) {
        if min < 0 || max < 0 || min > max {
            return Err(respond(Error::Validation(
                "Delay bounds must be non-negative with min <= max".to_string(),
            )));
        }
    }

    let repo = AccountRepository::new(state.db_pool.pool().clone());
    let account = repo.create(input).await.map_err(|e| {
        error!("Failed to create account: {}", e);
        respond(Error::Database(e.to_string()))
    })?;

    info!(account = %account.name, "Account created");
    Ok((StatusCode::CREATED, Json(account.into())))
}

/// Get one account
///
/// GET /api/v1/accounts/:id
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountResponse>, (StatusCode, Json<ErrorResponse>)> {
    let repo = AccountRepository::new(state.db_pool.pool().clone());
    let account = repo
        .get(id)
        .await
        .map_err(|e| respond(Error::Database(e.to_string())))?
        .ok_or_else(|| respond(Error::NotFound(format!("Account {} not found", id))))?;
    Ok(Json(account.into()))
}

/// Update safety settings
///
/// PUT /api/v1/accounts/:id
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateAccountSettings>,
) -> Result<Json<AccountResponse>, (StatusCode, Json<ErrorResponse>)> {
    for value in [
        input.daily_limit,
        input.min_delay,
        input.max_delay,
        input.pause_after,
        input.pause_duration,
    ]
    .into_iter()
    .flatten()
    {
        if value < 0 {
            return Err(respond(Error::Validation(
                "Settings must be non-negative".to_string(),
            )));
        }
    }

    let repo = AccountRepository::new(state.db_pool.pool().clone());
    let account = repo
        .update_settings(id, input)
        .await
        .map_err(|e| {
            error!("Failed to update account: {}", e);
            respond(Error::Database(e.to_string()))
        })?
        .ok_or_else(|| respond(Error::NotFound(format!("Account {} not found", id))))?;
    Ok(Json(account.into()))
}

/// Delete an account, tearing down any live session
///
/// DELETE /api/v1/accounts/:id
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    state.sessions.remove_account(id).await;

    let repo = AccountRepository::new(state.db_pool.pool().clone());
    let deleted = repo.delete(id).await.map_err(|e| {
        error!("Failed to delete account: {}", e);
        respond(Error::Database(e.to_string()))
    })?;
    if !deleted {
        return Err(respond(Error::NotFound(format!(
            "Account {} not found",
            id
        ))));
    }

    info!(account_id = %id, "Account deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Start the account's session
///
/// POST /api/v1/accounts/:id/connect
pub async fn connect_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionStateResponse>, (StatusCode, Json<ErrorResponse>)> {
    state.sessions.connect(id).await.map_err(respond)?;
    Ok(Json(SessionStateResponse {
        status: "connecting".to_string(),
    }))
}

/// Tear down the account's session
///
/// POST /api/v1/accounts/:id/disconnect
pub async fn disconnect_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionStateResponse>, (StatusCode, Json<ErrorResponse>)> {
    state.sessions.disconnect(id).await.map_err(respond)?;
    Ok(Json(SessionStateResponse {
        status: "disconnected".to_string(),
    }))
}

/// Fetch the pending provisioning challenge, if any
///
/// GET /api/v1/accounts/:id/qr
pub async fn get_qr(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<QrResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.sessions.qr_artifact(id).await {
        Some(qr) => Ok(Json(QrResponse { qr })),
        None => Err(respond(Error::NotFound(
            "No provisioning challenge pending".to_string(),
        ))),
    }
}
