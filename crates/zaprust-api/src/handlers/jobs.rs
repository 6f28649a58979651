//! Scheduled job handlers

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
use zaprust_core::scheduler::find_free_slot;
use zaprust_storage::{AccountRepository, CreateJob, Job, JobRepository, JobStatus};

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

/// Query parameters for listing jobs
#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub account_id: Option<Uuid>,
    pub status: Option<String>,
}

/// List jobs, optionally filtered by account and status
///
/// GET /api/v1/jobs
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<Vec<Job>>, (StatusCode, Json<ErrorResponse>)> {
    let status = match &query.status {
        Some(s) => Some(
            s.parse::<JobStatus>()
                .map_err(|_| respond(Error::Validation(format!("Unknown job status: {}", s))))?,
        ),
        None => None,
    };

    let repo = JobRepository::new(state.db_pool.pool().clone());
    let jobs = repo.list(query.account_id, status).await.map_err(|e| {
        error!("Failed to list jobs: {}", e);
        respond(Error::Database(e.to_string()))
    })?;
    Ok(Json(jobs))
}

/// Schedule a post
///
/// POST /api/v1/jobs
///
/// The requested time is nudged forward into the first calendar minute
/// that holds no other job, keeping posts from stacking up.
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(mut input): Json<CreateJob>,
) -> Result<(StatusCode, Json<Job>), (StatusCode, Json<ErrorResponse>)> {
    let has_media = input
        .media_path
        .as_deref()
        .map(|p| !p.trim().is_empty())
        .unwrap_or(false);
    if !has_media {
        return Err(respond(Error::Validation(
            "A media file is required for a scheduled post".to_string(),
        )));
    }
    if let Some(days) = &input.repeat_days {
        if days.iter().any(|d| *d > 6) {
            return Err(respond(Error::Validation(
                "Repeat weekdays must be between 0 (Sunday) and 6 (Saturday)".to_string(),
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

    let repo = JobRepository::new(state.db_pool.pool().clone());
    let slot = find_free_slot(input.scheduled_at, |minute| {
        let repo = repo.clone();
        async move { repo.minute_occupied(minute).await }
    })
    .await
    .map_err(|e| {
        error!("Failed to probe job slots: {}", e);
        respond(Error::Database(e.to_string()))
    })?;
    if slot != input.scheduled_at {
        info!(requested = %input.scheduled_at, slot = %slot, "Job moved to a free minute");
    }
    input.scheduled_at = slot;

    let job = repo.create(input).await.map_err(|e| {
        error!("Failed to create job: {}", e);
        respond(Error::Database(e.to_string()))
    })?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// Get one job
///
/// GET /api/v1/jobs/:id
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, (StatusCode, Json<ErrorResponse>)> {
    let repo = JobRepository::new(state.db_pool.pool().clone());
    let job = repo
        .get(id)
        .await
        .map_err(|e| respond(Error::Database(e.to_string())))?
        .ok_or_else(|| respond(Error::NotFound(format!("Job {} not found", id))))?;
    Ok(Json(job))
}

/// Delete a job that has not fired yet
///
/// DELETE /api/v1/jobs/:id
pub async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let repo = JobRepository::new(state.db_pool.pool().clone());
    let deleted = repo.delete_pending(id).await.map_err(|e| {
        error!("Failed to delete job: {}", e);
        respond(Error::Database(e.to_string()))
    })?;
    if !deleted {
        return Err(respond(Error::NotFound(format!(
            "Pending job {} not found",
            id
        ))));
    }
    Ok(StatusCode::NO_CONTENT)
}
