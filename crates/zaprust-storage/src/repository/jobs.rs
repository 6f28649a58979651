//! Scheduled job repository

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use zaprust_common::types::AccountId;

use crate::models::{CreateJob, Job, JobStatus};

/// Scheduled job repository
#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Create a new job repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new job
    pub async fn create(&self, input: CreateJob) -> Result<Job, sqlx::Error> {
        let id = Uuid::new_v4();
        let repeat_days =
            serde_json::to_value(input.repeat_days.unwrap_or_default()).unwrap_or_default();

        sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (id, account_id, media_path, caption, scheduled_at, repeat_type, repeat_days)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.account_id)
        .bind(&input.media_path)
        .bind(&input.caption)
        .bind(input.scheduled_at)
        .bind(input.repeat_type.map(|t| t.to_string()))
        .bind(&repeat_days)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a job by ID
    pub async fn get(&self, id: Uuid) -> Result<Option<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List jobs, optionally filtered by account and status
    pub async fn list(
        &self,
        account_id: Option<AccountId>,
        status: Option<JobStatus>,
    ) -> Result<Vec<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE ($1::uuid IS NULL OR account_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY scheduled_at ASC
            "#,
        )
        .bind(account_id)
        .bind(status.map(|s| s.to_string()))
        .fetch_all(&self.pool)
        .await
    }

    /// List pending jobs whose scheduled time has passed
    pub async fn due(&self, now: DateTime<Utc>) -> Result<Vec<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE status = 'pending' AND scheduled_at <= $1
            ORDER BY scheduled_at ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
    }

    /// Mark a job sent, recording the execution timestamp
    pub async fn mark_sent(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                status = 'sent',
                executed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark a job failed
    pub async fn mark_failed(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'failed', updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a job that has not fired yet
    pub async fn delete_pending(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1 AND status = 'pending'")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Check whether any job already occupies the given one-minute window
    pub async fn minute_occupied(&self, start: DateTime<Utc>) -> Result<bool, sqlx::Error> {
        let end = start + Duration::minutes(1);

        let row: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM jobs
                WHERE scheduled_at >= $1 AND scheduled_at < $2
            )
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }
}
