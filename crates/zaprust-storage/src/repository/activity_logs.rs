//! Activity log repository

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use zaprust_common::types::{AccountId, CampaignId};

use crate::models::{ActivityLog, CreateActivityLog};

/// Activity log repository
#[derive(Clone)]
pub struct ActivityLogRepository {
    pool: PgPool,
}

impl ActivityLogRepository {
    /// Create a new activity log repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append an activity entry
    pub async fn append(&self, input: CreateActivityLog) -> Result<ActivityLog, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, ActivityLog>(
            r#"
            INSERT INTO activity_logs (id, account_id, campaign_id, kind, action, details)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.account_id)
        .bind(input.campaign_id)
        .bind(input.kind.to_string())
        .bind(&input.action)
        .bind(&input.details)
        .fetch_one(&self.pool)
        .await
    }

    /// List entries newest first, optionally filtered by account or campaign
    pub async fn list(
        &self,
        account_id: Option<AccountId>,
        campaign_id: Option<CampaignId>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ActivityLog>, sqlx::Error> {
        sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT * FROM activity_logs
            WHERE ($1::uuid IS NULL OR account_id = $1)
              AND ($2::uuid IS NULL OR campaign_id = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(account_id)
        .bind(campaign_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    /// Most recent entries
    pub async fn recent(&self, limit: i64) -> Result<Vec<ActivityLog>, sqlx::Error> {
        sqlx::query_as::<_, ActivityLog>(
            "SELECT * FROM activity_logs ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Count error entries recorded since the given time
    pub async fn count_errors_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM activity_logs WHERE kind = 'error' AND created_at >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }
}
