//! Campaign item repository

use sqlx::{PgPool, Row};
use uuid::Uuid;
use zaprust_common::types::CampaignId;

use crate::models::{CampaignItem, CreateCampaignItem};

/// Campaign item repository
#[derive(Clone)]
pub struct CampaignItemRepository {
    pool: PgPool,
}

impl CampaignItemRepository {
    /// Create a new campaign item repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert all recipients for a campaign in one transaction
    pub async fn create_many(
        &self,
        campaign_id: CampaignId,
        items: Vec<CreateCampaignItem>,
    ) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO campaign_items (id, campaign_id, phone, name)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(campaign_id)
            .bind(&item.phone)
            .bind(&item.name)
            .execute(&mut *tx)
            .await?;
            inserted += 1;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Get the oldest still-pending item for a campaign
    pub async fn next_pending(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<CampaignItem>, sqlx::Error> {
        sqlx::query_as::<_, CampaignItem>(
            r#"
            SELECT * FROM campaign_items
            WHERE campaign_id = $1 AND status = 'pending'
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(campaign_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// List items for a campaign in creation order
    pub async fn list(&self, campaign_id: CampaignId) -> Result<Vec<CampaignItem>, sqlx::Error> {
        sqlx::query_as::<_, CampaignItem>(
            r#"
            SELECT * FROM campaign_items
            WHERE campaign_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Mark an item sent
    pub async fn mark_sent(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE campaign_items SET status = 'sent', sent_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark an item failed, retaining the error text
    ///
    /// `sent_at` records when the attempt finished, for failures too.
    pub async fn mark_failed(&self, id: Uuid, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE campaign_items SET
                status = 'failed',
                sent_at = NOW(),
                error_log = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Item counts for a campaign by status
    pub async fn counts(&self, campaign_id: CampaignId) -> Result<CampaignItemCounts, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'pending') as pending,
                COUNT(*) FILTER (WHERE status = 'sent') as sent,
                COUNT(*) FILTER (WHERE status = 'failed') as failed
            FROM campaign_items
            WHERE campaign_id = $1
            "#,
        )
        .bind(campaign_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(CampaignItemCounts {
            pending: row.get::<Option<i64>, _>("pending").unwrap_or(0),
            sent: row.get::<Option<i64>, _>("sent").unwrap_or(0),
            failed: row.get::<Option<i64>, _>("failed").unwrap_or(0),
        })
    }
}

/// Campaign item counts by status
#[derive(Debug, Clone, Default)]
pub struct CampaignItemCounts {
    pub pending: i64,
    pub sent: i64,
    pub failed: i64,
}

impl CampaignItemCounts {
    pub fn total(&self) -> i64 {
        self.pending + self.sent + self.failed
    }

    pub fn completed(&self) -> i64 {
        self.sent + self.failed
    }
}
