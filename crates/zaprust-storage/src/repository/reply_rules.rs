//! Reply rule repository

use sqlx::PgPool;
use uuid::Uuid;
use zaprust_common::types::AccountId;

use crate::models::{CreateReplyRule, ReplyRule, UpdateReplyRule};

/// Reply rule repository
#[derive(Clone)]
pub struct ReplyRuleRepository {
    pool: PgPool,
}

impl ReplyRuleRepository {
    /// Create a new reply rule repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new reply rule
    pub async fn create(&self, input: CreateReplyRule) -> Result<ReplyRule, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, ReplyRule>(
            r#"
            INSERT INTO reply_rules (
                id, account_id, name, trigger_text, match_type, response, media_path,
                priority, delay_secs, apply_group, apply_private, start_time, end_time
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.account_id)
        .bind(&input.name)
        .bind(&input.trigger_text)
        .bind(input.match_type.to_string())
        .bind(&input.response)
        .bind(&input.media_path)
        .bind(input.priority.unwrap_or(0))
        .bind(input.delay_secs.unwrap_or(0))
        .bind(input.apply_group.unwrap_or(false))
        .bind(input.apply_private.unwrap_or(true))
        .bind(input.start_time)
        .bind(input.end_time)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a reply rule by ID
    pub async fn get(&self, id: Uuid) -> Result<Option<ReplyRule>, sqlx::Error> {
        sqlx::query_as::<_, ReplyRule>("SELECT * FROM reply_rules WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List rules for an account, highest priority first
    pub async fn list_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<ReplyRule>, sqlx::Error> {
        sqlx::query_as::<_, ReplyRule>(
            r#"
            SELECT * FROM reply_rules
            WHERE account_id = $1
            ORDER BY priority DESC, created_at ASC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
    }

    /// List active rules for an account, highest priority first
    pub async fn active_rules(&self, account_id: AccountId) -> Result<Vec<ReplyRule>, sqlx::Error> {
        sqlx::query_as::<_, ReplyRule>(
            r#"
            SELECT * FROM reply_rules
            WHERE account_id = $1 AND is_active = TRUE
            ORDER BY priority DESC, created_at ASC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Update a reply rule
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateReplyRule,
    ) -> Result<Option<ReplyRule>, sqlx::Error> {
        sqlx::query_as::<_, ReplyRule>(
            r#"
            UPDATE reply_rules SET
                name = COALESCE($2, name),
                trigger_text = COALESCE($3, trigger_text),
                match_type = COALESCE($4, match_type),
                response = COALESCE($5, response),
                media_path = COALESCE($6, media_path),
                priority = COALESCE($7, priority),
                delay_secs = COALESCE($8, delay_secs),
                apply_group = COALESCE($9, apply_group),
                apply_private = COALESCE($10, apply_private),
                start_time = COALESCE($11, start_time),
                end_time = COALESCE($12, end_time),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.trigger_text)
        .bind(input.match_type.map(|m| m.to_string()))
        .bind(&input.response)
        .bind(&input.media_path)
        .bind(input.priority)
        .bind(input.delay_secs)
        .bind(input.apply_group)
        .bind(input.apply_private)
        .bind(input.start_time)
        .bind(input.end_time)
        .fetch_optional(&self.pool)
        .await
    }

    /// Set the active flag
    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE reply_rules SET is_active = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(active)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a reply rule
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM reply_rules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
