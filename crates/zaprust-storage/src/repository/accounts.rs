//! Account repository

use sqlx::{PgPool, Row};
use uuid::Uuid;
use zaprust_common::types::ConnectionStatus;

use crate::models::{Account, CreateAccount, UpdateAccountSettings};

/// Account repository
#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    /// Create a new account repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new account
    pub async fn create(&self, input: CreateAccount) -> Result<Account, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, name, daily_limit, min_delay, max_delay)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.daily_limit.unwrap_or(0))
        .bind(input.min_delay.unwrap_or(30))
        .bind(input.max_delay.unwrap_or(90))
        .fetch_one(&self.pool)
        .await
    }

    /// Get an account by ID
    pub async fn get(&self, id: Uuid) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List all accounts in creation order
    pub async fn list(&self) -> Result<Vec<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
    }

    /// List accounts whose sessions should be re-established on startup
    pub async fn list_resumable(&self) -> Result<Vec<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT * FROM accounts
            WHERE status IN ('connected', 'qr_pending')
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Update account safety settings
    pub async fn update_settings(
        &self,
        id: Uuid,
        input: UpdateAccountSettings,
    ) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts SET
                name = COALESCE($2, name),
                daily_limit = COALESCE($3, daily_limit),
                min_delay = COALESCE($4, min_delay),
                max_delay = COALESCE($5, max_delay),
                auto_pause = COALESCE($6, auto_pause),
                pause_after = COALESCE($7, pause_after),
                pause_duration = COALESCE($8, pause_duration),
                use_typing = COALESCE($9, use_typing),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.daily_limit)
        .bind(input.min_delay)
        .bind(input.max_delay)
        .bind(input.auto_pause)
        .bind(input.pause_after)
        .bind(input.pause_duration)
        .bind(input.use_typing)
        .fetch_optional(&self.pool)
        .await
    }

    /// Update the connection status
    pub async fn update_status(
        &self,
        id: Uuid,
        status: ConnectionStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE accounts SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark an account connected and record its resolved phone identity
    pub async fn mark_connected(&self, id: Uuid, phone: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                status = 'connected',
                phone_number = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(phone)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Reset the daily send counter
    pub async fn reset_daily_counter(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                daily_count = 0,
                last_reset = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Increment the daily send counter by one
    pub async fn increment_daily_count(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                daily_count = daily_count + 1,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete an account
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Aggregate account statistics
    pub async fn stats(&self) -> Result<AccountStats, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) as total,
                COUNT(*) FILTER (WHERE status = 'connected') as connected,
                COALESCE(SUM(daily_count), 0) as sends_today
            FROM accounts
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AccountStats {
            total: row.get::<Option<i64>, _>("total").unwrap_or(0),
            connected: row.get::<Option<i64>, _>("connected").unwrap_or(0),
            sends_today: row.get::<Option<i64>, _>("sends_today").unwrap_or(0),
        })
    }
}

/// Aggregate account statistics
#[derive(Debug, Clone, Default)]
pub struct AccountStats {
    pub total: i64,
    pub connected: i64,
    pub sends_today: i64,
}
