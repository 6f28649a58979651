//! Data models for ZapRust

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use zaprust_common::types::{AccountId, CampaignId, ConnectionStatus, Severity};

/// Account model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: uuid::Uuid,
    pub name: String,
    pub status: String,
    pub phone_number: Option<String>,
    pub daily_limit: i32,
    pub daily_count: i32,
    pub last_reset: DateTime<Utc>,
    pub min_delay: i32,
    pub max_delay: i32,
    pub auto_pause: bool,
    pub pause_after: i32,
    pub pause_duration: i32,
    pub use_typing: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Get connection status enum
    pub fn connection_status(&self) -> Option<ConnectionStatus> {
        self.status.parse().ok()
    }
}

/// Create account input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccount {
    pub name: String,
    pub daily_limit: Option<i32>,
    pub min_delay: Option<i32>,
    pub max_delay: Option<i32>,
}

/// Update account safety settings input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAccountSettings {
    pub name: Option<String>,
    pub daily_limit: Option<i32>,
    pub min_delay: Option<i32>,
    pub max_delay: Option<i32>,
    pub auto_pause: Option<bool>,
    pub pause_after: Option<i32>,
    pub pause_duration: Option<i32>,
    pub use_typing: Option<bool>,
}

/// Scheduled job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Sent,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Sent => write!(f, "sent"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "sent" => Ok(JobStatus::Sent),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

/// Repeat rule kind for a scheduled job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatType {
    Daily,
    Weekly,
    Custom,
}

impl std::fmt::Display for RepeatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepeatType::Daily => write!(f, "daily"),
            RepeatType::Weekly => write!(f, "weekly"),
            RepeatType::Custom => write!(f, "custom"),
        }
    }
}

impl std::str::FromStr for RepeatType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(RepeatType::Daily),
            "weekly" => Ok(RepeatType::Weekly),
            "custom" => Ok(RepeatType::Custom),
            _ => Err(format!("Invalid repeat type: {}", s)),
        }
    }
}

/// Scheduled job model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Job {
    pub id: uuid::Uuid,
    pub account_id: AccountId,
    pub media_path: Option<String>,
    pub caption: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub status: String,
    pub repeat_type: Option<String>,
    pub repeat_days: serde_json::Value,
    pub executed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Get status enum
    pub fn status_enum(&self) -> Option<JobStatus> {
        self.status.parse().ok()
    }

    /// Get repeat type enum
    pub fn repeat_enum(&self) -> Option<RepeatType> {
        self.repeat_type.as_deref().and_then(|s| s.parse().ok())
    }

    /// Get the custom repeat weekdays (0 = Sunday .. 6 = Saturday)
    pub fn repeat_days_vec(&self) -> Vec<u32> {
        serde_json::from_value(self.repeat_days.clone()).unwrap_or_default()
    }
}

/// Create job input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    pub account_id: AccountId,
    pub media_path: Option<String>,
    pub caption: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub repeat_type: Option<RepeatType>,
    pub repeat_days: Option<Vec<u32>>,
}

/// Campaign status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Pending,
    Scheduled,
    Running,
    Paused,
    Completed,
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignStatus::Pending => write!(f, "pending"),
            CampaignStatus::Scheduled => write!(f, "scheduled"),
            CampaignStatus::Running => write!(f, "running"),
            CampaignStatus::Paused => write!(f, "paused"),
            CampaignStatus::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CampaignStatus::Pending),
            "scheduled" => Ok(CampaignStatus::Scheduled),
            "running" => Ok(CampaignStatus::Running),
            "paused" => Ok(CampaignStatus::Paused),
            "completed" => Ok(CampaignStatus::Completed),
            _ => Err(format!("Invalid campaign status: {}", s)),
        }
    }
}

/// Campaign model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Campaign {
    pub id: uuid::Uuid,
    pub account_id: AccountId,
    pub name: String,
    pub message_template: String,
    pub media_path: Option<String>,
    pub min_interval: i32,
    pub max_interval: i32,
    pub status: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Get status enum
    pub fn status_enum(&self) -> Option<CampaignStatus> {
        self.status.parse().ok()
    }
}

/// Create campaign input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCampaign {
    pub account_id: AccountId,
    pub name: String,
    pub message_template: String,
    pub media_path: Option<String>,
    pub min_interval: Option<i32>,
    pub max_interval: Option<i32>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Campaign item status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignItemStatus {
    Pending,
    Sent,
    Failed,
}

impl std::fmt::Display for CampaignItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignItemStatus::Pending => write!(f, "pending"),
            CampaignItemStatus::Sent => write!(f, "sent"),
            CampaignItemStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for CampaignItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CampaignItemStatus::Pending),
            "sent" => Ok(CampaignItemStatus::Sent),
            "failed" => Ok(CampaignItemStatus::Failed),
            _ => Err(format!("Invalid campaign item status: {}", s)),
        }
    }
}

/// Campaign item model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CampaignItem {
    pub id: uuid::Uuid,
    pub campaign_id: CampaignId,
    pub phone: String,
    pub name: Option<String>,
    pub status: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub error_log: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CampaignItem {
    /// Get status enum
    pub fn status_enum(&self) -> Option<CampaignItemStatus> {
        self.status.parse().ok()
    }
}

/// Create campaign item input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCampaignItem {
    pub phone: String,
    pub name: Option<String>,
}

/// Reply rule match mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Contains,
    Exact,
    Regex,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchType::Contains => write!(f, "contains"),
            MatchType::Exact => write!(f, "exact"),
            MatchType::Regex => write!(f, "regex"),
        }
    }
}

impl std::str::FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contains" => Ok(MatchType::Contains),
            "exact" => Ok(MatchType::Exact),
            "regex" => Ok(MatchType::Regex),
            _ => Err(format!("Invalid match type: {}", s)),
        }
    }
}

/// Reply rule model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReplyRule {
    pub id: uuid::Uuid,
    pub account_id: AccountId,
    pub name: Option<String>,
    pub trigger_text: String,
    pub match_type: String,
    pub response: String,
    pub media_path: Option<String>,
    pub priority: i32,
    pub delay_secs: i32,
    pub apply_group: bool,
    pub apply_private: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReplyRule {
    /// Get match type enum
    pub fn match_type_enum(&self) -> Option<MatchType> {
        self.match_type.parse().ok()
    }
}

/// Create reply rule input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReplyRule {
    pub account_id: AccountId,
    pub name: Option<String>,
    pub trigger_text: String,
    pub match_type: MatchType,
    pub response: String,
    pub media_path: Option<String>,
    pub priority: Option<i32>,
    pub delay_secs: Option<i32>,
    pub apply_group: Option<bool>,
    pub apply_private: Option<bool>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

/// Update reply rule input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReplyRule {
    pub name: Option<String>,
    pub trigger_text: Option<String>,
    pub match_type: Option<MatchType>,
    pub response: Option<String>,
    pub media_path: Option<String>,
    pub priority: Option<i32>,
    pub delay_secs: Option<i32>,
    pub apply_group: Option<bool>,
    pub apply_private: Option<bool>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

/// Activity log entry model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: uuid::Uuid,
    pub account_id: Option<AccountId>,
    pub campaign_id: Option<CampaignId>,
    pub kind: String,
    pub action: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

/// Create activity log input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateActivityLog {
    pub account_id: Option<AccountId>,
    pub campaign_id: Option<CampaignId>,
    pub kind: Severity,
    pub action: String,
    pub details: String,
}
