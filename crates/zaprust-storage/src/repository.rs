//! Repository layer for data access

pub mod accounts;
pub mod activity_logs;
pub mod campaign_items;
pub mod campaigns;
pub mod jobs;
pub mod reply_rules;

pub use accounts::{AccountRepository, AccountStats};
pub use activity_logs::ActivityLogRepository;
pub use campaign_items::{CampaignItemCounts, CampaignItemRepository};
pub use campaigns::CampaignRepository;
pub use jobs::JobRepository;
pub use reply_rules::ReplyRuleRepository;
