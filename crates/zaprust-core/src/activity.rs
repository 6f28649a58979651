//! Best-effort activity recording

use tracing::warn;
use zaprust_common::types::{AccountId, CampaignId, Severity};
use zaprust_storage::models::CreateActivityLog;
use zaprust_storage::repository::ActivityLogRepository;

/// Appends activity entries without letting storage failures
/// propagate into engine paths.
#[derive(Clone)]
pub struct ActivityRecorder {
    repo: ActivityLogRepository,
}

impl ActivityRecorder {
    pub fn new(repo: ActivityLogRepository) -> Self {
        Self { repo }
    }

    /// Record one activity entry; failures are logged and swallowed
    pub async fn record(
        &self,
        kind: Severity,
        action: &str,
        details: impl Into<String>,
        account_id: Option<AccountId>,
        campaign_id: Option<CampaignId>,
    ) {
        let entry = CreateActivityLog {
            account_id,
            campaign_id,
            kind,
            action: action.to_string(),
            details: details.into(),
        };

        if let Err(e) = self.repo.append(entry).await {
            warn!(action, "Failed to record activity: {}", e);
        }
    }
}
