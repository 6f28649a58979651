//! Bulk campaign processor
//!
//! A single sequential loop advances every running campaign by at most
//! one recipient per cycle. Cooldowns and auto-pause windows are held
//! in memory and re-checked lazily, so a restart simply resumes from
//! the queue in the database.

use chrono::Local;
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use zaprust_common::config::CampaignConfig;
use zaprust_common::types::{PhoneNumber, Severity};
use zaprust_storage::{
    Account, AccountRepository, Campaign, CampaignItem, CampaignItemRepository,
    CampaignItemStatus, CampaignRepository, CampaignStatus,
};

use super::pause::PauseRegistry;
use super::template;
use crate::activity::ActivityRecorder;
use crate::dispatch::{DispatchError, DispatchGateway, SendOptions};
use crate::events::{Event, EventBus};
use crate::session::SessionManager;

/// Drains running campaigns one recipient at a time
#[derive(Clone)]
pub struct CampaignProcessor {
    campaigns: CampaignRepository,
    items: CampaignItemRepository,
    accounts: AccountRepository,
    sessions: SessionManager,
    gateway: DispatchGateway,
    activity: ActivityRecorder,
    bus: EventBus,
    paused: PauseRegistry,
    cooldown: PauseRegistry,
    cycle: Duration,
}

impl CampaignProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        campaigns: CampaignRepository,
        items: CampaignItemRepository,
        accounts: AccountRepository,
        sessions: SessionManager,
        gateway: DispatchGateway,
        activity: ActivityRecorder,
        bus: EventBus,
        paused: PauseRegistry,
        config: &CampaignConfig,
    ) -> Self {
        Self {
            campaigns,
            items,
            accounts,
            sessions,
            gateway,
            activity,
            bus,
            paused,
            cooldown: PauseRegistry::new(),
            cycle: Duration::from_secs(config.cycle_secs),
        }
    }

    /// Run the drain loop until cancelled
    ///
    /// Sleeps before the first pass so a freshly started server settles
    /// before campaigns begin moving.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(cycle_secs = self.cycle.as_secs(), "Campaign processor started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.cycle) => {}
            }
            self.drain_cycle().await;
        }
        info!("Campaign processor stopped");
    }

    /// One pass: promote due scheduled campaigns, then advance each
    /// running campaign by at most one recipient
    pub async fn drain_cycle(&self) {
        match self.campaigns.list_scheduled_ready().await {
            Ok(ready) => {
                for campaign in ready {
                    info!(campaign = %campaign.name, "Scheduled campaign starting");
                    if let Err(e) = self
                        .campaigns
                        .update_status(campaign.id, CampaignStatus::Running)
                        .await
                    {
                        error!(campaign_id = %campaign.id, "Failed to start campaign: {}", e);
                    }
                }
            }
            Err(e) => error!("Failed to load scheduled campaigns: {}", e),
        }

        let running = match self.campaigns.list_running().await {
            Ok(campaigns) => campaigns,
            Err(e) => {
                error!("Failed to load running campaigns: {}", e);
                return;
            }
        };
        for campaign in running {
            self.process_campaign(&campaign).await;
        }
    }

    async fn process_campaign(&self, campaign: &Campaign) {
        if self.paused.is_paused(campaign.id) || self.cooldown.is_paused(campaign.id) {
            return;
        }

        let account = match self.accounts.get(campaign.account_id).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                warn!(campaign = %campaign.name, "Owning account is gone; pausing campaign");
                if let Err(e) = self
                    .campaigns
                    .update_status(campaign.id, CampaignStatus::Paused)
                    .await
                {
                    error!(campaign_id = %campaign.id, "Failed to pause campaign: {}", e);
                }
                return;
            }
            Err(e) => {
                error!(campaign_id = %campaign.id, "Failed to load account: {}", e);
                return;
            }
        };

        if !self.sessions.is_connected(campaign.account_id).await {
            debug!(campaign = %campaign.name, "Session offline; campaign waits");
            return;
        }

        // Skip while today's quota is spent. A counter from an earlier
        // day does not block; the gateway resets it on the next send.
        let counter_is_todays =
            account.last_reset.with_timezone(&Local).date_naive() == Local::now().date_naive();
        if counter_is_todays && account.daily_limit > 0 && account.daily_count >= account.daily_limit
        {
            debug!(campaign = %campaign.name, "Daily limit reached; campaign waits");
            return;
        }

        let item = match self.items.next_pending(campaign.id).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                self.finish_campaign(campaign).await;
                return;
            }
            Err(e) => {
                error!(campaign_id = %campaign.id, "Failed to load next recipient: {}", e);
                return;
            }
        };

        self.send_item(campaign, &account, &item).await;
    }

    async fn send_item(&self, campaign: &Campaign, account: &Account, item: &CampaignItem) {
        let Some(phone) = PhoneNumber::parse(&item.phone) else {
            self.item_failed(campaign, item, "Invalid phone number").await;
            self.arm_cooldown(campaign, account);
            return;
        };

        let message =
            template::render_message(&campaign.message_template, &item.phone, item.name.as_deref());
        let options = SendOptions {
            media_path: campaign.media_path.clone(),
            skip_typing: false,
        };

        match self
            .gateway
            .send_direct(campaign.account_id, &phone.to_chat_address(), &message, &options)
            .await
        {
            Ok(()) => {
                self.item_sent(campaign, item).await;
                self.arm_cooldown(campaign, account);
                self.check_auto_pause(campaign, account).await;
            }
            Err(DispatchError::DailyLimitExceeded) => {
                // raced past the pre-check; the recipient stays queued
                debug!(campaign = %campaign.name, "Daily limit reached; campaign waits");
            }
            Err(e) if e.is_transient() => {
                debug!(
                    campaign = %campaign.name,
                    item_id = %item.id,
                    "Transient failure; recipient stays queued: {}", e
                );
            }
            Err(e) => {
                self.item_failed(campaign, item, &e.to_string()).await;
                self.arm_cooldown(campaign, account);
            }
        }
    }

    async fn item_sent(&self, campaign: &Campaign, item: &CampaignItem) {
        if let Err(e) = self.items.mark_sent(item.id).await {
            error!(item_id = %item.id, "Failed to mark recipient sent: {}", e);
        }
        debug!(campaign = %campaign.name, phone = %item.phone, "Campaign message sent");
        self.bus.publish(Event::CampaignProgress {
            campaign_id: campaign.id,
            item_id: item.id,
            status: CampaignItemStatus::Sent,
        });
    }

    async fn item_failed(&self, campaign: &Campaign, item: &CampaignItem, reason: &str) {
        warn!(
            campaign = %campaign.name,
            phone = %item.phone,
            reason,
            "Campaign message failed"
        );
        if let Err(e) = self.items.mark_failed(item.id, reason).await {
            error!(item_id = %item.id, "Failed to mark recipient failed: {}", e);
        }
        self.bus.publish(Event::CampaignProgress {
            campaign_id: campaign.id,
            item_id: item.id,
            status: CampaignItemStatus::Failed,
        });
        self.activity
            .record(
                Severity::Warning,
                "campaign",
                format!("Send to {} failed: {}", item.phone, reason),
                Some(campaign.account_id),
                Some(campaign.id),
            )
            .await;
    }

    fn arm_cooldown(&self, campaign: &Campaign, account: &Account) {
        let wait = draw_cooldown(
            campaign.min_interval,
            campaign.max_interval,
            account.min_delay,
            account.max_delay,
        );
        debug!(campaign = %campaign.name, secs = wait.as_secs(), "Cooldown armed");
        self.cooldown.pause_for(campaign.id, wait);
    }

    /// Re-reads the account so the counter incremented by the gateway
    /// is seen before deciding on a rest window.
    async fn check_auto_pause(&self, campaign: &Campaign, account: &Account) {
        let fresh = match self.accounts.get(account.id).await {
            Ok(Some(fresh)) => fresh,
            Ok(None) => return,
            Err(e) => {
                error!(account_id = %account.id, "Failed to re-read account: {}", e);
                return;
            }
        };
        if !should_auto_pause(&fresh) {
            return;
        }

        let rest = Duration::from_secs(fresh.pause_duration as u64 * 60);
        info!(
            account = %fresh.name,
            minutes = fresh.pause_duration,
            "Auto-pause engaged"
        );
        self.paused.pause_for(campaign.id, rest);
        self.bus.notify(
            Severity::Info,
            "Auto-pause",
            format!(
                "Account {} is resting for {} minutes",
                fresh.name, fresh.pause_duration
            ),
            Some(account.id),
        );
        self.activity
            .record(
                Severity::Info,
                "auto_pause",
                format!(
                    "Paused for {} minutes after {} sends today",
                    fresh.pause_duration, fresh.daily_count
                ),
                Some(account.id),
                Some(campaign.id),
            )
            .await;
    }

    async fn finish_campaign(&self, campaign: &Campaign) {
        info!(campaign = %campaign.name, "Campaign completed");
        if let Err(e) = self
            .campaigns
            .update_status(campaign.id, CampaignStatus::Completed)
            .await
        {
            error!(campaign_id = %campaign.id, "Failed to complete campaign: {}", e);
        }
        self.cooldown.clear(campaign.id);
        self.paused.clear(campaign.id);

        let details = match self.items.counts(campaign.id).await {
            Ok(counts) => format!("Delivered {} of {} messages", counts.sent, counts.total()),
            Err(_) => "Campaign completed".to_string(),
        };
        self.bus.notify(
            Severity::Info,
            "Campaign completed",
            details.clone(),
            Some(campaign.account_id),
        );
        self.activity
            .record(
                Severity::Info,
                "campaign",
                details,
                Some(campaign.account_id),
                Some(campaign.id),
            )
            .await;
    }
}

/// Upper bound for a cooldown draw
///
/// Stretches to 1.5x the lower bound when the configured bounds are
/// inverted or too close, keeping the pacing visibly random.
fn cooldown_upper(lower: i64, upper: i64) -> i64 {
    upper.max(lower.saturating_mul(3) / 2)
}

/// Random wait between campaign messages
///
/// Each bound is the stricter of the campaign's and the account's.
fn draw_cooldown(campaign_min: i32, campaign_max: i32, account_min: i32, account_max: i32) -> Duration {
    let lower = i64::from(campaign_min.max(account_min)).max(0);
    let upper = cooldown_upper(lower, i64::from(campaign_max.max(account_max)).max(0));
    let secs = if upper > lower {
        rand::thread_rng().gen_range(lower..=upper)
    } else {
        lower
    };
    Duration::from_secs(secs as u64)
}

/// Whether the account should rest after the send that just completed
fn should_auto_pause(account: &Account) -> bool {
    account.auto_pause
        && account.pause_after > 0
        && account.pause_duration > 0
        && account.daily_count > 0
        && account.daily_count % account.pause_after == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn account(auto_pause: bool, pause_after: i32, pause_duration: i32, daily_count: i32) -> Account {
        Account {
            id: Uuid::new_v4(),
            name: "test".to_string(),
            status: "connected".to_string(),
            phone_number: None,
            daily_limit: 0,
            daily_count,
            last_reset: Utc::now(),
            min_delay: 30,
            max_delay: 90,
            auto_pause,
            pause_after,
            pause_duration,
            use_typing: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_cooldown_upper_stretches_tight_bounds() {
        assert_eq!(cooldown_upper(10, 20), 20);
        assert_eq!(cooldown_upper(10, 5), 15);
        assert_eq!(cooldown_upper(10, 10), 15);
        assert_eq!(cooldown_upper(0, 0), 0);
    }

    #[test]
    fn test_draw_cooldown_takes_stricter_bounds() {
        for _ in 0..100 {
            let wait = draw_cooldown(30, 90, 60, 45).as_secs();
            // effective range is [60, 90]
            assert!((60..=90).contains(&wait), "drew {}", wait);
        }
    }

    #[test]
    fn test_draw_cooldown_zero_bounds_means_no_wait() {
        assert_eq!(draw_cooldown(0, 0, 0, 0), Duration::from_secs(0));
    }

    #[test]
    fn test_auto_pause_fires_on_threshold_multiples() {
        assert!(should_auto_pause(&account(true, 10, 5, 10)));
        assert!(should_auto_pause(&account(true, 10, 5, 20)));
        assert!(!should_auto_pause(&account(true, 10, 5, 15)));
    }

    #[test]
    fn test_auto_pause_guards() {
        assert!(!should_auto_pause(&account(false, 10, 5, 10)));
        assert!(!should_auto_pause(&account(true, 0, 5, 10)));
        assert!(!should_auto_pause(&account(true, 10, 0, 10)));
        assert!(!should_auto_pause(&account(true, 10, 5, 0)));
    }
}
