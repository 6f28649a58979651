//! Lazy-expiry hold registry for campaign throttling

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use zaprust_common::types::CampaignId;

/// Tracks campaigns that are sitting out a hold window
///
/// Expiry is evaluated lazily on read, so no timer tasks are involved.
/// Holds live in memory only and do not survive a restart.
#[derive(Clone, Default)]
pub struct PauseRegistry {
    inner: Arc<Mutex<HashMap<CampaignId, Instant>>>,
}

impl PauseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the campaign for `duration` from now
    pub fn pause_for(&self, id: CampaignId, duration: Duration) {
        let until = Instant::now() + duration;
        self.lock().insert(id, until);
    }

    /// Whether the campaign is still inside its hold window
    pub fn is_paused(&self, id: CampaignId) -> bool {
        let mut map = self.lock();
        match map.get(&id) {
            Some(until) if *until > Instant::now() => true,
            Some(_) => {
                map.remove(&id);
                false
            }
            None => false,
        }
    }

    /// Drop the hold early, e.g. when a campaign is resumed by hand
    pub fn clear(&self, id: CampaignId) {
        self.lock().remove(&id);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CampaignId, Instant>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test(start_paused = true)]
    async fn test_hold_expires_after_duration() {
        let registry = PauseRegistry::new();
        let id = Uuid::new_v4();

        registry.pause_for(id, Duration::from_secs(60));
        assert!(registry.is_paused(id));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(registry.is_paused(id));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!registry.is_paused(id));
        // expired entries are dropped, repeated checks stay false
        assert!(!registry.is_paused(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_lifts_hold_immediately() {
        let registry = PauseRegistry::new();
        let id = Uuid::new_v4();

        registry.pause_for(id, Duration::from_secs(600));
        assert!(registry.is_paused(id));

        registry.clear(id);
        assert!(!registry.is_paused(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_campaign_is_not_held() {
        let registry = PauseRegistry::new();
        assert!(!registry.is_paused(Uuid::new_v4()));
    }
}
