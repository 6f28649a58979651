//! Central send gateway
//!
//! Every outbound message passes through here so daily limits, counter
//! resets and typing simulation are enforced in one place. The critical
//! section covers the policy check only; transport calls run outside it.

use chrono::{Local, NaiveDate};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;
use zaprust_common::types::AccountId;
use zaprust_common::Error;
use zaprust_storage::AccountRepository;

use crate::session::{SessionManager, TransportError};

const TYPING_MS_PER_CHAR: u64 = 50;
const TYPING_MIN_MS: u64 = 2_000;
const TYPING_MAX_MS: u64 = 10_000;

/// Failure modes of a gateway send
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),
    #[error("Account {0} has no connected session")]
    SessionUnavailable(AccountId),
    #[error("Daily send limit exceeded")]
    DailyLimitExceeded,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl DispatchError {
    /// Transient failures leave the work item eligible for a later retry
    pub fn is_transient(&self) -> bool {
        match self {
            Self::SessionUnavailable(_) | Self::Database(_) => true,
            Self::Transport(e) => e.is_transient(),
            Self::AccountNotFound(_) | Self::DailyLimitExceeded => false,
        }
    }
}

impl From<DispatchError> for Error {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::AccountNotFound(id) => {
                Error::NotFound(format!("Account {} not found", id))
            }
            DispatchError::SessionUnavailable(id) => {
                Error::SessionUnavailable(format!("Account {} has no connected session", id))
            }
            DispatchError::DailyLimitExceeded => Error::DailyLimitExceeded,
            DispatchError::Database(e) => Error::Database(e.to_string()),
            DispatchError::Transport(e) => Error::Transport(e.to_string()),
        }
    }
}

/// Per-send modifiers
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub media_path: Option<String>,
    pub skip_typing: bool,
}

/// Policy-enforcing wrapper over the session manager's send primitives
#[derive(Clone)]
pub struct DispatchGateway {
    sessions: SessionManager,
    accounts: AccountRepository,
    media_dir: PathBuf,
    locks: Arc<Mutex<HashMap<AccountId, Arc<Mutex<()>>>>>,
}

impl DispatchGateway {
    pub fn new(sessions: SessionManager, accounts: AccountRepository, media_dir: PathBuf) -> Self {
        Self {
            sessions,
            accounts,
            media_dir,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Send one message to a chat, enforcing the account's send policy
    pub async fn send_direct(
        &self,
        account_id: AccountId,
        chat: &str,
        body: &str,
        options: &SendOptions,
    ) -> Result<(), DispatchError> {
        if !self.sessions.is_connected(account_id).await {
            return Err(DispatchError::SessionUnavailable(account_id));
        }

        let account = {
            let lock = self.account_lock(account_id).await;
            let _guard = lock.lock().await;

            let mut account = self
                .accounts
                .get(account_id)
                .await?
                .ok_or(DispatchError::AccountNotFound(account_id))?;

            let today = Local::now().date_naive();
            let last = account.last_reset.with_timezone(&Local).date_naive();
            if daily_reset_due(last, today) {
                self.accounts.reset_daily_counter(account_id).await?;
                account.daily_count = 0;
            }

            if account.daily_limit > 0 && account.daily_count >= account.daily_limit {
                return Err(DispatchError::DailyLimitExceeded);
            }
            account
        };

        if account.use_typing && !options.skip_typing {
            tokio::time::sleep(typing_delay(body.chars().count())).await;
        }

        match &options.media_path {
            Some(stored) => {
                let resolved = resolve_media(&self.media_dir, stored);
                let caption = (!body.is_empty()).then_some(body);
                self.sessions
                    .send_media(account_id, chat, &resolved, caption)
                    .await?;
            }
            None => self.sessions.send_text(account_id, chat, body).await?,
        }

        self.accounts.increment_daily_count(account_id).await?;
        debug!(%account_id, chat, "Message dispatched");
        Ok(())
    }

    /// Publish a broadcast post. Connectivity checked, limits not applied.
    pub async fn post_broadcast(
        &self,
        account_id: AccountId,
        media_path: &str,
        caption: Option<&str>,
    ) -> Result<(), DispatchError> {
        if !self.sessions.is_connected(account_id).await {
            return Err(DispatchError::SessionUnavailable(account_id));
        }
        let resolved = resolve_media(&self.media_dir, media_path);
        self.sessions
            .post_broadcast(account_id, &resolved, caption)
            .await?;
        Ok(())
    }

    async fn account_lock(&self, account_id: AccountId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(account_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Resolve a stored media reference against the configured media root
pub fn resolve_media(media_dir: &Path, stored: &str) -> PathBuf {
    let path = Path::new(stored);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        media_dir.join(path)
    }
}

/// Simulated typing time for a message of `len` characters
pub fn typing_delay(len: usize) -> Duration {
    let ms = (len as u64 * TYPING_MS_PER_CHAR).clamp(TYPING_MIN_MS, TYPING_MAX_MS);
    Duration::from_millis(ms)
}

/// True when the daily counter was last reset on a different calendar day
pub fn daily_reset_due(last_reset: NaiveDate, today: NaiveDate) -> bool {
    last_reset != today
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_typing_delay_clamps_short_messages() {
        assert_eq!(typing_delay(0), Duration::from_millis(2_000));
        assert_eq!(typing_delay(10), Duration::from_millis(2_000));
        assert_eq!(typing_delay(40), Duration::from_millis(2_000));
    }

    #[test]
    fn test_typing_delay_scales_with_length() {
        assert_eq!(typing_delay(100), Duration::from_millis(5_000));
        assert_eq!(typing_delay(150), Duration::from_millis(7_500));
    }

    #[test]
    fn test_typing_delay_clamps_long_messages() {
        assert_eq!(typing_delay(200), Duration::from_millis(10_000));
        assert_eq!(typing_delay(5_000), Duration::from_millis(10_000));
    }

    #[test]
    fn test_daily_reset_on_calendar_day_change() {
        let d = |s: &str| s.parse::<NaiveDate>().unwrap();
        assert!(!daily_reset_due(d("2024-01-05"), d("2024-01-05")));
        assert!(daily_reset_due(d("2024-01-04"), d("2024-01-05")));
        // a counter from exactly a month ago must also reset
        assert!(daily_reset_due(d("2024-01-05"), d("2024-02-05")));
    }

    #[test]
    fn test_resolve_media_paths() {
        let dir = Path::new("/var/lib/zaprust/uploads");
        assert_eq!(
            resolve_media(dir, "photo.jpg"),
            PathBuf::from("/var/lib/zaprust/uploads/photo.jpg")
        );
        assert_eq!(resolve_media(dir, "/tmp/abs.jpg"), PathBuf::from("/tmp/abs.jpg"));
    }
}
