//! Session lifecycle manager
//!
//! One entry per account: the live transport handle, a readiness watch,
//! the pending provisioning artifact and the reconnect state. All entry
//! mutation happens under short lock scopes; transport calls and
//! database writes run outside them.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use zaprust_common::types::{AccountId, ConnectionStatus, Severity};
use zaprust_common::{Error, Result};
use zaprust_storage::AccountRepository;

use super::backoff;
use super::transport::{SessionHandle, Transport, TransportError, TransportEvent};
use crate::activity::ActivityRecorder;
use crate::events::{Event, EventBus, InboundMessage};

const EVENT_CHANNEL_CAPACITY: usize = 64;

struct LiveSession {
    handle: Arc<dyn SessionHandle>,
    pump: JoinHandle<()>,
}

struct SessionEntry {
    live: Option<LiveSession>,
    ready: watch::Sender<bool>,
    qr: Option<String>,
    attempts: u32,
    reconnect_timer: Option<JoinHandle<()>>,
}

impl SessionEntry {
    fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            live: None,
            ready,
            qr: None,
            attempts: 0,
            reconnect_timer: None,
        }
    }
}

/// Drives one long-lived messaging session per account
#[derive(Clone)]
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    accounts: AccountRepository,
    activity: ActivityRecorder,
    bus: EventBus,
    inbound: mpsc::Sender<InboundMessage>,
    sessions: Arc<RwLock<HashMap<AccountId, SessionEntry>>>,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        accounts: AccountRepository,
        activity: ActivityRecorder,
        bus: EventBus,
        inbound: mpsc::Sender<InboundMessage>,
    ) -> Self {
        Self {
            transport,
            accounts,
            activity,
            bus,
            inbound,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start a session for the account; no-op when already connected
    pub async fn connect(&self, account_id: AccountId) -> Result<()> {
        let account = self
            .accounts
            .get(account_id)
            .await
            .map_err(|e| Error::Database(e.to_string()))?
            .ok_or_else(|| Error::NotFound(format!("Account {} not found", account_id)))?;

        if self.is_connected(account_id).await {
            debug!(account = %account.name, "Session already connected");
            return Ok(());
        }

        self.cancel_reconnect(account_id).await;
        if let Some(stale) = self.clear_live(account_id, true).await {
            if let Err(e) = stale.shutdown().await {
                debug!(account = %account.name, "Stale session teardown failed: {}", e);
            }
        }

        info!(account = %account.name, "Starting session");
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let handle: Arc<dyn SessionHandle> = match self.transport.start_session(account_id, tx).await
        {
            Ok(handle) => Arc::from(handle),
            Err(e) => {
                warn!(account = %account.name, "Session start failed: {}", e);
                self.schedule_reconnect(account_id).await;
                return Err(Error::Transport(e.to_string()));
            }
        };

        let pump = tokio::spawn({
            let manager = self.clone();
            async move { manager.pump_events(account_id, rx).await }
        });

        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(account_id).or_insert_with(SessionEntry::new);
        entry.live = Some(LiveSession { handle, pump });
        Ok(())
    }

    /// Tear down the account's session; idempotent
    pub async fn disconnect(&self, account_id: AccountId) -> Result<()> {
        self.cancel_reconnect(account_id).await;
        if let Some(handle) = self.clear_live(account_id, true).await {
            if let Err(e) = handle.shutdown().await {
                debug!(%account_id, "Session teardown failed: {}", e);
            }
        }

        self.accounts
            .update_status(account_id, ConnectionStatus::Disconnected)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        self.bus.publish(Event::ConnectionChanged {
            account_id,
            status: ConnectionStatus::Disconnected,
        });
        self.activity
            .record(
                Severity::Info,
                "disconnect",
                "Session disconnected",
                Some(account_id),
                None,
            )
            .await;
        Ok(())
    }

    /// Whether the account has a session that reported ready
    pub async fn is_connected(&self, account_id: AccountId) -> bool {
        let sessions = self.sessions.read().await;
        sessions
            .get(&account_id)
            .map(|entry| entry.live.is_some() && *entry.ready.borrow())
            .unwrap_or(false)
    }

    /// The pending provisioning artifact, if authentication is in progress
    pub async fn qr_artifact(&self, account_id: AccountId) -> Option<String> {
        let sessions = self.sessions.read().await;
        sessions.get(&account_id).and_then(|entry| entry.qr.clone())
    }

    /// Wait until the session reports ready, up to `timeout`
    pub async fn wait_until_ready(&self, account_id: AccountId, timeout: Duration) -> bool {
        let mut rx = {
            let sessions = self.sessions.read().await;
            match sessions.get(&account_id) {
                Some(entry) => entry.ready.subscribe(),
                None => return false,
            }
        };

        if *rx.borrow() {
            return true;
        }
        tokio::time::timeout(timeout, async {
            while rx.changed().await.is_ok() {
                if *rx.borrow() {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap_or(false)
    }

    pub async fn send_text(
        &self,
        account_id: AccountId,
        chat: &str,
        body: &str,
    ) -> std::result::Result<(), TransportError> {
        self.live_handle(account_id).await?.send_text(chat, body).await
    }

    pub async fn send_media(
        &self,
        account_id: AccountId,
        chat: &str,
        media_path: &Path,
        caption: Option<&str>,
    ) -> std::result::Result<(), TransportError> {
        self.live_handle(account_id)
            .await?
            .send_media(chat, media_path, caption)
            .await
    }

    pub async fn post_broadcast(
        &self,
        account_id: AccountId,
        media_path: &Path,
        caption: Option<&str>,
    ) -> std::result::Result<(), TransportError> {
        self.live_handle(account_id)
            .await?
            .post_broadcast(media_path, caption)
            .await
    }

    /// Drop every trace of a deleted account
    pub async fn remove_account(&self, account_id: AccountId) {
        self.cancel_reconnect(account_id).await;
        if let Some(handle) = self.clear_live(account_id, true).await {
            if let Err(e) = handle.shutdown().await {
                debug!(%account_id, "Session teardown failed: {}", e);
            }
        }
        self.sessions.write().await.remove(&account_id);
    }

    /// Re-establish sessions for accounts that were connected before restart
    pub async fn resume_saved_sessions(&self) {
        let accounts = match self.accounts.list_resumable().await {
            Ok(accounts) => accounts,
            Err(e) => {
                error!("Failed to list resumable accounts: {}", e);
                return;
            }
        };
        if accounts.is_empty() {
            return;
        }

        info!(count = accounts.len(), "Resuming saved sessions");
        for account in accounts {
            if let Err(e) = self.connect(account.id).await {
                warn!(account = %account.name, "Session resume failed: {}", e);
            }
        }
    }

    async fn live_handle(
        &self,
        account_id: AccountId,
    ) -> std::result::Result<Arc<dyn SessionHandle>, TransportError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&account_id)
            .and_then(|entry| entry.live.as_ref())
            .map(|live| live.handle.clone())
            .ok_or(TransportError::NotConnected)
    }

    /// Take the live session out of the entry, marking it not ready.
    /// `abort_pump` must be false when called from the pump itself.
    async fn clear_live(
        &self,
        account_id: AccountId,
        abort_pump: bool,
    ) -> Option<Arc<dyn SessionHandle>> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&account_id)?;
        let live = entry.live.take()?;
        if abort_pump {
            live.pump.abort();
        }
        let _ = entry.ready.send(false);
        entry.qr = None;
        Some(live.handle)
    }

    async fn cancel_reconnect(&self, account_id: AccountId) {
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(&account_id) {
            if let Some(timer) = entry.reconnect_timer.take() {
                timer.abort();
            }
        }
    }

    async fn schedule_reconnect(&self, account_id: AccountId) {
        let delay = {
            let mut sessions = self.sessions.write().await;
            let entry = sessions.entry(account_id).or_insert_with(SessionEntry::new);
            if let Some(timer) = entry.reconnect_timer.take() {
                timer.abort();
            }
            let delay = backoff::reconnect_delay(entry.attempts);
            entry.attempts += 1;
            if entry.attempts % 5 == 0 {
                self.bus.notify(
                    Severity::Warning,
                    "Reconnect pending",
                    format!("Still retrying connection (attempt {})", entry.attempts),
                    Some(account_id),
                );
            }
            delay
        };

        debug!(%account_id, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");
        let timer = tokio::spawn({
            let manager = self.clone();
            async move {
                tokio::time::sleep(delay).await;
                manager.attempt_reconnect(account_id).await;
            }
        });

        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(&account_id) {
            entry.reconnect_timer = Some(timer);
        }
    }

    // Boxed so the connect -> schedule_reconnect -> attempt_reconnect
    // -> connect future cycle stays `Send`-provable.
    fn attempt_reconnect(
        &self,
        account_id: AccountId,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            // The timer has fired; forget its handle so connect() does not
            // abort the very task we are running on.
            {
                let mut sessions = self.sessions.write().await;
                if let Some(entry) = sessions.get_mut(&account_id) {
                    entry.reconnect_timer = None;
                }
            }

            match self.accounts.get(account_id).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    debug!(%account_id, "Account removed; dropping reconnect");
                    self.sessions.write().await.remove(&account_id);
                    return;
                }
                Err(e) => {
                    error!(%account_id, "Failed to load account for reconnect: {}", e);
                    self.schedule_reconnect(account_id).await;
                    return;
                }
            }

            if self.is_connected(account_id).await {
                return;
            }
            if let Err(e) = self.connect(account_id).await {
                // connect() already scheduled the next attempt
                debug!(%account_id, "Reconnect attempt failed: {}", e);
            }
        })
    }

    async fn pump_events(&self, account_id: AccountId, mut events: mpsc::Receiver<TransportEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::Challenge { artifact } => {
                    self.on_challenge(account_id, artifact).await;
                }
                TransportEvent::Authenticated { phone } => {
                    self.on_authenticated(account_id, &phone).await;
                }
                TransportEvent::Ready => self.on_ready(account_id).await,
                TransportEvent::AuthFailure { reason } => {
                    self.on_auth_failure(account_id, &reason).await;
                    break;
                }
                TransportEvent::Disconnected { reason } => {
                    self.on_disconnected(account_id, &reason).await;
                    break;
                }
                TransportEvent::Message { chat, body } => {
                    let message = InboundMessage {
                        account_id,
                        chat,
                        body,
                    };
                    if self.inbound.send(message).await.is_err() {
                        warn!(%account_id, "Inbound channel closed; dropping message");
                    }
                }
            }
        }
        debug!(%account_id, "Event pump stopped");
    }

    async fn on_challenge(&self, account_id: AccountId, artifact: String) {
        info!(%account_id, "Provisioning challenge received");
        {
            let mut sessions = self.sessions.write().await;
            if let Some(entry) = sessions.get_mut(&account_id) {
                entry.qr = Some(artifact.clone());
            }
        }
        if let Err(e) = self
            .accounts
            .update_status(account_id, ConnectionStatus::QrPending)
            .await
        {
            error!(%account_id, "Failed to persist qr_pending status: {}", e);
        }
        self.bus.publish(Event::ChallengeIssued {
            account_id,
            artifact,
        });
        self.bus.publish(Event::ConnectionChanged {
            account_id,
            status: ConnectionStatus::QrPending,
        });
        self.bus.notify(
            Severity::Info,
            "Scan required",
            "Scan the provisioning code to finish connecting",
            Some(account_id),
        );
    }

    async fn on_authenticated(&self, account_id: AccountId, phone: &str) {
        info!(%account_id, phone, "Session authenticated");
        if let Err(e) = self.accounts.mark_connected(account_id, phone).await {
            error!(%account_id, "Failed to persist connected status: {}", e);
        }
        {
            let mut sessions = self.sessions.write().await;
            if let Some(entry) = sessions.get_mut(&account_id) {
                entry.qr = None;
                entry.attempts = 0;
            }
        }
        self.bus.publish(Event::ConnectionChanged {
            account_id,
            status: ConnectionStatus::Connected,
        });
        self.bus.notify(
            Severity::Info,
            "Connected",
            format!("Session authenticated as {}", phone),
            Some(account_id),
        );
        self.activity
            .record(
                Severity::Info,
                "connection",
                format!("Authenticated as {}", phone),
                Some(account_id),
                None,
            )
            .await;
    }

    async fn on_ready(&self, account_id: AccountId) {
        debug!(%account_id, "Session ready");
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(&account_id) {
            let _ = entry.ready.send(true);
        }
    }

    async fn on_auth_failure(&self, account_id: AccountId, reason: &str) {
        error!(%account_id, reason, "Authentication failed");
        if let Some(handle) = self.clear_live(account_id, false).await {
            if let Err(e) = handle.shutdown().await {
                debug!(%account_id, "Session teardown failed: {}", e);
            }
        }
        if let Err(e) = self
            .accounts
            .update_status(account_id, ConnectionStatus::Disconnected)
            .await
        {
            error!(%account_id, "Failed to persist disconnected status: {}", e);
        }
        self.bus.publish(Event::ConnectionChanged {
            account_id,
            status: ConnectionStatus::Disconnected,
        });
        self.bus.notify(
            Severity::Error,
            "Authentication failed",
            format!("Session rejected: {}", reason),
            Some(account_id),
        );
        self.activity
            .record(
                Severity::Error,
                "connection",
                format!("Authentication failed: {}", reason),
                Some(account_id),
                None,
            )
            .await;
        // No automatic retry after an auth failure; the account needs a
        // fresh provisioning pass via an explicit connect.
    }

    async fn on_disconnected(&self, account_id: AccountId, reason: &str) {
        warn!(%account_id, reason, "Session dropped");
        if let Some(handle) = self.clear_live(account_id, false).await {
            if let Err(e) = handle.shutdown().await {
                debug!(%account_id, "Session teardown failed: {}", e);
            }
        }
        if let Err(e) = self
            .accounts
            .update_status(account_id, ConnectionStatus::Disconnected)
            .await
        {
            error!(%account_id, "Failed to persist disconnected status: {}", e);
        }
        self.bus.publish(Event::ConnectionChanged {
            account_id,
            status: ConnectionStatus::Disconnected,
        });
        self.bus.notify(
            Severity::Warning,
            "Disconnected",
            format!("Session dropped: {}", reason),
            Some(account_id),
        );
        self.activity
            .record(
                Severity::Warning,
                "connection",
                format!("Session dropped: {}", reason),
                Some(account_id),
                None,
            )
            .await;
        self.schedule_reconnect(account_id).await;
    }
}
