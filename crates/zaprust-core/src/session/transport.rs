//! Messaging transport seam

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::sync::mpsc;
use zaprust_common::types::AccountId;

/// Errors from the messaging transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("session is not connected")]
    NotConnected,

    #[error("bridge unavailable: {0}")]
    Unavailable(String),

    #[error("bridge request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("media unavailable: {0}")]
    Media(String),
}

impl TransportError {
    /// Whether the failure is connectivity-shaped and worth retrying later
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::NotConnected
                | TransportError::Unavailable(_)
                | TransportError::Http(_)
        )
    }
}

/// Events pushed from the transport for one account's session
///
/// This is also the webhook wire format the bridge posts back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransportEvent {
    /// Provisioning challenge artifact to present to the operator
    Challenge { artifact: String },

    /// Authentication succeeded; carries the resolved phone identity
    Authenticated { phone: String },

    /// The session is fully usable for sending
    Ready,

    /// Authentication was rejected by the network
    AuthFailure { reason: String },

    /// The session dropped
    Disconnected { reason: String },

    /// An inbound message arrived
    Message { chat: String, body: String },
}

/// Starts sessions against the messaging network
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start a session for the account, delivering its events on `events`
    async fn start_session(
        &self,
        account_id: AccountId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn SessionHandle>, TransportError>;
}

/// One live session's command surface
#[async_trait]
pub trait SessionHandle: Send + Sync + std::fmt::Debug {
    /// Send a text message to a chat address
    async fn send_text(&self, chat: &str, body: &str) -> Result<(), TransportError>;

    /// Send a media file with an optional caption to a chat address
    async fn send_media(
        &self,
        chat: &str,
        media_path: &Path,
        caption: Option<&str>,
    ) -> Result<(), TransportError>;

    /// Post a media status broadcast with an optional caption
    async fn post_broadcast(
        &self,
        media_path: &Path,
        caption: Option<&str>,
    ) -> Result<(), TransportError>;

    /// Tear the session down
    async fn shutdown(&self) -> Result<(), TransportError>;
}
