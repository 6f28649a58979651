//! Typed event bus for engine observers

use serde::Serialize;
use tokio::sync::broadcast;
use zaprust_common::types::{AccountId, CampaignId, CampaignItemId, ConnectionStatus, Severity};
use zaprust_storage::models::CampaignItemStatus;

/// Events published by the engine toward observers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A provisioning challenge is waiting to be scanned
    ChallengeIssued {
        account_id: AccountId,
        artifact: String,
    },

    /// An account's connection status changed
    ConnectionChanged {
        account_id: AccountId,
        status: ConnectionStatus,
    },

    /// Advisory, warning, or error notification
    Notification {
        severity: Severity,
        title: String,
        body: String,
        account_id: Option<AccountId>,
    },

    /// A campaign item finished processing
    CampaignProgress {
        campaign_id: CampaignId,
        item_id: CampaignItemId,
        status: CampaignItemStatus,
    },
}

/// Broadcast bus carrying [`Event`]s to any number of subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event; events without subscribers are dropped
    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Publish a notification event
    pub fn notify(
        &self,
        severity: Severity,
        title: impl Into<String>,
        body: impl Into<String>,
        account_id: Option<AccountId>,
    ) {
        self.publish(Event::Notification {
            severity,
            title: title.into(),
            body: body.into(),
            account_id,
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// An inbound message delivered from a session to the reply rule engine
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub account_id: AccountId,
    /// Full chat address, e.g. `5511999990000@c.us` or `...@g.us`
    pub chat: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_fan_out_to_all_subscribers() {
        let bus = EventBus::new(16);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let account_id = Uuid::new_v4();
        bus.notify(Severity::Info, "hello", "world", Some(account_id));

        for rx in [&mut first, &mut second] {
            match rx.recv().await.unwrap() {
                Event::Notification {
                    severity,
                    title,
                    account_id: got,
                    ..
                } => {
                    assert_eq!(severity, Severity::Info);
                    assert_eq!(title, "hello");
                    assert_eq!(got, Some(account_id));
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.publish(Event::ConnectionChanged {
            account_id: Uuid::new_v4(),
            status: ConnectionStatus::Connected,
        });
    }
}
