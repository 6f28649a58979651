//! ZapRust Core - Automation and dispatch engine
//!
//! This crate provides the core automation engine for ZapRust:
//! session lifecycle management, the dispatch gateway, the status job
//! scheduler, the campaign queue processor, and the reply rule engine.

pub mod activity;
pub mod autoreply;
pub mod campaign;
pub mod dispatch;
pub mod events;
pub mod scheduler;
pub mod session;

pub use activity::ActivityRecorder;
pub use autoreply::ReplyRuleEngine;
pub use campaign::{CampaignProcessor, PauseRegistry};
pub use dispatch::{DispatchError, DispatchGateway, SendOptions};
pub use events::{Event, EventBus, InboundMessage};
pub use scheduler::{InFlightSet, JobScheduler};
pub use session::{
    BridgeTransport, SessionHandle, SessionManager, Transport, TransportError, TransportEvent,
};
