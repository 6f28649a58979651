//! Account sessions: transport seam, bridge client and lifecycle manager

pub mod backoff;
pub mod bridge;
pub mod manager;
pub mod transport;

pub use bridge::BridgeTransport;
pub use manager::SessionManager;
pub use transport::{SessionHandle, Transport, TransportError, TransportEvent};
