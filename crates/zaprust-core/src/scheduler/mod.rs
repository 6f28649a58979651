//! Scheduled posts: polling worker, repeat expansion and slot allocation

pub mod inflight;
pub mod repeat;
pub mod slots;
pub mod worker;

pub use inflight::InFlightSet;
pub use slots::{find_free_slot, minute_start};
pub use worker::JobScheduler;
