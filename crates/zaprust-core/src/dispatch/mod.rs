//! Outbound message dispatch

pub mod gateway;

pub use gateway::{DispatchError, DispatchGateway, SendOptions};
