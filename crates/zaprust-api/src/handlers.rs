//! API request handlers

pub mod accounts;
pub mod activity;
pub mod campaigns;
pub mod health;
pub mod jobs;
pub mod reply_rules;
pub mod stats;
pub mod transport_events;
