//! Auto replies to inbound messages

pub mod engine;

pub use engine::ReplyRuleEngine;
