//! Bulk campaigns: drain loop, templating and hold tracking

pub mod pause;
pub mod processor;
pub mod template;

pub use pause::PauseRegistry;
pub use processor::CampaignProcessor;
pub use template::{render_message, render_template, resolve_spintax};
