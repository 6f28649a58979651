//! Shared API state

use std::sync::Arc;
use zaprust_core::{BridgeTransport, PauseRegistry, SessionManager};
use zaprust_storage::DatabasePool;

/// State shared by every handler
pub struct AppState {
    pub db_pool: DatabasePool,
    pub sessions: SessionManager,
    pub bridge: Arc<BridgeTransport>,
    pub paused: PauseRegistry,
}
