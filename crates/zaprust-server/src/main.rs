//! ZapRust - messaging automation server entry point

use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use zaprust_api::AppState;
use zaprust_common::config::{Config, LoggingConfig};
use zaprust_core::{
    ActivityRecorder, BridgeTransport, CampaignProcessor, DispatchGateway, EventBus, JobScheduler,
    PauseRegistry, ReplyRuleEngine, SessionManager, Transport,
};
use zaprust_storage::{
    db::DatabasePool, AccountRepository, ActivityLogRepository, CampaignItemRepository,
    CampaignRepository, JobRepository, ReplyRuleRepository,
};

const EVENT_BUS_CAPACITY: usize = 256;
const INBOUND_QUEUE_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(&config.logging);

    info!("Starting ZapRust automation server...");

    // Initialize database
    let db_pool = DatabasePool::new(&config.database).await?;
    info!("Database connection established");

    // Run migrations
    db_pool.migrate().await?;
    info!("Database migrations completed");

    // Repositories
    let accounts = AccountRepository::new(db_pool.pool().clone());
    let jobs = JobRepository::new(db_pool.pool().clone());
    let campaigns = CampaignRepository::new(db_pool.pool().clone());
    let campaign_items = CampaignItemRepository::new(db_pool.pool().clone());
    let reply_rules = ReplyRuleRepository::new(db_pool.pool().clone());
    let activity = ActivityRecorder::new(ActivityLogRepository::new(db_pool.pool().clone()));

    // Event bus and inbound message queue
    let bus = EventBus::new(EVENT_BUS_CAPACITY);
    let (inbound_tx, inbound_rx) = tokio::sync::mpsc::channel(INBOUND_QUEUE_CAPACITY);

    // Transport bridge and session manager
    let bridge = Arc::new(BridgeTransport::new(&config.transport));
    let sessions = SessionManager::new(
        bridge.clone() as Arc<dyn Transport>,
        accounts.clone(),
        activity.clone(),
        bus.clone(),
        inbound_tx,
    );

    // Dispatch gateway
    let gateway = DispatchGateway::new(
        sessions.clone(),
        accounts.clone(),
        config.storage.media_dir.clone(),
    );

    let shutdown = CancellationToken::new();

    // Start status job scheduler
    let scheduler_handle = {
        let scheduler = JobScheduler::new(
            jobs,
            sessions.clone(),
            gateway.clone(),
            activity.clone(),
            bus.clone(),
            &config.scheduler,
        );
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            scheduler.run(shutdown).await;
        })
    };
    info!("Job scheduler started");

    // Start campaign processor
    let paused = PauseRegistry::new();
    let campaign_handle = {
        let processor = CampaignProcessor::new(
            campaigns,
            campaign_items,
            accounts.clone(),
            sessions.clone(),
            gateway.clone(),
            activity.clone(),
            bus.clone(),
            paused.clone(),
            &config.campaigns,
        );
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            processor.run(shutdown).await;
        })
    };
    info!("Campaign processor started");

    // Start reply rule engine
    let reply_handle = {
        let engine = ReplyRuleEngine::new(reply_rules, gateway.clone(), activity.clone());
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            engine.run(inbound_rx, shutdown).await;
        })
    };

    // Reconnect accounts that were connected before the last shutdown
    sessions.resume_saved_sessions().await;

    // Start API server
    let state = Arc::new(AppState {
        db_pool: db_pool.clone(),
        sessions,
        bridge,
        paused,
    });
    let app = zaprust_api::create_router(state, &config.server.cors_origins);
    let bind = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Starting API server on {}", bind);

    let api_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    info!("ZapRust server started successfully");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // Cleanup
    shutdown.cancel();
    let _ = scheduler_handle.await;
    let _ = campaign_handle.await;
    let _ = reply_handle.await;
    api_handle.abort();

    info!("ZapRust server shutdown complete");

    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},zaprust=debug", config.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
