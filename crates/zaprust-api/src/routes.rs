//! API routes

use axum::http::HeaderValue;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    accounts, activity, campaigns, health, jobs, reply_rules, stats, transport_events,
};
use crate::state::AppState;

/// Create the API router
pub fn create_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let health_routes = Router::new()
        .route("/", get(health::health))
        .route("/ready", get(health::readiness));

    let account_routes = Router::new()
        .route("/", get(accounts::list_accounts))
        .route("/", post(accounts::create_account))
        .route("/:id", get(accounts::get_account))
        .route("/:id", put(accounts::update_account))
        .route("/:id", delete(accounts::delete_account))
        .route("/:id/connect", post(accounts::connect_account))
        .route("/:id/disconnect", post(accounts::disconnect_account))
        .route("/:id/qr", get(accounts::get_qr));

    let job_routes = Router::new()
        .route("/", get(jobs::list_jobs))
        .route("/", post(jobs::create_job))
        .route("/:id", get(jobs::get_job))
        .route("/:id", delete(jobs::delete_job));

    let campaign_routes = Router::new()
        .route("/", get(campaigns::list_campaigns))
        .route("/", post(campaigns::create_campaign))
        .route("/:id", get(campaigns::get_campaign))
        .route("/:id", delete(campaigns::delete_campaign))
        .route("/:id/toggle", post(campaigns::toggle_campaign));

    let reply_rule_routes = Router::new()
        .route("/", get(reply_rules::list_reply_rules))
        .route("/", post(reply_rules::create_reply_rule))
        .route("/:id", put(reply_rules::update_reply_rule))
        .route("/:id", delete(reply_rules::delete_reply_rule))
        .route("/:id/toggle", post(reply_rules::toggle_reply_rule));

    let activity_routes = Router::new().route("/", get(activity::list_activity));

    let stats_routes = Router::new().route("/", get(stats::get_stats));

    let transport_routes =
        Router::new().route("/events/:account_id", post(transport_events::receive_event));

    let api_v1 = Router::new()
        .nest("/accounts", account_routes)
        .nest("/jobs", job_routes)
        .nest("/campaigns", campaign_routes)
        .nest("/reply-rules", reply_rule_routes)
        .nest("/activity", activity_routes)
        .nest("/stats", stats_routes);

    Router::new()
        .nest("/health", health_routes)
        .nest("/api/v1", api_v1)
        .nest("/transport", transport_routes)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Browser origins allowed to call the API; an empty list or `*` opens
/// it up, which suits local single-operator deployments
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}
