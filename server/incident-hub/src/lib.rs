//! Incident Hub
//!
//! In-memory incident and deployment tracking with live push to websocket
//! observers. Incidents are fanned out to observers and to chat/email
//! notifiers without holding up the request; deployments advance through a
//! timed state machine in the background.

pub mod config;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod ingest;
pub mod notify;
pub mod policy;
pub mod scan;
pub mod simulator;
pub mod state;
pub mod store;
pub mod types;
pub mod ws;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::HubError;
pub use hub::SubscriberHub;
pub use ingest::IncidentIngestor;
pub use simulator::DeploymentSimulator;
pub use state::AppState;
pub use store::StateStore;

/// All routes, with permissive CORS and request tracing.
pub fn router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/health", get(handlers::health))
    .route(
      "/incidents",
      get(handlers::list_incidents).post(handlers::create_incident),
    )
    .route("/resolve", post(handlers::resolve_incident))
    .route("/diagnose", post(handlers::diagnose_incident))
    .route(
      "/deployments",
      get(handlers::list_deployments).post(handlers::create_deployment),
    )
    .route("/metrics", get(handlers::metrics))
    .route("/scan", get(handlers::scan_query).post(handlers::scan))
    .route("/graph", get(handlers::graph))
    .route("/emit-deploy", post(handlers::emit_deploy))
    .route("/ws", get(ws::ws_handler))
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
    .with_state(state)
}
