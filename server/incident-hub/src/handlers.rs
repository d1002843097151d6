//! HTTP handlers for the incident hub.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::HubError;
use crate::policy;
use crate::scan;
use crate::state::AppState;
use crate::types::{
  DepGraph, Deployment, Diagnosis, EmitDeploy, IdRequest, Incident, Metrics, NewDeployment,
  NewIncident, ScanRequest, StreamNotice,
};

pub async fn health() -> &'static str {
  "ok"
}

pub async fn create_incident(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<NewIncident>, JsonRejection>,
) -> Result<Json<Incident>, HubError> {
  let Json(payload) = payload?;
  let incident = state.ingestor.ingest(&payload)?;
  Ok(Json(incident))
}

pub async fn list_incidents(State(state): State<Arc<AppState>>) -> Json<Vec<Incident>> {
  Json(state.store.list_incidents())
}

pub async fn resolve_incident(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<IdRequest>, JsonRejection>,
) -> Result<Json<Value>, HubError> {
  let Json(req) = payload?;
  if state.store.resolve_incident(req.id) {
    info!(incident_id = req.id, "incident resolved");
  }
  Ok(Json(json!({})))
}

pub async fn diagnose_incident(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<IdRequest>, JsonRejection>,
) -> Result<Json<Diagnosis>, HubError> {
  let Json(req) = payload?;
  let incident = state.store.get_incident(req.id);
  Ok(Json(Diagnosis {
    fix: policy::suggest_fix(incident.as_ref()),
  }))
}

pub async fn create_deployment(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<NewDeployment>, JsonRejection>,
) -> Result<Json<Deployment>, HubError> {
  let Json(req) = payload?;
  let service = req.service.trim();
  if service.is_empty() {
    return Err(HubError::malformed("service", "must not be empty"));
  }
  let deployment = state.store.append_deployment(service);
  state.simulator.schedule(deployment.id);
  info!(deployment_id = deployment.id, service = %deployment.service, "deployment started");
  Ok(Json(deployment))
}

pub async fn list_deployments(State(state): State<Arc<AppState>>) -> Json<Vec<Deployment>> {
  Json(state.store.list_deployments())
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Json<Metrics> {
  let deployments = state.store.list_deployments();
  Json(policy::compute_metrics(&deployments, state.metrics.as_ref()))
}

/// `POST /scan` with `{repoPath}` in the body.
pub async fn scan(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<DepGraph>, HubError> {
  let Json(req) = payload?;
  run_scan(&state, req).await
}

/// `GET /scan?repoPath=...`
pub async fn scan_query(
  State(state): State<Arc<AppState>>,
  query: Result<Query<ScanRequest>, QueryRejection>,
) -> Result<Json<DepGraph>, HubError> {
  let Query(req) = query?;
  run_scan(&state, req).await
}

async fn run_scan(state: &AppState, req: ScanRequest) -> Result<Json<DepGraph>, HubError> {
  let repo = req.repo_path.clone();
  // Manifest reads are blocking file IO.
  let result = tokio::task::spawn_blocking(move || scan::scan_repo(&repo))
    .await
    .map_err(|e| HubError::delivery(format!("scan task failed: {}", e)))?;

  let graph = match result {
    Ok(graph) => graph,
    Err(e) => {
      warn!(repo = %req.repo_path, error = %e, "scan failed");
      return Err(e.into());
    }
  };
  info!(repo = %req.repo_path, dependencies = graph.edges.len(), "scan complete");
  *state.last_graph.write() = graph.clone();
  Ok(Json(graph))
}

pub async fn graph(State(state): State<Arc<AppState>>) -> Json<DepGraph> {
  Json(state.last_graph.read().clone())
}

pub async fn emit_deploy(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<EmitDeploy>, JsonRejection>,
) -> Result<&'static str, HubError> {
  let Json(req) = payload?;
  let hub = state.hub.clone();
  tokio::spawn(async move {
    if let Err(e) = hub.broadcast(&StreamNotice::deployed(req.repo)).await {
      warn!(error = %e, "deploy event broadcast failed");
    }
  });
  Ok("ok")
}
