//! Synthetic stand-ins for signals a real deployment would get from monitoring.
//!
//! Deployment outcome, the static metrics figures and the diagnosis text are
//! placeholders. Each sits behind a trait so a real source can replace it
//! without touching the simulator or the handlers.

use crate::types::{Deployment, DeploymentStatus, Incident, Metrics};

/// Decides the terminal status of a simulated deployment.
pub trait OutcomePolicy: Send + Sync {
  fn outcome(&self, deployment_id: u64) -> DeploymentStatus;
}

/// Every deployment whose id is a multiple of `every` fails; the rest succeed.
#[derive(Debug, Clone, Copy)]
pub struct EveryNthFails {
  pub every: u64,
}

impl Default for EveryNthFails {
  fn default() -> Self {
    Self { every: 5 }
  }
}

impl OutcomePolicy for EveryNthFails {
  fn outcome(&self, deployment_id: u64) -> DeploymentStatus {
    if self.every != 0 && deployment_id % self.every == 0 {
      DeploymentStatus::Failed
    } else {
      DeploymentStatus::Success
    }
  }
}

/// Supplies the figures `/metrics` reports alongside the success rate.
pub trait MetricsPolicy: Send + Sync {
  fn detection_time_s(&self) -> u64;
  fn api_latency_ms(&self) -> u64;
  fn max_blast_radius(&self) -> u32;
}

#[derive(Debug, Clone, Copy)]
pub struct StaticMetrics {
  pub detection_time_s: u64,
  pub api_latency_ms: u64,
  pub max_blast_radius: u32,
}

impl Default for StaticMetrics {
  fn default() -> Self {
    Self {
      detection_time_s: 20,
      api_latency_ms: 180,
      max_blast_radius: 7,
    }
  }
}

impl MetricsPolicy for StaticMetrics {
  fn detection_time_s(&self) -> u64 {
    self.detection_time_s
  }

  fn api_latency_ms(&self) -> u64 {
    self.api_latency_ms
  }

  fn max_blast_radius(&self) -> u32 {
    self.max_blast_radius
  }
}

/// Successful deployments over all deployments; 1.0 when there are none.
pub fn success_rate(deployments: &[Deployment]) -> f64 {
  if deployments.is_empty() {
    return 1.0;
  }
  let successes = deployments
    .iter()
    .filter(|d| d.status == DeploymentStatus::Success)
    .count();
  successes as f64 / deployments.len() as f64
}

pub fn compute_metrics(deployments: &[Deployment], policy: &dyn MetricsPolicy) -> Metrics {
  Metrics {
    deploy_success_rate: success_rate(deployments),
    incident_detection_time_s: policy.detection_time_s(),
    api_latency_ms: policy.api_latency_ms(),
    max_blast_radius: policy.max_blast_radius(),
  }
}

const GENERIC_FIX: &str =
  "Check DB connection, dependency configuration, and service logs for details.";

/// Canned first-response suggestion for an incident.
pub fn suggest_fix(incident: Option<&Incident>) -> String {
  match incident {
    Some(incident) => format!("{}: {}", incident.service, GENERIC_FIX),
    None => GENERIC_FIX.to_string(),
  }
}
