//! Timed deployment progression: pending -> running -> success|failed.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::Config;
use crate::policy::{EveryNthFails, OutcomePolicy};
use crate::store::StateStore;
use crate::types::DeploymentStatus;

/// Drives freshly created deployments through their state machine in the background.
#[derive(Clone)]
pub struct DeploymentSimulator {
  store: Arc<StateStore>,
  policy: Arc<dyn OutcomePolicy>,
  running_delay: Duration,
  finish_delay: Duration,
}

impl DeploymentSimulator {
  pub fn new(store: Arc<StateStore>, config: &Config) -> Self {
    Self {
      store,
      policy: Arc::new(EveryNthFails::default()),
      running_delay: config.running_delay,
      finish_delay: config.finish_delay,
    }
  }

  pub fn with_policy(mut self, policy: Arc<dyn OutcomePolicy>) -> Self {
    self.policy = policy;
    self
  }

  /// Spawn the transitions for `deployment_id` and return immediately.
  ///
  /// The task always runs to completion; steps that find no record do nothing.
  pub fn schedule(&self, deployment_id: u64) -> JoinHandle<()> {
    let sim = self.clone();
    tokio::spawn(async move { sim.run(deployment_id).await })
  }

  async fn run(self, id: u64) {
    tokio::time::sleep(self.running_delay).await;
    if self.store.advance_deployment(id, DeploymentStatus::Running) {
      debug!(deployment_id = id, "deployment running");
    }

    tokio::time::sleep(self.finish_delay).await;
    let outcome = self.policy.outcome(id);
    if self.store.advance_deployment(id, outcome) {
      info!(deployment_id = id, status = ?outcome, "deployment finished");
    }
  }
}
