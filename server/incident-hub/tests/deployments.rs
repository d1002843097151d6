//! Timed deployment progression under a paused clock.

use std::sync::Arc;
use std::time::Duration;

use incident_hub::types::DeploymentStatus;
use incident_hub::{Config, DeploymentSimulator, StateStore};

fn status(store: &StateStore, id: u64) -> DeploymentStatus {
  store.get_deployment(id).unwrap().status
}

#[tokio::test(start_paused = true)]
async fn fifth_deployment_fails_and_sixth_succeeds() {
  let store = Arc::new(StateStore::new());
  let sim = DeploymentSimulator::new(store.clone(), &Config::default());

  for _ in 0..4 {
    store.append_deployment("warmup");
  }
  let fifth = store.append_deployment("billing");
  let sixth = store.append_deployment("billing");
  assert_eq!((fifth.id, sixth.id), (5, 6));
  sim.schedule(fifth.id);
  sim.schedule(sixth.id);

  // Before D1.
  tokio::time::sleep(Duration::from_millis(1999)).await;
  assert_eq!(status(&store, 5), DeploymentStatus::Pending);
  assert_eq!(status(&store, 6), DeploymentStatus::Pending);

  // Inside [D1, D1 + D2).
  tokio::time::sleep(Duration::from_millis(1000)).await;
  assert_eq!(status(&store, 5), DeploymentStatus::Running);
  assert_eq!(status(&store, 6), DeploymentStatus::Running);

  // After D1 + D2.
  tokio::time::sleep(Duration::from_millis(1500)).await;
  assert_eq!(status(&store, 5), DeploymentStatus::Failed);
  assert_eq!(status(&store, 6), DeploymentStatus::Success);

  // Unscheduled deployments never move.
  assert_eq!(status(&store, 1), DeploymentStatus::Pending);
}

#[tokio::test(start_paused = true)]
async fn configured_delays_are_honoured() {
  let store = Arc::new(StateStore::new());
  let config = Config {
    running_delay: Duration::from_millis(100),
    finish_delay: Duration::from_millis(300),
    ..Config::default()
  };
  let sim = DeploymentSimulator::new(store.clone(), &config);
  let d = store.append_deployment("api");
  sim.schedule(d.id);

  tokio::time::sleep(Duration::from_millis(150)).await;
  assert_eq!(status(&store, d.id), DeploymentStatus::Running);
  tokio::time::sleep(Duration::from_millis(200)).await;
  assert_eq!(status(&store, d.id), DeploymentStatus::Running);
  tokio::time::sleep(Duration::from_millis(100)).await;
  assert_eq!(status(&store, d.id), DeploymentStatus::Success);
}
