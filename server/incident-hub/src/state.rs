//! Shared application state, wired once at startup.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::HubError;
use crate::hub::SubscriberHub;
use crate::ingest::IncidentIngestor;
use crate::notify::NotifierSet;
use crate::policy::{MetricsPolicy, StaticMetrics};
use crate::simulator::DeploymentSimulator;
use crate::store::StateStore;
use crate::types::DepGraph;

pub struct AppState {
  pub config: Config,
  pub store: Arc<StateStore>,
  pub hub: Arc<SubscriberHub>,
  pub ingestor: IncidentIngestor,
  pub simulator: DeploymentSimulator,
  pub metrics: Arc<dyn MetricsPolicy>,
  /// Graph from the most recent successful scan.
  pub last_graph: RwLock<DepGraph>,
}

impl AppState {
  /// Build state with the notifiers described by `config`.
  pub fn new(config: Config) -> Result<Self, HubError> {
    let notifiers = NotifierSet::from_config(&config)?;
    Ok(Self::with_notifiers(config, notifiers))
  }

  pub fn with_notifiers(config: Config, notifiers: NotifierSet) -> Self {
    let store = Arc::new(StateStore::new());
    let hub = Arc::new(SubscriberHub::with_write_timeout(config.observer_write_timeout));
    let ingestor = IncidentIngestor::new(
      store.clone(),
      hub.clone(),
      notifiers,
      config.war_room_base_url.clone(),
    );
    let simulator = DeploymentSimulator::new(store.clone(), &config);

    Self {
      config,
      store,
      hub,
      ingestor,
      simulator,
      metrics: Arc::new(StaticMetrics::default()),
      last_graph: RwLock::new(DepGraph::default()),
    }
  }
}
