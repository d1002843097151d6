//! Authoritative in-memory incident and deployment logs.
//!
//! Each log sits behind its own lock so incident traffic never waits on
//! deployment traffic and vice versa. Every read hands out a copy.

use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;

use crate::types::{Deployment, DeploymentStatus, Incident, IncidentDraft, IncidentStatus};

/// Append-only log with its own id counter.
struct Log<T> {
  last_id: u64,
  records: Vec<T>,
}

impl<T> Log<T> {
  fn new() -> Self {
    Self {
      last_id: 0,
      records: Vec::new(),
    }
  }

  fn next_id(&mut self) -> u64 {
    self.last_id += 1;
    self.last_id
  }
}

pub struct StateStore {
  incidents: Mutex<Log<Incident>>,
  deployments: Mutex<Log<Deployment>>,
}

impl Default for StateStore {
  fn default() -> Self {
    Self::new()
  }
}

impl StateStore {
  pub fn new() -> Self {
    Self {
      incidents: Mutex::new(Log::new()),
      deployments: Mutex::new(Log::new()),
    }
  }

  /// Assign the next id and creation time, append, and return the stored value.
  ///
  /// Critical incidents get their war room under `war_room_base_url` here, once.
  pub fn append_incident(&self, draft: IncidentDraft, war_room_base_url: &str) -> Incident {
    let mut log = self.incidents.lock();
    let id = log.next_id();
    let incident = Incident::open(id, Utc::now(), draft, war_room_base_url);
    log.records.push(incident.clone());
    incident
  }

  /// Snapshot of every incident in insertion order.
  pub fn list_incidents(&self) -> Vec<Incident> {
    self.incidents.lock().records.clone()
  }

  pub fn get_incident(&self, id: u64) -> Option<Incident> {
    self.incidents.lock().records.iter().find(|i| i.id == id).cloned()
  }

  /// Mark an incident resolved. Unknown ids are a no-op; returns whether a record matched.
  pub fn resolve_incident(&self, id: u64) -> bool {
    let mut log = self.incidents.lock();
    match log.records.iter_mut().find(|i| i.id == id) {
      Some(incident) => {
        incident.status = IncidentStatus::Resolved;
        true
      }
      None => {
        debug!(incident_id = id, "resolve: no such incident");
        false
      }
    }
  }

  pub fn append_deployment(&self, service: impl Into<String>) -> Deployment {
    let mut log = self.deployments.lock();
    let id = log.next_id();
    let deployment = Deployment {
      id,
      service: service.into(),
      status: DeploymentStatus::Pending,
      created: Utc::now(),
    };
    log.records.push(deployment.clone());
    deployment
  }

  pub fn list_deployments(&self) -> Vec<Deployment> {
    self.deployments.lock().records.clone()
  }

  pub fn get_deployment(&self, id: u64) -> Option<Deployment> {
    self.deployments.lock().records.iter().find(|d| d.id == id).cloned()
  }

  /// Move a deployment one step along its state machine.
  ///
  /// Unknown ids and out-of-order transitions are ignored. Returns whether the
  /// status changed.
  pub fn advance_deployment(&self, id: u64, next: DeploymentStatus) -> bool {
    let mut log = self.deployments.lock();
    let Some(deployment) = log.records.iter_mut().find(|d| d.id == id) else {
      debug!(deployment_id = id, status = ?next, "advance: no such deployment");
      return false;
    };
    if !deployment.status.can_advance_to(next) {
      debug!(
        deployment_id = id,
        from = ?deployment.status,
        to = ?next,
        "advance: transition out of order, ignored"
      );
      return false;
    }
    deployment.status = next;
    true
  }

  /// Drop every record. Ids keep counting from where they were.
  pub fn clear(&self) {
    self.incidents.lock().records.clear();
    self.deployments.lock().records.clear();
  }
}
