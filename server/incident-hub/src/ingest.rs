//! Single entry point for declaring incidents.
//!
//! Validation and the store append happen on the caller's task. The live
//! broadcast and the external notifications are spawned and never awaited by
//! the request.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::HubError;
use crate::hub::SubscriberHub;
use crate::notify::NotifierSet;
use crate::store::StateStore;
use crate::types::{Incident, IncidentDraft, NewIncident, Severity};

/// Validate and trim an inbound incident. Severity is kept exactly as sent.
pub fn normalize(raw: &NewIncident) -> Result<IncidentDraft, HubError> {
  let kind = raw.kind.trim();
  let service = raw.service.trim();
  let message = raw.message.trim();

  if kind.is_empty() {
    return Err(HubError::malformed("type", "must not be empty"));
  }
  if service.is_empty() {
    return Err(HubError::malformed("service", "must not be empty"));
  }
  if message.is_empty() {
    return Err(HubError::malformed("message", "must not be empty"));
  }

  let severity = raw
    .severity
    .as_ref()
    .filter(|tag| !tag.trim().is_empty())
    .map(|tag| Severity::from(tag.clone()));

  Ok(IncidentDraft {
    kind: kind.to_string(),
    service: service.to_string(),
    message: message.to_string(),
    severity,
  })
}

/// Background work started for one incident.
pub struct Fanout {
  pub broadcast: JoinHandle<()>,
  pub notifications: Vec<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct IncidentIngestor {
  store: Arc<StateStore>,
  hub: Arc<SubscriberHub>,
  notifiers: NotifierSet,
  war_room_base_url: String,
}

impl IncidentIngestor {
  pub fn new(
    store: Arc<StateStore>,
    hub: Arc<SubscriberHub>,
    notifiers: NotifierSet,
    war_room_base_url: impl Into<String>,
  ) -> Self {
    Self {
      store,
      hub,
      notifiers,
      war_room_base_url: war_room_base_url.into(),
    }
  }

  /// Persist a new incident and start its fan-out. Must run inside a tokio runtime.
  pub fn ingest(&self, raw: &NewIncident) -> Result<Incident, HubError> {
    self.ingest_tracked(raw).map(|(incident, _)| incident)
  }

  /// Like [`ingest`](Self::ingest), also handing back the spawned fan-out tasks.
  pub fn ingest_tracked(&self, raw: &NewIncident) -> Result<(Incident, Fanout), HubError> {
    let draft = normalize(raw)?;
    let incident = self.store.append_incident(draft, &self.war_room_base_url);
    info!(
      incident_id = incident.id,
      kind = %incident.kind,
      service = %incident.service,
      critical = incident.is_critical(),
      "incident recorded"
    );

    let hub = self.hub.clone();
    let pushed = incident.clone();
    let broadcast = tokio::spawn(async move {
      match hub.broadcast(&pushed).await {
        Ok(report) if report.dropped > 0 => warn!(
          incident_id = pushed.id,
          delivered = report.delivered,
          dropped = report.dropped,
          "incident broadcast lost observers"
        ),
        Ok(_) => {}
        Err(e) => warn!(incident_id = pushed.id, error = %e, "incident broadcast failed"),
      }
    });
    let notifications = self.notifiers.dispatch(&incident);

    Ok((
      incident,
      Fanout {
        broadcast,
        notifications,
      },
    ))
  }
}
