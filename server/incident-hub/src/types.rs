//! Core types for the incident hub (JSON contracts + stored records).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Inbound types (JSON contract — what the caller sends)
// ---------------------------------------------------------------------------

/// Body of `POST /incidents`. Unknown fields are silently ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct NewIncident {
  #[serde(rename = "type")]
  pub kind: String,
  pub service: String,
  pub message: String,
  #[serde(default)]
  pub severity: Option<String>,
}

/// Body of `POST /deployments`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDeployment {
  #[serde(alias = "targetService")]
  pub service: String,
}

/// Body of `POST /resolve` and `POST /diagnose`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IdRequest {
  #[serde(alias = "ID")]
  pub id: u64,
}

/// Body of `POST /scan`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanRequest {
  #[serde(rename = "repoPath")]
  pub repo_path: String,
}

/// Body of `POST /emit-deploy`.
#[derive(Debug, Clone, Deserialize)]
pub struct EmitDeploy {
  pub repo: String,
}

// ---------------------------------------------------------------------------
// Severity / status enums
// ---------------------------------------------------------------------------

/// Caller-supplied severity tag. Known tags match exactly; anything else is
/// kept verbatim and echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
  Info,
  Warning,
  Error,
  Critical,
  Other(String),
}

impl Severity {
  pub fn as_str(&self) -> &str {
    match self {
      Self::Info => "info",
      Self::Warning => "warning",
      Self::Error => "error",
      Self::Critical => "critical",
      Self::Other(tag) => tag,
    }
  }
}

impl From<String> for Severity {
  fn from(tag: String) -> Self {
    match tag.as_str() {
      "info" => Self::Info,
      "warning" => Self::Warning,
      "error" => Self::Error,
      "critical" => Self::Critical,
      _ => Self::Other(tag),
    }
  }
}

impl From<Severity> for String {
  fn from(severity: Severity) -> Self {
    match severity {
      Severity::Other(tag) => tag,
      known => known.as_str().to_string(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
  Active,
  Resolved,
}

impl IncidentStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Active => "active",
      Self::Resolved => "resolved",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
  Pending,
  Running,
  Success,
  Failed,
}

impl DeploymentStatus {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Success | Self::Failed)
  }

  /// Only single forward steps are legal: pending -> running -> success|failed.
  pub fn can_advance_to(self, next: Self) -> bool {
    matches!(
      (self, next),
      (Self::Pending, Self::Running)
        | (Self::Running, Self::Success)
        | (Self::Running, Self::Failed)
    )
  }
}

// ---------------------------------------------------------------------------
// Stored records
// ---------------------------------------------------------------------------

/// Validated incident fields, before the store assigns identity.
#[derive(Debug, Clone)]
pub struct IncidentDraft {
  pub kind: String,
  pub service: String,
  pub message: String,
  pub severity: Option<Severity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
  pub id: u64,
  #[serde(rename = "type")]
  pub kind: String,
  pub service: String,
  pub status: IncidentStatus,
  pub message: String,
  pub timestamp: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub severity: Option<Severity>,
  /// Non-empty iff severity is critical; fixed at creation.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub war_room_url: String,
}

impl Incident {
  /// Materialize a draft with the identity the store assigned.
  pub fn open(
    id: u64,
    timestamp: DateTime<Utc>,
    draft: IncidentDraft,
    war_room_base_url: &str,
  ) -> Self {
    let war_room_url = war_room_url(draft.severity.as_ref(), war_room_base_url, id, &timestamp);
    Self {
      id,
      kind: draft.kind,
      service: draft.service,
      status: IncidentStatus::Active,
      message: draft.message,
      timestamp,
      severity: draft.severity,
      war_room_url,
    }
  }

  pub fn is_critical(&self) -> bool {
    self.severity == Some(Severity::Critical)
  }
}

/// Meeting link for critical incidents, empty otherwise.
///
/// The room slug is a blake3 hash of id + creation minute, so it is stable for
/// the incident and distinct across incidents.
pub fn war_room_url(
  severity: Option<&Severity>,
  base_url: &str,
  id: u64,
  created: &DateTime<Utc>,
) -> String {
  if severity != Some(&Severity::Critical) {
    return String::new();
  }
  let mut hasher = blake3::Hasher::new();
  hasher.update(&id.to_be_bytes());
  hasher.update(b"|");
  hasher.update(created.format("%Y-%m-%dT%H:%M").to_string().as_bytes());
  let hex = hasher.finalize().to_hex();
  format!("{}/inc-{}-{}", base_url.trim_end_matches('/'), id, &hex[..12])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
  pub id: u64,
  pub service: String,
  pub status: DeploymentStatus,
  pub created: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Output types (JSON contract — what we emit)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
  pub deploy_success_rate: f64,
  pub incident_detection_time_s: u64,
  pub api_latency_ms: u64,
  pub max_blast_radius: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
  pub from: String,
  pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepGraph {
  pub nodes: Vec<String>,
  pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
  pub fix: String,
}

/// Non-incident frames pushed over the live stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamNotice {
  Info {
    message: String,
  },
  RepoUpdate {
    repo: String,
    event: String,
    timestamp: DateTime<Utc>,
  },
}

impl StreamNotice {
  pub fn welcome() -> Self {
    Self::Info {
      message: "Connected to live incident stream".into(),
    }
  }

  pub fn deployed(repo: impl Into<String>) -> Self {
    Self::RepoUpdate {
      repo: repo.into(),
      event: "deployed".into(),
      timestamp: Utc::now(),
    }
  }
}

/// Structured error body for rejected requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn draft(severity: Option<Severity>) -> IncidentDraft {
    IncidentDraft {
      kind: "outage".into(),
      service: "billing".into(),
      message: "db down".into(),
      severity,
    }
  }

  const BASE: &str = "https://meet.example.com/room/";

  #[test]
  fn only_critical_gets_a_war_room() {
    let ts = Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap();
    let critical = Incident::open(1, ts, draft(Some(Severity::Critical)), BASE);
    assert!(critical.war_room_url.starts_with("https://meet.example.com/room/inc-1-"));
    assert_eq!(critical.status, IncidentStatus::Active);

    for severity in [None, Some(Severity::Info), Some(Severity::Error)] {
      assert!(Incident::open(2, ts, draft(severity), BASE).war_room_url.is_empty());
    }
  }

  #[test]
  fn near_miss_critical_tags_get_no_war_room() {
    let ts = Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap();
    for tag in ["fatal", "crit", "Critical", " critical"] {
      let severity = Severity::from(tag.to_string());
      assert_eq!(severity, Severity::Other(tag.to_string()));
      assert!(Incident::open(3, ts, draft(Some(severity)), BASE).war_room_url.is_empty());
    }
  }

  #[test]
  fn unknown_severity_round_trips_verbatim() {
    let parsed: Severity = serde_json::from_str("\"p1\"").unwrap();
    assert_eq!(parsed, Severity::Other("p1".into()));
    assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"p1\"");
    assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"critical\"");
  }

  #[test]
  fn war_rooms_differ_per_incident() {
    let ts = Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap();
    let critical = Severity::Critical;
    let a = war_room_url(Some(&critical), "https://m", 1, &ts);
    let b = war_room_url(Some(&critical), "https://m", 2, &ts);
    assert_ne!(a, b);
    assert_eq!(a, war_room_url(Some(&critical), "https://m", 1, &ts));
  }

  #[test]
  fn deployment_transitions_are_single_forward_steps() {
    use DeploymentStatus::*;
    assert!(Pending.can_advance_to(Running));
    assert!(Running.can_advance_to(Success));
    assert!(Running.can_advance_to(Failed));
    assert!(!Pending.can_advance_to(Success));
    assert!(!Success.can_advance_to(Failed));
    assert!(!Running.can_advance_to(Pending));
  }

  #[test]
  fn incident_json_uses_wire_names() {
    let ts = Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap();
    let critical = Incident::open(7, ts, draft(Some(Severity::Critical)), BASE);
    let json = serde_json::to_value(critical).unwrap();
    assert_eq!(json["type"], "outage");
    assert_eq!(json["status"], "active");
    assert_eq!(json["severity"], "critical");
    assert!(json["warRoomUrl"].as_str().is_some());

    let plain = serde_json::to_value(Incident::open(8, ts, draft(None), BASE)).unwrap();
    assert!(plain.get("warRoomUrl").is_none());
    assert!(plain.get("severity").is_none());
  }

  #[test]
  fn stream_notice_is_tagged() {
    let json = serde_json::to_value(StreamNotice::deployed("api")).unwrap();
    assert_eq!(json["type"], "repo-update");
    assert_eq!(json["event"], "deployed");
    assert_eq!(serde_json::to_value(StreamNotice::welcome()).unwrap()["type"], "info");
  }
}
