//! Structured error types for the incident hub.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::types::ErrorOutput;

#[derive(Debug, Error)]
pub enum HubError {
  #[error("malformed input: {field}: {reason}")]
  MalformedInput { field: String, reason: String },

  #[error("failed to scan: {0}")]
  Scan(#[from] ScanError),

  #[error("delivery: {0}")]
  Delivery(String),

  #[error("config: {0}")]
  Config(String),

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),

  #[error("notify: {0}")]
  Notify(#[from] NotifyError),
}

impl HubError {
  pub fn malformed(field: &str, reason: &str) -> Self {
    Self::MalformedInput {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn delivery(msg: impl Into<String>) -> Self {
    Self::Delivery(msg.into())
  }

  pub fn config(msg: impl Into<String>) -> Self {
    Self::Config(msg.into())
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::MalformedInput { .. } | Self::Scan(_) => StatusCode::BAD_REQUEST,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<JsonRejection> for HubError {
  fn from(rejection: JsonRejection) -> Self {
    Self::MalformedInput {
      field: "body".into(),
      reason: rejection.body_text(),
    }
  }
}

impl From<QueryRejection> for HubError {
  fn from(rejection: QueryRejection) -> Self {
    Self::MalformedInput {
      field: "query".into(),
      reason: rejection.body_text(),
    }
  }
}

impl IntoResponse for HubError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = match &self {
      Self::MalformedInput { field, reason } => {
        ErrorOutput::new(reason.clone()).with_field(field.clone())
      }
      other => ErrorOutput::new(other.to_string()),
    };
    (status, Json(body)).into_response()
  }
}

/// Failure to read or parse a module manifest.
#[derive(Debug, Error)]
pub enum ScanError {
  #[error("cannot read {path}: {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("{path}:{line}: {reason}")]
  Parse {
    path: String,
    line: usize,
    reason: String,
  },
}

/// Failure delivering an outbound notification.
#[derive(Debug, Error)]
pub enum NotifyError {
  #[error("http: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{target} answered {status}")]
  Rejected { target: String, status: u16 },

  #[error("{failed} of {total} recipients failed")]
  Partial { failed: usize, total: usize },
}
