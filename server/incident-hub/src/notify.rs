//! Outbound incident notifications: chat webhook and HTTP email relay.
//!
//! Delivery is fire-and-forget. Each notifier runs in its own task; failures
//! are logged and dropped, never retried.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{HubError, NotifyError};
use crate::types::Incident;

#[async_trait]
pub trait Notifier: Send + Sync {
  fn name(&self) -> &'static str;
  async fn notify(&self, incident: &Incident) -> Result<(), NotifyError>;
}

/// Posts a short text summary to a Slack-compatible incoming webhook.
pub struct SlackNotifier {
  client: Client,
  webhook_url: String,
}

impl SlackNotifier {
  pub fn new(client: Client, webhook_url: impl Into<String>) -> Self {
    Self {
      client,
      webhook_url: webhook_url.into(),
    }
  }
}

#[derive(Serialize)]
struct SlackPayload<'a> {
  text: &'a str,
}

pub fn slack_text(incident: &Incident) -> String {
  let mut text = format!(
    "\u{1f6a8} *New Incident: {}*\nService: {}\nStatus: {}\nMessage: {}",
    incident.kind,
    incident.service,
    incident.status.as_str(),
    incident.message
  );
  if !incident.war_room_url.is_empty() {
    text.push_str(&format!("\nWar room: {}", incident.war_room_url));
  }
  text
}

#[async_trait]
impl Notifier for SlackNotifier {
  fn name(&self) -> &'static str {
    "slack"
  }

  async fn notify(&self, incident: &Incident) -> Result<(), NotifyError> {
    let text = slack_text(incident);
    let response = self
      .client
      .post(&self.webhook_url)
      .json(&SlackPayload { text: &text })
      .send()
      .await?;
    if !response.status().is_success() {
      return Err(NotifyError::Rejected {
        target: "slack webhook".into(),
        status: response.status().as_u16(),
      });
    }
    Ok(())
  }
}

/// Sends one HTML mail per recipient through an HTTP mail relay.
pub struct EmailRelayNotifier {
  client: Client,
  relay_url: String,
  from: String,
  recipients: Vec<String>,
}

impl EmailRelayNotifier {
  pub fn new(
    client: Client,
    relay_url: impl Into<String>,
    from: impl Into<String>,
    recipients: Vec<String>,
  ) -> Self {
    Self {
      client,
      relay_url: relay_url.into(),
      from: from.into(),
      recipients,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct RelayMail {
  pub from: String,
  pub to: String,
  pub subject: String,
  pub html: String,
}

pub fn email_subject(incident: &Incident) -> String {
  format!("New Incident: {}", incident.kind)
}

pub fn email_body(incident: &Incident) -> String {
  let mut body = format!(
    "<b>Service:</b> {}<br />\n<b>Status:</b> {}<br />\n<b>Message:</b> {}",
    incident.service,
    incident.status.as_str(),
    incident.message
  );
  if !incident.war_room_url.is_empty() {
    body.push_str(&format!(
      "<br />\n<b>War room:</b> <a href=\"{0}\">{0}</a>",
      incident.war_room_url
    ));
  }
  body
}

#[async_trait]
impl Notifier for EmailRelayNotifier {
  fn name(&self) -> &'static str {
    "email"
  }

  async fn notify(&self, incident: &Incident) -> Result<(), NotifyError> {
    let subject = email_subject(incident);
    let html = email_body(incident);
    let mut failed = 0;

    for to in &self.recipients {
      let mail = RelayMail {
        from: self.from.clone(),
        to: to.clone(),
        subject: subject.clone(),
        html: html.clone(),
      };
      let result = self.client.post(&self.relay_url).json(&mail).send().await;
      match result {
        Ok(response) if response.status().is_success() => {}
        Ok(response) => {
          warn!(recipient = %to, status = response.status().as_u16(), "email relay rejected mail");
          failed += 1;
        }
        Err(e) => {
          warn!(recipient = %to, error = %e, "email relay unreachable");
          failed += 1;
        }
      }
    }

    if failed > 0 {
      return Err(NotifyError::Partial {
        failed,
        total: self.recipients.len(),
      });
    }
    Ok(())
  }
}

/// Every configured notifier; dispatch spawns one task per notifier.
#[derive(Clone, Default)]
pub struct NotifierSet {
  notifiers: Vec<Arc<dyn Notifier>>,
}

impl NotifierSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_config(config: &Config) -> Result<Self, HubError> {
    let client = Client::builder()
      .timeout(config.notify_timeout)
      .build()
      .map_err(NotifyError::from)?;

    let mut set = Self::new();
    if let Some(url) = &config.slack_webhook_url {
      set = set.with(Arc::new(SlackNotifier::new(client.clone(), url.clone())));
    }
    if let Some(url) = &config.email_relay_url {
      set = set.with(Arc::new(EmailRelayNotifier::new(
        client,
        url.clone(),
        config.email_from.clone(),
        config.email_recipients.clone(),
      )));
    }
    Ok(set)
  }

  pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
    self.notifiers.push(notifier);
    self
  }

  pub fn len(&self) -> usize {
    self.notifiers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.notifiers.is_empty()
  }

  pub fn dispatch(&self, incident: &Incident) -> Vec<JoinHandle<()>> {
    self
      .notifiers
      .iter()
      .map(|notifier| {
        let notifier = notifier.clone();
        let incident = incident.clone();
        tokio::spawn(async move {
          match notifier.notify(&incident).await {
            Ok(()) => debug!(
              notifier = notifier.name(),
              incident_id = incident.id,
              "notification sent"
            ),
            Err(e) => warn!(
              notifier = notifier.name(),
              incident_id = incident.id,
              error = %e,
              "notification failed"
            ),
          }
        })
      })
      .collect()
  }
}
