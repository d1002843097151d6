//! Service configuration with sane defaults, overridable from the environment.

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use crate::error::HubError;

/// Tunables for the HTTP service, the deployment simulator and the notifiers.
#[derive(Debug, Clone)]
pub struct Config {
  pub bind_addr: IpAddr,
  pub port: u16,
  /// Delay between a deployment being created and it entering `running`.
  pub running_delay: Duration,
  /// Delay between `running` and the terminal status.
  pub finish_delay: Duration,
  /// Prefix of the meeting link attached to critical incidents.
  pub war_room_base_url: String,
  pub slack_webhook_url: Option<String>,
  pub email_relay_url: Option<String>,
  pub email_recipients: Vec<String>,
  pub email_from: String,
  /// Per-request timeout for outbound notifications.
  pub notify_timeout: Duration,
  /// How long one push to one observer may take before it is dropped.
  pub observer_write_timeout: Duration,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
      port: 8081,
      running_delay: Duration::from_secs(2),
      finish_delay: Duration::from_secs(2),
      war_room_base_url: "https://meet.example.com/war-room".into(),
      slack_webhook_url: None,
      email_relay_url: None,
      email_recipients: Vec::new(),
      email_from: "incident-hub@localhost".into(),
      notify_timeout: Duration::from_millis(5000),
      observer_write_timeout: Duration::from_millis(5000),
    }
  }
}

impl Config {
  /// Build from process environment variables.
  pub fn from_env() -> Self {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Build from an arbitrary key lookup. Unset or unparsable values keep their default.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    let defaults = Self::default();
    let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    Self {
      bind_addr: parsed(&lookup, "BIND_ADDR").unwrap_or(defaults.bind_addr),
      port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
      running_delay: parsed(&lookup, "DEPLOY_RUNNING_DELAY_MS")
        .map(Duration::from_millis)
        .unwrap_or(defaults.running_delay),
      finish_delay: parsed(&lookup, "DEPLOY_FINISH_DELAY_MS")
        .map(Duration::from_millis)
        .unwrap_or(defaults.finish_delay),
      war_room_base_url: non_empty("WAR_ROOM_BASE_URL").unwrap_or(defaults.war_room_base_url),
      slack_webhook_url: non_empty("SLACK_WEBHOOK_URL"),
      email_relay_url: non_empty("EMAIL_RELAY_URL"),
      email_recipients: non_empty("INCIDENT_EMAIL_RECIPIENTS")
        .map(|list| {
          list
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from)
            .collect()
        })
        .unwrap_or_default(),
      email_from: non_empty("EMAIL_FROM").unwrap_or(defaults.email_from),
      notify_timeout: parsed(&lookup, "NOTIFY_TIMEOUT_MS")
        .map(Duration::from_millis)
        .unwrap_or(defaults.notify_timeout),
      observer_write_timeout: parsed(&lookup, "OBSERVER_WRITE_TIMEOUT_MS")
        .map(Duration::from_millis)
        .unwrap_or(defaults.observer_write_timeout),
    }
  }

  pub fn validate(&self) -> Result<(), HubError> {
    if self.war_room_base_url.is_empty() {
      return Err(HubError::config("war room base url must not be empty"));
    }
    for (name, url) in [
      ("SLACK_WEBHOOK_URL", &self.slack_webhook_url),
      ("EMAIL_RELAY_URL", &self.email_relay_url),
    ] {
      if let Some(url) = url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
          return Err(HubError::config(format!("{} must start with http:// or https://", name)));
        }
      }
    }
    if self.observer_write_timeout.is_zero() {
      return Err(HubError::config("OBSERVER_WRITE_TIMEOUT_MS must be greater than zero"));
    }
    if self.email_relay_url.is_some() && self.email_recipients.is_empty() {
      return Err(HubError::config(
        "EMAIL_RELAY_URL is set but INCIDENT_EMAIL_RECIPIENTS is empty",
      ));
    }
    Ok(())
  }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
  lookup(key).and_then(|v| v.trim().parse().ok())
}
