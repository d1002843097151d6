//! Live observer registry and best-effort fan-out.
//!
//! The observer set is only touched under its lock for insert/remove/snapshot.
//! Writes to observers happen after the lock is released, so a slow or broken
//! observer never holds up registrations. Every write is bounded by the hub's
//! write timeout; an observer that misses it is dropped like a broken one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::HubError;

/// Handle identifying one registered observer. Never reused.
pub type ObserverId = u64;

/// Write side of one observer's push channel.
#[async_trait]
pub trait ObserverSink: Send + Sync {
  async fn send_text(&self, frame: String) -> Result<(), HubError>;
}

/// Observer backed by an in-process channel. Dropping the receiver closes it.
pub struct ChannelSink {
  tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
  pub fn pair() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(Self { tx }), rx)
  }
}

#[async_trait]
impl ObserverSink for ChannelSink {
  async fn send_text(&self, frame: String) -> Result<(), HubError> {
    self
      .tx
      .send(frame)
      .map_err(|_| HubError::delivery("observer channel closed"))
  }
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
  pub delivered: usize,
  pub dropped: usize,
}

pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SubscriberHub {
  observers: Mutex<HashMap<ObserverId, Arc<dyn ObserverSink>>>,
  next_id: AtomicU64,
  write_timeout: Duration,
}

impl Default for SubscriberHub {
  fn default() -> Self {
    Self::with_write_timeout(DEFAULT_WRITE_TIMEOUT)
  }
}

impl SubscriberHub {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_write_timeout(write_timeout: Duration) -> Self {
    Self {
      observers: Mutex::new(HashMap::new()),
      next_id: AtomicU64::new(0),
      write_timeout,
    }
  }

  /// One bounded write. A missed deadline counts as a failed write.
  pub async fn write(&self, sink: &dyn ObserverSink, frame: String) -> Result<(), HubError> {
    match tokio::time::timeout(self.write_timeout, sink.send_text(frame)).await {
      Ok(result) => result,
      Err(_) => Err(HubError::delivery(format!(
        "observer write timed out after {:?}",
        self.write_timeout
      ))),
    }
  }

  pub fn register(&self, sink: Arc<dyn ObserverSink>) -> ObserverId {
    let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
    let live = {
      let mut observers = self.observers.lock();
      observers.insert(id, sink);
      observers.len()
    };
    debug!(observer_id = id, live, "observer registered");
    id
  }

  /// Remove an observer. Safe to call more than once; returns whether it was present.
  pub fn unregister(&self, id: ObserverId) -> bool {
    let removed = self.observers.lock().remove(&id).is_some();
    if removed {
      debug!(observer_id = id, "observer unregistered");
    }
    removed
  }

  pub fn len(&self) -> usize {
    self.observers.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn contains(&self, id: ObserverId) -> bool {
    self.observers.lock().contains_key(&id)
  }

  /// Push one event to every observer registered at the time of the call.
  ///
  /// A failed or timed-out write unregisters that observer and does not affect
  /// the others.
  pub async fn broadcast<T: Serialize>(&self, event: &T) -> Result<BroadcastReport, HubError> {
    let frame = serde_json::to_string(event)?;
    let targets: Vec<(ObserverId, Arc<dyn ObserverSink>)> = self
      .observers
      .lock()
      .iter()
      .map(|(id, sink)| (*id, sink.clone()))
      .collect();

    let results = join_all(targets.into_iter().map(|(id, sink)| {
      let frame = frame.clone();
      async move { (id, self.write(&*sink, frame).await) }
    }))
    .await;

    let mut report = BroadcastReport::default();
    let mut failed = Vec::new();
    for (id, result) in results {
      match result {
        Ok(()) => report.delivered += 1,
        Err(e) => {
          warn!(observer_id = id, error = %e, "dropping observer after failed write");
          failed.push(id);
        }
      }
    }

    if !failed.is_empty() {
      let mut observers = self.observers.lock();
      for id in &failed {
        observers.remove(id);
      }
    }
    report.dropped = failed.len();
    Ok(report)
  }
}
