//! Websocket live-push endpoint.
//!
//! Each connection gets a welcome frame, then registers with the hub and parks
//! in a read loop. The loop only exists to notice the peer going away; inbound
//! frames are ignored.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::HubError;
use crate::hub::{ObserverSink, SubscriberHub};
use crate::state::AppState;
use crate::types::StreamNotice;

/// Write half of an upgraded socket.
pub struct WsSink {
  inner: Mutex<SplitSink<WebSocket, Message>>,
}

#[async_trait]
impl ObserverSink for WsSink {
  async fn send_text(&self, frame: String) -> Result<(), HubError> {
    self
      .inner
      .lock()
      .await
      .send(Message::Text(frame))
      .await
      .map_err(|e| HubError::delivery(e.to_string()))
  }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
  let hub = state.hub.clone();
  ws.on_upgrade(move |socket| observe(socket, hub))
}

async fn observe(socket: WebSocket, hub: Arc<SubscriberHub>) {
  let (sink, mut stream) = socket.split();
  let sink = Arc::new(WsSink {
    inner: Mutex::new(sink),
  });

  // Welcome is written before registration so it is always the first frame.
  let welcome = match serde_json::to_string(&StreamNotice::welcome()) {
    Ok(frame) => frame,
    Err(e) => {
      warn!(error = %e, "welcome frame encoding failed");
      return;
    }
  };
  if let Err(e) = hub.write(&*sink, welcome).await {
    debug!(error = %e, "observer gone before welcome");
    return;
  }
  let id = hub.register(sink.clone());

  while let Some(msg) = stream.next().await {
    match msg {
      Ok(Message::Close(_)) => break,
      Ok(_) => {}
      Err(e) => {
        debug!(observer_id = id, error = %e, "observer read failed");
        break;
      }
    }
  }

  hub.unregister(id);
  let _ = sink.inner.lock().await.close().await;
}
