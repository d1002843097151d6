//! Incident fan-out to live observers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use incident_hub::hub::ChannelSink;
use incident_hub::notify::NotifierSet;
use incident_hub::types::{Incident, NewIncident, StreamNotice};
use incident_hub::{AppState, Config};
use serde_json::json;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn new_incident(kind: &str) -> NewIncident {
  NewIncident {
    kind: kind.into(),
    service: "billing".into(),
    message: "db down".into(),
    severity: None,
  }
}

#[tokio::test]
async fn both_observers_receive_a_new_incident() {
  let state = AppState::with_notifiers(Config::default(), NotifierSet::new());
  let (a, mut rx_a) = ChannelSink::pair();
  let (b, mut rx_b) = ChannelSink::pair();
  state.hub.register(a);
  state.hub.register(b);

  let (incident, fanout) = state.ingestor.ingest_tracked(&new_incident("outage")).unwrap();
  fanout.broadcast.await.unwrap();

  for rx in [&mut rx_a, &mut rx_b] {
    let pushed: Incident = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(pushed, incident);
  }
}

#[tokio::test]
async fn closed_observer_is_skipped_and_removed() {
  let state = AppState::with_notifiers(Config::default(), NotifierSet::new());
  let (a, mut rx_a) = ChannelSink::pair();
  let (b, rx_b) = ChannelSink::pair();
  let id_a = state.hub.register(a);
  let id_b = state.hub.register(b);
  drop(rx_b);

  let (incident, fanout) = state.ingestor.ingest_tracked(&new_incident("outage")).unwrap();
  fanout.broadcast.await.unwrap();

  let pushed: Incident = serde_json::from_str(&rx_a.recv().await.unwrap()).unwrap();
  assert_eq!(pushed.id, incident.id);
  assert_eq!(state.hub.len(), 1);
  assert!(state.hub.contains(id_a));
  assert!(!state.hub.contains(id_b));
}

#[tokio::test]
async fn incident_is_stored_even_with_no_observers() {
  let state = AppState::with_notifiers(Config::default(), NotifierSet::new());
  let (incident, fanout) = state.ingestor.ingest_tracked(&new_incident("outage")).unwrap();
  fanout.broadcast.await.unwrap();
  assert_eq!(state.store.list_incidents(), vec![incident]);
}

#[tokio::test]
async fn http_post_pushes_to_registered_observer() {
  let state = Arc::new(AppState::with_notifiers(Config::default(), NotifierSet::new()));
  let (sink, mut rx) = ChannelSink::pair();
  state.hub.register(sink);

  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  let app = incident_hub::router(state.clone());
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });

  let client = reqwest::Client::new();
  let created: Incident = client
    .post(format!("http://{}/incidents", addr))
    .json(&json!({"type": "outage", "service": "billing", "message": "db down"}))
    .send()
    .await
    .unwrap()
    .json()
    .await
    .unwrap();

  let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
    .await
    .expect("broadcast should arrive")
    .unwrap();
  let pushed: Incident = serde_json::from_str(&frame).unwrap();
  assert_eq!(pushed, created);

  let ok = client
    .post(format!("http://{}/emit-deploy", addr))
    .json(&json!({"repo": "billing"}))
    .send()
    .await
    .unwrap();
  assert_eq!(ok.text().await.unwrap(), "ok");

  let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
    .await
    .expect("deploy event should arrive")
    .unwrap();
  match serde_json::from_str::<StreamNotice>(&frame).unwrap() {
    StreamNotice::RepoUpdate { repo, event, .. } => {
      assert_eq!(repo, "billing");
      assert_eq!(event, "deployed");
    }
    other => panic!("unexpected frame: {:?}", other),
  }
}

async fn serve(state: Arc<AppState>) -> SocketAddr {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  let app = incident_hub::router(state);
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });
  addr
}

async fn connect(addr: SocketAddr) -> Client {
  let (socket, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
    .await
    .unwrap();
  socket
}

async fn next_text(socket: &mut Client) -> String {
  loop {
    let msg = tokio::time::timeout(Duration::from_secs(2), socket.next())
      .await
      .expect("frame should arrive")
      .expect("stream ended")
      .unwrap();
    if let Message::Text(_) = msg {
      return msg.to_text().unwrap().to_string();
    }
  }
}

async fn wait_for_observers(state: &AppState, n: usize) {
  for _ in 0..200 {
    if state.hub.len() == n {
      return;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  panic!("expected {} observers, have {}", n, state.hub.len());
}

#[tokio::test]
async fn websocket_observers_get_welcome_first_and_closed_ones_are_dropped() {
  let state = Arc::new(AppState::with_notifiers(Config::default(), NotifierSet::new()));
  let addr = serve(state.clone()).await;

  let mut first = connect(addr).await;
  let mut second = connect(addr).await;
  for socket in [&mut first, &mut second] {
    let welcome: StreamNotice = serde_json::from_str(&next_text(socket).await).unwrap();
    assert_eq!(welcome, StreamNotice::welcome());
  }
  wait_for_observers(&state, 2).await;

  second.close(None).await.unwrap();
  wait_for_observers(&state, 1).await;

  let created: Incident = reqwest::Client::new()
    .post(format!("http://{}/incidents", addr))
    .json(&json!({"type": "outage", "service": "billing", "message": "db down"}))
    .send()
    .await
    .unwrap()
    .json()
    .await
    .unwrap();

  let pushed: Incident = serde_json::from_str(&next_text(&mut first).await).unwrap();
  assert_eq!(pushed, created);
  assert_eq!(state.hub.len(), 1);
}

#[tokio::test]
async fn welcome_precedes_incidents_raised_right_after_connect() {
  let state = Arc::new(AppState::with_notifiers(Config::default(), NotifierSet::new()));
  let addr = serve(state.clone()).await;

  let mut socket = connect(addr).await;
  // Fire incidents while the connection may still be registering.
  let raiser = {
    let state = state.clone();
    tokio::spawn(async move {
      for _ in 0..20 {
        let (_, fanout) = state.ingestor.ingest_tracked(&new_incident("outage")).unwrap();
        fanout.broadcast.await.unwrap();
        tokio::task::yield_now().await;
      }
    })
  };

  let first_frame: serde_json::Value = serde_json::from_str(&next_text(&mut socket).await).unwrap();
  assert_eq!(first_frame["type"], "info");
  raiser.await.unwrap();
}

#[tokio::test]
async fn dropped_connection_is_unregistered() {
  let state = Arc::new(AppState::with_notifiers(Config::default(), NotifierSet::new()));
  let addr = serve(state.clone()).await;

  let mut socket = connect(addr).await;
  next_text(&mut socket).await;
  wait_for_observers(&state, 1).await;

  drop(socket);
  wait_for_observers(&state, 0).await;
}
