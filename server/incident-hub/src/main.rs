//! Binary entrypoint for the incident hub.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use incident_hub::{AppState, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  init_logging();

  let config = Config::from_env();
  config.validate()?;

  let addr = SocketAddr::new(config.bind_addr, config.port);
  let state = Arc::new(AppState::new(config)?);
  let app = incident_hub::router(state);

  info!(%addr, "incident-hub listening");
  let listener = tokio::net::TcpListener::bind(addr).await?;
  axum::serve(listener, app).await?;

  Ok(())
}

fn init_logging() {
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new("incident_hub=info,tower_http=info"));

  tracing_subscriber::registry()
    .with(fmt::layer().with_target(false))
    .with(filter)
    .init();
}
