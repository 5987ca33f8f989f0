use std::net::SocketAddr;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Serve the global registry at `/metrics` until the process exits.
///
/// Failures are logged, never fatal to the node.
#[tracing::instrument(name = "metrics", skip_all)]
pub async fn serve_metrics(listen_addr: SocketAddr) {
    let app = Router::new().route("/metrics", get(get_metrics));

    let listener = match TcpListener::bind(listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%listen_addr, "Failed to bind metrics server: {e}");
            return;
        }
    };

    match listener.local_addr() {
        Ok(address) => info!(%address, "Serving metrics"),
        Err(_) => info!(%listen_addr, "Serving metrics"),
    }

    if let Err(e) = axum::serve(listener, app).await {
        error!("Metrics server failed: {e}");
    }
}

async fn get_metrics() -> String {
    let mut buf = String::new();

    if let Err(e) = primus_metrics::export(&mut buf) {
        error!("Failed to encode metrics: {e}");
    }

    buf
}
