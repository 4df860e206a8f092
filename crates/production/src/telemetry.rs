//! `/healthz` and `/metrics`: the only HTTP surface this binary exposes.
//!
//! spec.md's Non-goals exclude the HTTP/REST API; this is observability
//! plumbing, not that surface (see `SPEC_FULL.md`'s ambient-stack section).

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use prometheus::{Encoder, Registry, TextEncoder};
use serde_json::json;
use tokio_util::sync::CancellationToken;

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn metrics(registry: axum::extract::State<Arc<Registry>>) -> String {
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&metric_families, &mut buffer)
        .expect("prometheus text encoding is infallible for well-formed metric families");
    String::from_utf8(buffer).expect("prometheus text encoder emits valid UTF-8")
}

/// Serve `/healthz` and `/metrics` until `cancellation` fires.
pub async fn serve(addr: SocketAddr, registry: Arc<Registry>, cancellation: CancellationToken) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(registry);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "health/metrics endpoint listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancellation.cancelled().await })
        .await?;
    Ok(())
}
