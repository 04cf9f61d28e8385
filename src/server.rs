//! HTTP server exposing the metrics endpoint.
//!
//! Provides three endpoints:
//! - `/` - landing page linking to the other two
//! - `/healthz` - liveness check
//! - metrics path (default `/metrics`) - Prometheus text exposition
//!
//! Collectors block on upstream requests, so every scrape gathers the
//! registry on tokio's blocking pool.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use log::{error, info};

use crate::registry::Registry;

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct ServerState {
    pub registry: Arc<Registry>,
    pub metrics_path: String,
}

/// Builds the router for the given metrics path.
pub fn router(state: ServerState) -> Router {
    let metrics_path = state.metrics_path.clone();
    Router::new()
        .route("/", get(root_handler))
        .route("/healthz", get(healthz_handler))
        .route(&metrics_path, get(metrics_handler))
        .with_state(state)
}

/// Binds `endpoint` and serves until the process is interrupted.
pub async fn serve(endpoint: &str, state: ServerState) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(endpoint).await?;

    info!("endpoint={} Server starting", endpoint);
    info!("path={} metrics path", state.metrics_path);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Renders the landing page.
pub fn landing_page(metrics_path: &str) -> String {
    format!(
        r#"<h2>A Prometheus Exporter for <a href="https://crt.sh">Certificate Search</a></h2>
<ul>
	<li><a href="{}">metrics</a></li>
	<li><a href="/healthz">healthz</a></li>
</ul>"#,
        escape_html(metrics_path)
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

async fn root_handler(State(state): State<ServerState>) -> Html<String> {
    Html(landing_page(&state.metrics_path))
}

async fn healthz_handler() -> &'static str {
    "ok"
}

async fn metrics_handler(State(state): State<ServerState>) -> Response {
    let registry = Arc::clone(&state.registry);
    match tokio::task::spawn_blocking(move || registry.render()).await {
        Ok(Ok(body)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Ok(Err(e)) => {
            error!("Unable to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => {
            error!("Metrics collection task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
