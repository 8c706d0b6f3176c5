//! Doable sync server
//!
//! Serves the todos and lists found under a sync directory over HTTP. The
//! binary in `main.rs` wires configuration, logging and the directory
//! watcher around [`app`].

pub mod api;
pub mod config;
pub mod error;
pub mod frontend;
pub mod logging;

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tracing::debug;

pub use api::AppState;
pub use config::{Config, LogLevel};

/// Build the full router: frontend, API and optional access log
pub fn app(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .route("/", get(frontend::index))
        .merge(api::router(state));

    if config.log_level.enables_request_logging() {
        router.layer(middleware::from_fn(log_requests))
    } else {
        router
    }
}

/// Access log line: `[ip] status - METHOD path in latency`
async fn log_requests(req: Request, next: Next) -> Response {
    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "-".to_string());
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    debug!(
        "[{}] {} - {} {} in {:?}",
        ip,
        response.status().as_u16(),
        method,
        path,
        started.elapsed()
    );
    response
}
