use axum::{
    Router,
    extract::{FromRef, Request},
    http::{StatusCode, Version},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::routes;
use crate::registry::InstanceRegistry;

fn format_http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/?",
    }
}

#[derive(Clone)]
pub struct CastorState {
    pub registry: Arc<InstanceRegistry>,
}

impl CastorState {
    pub fn new(registry: Arc<InstanceRegistry>) -> Self {
        Self { registry }
    }
}

impl FromRef<CastorState> for Arc<InstanceRegistry> {
    fn from_ref(state: &CastorState) -> Self {
        Arc::clone(&state.registry)
    }
}

async fn not_found_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let protocol = format_http_version(req.version());

    let start = Instant::now();
    let resp = next.run(req).await;

    let status = resp.status();
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    if status.is_server_error() {
        error!(
            "| {:>3} | {:^7} | {:<8} | {} | {}ms",
            status.as_u16(),
            method.as_str(),
            protocol,
            path,
            latency_ms
        );
    } else if status.is_client_error() {
        warn!(
            "| {:>3} | {:^7} | {:<8} | {} | {}ms",
            status.as_u16(),
            method.as_str(),
            protocol,
            path,
            latency_ms
        );
    } else {
        info!(
            "| {:>3} | {:^7} | {:<8} | {} | {}ms",
            status.as_u16(),
            method.as_str(),
            protocol,
            path,
            latency_ms
        );
    }

    resp
}

/// Read-only introspection routes over the registered databases.
pub fn castor_router(state: CastorState) -> Router {
    Router::new()
        .route("/databases", get(routes::list_databases))
        .route("/databases/{database}/models", get(routes::list_models))
        .route(
            "/databases/{database}/models/{model}",
            get(routes::named_model),
        )
        .route("/models/{model}", get(routes::default_model))
        .fallback(not_found_handler)
        .with_state(state)
        .layer(middleware::from_fn(access_log))
}
