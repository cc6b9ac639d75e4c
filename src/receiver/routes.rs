//! HTTP request handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, ConnectInfo, DefaultBodyLimit, Json, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use super::handler::{AsyncMdnReceiver, InboundReceipt, ReceiptResponse};
use super::stats::StatsSummary;
use crate::config::{ReceiverConfig, HEALTH_PATH};
use crate::error::Result;
use crate::message::Headers;

/// State shared across handlers
pub struct ReceiverState {
    /// Receipt handler
    pub receiver: AsyncMdnReceiver,
    /// Address the listener is bound to, when known
    pub local_addr: Option<SocketAddr>,
}

/// Create the receiver router.
///
/// Fails with a config error when `config.path` cannot be routed.
pub fn create_router(state: Arc<ReceiverState>, config: &ReceiverConfig) -> Result<Router> {
    config.validate_path()?;
    Ok(Router::new()
        .route(HEALTH_PATH, get(health_check))
        .route(&config.path, post(receive_mdn))
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always `ok`
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
    /// Receipt counters
    pub stats: StatsSummary,
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<ReceiverState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
        stats: state.receiver.stats().summary(),
    })
}

/// Async MDN endpoint
async fn receive_mdn(
    State(state): State<Arc<ReceiverState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    header_map: HeaderMap,
    body: std::result::Result<Bytes, BytesRejection>,
) -> StatusCode {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            let response = state.receiver.reject_unreadable(&rejection.body_text());
            return status_code(&response);
        },
    };

    let mut headers = Headers::new();
    for (name, value) in &header_map {
        headers.add(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
    }

    let response = state
        .receiver
        .handle(InboundReceipt {
            headers,
            body,
            remote_addr: connect_info.map(|ConnectInfo(addr)| addr),
            local_addr: state.local_addr,
        })
        .await;

    status_code(&response)
}

fn status_code(response: &ReceiptResponse) -> StatusCode {
    StatusCode::from_u16(response.status.status_code()).unwrap_or(StatusCode::BAD_REQUEST)
}
