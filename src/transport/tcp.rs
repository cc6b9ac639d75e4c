//! TCP transport.
//!
//! HTTP/1.1 over TCP using axum's built-in listener, with the peer address
//! made available to handlers as connect info.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

use axum::Router;
use tokio::net::TcpListener;

use super::Transport;
use crate::error::{As2Error, Result};

/// TCP/HTTP transport using Axum's built-in server.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    /// Address to listen on.
    listen_addr: SocketAddr,
}

impl TcpTransport {
    /// Create a new TCP transport.
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self { listen_addr }
    }

    /// Create with default localhost address.
    pub fn localhost(port: u16) -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    /// Bind the listener.
    pub async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(self.listen_addr).await.map_err(|e| {
            As2Error::Server(format!("Failed to bind TCP to {}: {e}", self.listen_addr))
        })
    }

    /// Serve `router` on an already bound listener.
    pub async fn serve_listener(listener: TcpListener, router: Router) -> Result<()> {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(|e| As2Error::Server(format!("TCP server error: {e}")))
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::localhost(10081)
    }
}

impl Transport for TcpTransport {
    fn serve(&self, router: Router) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let listener = self.bind().await?;
            tracing::info!("TCP transport listening on {}", self.listen_addr);
            Self::serve_listener(listener, router).await
        })
    }

    fn name(&self) -> &'static str {
        "TCP/HTTP"
    }

    fn listen_addr(&self) -> String {
        format!("http://{}", self.listen_addr)
    }
}
