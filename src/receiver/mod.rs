//! Async-MDN receiver.
//!
//! Accepts receipts for messages sent with a receipt-delivery option and
//! completes their exchange against the pending store.
//!
//! # Endpoints
//!
//! | Method | Path                   | Purpose                         |
//! |--------|------------------------|---------------------------------|
//! | POST   | `ReceiverConfig::path` | Receive an async MDN            |
//! | GET    | `/health`              | Liveness plus receipt counters  |
//!
//! # Responses
//!
//! | Outcome                                   | Status |
//! |-------------------------------------------|--------|
//! | MIC matched, record consumed              | 200    |
//! | MIC mismatch, record consumed             | 404    |
//! | No pending record                         | 404    |
//! | Unreadable, unresolvable or unverifiable  | 400    |
//! | Body over `max_body_size`                 | 400    |
//!
//! # Example
//!
//! ```rust,ignore
//! use as2::receiver::{AsyncMdnReceiver, MdnServer};
//!
//! let receiver = AsyncMdnReceiver::new(certificates, partnerships, crypto, pending);
//! MdnServer::new(receiver, config.receiver).run().await?;
//! ```

mod handler;
mod routes;
mod stats;

use std::sync::Arc;

use axum::Router;

pub use handler::{AsyncMdnReceiver, InboundReceipt, ReceiptResponse, ReceiptStatus};
pub use routes::{create_router, HealthResponse, ReceiverState};
pub use stats::{ReceiverStats, StatsSummary};

use crate::config::ReceiverConfig;
use crate::error::Result;
use crate::transport::{TcpTransport, Transport};

/// Async MDN receiver server
pub struct MdnServer {
    state: Arc<ReceiverState>,
    config: ReceiverConfig,
}

impl MdnServer {
    /// Create a server for `receiver`
    pub fn new(receiver: AsyncMdnReceiver, config: ReceiverConfig) -> Self {
        let state = ReceiverState {
            receiver,
            local_addr: config.listen_addr().ok(),
        };
        Self {
            state: Arc::new(state),
            config,
        }
    }

    /// Receipt handler
    pub fn receiver(&self) -> &AsyncMdnReceiver {
        &self.state.receiver
    }

    /// Get the router for the server.
    ///
    /// Fails when the configured path cannot be routed.
    pub fn router(&self) -> Result<Router> {
        create_router(self.state.clone(), &self.config)
    }

    /// Run the server on the configured address.
    pub async fn run(&self) -> Result<()> {
        let router = self.router()?;
        let transport = TcpTransport::new(self.config.listen_addr()?);
        tracing::info!(
            addr = %transport.listen_addr(),
            path = %self.config.path,
            "async MDN receiver starting"
        );
        transport.serve(router).await
    }
}
