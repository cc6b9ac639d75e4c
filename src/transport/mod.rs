//! Listener transports for the async MDN receiver.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            MdnServer (Router)           │
//! └──────────────────┬──────────────────────┘
//!                    ▼
//!          ┌─────────────────┐
//!          │  TcpTransport   │
//!          │   (HTTP/1.1)    │
//!          └─────────────────┘
//! ```

mod tcp;

pub use tcp::TcpTransport;

use crate::error::Result;
use axum::Router;
use std::future::Future;
use std::pin::Pin;

/// Transport trait for pluggable network backends.
///
/// Implementations handle the low-level network protocol while
/// the receiver remains transport-agnostic.
pub trait Transport: Send + Sync {
    /// Serve the given Axum router on this transport.
    ///
    /// Runs until the listener fails.
    fn serve(&self, router: Router) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Get the transport name for logging.
    fn name(&self) -> &'static str;

    /// Get the listen address as a string.
    fn listen_addr(&self) -> String;
}
