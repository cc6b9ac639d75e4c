//! # AS2 Engine - Business Document Exchange with Signed Receipts
//!
//! Sends business documents to trading partners over HTTP following AS2,
//! and completes each exchange with a receipt (MDN) that proves the partner
//! received the unmodified document.
//!
//! ## Features
//!
//! - **Transmission**: sign and/or encrypt, POST, bounded resend on transport failure
//! - **Synchronous receipts**: read and verify the MDN from the same connection
//! - **Asynchronous receipts**: durable pending records correlated with an MDN
//!   arriving on a later connection
//! - **Integrity**: MIC calculation and whitespace-insensitive comparison
//! - **Dispositions**: structured parsing with warning vs failure classification
//!
//! ## Exchange Overview
//!
//! ### Synchronous receipt
//!
//! ```text
//! As2Sender                                  Partner
//!    |                                          |
//!    |------ POST (secured body, AS2 headers) ->|
//!    |<----- 200 + MDN -------------------------|
//!    |                                          |
//!  verify disposition + MIC
//! ```
//!
//! ### Asynchronous receipt
//!
//! ```text
//! As2Sender         PendingStore        Partner        AsyncMdnReceiver
//!    |                   |                 |                  |
//!    |--- put record --->|                 |                  |
//!    |------ POST (Receipt-delivery-option) ->|               |
//!    |<----- 200 ----------------------------|                |
//!    |                   |                 |--- POST MDN ---->|
//!    |                   |<--------------- get + remove ------|
//!    |                   |                 |<-- 200 / 404 ----|
//! ```
//!
//! ### Receipt status codes
//!
//! | Outcome                          | Status |
//! |----------------------------------|--------|
//! | MIC matched                      | 200    |
//! | MIC mismatch / no pending record | 404    |
//! | Malformed receipt                | 400    |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use as2::{As2Sender, Config, FilePendingStore, Message, MimeBody};
//!
//! let config = Config::from_env();
//! let pending = Arc::new(FilePendingStore::from_config(&config.pending).await?);
//! let sender = As2Sender::new(config.sender, certificates, partnerships, crypto, pending)?;
//!
//! let mut partnership = as2::Partnership::new()
//!     .with_sender_id(as2::PID_AS2, "alpha")
//!     .with_receiver_id(as2::PID_AS2, "beta");
//! directory.resolve(&mut partnership)?;
//!
//! let mut msg = Message::new(partnership)
//!     .with_message_id(Message::generate_id("alpha", "beta"))
//!     .with_subject("Invoice 42")
//!     .with_data(MimeBody::new("application/edi-x12", edi_bytes));
//!
//! match sender.send(&mut msg).await? {
//!     as2::SendOutcome::Delivered { receipt } => println!("delivered: {receipt:?}"),
//!     as2::SendOutcome::AwaitingAsyncMdn { .. } => println!("awaiting receipt"),
//!     as2::SendOutcome::Abandoned { attempts } => println!("gave up after {attempts}"),
//! }
//! ```
//!
//! ## Modules
//!
//! - [`sender`]: Transmission engine and resend controller
//! - [`receiver`]: Async MDN receiver (Axum-based)
//! - [`pending`]: Durable pending-receipt store
//! - [`disposition`]: Disposition parsing, MIC calculation and comparison
//! - [`message`]: Message, partnership and MDN model
//! - [`resolver`]: Collaborator traits and in-memory resolvers
//! - [`transport`]: Listener transports
//! - [`config`]: Configuration management
//! - [`error`]: Error types and result aliases

pub mod config;
pub mod disposition;
pub mod error;
pub mod message;
pub mod pending;
pub mod receiver;
pub mod resolver;
pub mod sender;
pub mod transport;

// Re-exports for convenience
pub use config::{Config, PendingConfig, ReceiverConfig, SenderConfig};
pub use disposition::{
    calculate_mic, mic_matches, verify_mic, Disposition, DispositionCheck, DispositionOptions,
};
pub use error::{As2Error, Result};
pub use message::{
    parse_report_fields, Headers, MdnReport, Message, MessageMdn, MimeBody, PartnerRole,
    Partnership, PID_AS2, PID_EMAIL, PID_X509_ALIAS,
};
pub use pending::{pending_key, FilePendingStore, PendingRecord, PendingStore};
pub use receiver::{AsyncMdnReceiver, InboundReceipt, MdnServer, ReceiptResponse, ReceiptStatus};
pub use resolver::{
    Certificate, CertificateResolver, CertificateStore, CryptoHelper, PartnershipDirectory,
    PartnershipResolver, PrivateKey, StorageAction, StorageDispatch,
};
pub use sender::{As2Sender, ResendController, ResendDecision, SendOutcome, SyncReceipt, AS2_VERSION};
pub use transport::{TcpTransport, Transport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
