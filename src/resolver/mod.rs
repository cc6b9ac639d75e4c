//! Collaborator interfaces consumed by the engine.
//!
//! The engine never reaches for process-wide registries; every collaborator
//! is handed to [`As2Sender`](crate::sender::As2Sender) or
//! [`AsyncMdnReceiver`](crate::receiver::AsyncMdnReceiver) at construction.
//!
//! | Trait                  | Supplies                                    |
//! |------------------------|---------------------------------------------|
//! | [`PartnershipResolver`]| identifiers and policy for a sender/receiver|
//! | [`CertificateResolver`]| certificates and private keys               |
//! | [`CryptoHelper`]       | S/MIME sign, encrypt, MDN verification      |
//! | [`StorageDispatch`]    | archive and MDN storage (fire-and-forget)   |

mod memory;

use async_trait::async_trait;

pub use memory::{CertificateStore, PartnershipDirectory};

use crate::disposition::calculate_mic;
use crate::error::Result;
use crate::message::{MdnReport, Message, MimeBody, PartnerRole, Partnership};

/// DER-encoded X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate(pub Vec<u8>);

/// DER-encoded private key.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(pub Vec<u8>);

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKey([REDACTED; {} bytes])", self.0.len())
    }
}

/// Fills in a partnership from the identifiers already set on it.
pub trait PartnershipResolver: Send + Sync {
    /// Merge the stored identifiers and attributes into `partnership`.
    fn resolve(&self, partnership: &mut Partnership) -> Result<()>;
}

/// Certificate and key lookup.
pub trait CertificateResolver: Send + Sync {
    /// Certificate of the party playing `role` in the partnership.
    fn certificate(&self, partnership: &Partnership, role: PartnerRole) -> Result<Certificate>;

    /// Private key belonging to `cert`.
    fn private_key(&self, partnership: &Partnership, cert: &Certificate) -> Result<PrivateKey>;
}

/// S/MIME operations. Implementations build and parse the MIME structures.
pub trait CryptoHelper: Send + Sync {
    /// Wrap `body` in a detached signature.
    fn sign(
        &self,
        body: &MimeBody,
        cert: &Certificate,
        key: &PrivateKey,
        digest: &str,
    ) -> Result<MimeBody>;

    /// Encrypt `body` for the holder of `cert`.
    fn encrypt(&self, body: &MimeBody, cert: &Certificate, algorithm: &str) -> Result<MimeBody>;

    /// Verify a received MDN against the signer's certificate and extract its fields.
    ///
    /// Implementations typically unwrap the signature and the `multipart/report`
    /// and hand the disposition-notification part to
    /// [`parse_report_fields`](crate::message::parse_report_fields).
    fn parse_mdn(&self, mdn: &MimeBody, signer: &Certificate) -> Result<MdnReport>;

    /// Message integrity check over `body`.
    fn calculate_mic(&self, body: &MimeBody, digest: &str, include_headers: bool) -> Result<String> {
        calculate_mic(body, digest, include_headers)
    }
}

/// Storage actions dispatched by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageAction {
    /// Keep a copy of a sent message
    Archive,
    /// Keep a received MDN
    StoreMdn,
}

impl StorageAction {
    /// Action name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::StoreMdn => "store-mdn",
        }
    }
}

/// Archive and MDN storage. Failures are logged by the caller and never
/// affect the exchange.
#[async_trait]
pub trait StorageDispatch: Send + Sync {
    /// Handle a storage action for `msg`.
    async fn handle(&self, action: StorageAction, msg: &Message) -> Result<()>;
}

/// Dispatch to optional storage, logging failures.
pub(crate) async fn dispatch_storage(
    storage: Option<&dyn StorageDispatch>,
    action: StorageAction,
    msg: &Message,
) {
    let Some(storage) = storage else {
        return;
    };
    if let Err(e) = storage.handle(action, msg).await {
        tracing::warn!(
            action = action.name(),
            message_id = msg.message_id(),
            error = %e,
            "storage dispatch failed"
        );
    }
}
