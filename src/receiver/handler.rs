//! Async-MDN receipt handling.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;

use super::stats::ReceiverStats;
use crate::disposition::{verify_mic, Disposition, DispositionCheck};
use crate::error::{As2Error, Result};
use crate::message::{attr, Headers, Message, MessageMdn, MimeBody, PartnerRole, Partnership, PID_AS2};
use crate::pending::PendingStore;
use crate::resolver::{
    dispatch_storage, CertificateResolver, CryptoHelper, PartnershipResolver, StorageAction,
    StorageDispatch,
};

/// One inbound connection believed to carry a receipt.
#[derive(Debug, Clone, Default)]
pub struct InboundReceipt {
    /// Request headers
    pub headers: Headers,
    /// Request body
    pub body: Bytes,
    /// Peer address
    pub remote_addr: Option<SocketAddr>,
    /// Address the connection was accepted on
    pub local_addr: Option<SocketAddr>,
}

/// How an inbound receipt was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// MIC matched; the pending record is consumed
    Matched,
    /// MIC differs; the pending record is consumed anyway
    MicMismatch,
    /// No pending record for the original message ID
    NotFound,
    /// The receipt could not be read, resolved or verified
    Malformed,
}

impl ReceiptStatus {
    /// HTTP status code for the response
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Matched => 200,
            Self::MicMismatch | Self::NotFound => 404,
            Self::Malformed => 400,
        }
    }
}

/// Result of [`AsyncMdnReceiver::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptResponse {
    /// Response status
    pub status: ReceiptStatus,
    /// Original message ID the receipt refers to, once known
    pub message_id: Option<String>,
    /// Disposition check made after the status was decided
    pub disposition: Option<DispositionCheck>,
}

impl ReceiptResponse {
    fn malformed() -> Self {
        Self {
            status: ReceiptStatus::Malformed,
            message_id: None,
            disposition: None,
        }
    }
}

/// Completes exchanges whose receipt arrives on a later connection.
pub struct AsyncMdnReceiver {
    certificates: Arc<dyn CertificateResolver>,
    partnerships: Arc<dyn PartnershipResolver>,
    crypto: Arc<dyn CryptoHelper>,
    pending: Arc<dyn PendingStore>,
    storage: Option<Arc<dyn StorageDispatch>>,
    stats: ReceiverStats,
}

impl AsyncMdnReceiver {
    /// Create a receiver with its collaborators
    pub fn new(
        certificates: Arc<dyn CertificateResolver>,
        partnerships: Arc<dyn PartnershipResolver>,
        crypto: Arc<dyn CryptoHelper>,
        pending: Arc<dyn PendingStore>,
    ) -> Self {
        Self {
            certificates,
            partnerships,
            crypto,
            pending,
            storage: None,
            stats: ReceiverStats::new(),
        }
    }

    /// Attach MDN storage
    pub fn with_storage(mut self, storage: Arc<dyn StorageDispatch>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Receipt counters
    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// Handle one inbound receipt. Never fails; every failure maps to a status.
    ///
    /// The status is fixed before the disposition is checked, so a fatal
    /// disposition is only logged.
    pub async fn handle(&self, inbound: InboundReceipt) -> ReceiptResponse {
        self.stats.record_receipt();
        tracing::info!(
            remote = ?inbound.remote_addr,
            bytes = inbound.body.len(),
            "incoming connection for receiving async MDN"
        );

        let mut msg = match self.read_receipt(inbound).await {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(error = %e, "rejecting unreadable async MDN");
                self.stats.record_status(ReceiptStatus::Malformed);
                return ReceiptResponse::malformed();
            },
        };

        let status = self.check_async_mdn(&msg).await;
        self.stats.record_status(status);
        let disposition = self.check_disposition(&mut msg);

        ReceiptResponse {
            status,
            message_id: Some(msg.message_id().to_string()),
            disposition: Some(disposition),
        }
    }

    /// Answer a receipt whose body could not be read at all.
    pub fn reject_unreadable(&self, reason: &str) -> ReceiptResponse {
        self.stats.record_receipt();
        self.stats.record_status(ReceiptStatus::Malformed);
        tracing::warn!(reason, "rejecting async MDN with unreadable body");
        ReceiptResponse::malformed()
    }

    /// Rebuild the receipt as a message carrying the original message's
    /// identity, then hand it to MDN storage.
    async fn read_receipt(&self, inbound: InboundReceipt) -> Result<Message> {
        let mut msg = Message::new(Partnership::new());
        if let Some(local) = inbound.local_addr {
            msg.set_attribute(attr::SOURCE_IP, local.ip().to_string());
            msg.set_attribute(attr::SOURCE_PORT, local.port().to_string());
        }
        if let Some(remote) = inbound.remote_addr {
            msg.set_attribute(attr::DESTINATION_IP, remote.ip().to_string());
            msg.set_attribute(attr::DESTINATION_PORT, remote.port().to_string());
        }

        let headers = inbound.headers;
        if headers.get("Content-Type").is_none() {
            return Err(As2Error::Mdn("MDN has no Content-Type".to_string()));
        }
        let from = required_header(&headers, "AS2-From")?;
        let to = required_header(&headers, "AS2-To")?;

        let part = MimeBody::with_headers(headers.clone(), inbound.body);
        msg.set_data(part.clone());
        *msg.headers_mut() = headers.clone();

        let mut mdn = MessageMdn::new(headers, part);
        mdn.partnership = Partnership::new()
            .with_sender_id(PID_AS2, from.clone())
            .with_receiver_id(PID_AS2, to.clone());
        self.partnerships.resolve(&mut mdn.partnership)?;

        let cert = self.certificates.certificate(&mdn.partnership, PartnerRole::Sender)?;
        let report = match &mdn.data {
            Some(part) => self.crypto.parse_mdn(part, &cert)?,
            None => return Err(As2Error::Mdn("MDN has no body".to_string())),
        };
        let original_id = report
            .original_message_id
            .clone()
            .ok_or_else(|| As2Error::Mdn("MDN has no Original-Message-ID".to_string()))?;
        mdn.report = Some(report);

        // Store under the original exchange: it was sent by AS2-To to AS2-From.
        msg.partnership_mut().set_sender_id(PID_AS2, to);
        msg.partnership_mut().set_receiver_id(PID_AS2, from);
        self.partnerships.resolve(msg.partnership_mut())?;
        msg.set_message_id(original_id);
        msg.set_mdn(mdn);

        dispatch_storage(self.storage.as_deref(), StorageAction::StoreMdn, &msg).await;
        Ok(msg)
    }

    /// Compare the receipt MIC with the pending record and consume the record.
    async fn check_async_mdn(&self, msg: &Message) -> ReceiptStatus {
        let message_id = msg.message_id();
        let record = match self.pending.get(message_id).await {
            Ok(record) => record,
            Err(As2Error::PendingNotFound(_)) => {
                tracing::warn!(message_id, "no pending record for async MDN");
                return ReceiptStatus::NotFound;
            },
            Err(e) => {
                tracing::error!(message_id, error = %e, "failed to read pending record");
                return ReceiptStatus::NotFound;
            },
        };

        let mdn = msg.mdn();
        tracing::info!(
            message_id,
            disposition = mdn.and_then(MessageMdn::disposition).unwrap_or(""),
            "received MDN"
        );

        let matched = match verify_mic(&record.mic, mdn.and_then(MessageMdn::mic)) {
            Ok(()) => {
                tracing::info!(message_id, mic = %record.mic, "MIC is matched");
                true
            },
            Err(e) => {
                tracing::info!(message_id, error = %e, "MIC is not matched");
                false
            },
        };

        if let Err(e) = self.pending.remove(message_id).await {
            tracing::error!(message_id, error = %e, "failed to delete pending record");
        }

        if matched {
            ReceiptStatus::Matched
        } else {
            ReceiptStatus::MicMismatch
        }
    }

    fn check_disposition(&self, msg: &mut Message) -> DispositionCheck {
        let Some(mdn) = msg.mdn() else {
            return DispositionCheck::Fatal;
        };
        let text = mdn.disposition().unwrap_or_default().to_string();
        let checked = Disposition::parse(&text).and_then(|d| d.validate(mdn.text()));

        match checked {
            Ok(DispositionCheck::Warning) => {
                self.stats.record_warning();
                tracing::warn!(
                    message_id = msg.message_id(),
                    disposition = %text,
                    "async MDN reports a warning"
                );
                msg.set_attribute(attr::DISPOSITION_WARNING, text);
                DispositionCheck::Warning
            },
            Ok(DispositionCheck::Clean) => DispositionCheck::Clean,
            Ok(DispositionCheck::Fatal) | Err(_) => {
                self.stats.record_fatal_disposition();
                tracing::error!(
                    message_id = msg.message_id(),
                    disposition = %text,
                    "async MDN reports a failed disposition"
                );
                DispositionCheck::Fatal
            },
        }
    }
}

fn required_header(headers: &Headers, name: &str) -> Result<String> {
    headers
        .get(name)
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.trim().to_string())
        .ok_or_else(|| As2Error::Mdn(format!("MDN has no {name} header")))
}
