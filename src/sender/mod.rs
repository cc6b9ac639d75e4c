//! AS2 Transmission Engine.
//!
//! Drives one outbound exchange:
//!
//! ```text
//!  check_required ──► secure ──► MIC ──► [pending write] ──► transmit ──► [sync MDN]
//!                     (once)    (once)    (async mode)         ▲   │
//!                                                              └───┘ resend on
//!                                                            transport failure
//! ```
//!
//! Securing, the MIC and the pending write happen once per [`As2Sender::send`];
//! resends re-transmit the same secured body.
//!
//! # Outcomes
//!
//! | Situation                                  | Result                                      |
//! |--------------------------------------------|---------------------------------------------|
//! | Required field missing                     | `Err(Validation)`, no network call          |
//! | Delivered, no receipt requested            | `Delivered { receipt: NotRequested }`       |
//! | Delivered, sync MDN clean or warning       | `Delivered { receipt: Received { .. } }`    |
//! | Delivered, sync MDN fatal                  | `Err(Disposition)`, never resent            |
//! | Delivered, sync MDN unreadable             | `Delivered { receipt: Unprocessed { .. } }` |
//! | Delivered, async receipt option set        | `AwaitingAsyncMdn { payload_ref }`          |
//! | Every attempt failed in transport          | `Abandoned { attempts }` plus an error log  |
//! | Request cannot be built (header, scheme)   | `Err(InvalidRequest)`, no resend            |
//!
//! Redirects are not followed; a 3xx answer is a transport failure.

mod headers;
mod resend;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, Url};

pub use headers::{http_date, request_headers, AS2_VERSION, MIME_VERSION};
pub use resend::{ResendController, ResendDecision, ACTION_SEND};

use crate::config::SenderConfig;
use crate::disposition::{
    verify_mic, Disposition, DispositionCheck, DispositionOptions, DEFAULT_MIC_ALGORITHM,
};
use crate::error::{As2Error, Result};
use crate::message::{
    attr, Headers, Message, MessageMdn, MimeBody, PartnerRole, Partnership, PA_AS2_MDN_OPTIONS,
    PA_ENCRYPT, PA_SIGN, PID_AS2, PID_EMAIL,
};
use crate::pending::{PendingRecord, PendingStore};
use crate::resolver::{
    dispatch_storage, CertificateResolver, CryptoHelper, PartnershipResolver, StorageAction,
    StorageDispatch,
};

/// HTTP statuses accepted as a successful delivery.
pub const SUCCESS_STATUSES: [u16; 5] = [200, 201, 202, 204, 206];

/// Receipt handling on the connection that carried the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReceipt {
    /// The partnership asked for no synchronous receipt
    NotRequested,
    /// A receipt was read and its disposition is not fatal
    Received {
        /// Parsed disposition
        disposition: Disposition,
        /// Whether the returned MIC equals the computed one
        mic_matched: bool,
        /// Whether the disposition carries a warning modifier
        warning: bool,
    },
    /// The message was delivered but its receipt could not be processed
    Unprocessed {
        /// Why the receipt was not processed
        reason: String,
    },
}

/// Result of [`As2Sender::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Partner accepted the message
    Delivered {
        /// Synchronous receipt handling
        receipt: SyncReceipt,
    },
    /// Partner accepted the message; the receipt will arrive later
    AwaitingAsyncMdn {
        /// Reference to the payload kept with the pending record
        payload_ref: String,
    },
    /// Every attempt failed in transport and the resend budget is spent
    Abandoned {
        /// Total attempts made
        attempts: u32,
    },
}

impl SendOutcome {
    /// Whether the partner accepted the message
    pub fn is_delivered(&self) -> bool {
        !matches!(self, SendOutcome::Abandoned { .. })
    }
}

/// Sends AS2 messages over HTTP.
pub struct As2Sender {
    config: SenderConfig,
    client: Client,
    certificates: Arc<dyn CertificateResolver>,
    partnerships: Arc<dyn PartnershipResolver>,
    crypto: Arc<dyn CryptoHelper>,
    pending: Arc<dyn PendingStore>,
    storage: Option<Arc<dyn StorageDispatch>>,
    resender: ResendController,
}

impl As2Sender {
    /// Create a sender with its collaborators.
    pub fn new(
        config: SenderConfig,
        certificates: Arc<dyn CertificateResolver>,
        partnerships: Arc<dyn PartnershipResolver>,
        crypto: Arc<dyn CryptoHelper>,
        pending: Arc<dyn PendingStore>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| As2Error::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            resender: ResendController::new(config.max_retries),
            config,
            client,
            certificates,
            partnerships,
            crypto,
            pending,
            storage: None,
        })
    }

    /// Attach archive and MDN storage
    pub fn with_storage(mut self, storage: Arc<dyn StorageDispatch>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sender configuration
    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    /// Send `msg` to its partner.
    ///
    /// Validation, securing, pending-store and fatal-disposition failures
    /// surface as `Err`. Transport failures are resent until the budget is
    /// spent and then reported as [`SendOutcome::Abandoned`].
    pub async fn send(&self, msg: &mut Message) -> Result<SendOutcome> {
        tracing::info!(message_id = msg.message_id(), "message submitted");
        Self::check_required(msg)?;

        let secured = self.secure(msg)?;
        let mic = self.calculate_mic(msg)?;

        let payload_ref = if msg.is_requesting_async_mdn() {
            Some(self.store_pending(msg, &mic, &secured).await?)
        } else {
            None
        };

        let mut retries_left = self.resender.max_retries();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let err = match self.transmit(msg, &secured, &mic).await {
                Ok(receipt) => {
                    return Ok(match payload_ref {
                        Some(payload_ref) => SendOutcome::AwaitingAsyncMdn { payload_ref },
                        None => SendOutcome::Delivered { receipt },
                    });
                },
                Err(e) => e,
            };

            if !err.is_retryable() {
                return Err(err);
            }
            match self.resender.resend(ACTION_SEND, msg, &err, retries_left) {
                ResendDecision::Retry { retries_left: left } => retries_left = left,
                ResendDecision::GiveUp => {
                    tracing::error!(
                        message_id = msg.message_id(),
                        attempts,
                        error = %err,
                        "message abandoned after exhausting resends"
                    );
                    return Ok(SendOutcome::Abandoned { attempts });
                },
            }
        }
    }

    /// Fail with the first missing field required for sending.
    pub fn check_required(msg: &Message) -> Result<()> {
        fn present(value: Option<&str>) -> bool {
            value.is_some_and(|v| !v.trim().is_empty())
        }

        let partnership = msg.partnership();
        let required = [
            ("ContentType", present(msg.content_type())),
            ("Attribute: as2_url", present(partnership.url())),
            ("Receiver: as2_id", present(partnership.receiver_id(PID_AS2))),
            ("Sender: as2_id", present(partnership.sender_id(PID_AS2))),
            ("Subject", present(msg.subject())),
            ("Sender: email", present(partnership.sender_id(PID_EMAIL))),
            ("Message Data", msg.data().is_some_and(|d| !d.is_empty())),
            ("Message-ID", present(Some(msg.message_id()))),
        ];

        match required.iter().find(|(_, ok)| !ok) {
            Some((field, _)) => Err(As2Error::missing(*field)),
            None => Ok(()),
        }
    }

    /// Sign and/or encrypt the message body as the partnership requests.
    ///
    /// Each step appends one history entry and replaces the message's
    /// content type. Returns the body to put on the wire.
    pub fn secure(&self, msg: &mut Message) -> Result<MimeBody> {
        let mut body = msg.data().cloned().ok_or_else(|| As2Error::missing("Message Data"))?;
        let partnership = msg.partnership().clone();

        if let Some(digest) = partnership.attribute(PA_SIGN) {
            let cert = self.certificates.certificate(&partnership, PartnerRole::Sender)?;
            let key = self.certificates.private_key(&partnership, &cert)?;
            body = self.crypto.sign(&body, &cert, &key, digest)?;
            record_step(msg, &body)?;
            tracing::debug!(message_id = msg.message_id(), digest, "signed data");
        }

        if let Some(algorithm) = partnership.attribute(PA_ENCRYPT) {
            let cert = self.certificates.certificate(&partnership, PartnerRole::Receiver)?;
            body = self.crypto.encrypt(&body, &cert, algorithm)?;
            record_step(msg, &body)?;
            tracing::debug!(message_id = msg.message_id(), algorithm, "encrypted data");
        }

        Ok(body)
    }

    /// MIC over the message data with the negotiated digest.
    ///
    /// Headers are covered once the body has been wrapped at least once.
    pub fn calculate_mic(&self, msg: &Message) -> Result<String> {
        let options = msg
            .partnership()
            .attribute(PA_AS2_MDN_OPTIONS)
            .map(DispositionOptions::parse)
            .transpose()?
            .unwrap_or_default();
        let digest = options.micalg().unwrap_or(DEFAULT_MIC_ALGORITHM);
        let data = msg.data().ok_or_else(|| As2Error::missing("Message Data"))?;
        let include_headers = msg.history().len() > 1;

        self.crypto.calculate_mic(data, digest, include_headers)
    }

    async fn store_pending(&self, msg: &mut Message, mic: &str, secured: &MimeBody) -> Result<String> {
        let payload_ref = self.pending.put_payload(msg.message_id(), &secured.content).await?;
        self.pending
            .put(msg.message_id(), &PendingRecord::new(mic, payload_ref.clone()))
            .await?;

        msg.set_attribute(attr::PENDING_FILE, payload_ref.clone());
        msg.set_attribute(attr::STATUS, attr::STATUS_PENDING);
        tracing::info!(
            message_id = msg.message_id(),
            payload_ref = %payload_ref,
            "pending record stored, awaiting async MDN"
        );
        Ok(payload_ref)
    }

    async fn transmit(&self, msg: &mut Message, secured: &MimeBody, mic: &str) -> Result<SyncReceipt> {
        let url_text = msg
            .partnership()
            .url()
            .ok_or_else(|| As2Error::missing("Attribute: as2_url"))?
            .to_string();
        let url = Url::parse(&url_text)
            .map_err(|e| As2Error::Partnership(format!("Invalid partner URL {url_text:?}: {e}")))?;
        if let Some(host) = url.host_str() {
            msg.set_attribute(attr::DESTINATION_IP, host);
        }
        if let Some(port) = url.port_or_known_default() {
            msg.set_attribute(attr::DESTINATION_PORT, port.to_string());
        }

        let headers = request_headers(msg, &http_date(chrono::Utc::now()));
        tracing::info!(message_id = msg.message_id(), url = %url_text, "connecting");

        let mut request = self.client.post(url);
        for (name, value) in headers.iter() {
            request = request.header(name, value);
        }
        let response = request.body(secured.content.clone()).send().await?;
        tracing::info!(
            message_id = msg.message_id(),
            bytes = secured.len(),
            status = response.status().as_u16(),
            "transferred"
        );

        self.archive(msg, &headers).await;

        let status = response.status();
        if !SUCCESS_STATUSES.contains(&status.as_u16()) {
            tracing::error!(
                message_id = msg.message_id(),
                url = %url_text,
                status = status.as_u16(),
                "partner rejected message"
            );
            return Err(As2Error::Transport {
                url: url_text,
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        if !msg.is_requesting_mdn() || msg.is_requesting_async_mdn() {
            tracing::info!(message_id = msg.message_id(), "message sent");
            return Ok(SyncReceipt::NotRequested);
        }

        match self.receive_mdn(msg, response, mic).await {
            Ok(receipt) => {
                tracing::info!(message_id = msg.message_id(), "message sent, MDN received");
                Ok(receipt)
            },
            Err(e @ As2Error::Disposition { .. }) => Err(e),
            Err(e) => {
                tracing::error!(
                    message_id = msg.message_id(),
                    error = %e,
                    "message was sent but its MDN could not be processed"
                );
                Ok(SyncReceipt::Unprocessed {
                    reason: e.to_string(),
                })
            },
        }
    }

    async fn archive(&self, msg: &Message, request_headers: &Headers) {
        let Some(storage) = self.storage.as_deref() else {
            return;
        };
        let mut copy = msg.clone();
        for (name, value) in request_headers.iter() {
            if !copy.headers().contains(name) {
                copy.headers_mut().add(name, value);
            }
        }
        dispatch_storage(Some(storage), StorageAction::Archive, &copy).await;
    }

    async fn receive_mdn(&self, msg: &mut Message, response: Response, mic: &str) -> Result<SyncReceipt> {
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            headers.add(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
        }
        let body = response.bytes().await?;
        let part = MimeBody::with_headers(headers.clone(), body);

        let from = headers
            .get("AS2-From")
            .ok_or_else(|| As2Error::Mdn("MDN has no AS2-From header".to_string()))?;
        let to = headers
            .get("AS2-To")
            .ok_or_else(|| As2Error::Mdn("MDN has no AS2-To header".to_string()))?;
        let mut partnership = Partnership::new()
            .with_sender_id(PID_AS2, from)
            .with_receiver_id(PID_AS2, to);
        self.partnerships.resolve(&mut partnership)?;

        let cert = self.certificates.certificate(&partnership, PartnerRole::Sender)?;
        let report = self.crypto.parse_mdn(&part, &cert)?;

        let mut mdn = MessageMdn::new(headers, part);
        mdn.partnership = partnership;
        mdn.report = Some(report);
        msg.set_mdn(mdn);
        dispatch_storage(self.storage.as_deref(), StorageAction::StoreMdn, msg).await;

        let Some(mdn) = msg.mdn() else {
            return Err(As2Error::Mdn("MDN was not attached".to_string()));
        };
        let disposition_text = mdn
            .disposition()
            .ok_or_else(|| As2Error::Mdn("MDN has no disposition".to_string()))?
            .to_string();
        let returned_mic = mdn.mic().map(str::to_string);
        let mdn_text = mdn.text().map(str::to_string);
        tracing::info!(
            message_id = msg.message_id(),
            disposition = %disposition_text,
            "received MDN"
        );

        let mic_matched = match verify_mic(mic, returned_mic.as_deref()) {
            Ok(()) => {
                tracing::info!(message_id = msg.message_id(), mic, "MIC is matched");
                true
            },
            Err(e) => {
                tracing::info!(message_id = msg.message_id(), error = %e, "MIC is not matched");
                false
            },
        };

        let disposition = Disposition::parse(&disposition_text)?;
        let warning = match disposition.validate(mdn_text.as_deref())? {
            DispositionCheck::Warning => {
                tracing::warn!(
                    message_id = msg.message_id(),
                    disposition = %disposition_text,
                    "MDN reports a warning"
                );
                msg.set_attribute(attr::DISPOSITION_WARNING, disposition_text);
                true
            },
            DispositionCheck::Clean | DispositionCheck::Fatal => false,
        };

        Ok(SyncReceipt::Received {
            disposition,
            mic_matched,
            warning,
        })
    }
}

/// Record one securing step on the message.
fn record_step(msg: &mut Message, body: &MimeBody) -> Result<()> {
    let content_type = body
        .content_type()
        .ok_or_else(|| As2Error::Crypto("Secured body has no Content-Type".to_string()))?
        .to_string();
    msg.push_history(content_type.clone());
    msg.set_content_type(content_type);
    Ok(())
}
