//! Shared fixtures for exchange tests: a fake S/MIME helper, a scriptable
//! partner server, and alpha/beta partnerships.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use as2::message::{PA_AS2_URL, PID_AS2, PID_EMAIL, PID_X509_ALIAS};
use as2::{
    parse_report_fields, As2Error, As2Sender, Certificate, CertificateStore, CryptoHelper,
    MdnReport, Message, MimeBody, Partnership, PartnershipDirectory, PendingStore, PrivateKey,
    Result, SenderConfig, StorageAction, StorageDispatch, TcpTransport,
};
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tokio::task::JoinHandle;

pub const SIGNED_TYPE: &str = "multipart/signed; protocol=\"application/pkcs7-signature\"";
pub const ENCRYPTED_TYPE: &str = "application/pkcs7-mime; smime-type=enveloped-data";
pub const PROCESSED: &str = "automatic-action/MDN-sent-automatically; processed";

/// Install a test subscriber once; respects `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// S/MIME stand-in: wraps bodies with a marker and treats MDN bodies as the
/// plain disposition-notification part.
pub struct FakeCrypto;

impl CryptoHelper for FakeCrypto {
    fn sign(&self, body: &MimeBody, _cert: &Certificate, key: &PrivateKey, digest: &str) -> Result<MimeBody> {
        if key.0.is_empty() {
            return Err(As2Error::Crypto("empty key".to_string()));
        }
        let mut content = format!("SIGNED({digest}):").into_bytes();
        content.extend_from_slice(&body.content);
        Ok(MimeBody::new(SIGNED_TYPE, content))
    }

    fn encrypt(&self, body: &MimeBody, _cert: &Certificate, algorithm: &str) -> Result<MimeBody> {
        let mut content = format!("ENCRYPTED({algorithm}):").into_bytes();
        content.extend_from_slice(&body.content);
        Ok(MimeBody::new(ENCRYPTED_TYPE, content))
    }

    fn parse_mdn(&self, mdn: &MimeBody, _signer: &Certificate) -> Result<MdnReport> {
        let text = std::str::from_utf8(&mdn.content).map_err(|e| As2Error::Mdn(e.to_string()))?;
        parse_report_fields(text)
    }
}

/// Storage dispatch that records every action.
#[derive(Default)]
pub struct RecordingStorage {
    pub actions: Mutex<Vec<(StorageAction, Message)>>,
}

impl RecordingStorage {
    pub fn actions(&self) -> Vec<StorageAction> {
        self.actions.lock().unwrap().iter().map(|(a, _)| *a).collect()
    }

    pub fn message_for(&self, action: StorageAction) -> Option<Message> {
        self.actions
            .lock()
            .unwrap()
            .iter()
            .find(|(a, _)| *a == action)
            .map(|(_, m)| m.clone())
    }
}

#[async_trait]
impl StorageDispatch for RecordingStorage {
    async fn handle(&self, action: StorageAction, msg: &Message) -> Result<()> {
        self.actions.lock().unwrap().push((action, msg.clone()));
        Ok(())
    }
}

/// Outbound partnership from alpha to beta.
pub fn alpha_beta(url: &str) -> Partnership {
    Partnership::named("alpha-beta")
        .with_sender_id(PID_AS2, "alpha")
        .with_sender_id(PID_EMAIL, "edi@alpha.example")
        .with_sender_id(PID_X509_ALIAS, "alpha-cert")
        .with_receiver_id(PID_AS2, "beta")
        .with_receiver_id(PID_X509_ALIAS, "beta-cert")
        .with_attribute(PA_AS2_URL, url)
}

/// Directory knowing both directions between alpha and beta.
pub fn directory() -> PartnershipDirectory {
    PartnershipDirectory::new()
        .with(alpha_beta("http://beta.invalid/as2"))
        .unwrap()
        .with(
            Partnership::named("beta-alpha")
                .with_sender_id(PID_AS2, "beta")
                .with_sender_id(PID_X509_ALIAS, "beta-cert")
                .with_receiver_id(PID_AS2, "alpha")
                .with_receiver_id(PID_X509_ALIAS, "alpha-cert"),
        )
        .unwrap()
}

pub fn certificates() -> CertificateStore {
    CertificateStore::new()
        .with_key_pair("alpha-cert", Certificate(b"alpha".to_vec()), PrivateKey(b"alpha-key".to_vec()))
        .with_certificate("beta-cert", Certificate(b"beta".to_vec()))
}

pub fn sender_config(max_retries: u32) -> SenderConfig {
    SenderConfig {
        timeout_secs: 5,
        connect_timeout_secs: 2,
        max_retries,
        ..SenderConfig::default()
    }
}

pub fn sender(pending: Arc<dyn PendingStore>, max_retries: u32) -> As2Sender {
    As2Sender::new(
        sender_config(max_retries),
        Arc::new(certificates()),
        Arc::new(directory()),
        Arc::new(FakeCrypto),
        pending,
    )
    .unwrap()
}

/// A business document for `partnership`.
pub fn invoice(partnership: Partnership) -> Message {
    Message::new(partnership)
        .with_message_id(Message::generate_id("alpha", "beta"))
        .with_subject("Invoice 42")
        .with_data(MimeBody::new("application/edi-x12", "ISA*00*          *00*~"))
}

/// Machine-readable MDN fields as a partner would send them.
pub fn mdn_report(original_message_id: &str, disposition: &str, mic: &str) -> String {
    format!(
        "Reporting-UA: beta-as2\r\n\
         Original-Recipient: rfc822; beta\r\n\
         Final-Recipient: rfc822; beta\r\n\
         Original-Message-ID: {original_message_id}\r\n\
         Disposition: {disposition}\r\n\
         Received-Content-MIC: {mic}\r\n"
    )
}

/// How the fake partner answers each POST.
#[derive(Debug, Clone)]
pub enum PartnerReply {
    /// Bare status, no MDN
    Status(u16),
    /// 200 with an MDN for the posted Message-ID
    Mdn { disposition: String, mic: String },
    /// 200 with a body that is not an MDN
    Garbage,
    /// 302 to a page that answers GET with 200
    Redirect,
}

/// One request seen by the partner.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub headers: HeaderMap,
    pub body: Bytes,
}

struct PartnerState {
    reply: PartnerReply,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// A running fake partner.
pub struct Partner {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl Partner {
    pub fn attempts(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for Partner {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_partner(reply: PartnerReply) -> Partner {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = Arc::new(PartnerState {
        reply,
        requests: requests.clone(),
    });
    let router = Router::new()
        .route("/as2", post(partner_handler))
        .route("/elsewhere", get(|| async { StatusCode::OK }))
        .with_state(state);

    let listener = TcpTransport::localhost(0).bind().await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let _ = TcpTransport::serve_listener(listener, router).await;
    });

    Partner {
        url: format!("http://{addr}/as2"),
        requests,
        handle,
    }
}

async fn partner_handler(
    State(state): State<Arc<PartnerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let message_id = headers
        .get("message-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state
        .requests
        .lock()
        .unwrap()
        .push(RecordedRequest { headers, body });

    let mdn_headers = [
        ("AS2-From", "beta"),
        ("AS2-To", "alpha"),
        ("Content-Type", "message/disposition-notification"),
    ];
    match &state.reply {
        PartnerReply::Status(code) => StatusCode::from_u16(*code).unwrap().into_response(),
        PartnerReply::Mdn { disposition, mic } => {
            (mdn_headers, mdn_report(&message_id, disposition, mic)).into_response()
        },
        PartnerReply::Garbage => (mdn_headers, "not an mdn").into_response(),
        PartnerReply::Redirect => (StatusCode::FOUND, [("Location", "/elsewhere")]).into_response(),
    }
}

/// A URL nothing listens on.
pub async fn closed_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/as2")
}
