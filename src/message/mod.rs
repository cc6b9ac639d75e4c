//! AS2 message model.
//!
//! Plain value objects carried through the engine:
//!
//! - [`Message`]: one business document in transit
//! - [`Partnership`]: sender/receiver identities plus policy attributes
//! - [`MessageMdn`]: the receipt belonging to a message
//! - [`MimeBody`] / [`Headers`]: the body part handed between collaborators
//!
//! A message's history gets one entry when its data is set and one more per
//! signing or encryption step. The MIC covers headers only when the history
//! has grown past that first entry.

mod mdn;
mod mime;
mod partnership;

use std::collections::BTreeMap;

pub use mdn::{
    parse_report_fields, MdnReport, MessageMdn, FIELD_DISPOSITION, FIELD_ORIGINAL_MESSAGE_ID,
    FIELD_RECEIVED_CONTENT_MIC,
};
pub use mime::{Headers, MimeBody};
pub use partnership::{
    PartnerRole, Partnership, PA_AS2_MDN_OPTIONS, PA_AS2_MDN_TO, PA_AS2_RECEIPT_OPTION,
    PA_AS2_URL, PA_ENCRYPT, PA_SIGN, PID_AS2, PID_EMAIL, PID_X509_ALIAS,
};

/// Message attribute keys.
pub mod attr {
    /// Local address the message was received on
    pub const SOURCE_IP: &str = "source_ip";
    /// Local port the message was received on
    pub const SOURCE_PORT: &str = "source_port";
    /// Remote host the message was sent to / received from
    pub const DESTINATION_IP: &str = "destination_ip";
    /// Remote port the message was sent to / received from
    pub const DESTINATION_PORT: &str = "destination_port";
    /// Reference to the payload kept while an async receipt is pending
    pub const PENDING_FILE: &str = "pending_file";
    /// Exchange status
    pub const STATUS: &str = "status";
    /// Status value while an async receipt is outstanding
    pub const STATUS_PENDING: &str = "pending";
    /// Disposition text of a non-fatal warning receipt
    pub const DISPOSITION_WARNING: &str = "disposition_warning";
    /// Number of resends performed for the message
    pub const RESEND_COUNT: &str = "resend_count";
}

/// One content-type transformation applied to a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryItem {
    /// Content type after the step
    pub content_type: String,
}

/// A business document in transit.
#[derive(Debug, Clone)]
pub struct Message {
    message_id: String,
    content_type: Option<String>,
    subject: Option<String>,
    content_disposition: Option<String>,
    data: Option<MimeBody>,
    partnership: Partnership,
    headers: Headers,
    attributes: BTreeMap<String, String>,
    history: Vec<HistoryItem>,
    mdn: Option<MessageMdn>,
}

impl Message {
    /// Create an empty message for a partnership
    pub fn new(partnership: Partnership) -> Self {
        Self {
            message_id: String::new(),
            content_type: None,
            subject: None,
            content_disposition: None,
            data: None,
            partnership,
            headers: Headers::new(),
            attributes: BTreeMap::new(),
            history: Vec::new(),
            mdn: None,
        }
    }

    /// Generate a bracketed, UUID-based message ID
    pub fn generate_id(sender: &str, receiver: &str) -> String {
        format!(
            "<AS2-{}@{}_{}>",
            uuid::Uuid::new_v4().simple(),
            sender,
            receiver
        )
    }

    /// Message ID as sent on the wire
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Set the message ID
    pub fn set_message_id(&mut self, id: impl Into<String>) {
        self.message_id = id.into();
    }

    /// Builder form of [`set_message_id`](Self::set_message_id)
    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.set_message_id(id);
        self
    }

    /// Effective content type
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Replace the effective content type
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = Some(content_type.into());
    }

    /// Subject header
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Set the subject
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = Some(subject.into());
    }

    /// Builder form of [`set_subject`](Self::set_subject)
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.set_subject(subject);
        self
    }

    /// Content-Disposition header, if any
    pub fn content_disposition(&self) -> Option<&str> {
        self.content_disposition.as_deref()
    }

    /// Set the Content-Disposition header
    pub fn set_content_disposition(&mut self, value: impl Into<String>) {
        self.content_disposition = Some(value.into());
    }

    /// Body part
    pub fn data(&self) -> Option<&MimeBody> {
        self.data.as_ref()
    }

    /// Set the body part.
    ///
    /// Resets the content type and history to the new part's content type.
    pub fn set_data(&mut self, data: MimeBody) {
        let content_type = data
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        self.content_type = Some(content_type.clone());
        self.history = vec![HistoryItem { content_type }];
        self.data = Some(data);
    }

    /// Builder form of [`set_data`](Self::set_data)
    pub fn with_data(mut self, data: MimeBody) -> Self {
        self.set_data(data);
        self
    }

    /// Partnership
    pub fn partnership(&self) -> &Partnership {
        &self.partnership
    }

    /// Mutable partnership
    pub fn partnership_mut(&mut self) -> &mut Partnership {
        &mut self.partnership
    }

    /// Message headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable message headers
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Attribute value
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Set an attribute
    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    /// All attributes
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Content-type transformation history
    pub fn history(&self) -> &[HistoryItem] {
        &self.history
    }

    /// Record one transformation step
    pub fn push_history(&mut self, content_type: impl Into<String>) {
        self.history.push(HistoryItem {
            content_type: content_type.into(),
        });
    }

    /// Attached receipt
    pub fn mdn(&self) -> Option<&MessageMdn> {
        self.mdn.as_ref()
    }

    /// Attach a receipt
    pub fn set_mdn(&mut self, mdn: MessageMdn) {
        self.mdn = Some(mdn);
    }

    /// Whether the partnership asks for a receipt
    pub fn is_requesting_mdn(&self) -> bool {
        self.partnership.is_requesting_mdn()
    }

    /// Whether the receipt is expected on a later connection
    pub fn is_requesting_async_mdn(&self) -> bool {
        self.partnership.is_async_mdn()
    }
}
