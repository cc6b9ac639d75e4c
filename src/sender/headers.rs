//! AS2 request headers.

use crate::message::{
    Headers, Message, PA_AS2_MDN_OPTIONS, PA_AS2_MDN_TO, PA_AS2_RECEIPT_OPTION, PA_AS2_URL, PID_AS2,
    PID_EMAIL,
};

/// AS2 protocol version sent in `AS2-Version`.
pub const AS2_VERSION: &str = "1.1";

/// MIME version sent in `Mime-Version`.
pub const MIME_VERSION: &str = "1.0";

/// Format a `Date` header value.
pub fn http_date(now: chrono::DateTime<chrono::Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S %z").to_string()
}

/// Build the request headers for sending `msg`.
///
/// Optional headers appear only when the partnership or message carries
/// the corresponding value.
pub fn request_headers(msg: &Message, date: &str) -> Headers {
    let partnership = msg.partnership();
    let mut headers = Headers::new();

    headers.set("Date", date);
    headers.set("Message-ID", msg.message_id());
    headers.set("Mime-Version", MIME_VERSION);
    headers.set("Content-Type", msg.content_type().unwrap_or_default());
    headers.set("AS2-Version", AS2_VERSION);
    headers.set(
        "Recipient-Address",
        partnership.attribute(PA_AS2_URL).unwrap_or_default(),
    );
    headers.set("AS2-To", partnership.receiver_id(PID_AS2).unwrap_or_default());
    headers.set("AS2-From", partnership.sender_id(PID_AS2).unwrap_or_default());
    headers.set("Subject", msg.subject().unwrap_or_default());
    headers.set("From", partnership.sender_id(PID_EMAIL).unwrap_or_default());

    if let Some(disp_to) = partnership.attribute(PA_AS2_MDN_TO) {
        headers.set("Disposition-Notification-To", disp_to);
    }
    if let Some(options) = partnership.attribute(PA_AS2_MDN_OPTIONS) {
        headers.set("Disposition-Notification-Options", options);
    }
    if let Some(receipt_option) = partnership.attribute(PA_AS2_RECEIPT_OPTION) {
        headers.set("Receipt-delivery-option", receipt_option);
    }
    if let Some(content_disposition) = msg.content_disposition() {
        headers.set("Content-Disposition", content_disposition);
    }

    headers
}
