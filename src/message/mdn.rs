//! Message Disposition Notification (receipt) model.

use super::mime::{Headers, MimeBody};
use super::partnership::Partnership;
use crate::error::{As2Error, Result};

/// Machine-readable MDN field: original message ID.
pub const FIELD_ORIGINAL_MESSAGE_ID: &str = "Original-Message-ID";
/// Machine-readable MDN field: disposition.
pub const FIELD_DISPOSITION: &str = "Disposition";
/// Machine-readable MDN field: MIC of the received content.
pub const FIELD_RECEIVED_CONTENT_MIC: &str = "Received-Content-MIC";

/// Fields extracted from a verified MDN.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MdnReport {
    /// Message ID the receipt refers to
    pub original_message_id: Option<String>,
    /// Raw disposition text
    pub disposition: Option<String>,
    /// Claimed MIC (`"<base64>, <algorithm>"`)
    pub mic: Option<String>,
    /// Human-readable part of the report
    pub text: Option<String>,
    /// All machine-readable fields as received
    pub fields: Headers,
}

/// Parse the `message/disposition-notification` part of an MDN.
///
/// Fields are header-style `Name: value` lines. Continuation lines (leading
/// space or tab) are joined onto the previous field. Names match case-insensitively.
pub fn parse_report_fields(text: &str) -> Result<MdnReport> {
    let mut fields = Headers::new();
    let mut current: Option<(String, String)> = None;

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        if line.starts_with([' ', '\t']) {
            match current.as_mut() {
                Some((_, value)) => {
                    value.push(' ');
                    value.push_str(line.trim());
                },
                None => {
                    return Err(As2Error::Mdn(format!(
                        "Continuation line without a field: {line:?}"
                    )))
                },
            }
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(As2Error::Mdn(format!("Malformed MDN field: {line:?}")));
        };
        if let Some((n, v)) = current.take() {
            fields.add(n, v);
        }
        current = Some((name.trim().to_string(), value.trim().to_string()));
    }
    if let Some((n, v)) = current {
        fields.add(n, v);
    }

    if fields.is_empty() {
        return Err(As2Error::Mdn("MDN report has no fields".to_string()));
    }

    Ok(MdnReport {
        original_message_id: fields.get(FIELD_ORIGINAL_MESSAGE_ID).map(str::to_string),
        disposition: fields.get(FIELD_DISPOSITION).map(str::to_string),
        mic: fields.get(FIELD_RECEIVED_CONTENT_MIC).map(str::to_string),
        text: None,
        fields,
    })
}

/// The receipt belonging to exactly one [`Message`](super::Message).
#[derive(Debug, Clone, Default)]
pub struct MessageMdn {
    /// Transport headers the receipt arrived with
    pub headers: Headers,
    /// Raw MDN body
    pub data: Option<MimeBody>,
    /// Partnership as seen from the receipt (`AS2-From` is the sender)
    pub partnership: Partnership,
    /// Parsed report, once verified
    pub report: Option<MdnReport>,
}

impl MessageMdn {
    /// Create a receipt from transport headers and body
    pub fn new(headers: Headers, data: MimeBody) -> Self {
        Self {
            headers,
            data: Some(data),
            partnership: Partnership::new(),
            report: None,
        }
    }

    /// Header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Disposition text from the parsed report
    pub fn disposition(&self) -> Option<&str> {
        self.report.as_ref().and_then(|r| r.disposition.as_deref())
    }

    /// Claimed MIC from the parsed report
    pub fn mic(&self) -> Option<&str> {
        self.report.as_ref().and_then(|r| r.mic.as_deref())
    }

    /// Original message ID from the parsed report
    pub fn original_message_id(&self) -> Option<&str> {
        self.report
            .as_ref()
            .and_then(|r| r.original_message_id.as_deref())
    }

    /// Human-readable report text
    pub fn text(&self) -> Option<&str> {
        self.report.as_ref().and_then(|r| r.text.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report_fields() {
        let text = "Reporting-UA: beta-as2\r\n\
                    Original-Recipient: rfc822; beta\r\n\
                    Final-Recipient: rfc822; beta\r\n\
                    Original-Message-ID: <1234@alpha_beta>\r\n\
                    Received-Content-MIC: kq6TfZ1bPDZ3+GmZ5QdfCQ==,\r\n\
                    \tsha1\r\n\
                    Disposition: automatic-action/MDN-sent-automatically; processed\r\n";

        let report = parse_report_fields(text).unwrap();
        assert_eq!(report.original_message_id.as_deref(), Some("<1234@alpha_beta>"));
        assert_eq!(report.mic.as_deref(), Some("kq6TfZ1bPDZ3+GmZ5QdfCQ==, sha1"));
        assert_eq!(
            report.disposition.as_deref(),
            Some("automatic-action/MDN-sent-automatically; processed")
        );
        assert_eq!(report.fields.get("reporting-ua"), Some("beta-as2"));
    }

    #[test]
    fn test_parse_report_rejects_garbage() {
        assert!(parse_report_fields("").is_err());
        assert!(parse_report_fields("not a field line").is_err());
        assert!(parse_report_fields("  leading continuation").is_err());
    }

    #[test]
    fn test_mdn_accessors() {
        let mut mdn = MessageMdn::new(Headers::new(), MimeBody::new("text/plain", "x"));
        assert_eq!(mdn.mic(), None);

        mdn.report = Some(MdnReport {
            mic: Some("abc, sha1".to_string()),
            original_message_id: Some("<m1>".to_string()),
            ..MdnReport::default()
        });
        assert_eq!(mdn.mic(), Some("abc, sha1"));
        assert_eq!(mdn.original_message_id(), Some("<m1>"));
    }
}
