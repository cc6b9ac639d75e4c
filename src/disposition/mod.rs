//! Receipt verdicts and message integrity checks.
//!
//! - [`Disposition`]: the structured verdict carried in an MDN
//! - [`DispositionOptions`]: the `Disposition-Notification-Options` request header
//! - [`calculate_mic`] / [`mic_matches`] / [`verify_mic`]: integrity digest and its comparison
//!
//! # Disposition Grammar
//!
//! ```text
//! action-mode "/" sending-mode ";" disposition-type [ "/" severity ] [ ":" text ]
//!
//! automatic-action/MDN-sent-automatically; processed
//! automatic-action/MDN-sent-automatically; processed/warning: duplicate-document
//! automatic-action/MDN-sent-automatically; processed/error: decryption-failed
//! ```
//!
//! | Type        | Severity  | Check     |
//! |-------------|-----------|-----------|
//! | `processed` | (none)    | `Clean`   |
//! | `processed` | `warning` | `Warning` |
//! | `processed` | other     | `Fatal`   |
//! | other       | any       | `Fatal`   |

mod mic;
mod options;

use std::fmt;

pub use mic::{calculate_mic, mic_matches, normalize_mic, verify_mic, DEFAULT_MIC_ALGORITHM};
pub use options::DispositionOptions;

use crate::error::{As2Error, Result};

/// Who triggered the disposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionMode {
    /// `automatic-action`
    Automatic,
    /// `manual-action`
    Manual,
    /// Anything else, kept verbatim
    Other(String),
}

/// How the MDN was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendingMode {
    /// `MDN-sent-automatically`
    Automatically,
    /// `MDN-sent-manually`
    Manually,
    /// Anything else, kept verbatim
    Other(String),
}

/// Outcome reported by the partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispositionKind {
    /// `processed`
    Processed,
    /// `failed`
    Failed,
    /// Anything else, kept verbatim
    Other(String),
}

/// Modifier severity after the disposition type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    /// `error`
    Error,
    /// `warning`
    Warning,
    /// `failure`
    Failure,
    /// Anything else, kept verbatim
    Other(String),
}

/// Result of checking a disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispositionCheck {
    /// Processed without modifier
    Clean,
    /// Processed with a warning; logged, not propagated
    Warning,
    /// Any failure; propagated on the synchronous path
    Fatal,
}

/// A parsed MDN disposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disposition {
    /// Action mode
    pub action: ActionMode,
    /// Sending mode
    pub sending: SendingMode,
    /// Disposition type
    pub kind: DispositionKind,
    /// Optional modifier severity
    pub severity: Option<Severity>,
    /// Optional modifier text
    pub modifier_text: Option<String>,
}

impl Disposition {
    /// A clean `processed` disposition sent automatically
    pub fn processed() -> Self {
        Self {
            action: ActionMode::Automatic,
            sending: SendingMode::Automatically,
            kind: DispositionKind::Processed,
            severity: None,
            modifier_text: None,
        }
    }

    /// Attach a severity modifier
    pub fn with_modifier(mut self, severity: Severity, text: &str) -> Self {
        self.severity = Some(severity);
        self.modifier_text = Some(text.to_string());
        self
    }

    /// Parse disposition text.
    ///
    /// Fails only when the text lacks the `mode/mode; type` skeleton;
    /// unknown tokens parse into the `Other` variants.
    pub fn parse(text: &str) -> Result<Self> {
        let malformed = || As2Error::Mdn(format!("Malformed disposition: {text:?}"));

        let (modes, rest) = text.split_once(';').ok_or_else(malformed)?;
        let (action, sending) = modes.split_once('/').ok_or_else(malformed)?;
        let (action, sending) = (action.trim(), sending.trim());

        let (type_part, modifier_text) = match rest.split_once(':') {
            Some((t, m)) => (t, Some(m.trim().to_string())),
            None => (rest, None),
        };
        let (kind, severity) = match type_part.split_once('/') {
            Some((k, s)) => (k.trim(), Some(s.trim())),
            None => (type_part.trim(), None),
        };

        if action.is_empty() || sending.is_empty() || kind.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            action: parse_action(action),
            sending: parse_sending(sending),
            kind: parse_kind(kind),
            severity: severity.filter(|s| !s.is_empty()).map(parse_severity),
            modifier_text: modifier_text.filter(|m| !m.is_empty()),
        })
    }

    /// Classify the disposition
    pub fn check(&self) -> DispositionCheck {
        match (&self.kind, &self.severity) {
            (DispositionKind::Processed, None) => DispositionCheck::Clean,
            (DispositionKind::Processed, Some(Severity::Warning)) => DispositionCheck::Warning,
            _ => DispositionCheck::Fatal,
        }
    }

    /// Whether the disposition is a non-fatal warning
    pub fn is_warning(&self) -> bool {
        self.check() == DispositionCheck::Warning
    }

    /// `Err(As2Error::Disposition)` for fatal dispositions.
    pub fn validate(&self, text: Option<&str>) -> Result<DispositionCheck> {
        match self.check() {
            DispositionCheck::Fatal => Err(As2Error::Disposition {
                disposition: self.clone(),
                text: text.map(str::to_string),
            }),
            check => Ok(check),
        }
    }
}

fn parse_action(s: &str) -> ActionMode {
    if s.eq_ignore_ascii_case("automatic-action") {
        ActionMode::Automatic
    } else if s.eq_ignore_ascii_case("manual-action") {
        ActionMode::Manual
    } else {
        ActionMode::Other(s.to_string())
    }
}

fn parse_sending(s: &str) -> SendingMode {
    if s.eq_ignore_ascii_case("MDN-sent-automatically") {
        SendingMode::Automatically
    } else if s.eq_ignore_ascii_case("MDN-sent-manually") {
        SendingMode::Manually
    } else {
        SendingMode::Other(s.to_string())
    }
}

fn parse_kind(s: &str) -> DispositionKind {
    if s.eq_ignore_ascii_case("processed") {
        DispositionKind::Processed
    } else if s.eq_ignore_ascii_case("failed") {
        DispositionKind::Failed
    } else {
        DispositionKind::Other(s.to_string())
    }
}

fn parse_severity(s: &str) -> Severity {
    if s.eq_ignore_ascii_case("error") {
        Severity::Error
    } else if s.eq_ignore_ascii_case("warning") {
        Severity::Warning
    } else if s.eq_ignore_ascii_case("failure") {
        Severity::Failure
    } else {
        Severity::Other(s.to_string())
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match &self.action {
            ActionMode::Automatic => "automatic-action",
            ActionMode::Manual => "manual-action",
            ActionMode::Other(s) => s,
        };
        let sending = match &self.sending {
            SendingMode::Automatically => "MDN-sent-automatically",
            SendingMode::Manually => "MDN-sent-manually",
            SendingMode::Other(s) => s,
        };
        let kind = match &self.kind {
            DispositionKind::Processed => "processed",
            DispositionKind::Failed => "failed",
            DispositionKind::Other(s) => s,
        };
        write!(f, "{action}/{sending}; {kind}")?;
        if let Some(severity) = &self.severity {
            let severity = match severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Failure => "failure",
                Severity::Other(s) => s,
            };
            write!(f, "/{severity}")?;
        }
        if let Some(text) = &self.modifier_text {
            write!(f, ": {text}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Disposition {
    type Err = As2Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clean() {
        let d = Disposition::parse("automatic-action/MDN-sent-automatically; processed").unwrap();
        assert_eq!(d, Disposition::processed());
        assert_eq!(d.check(), DispositionCheck::Clean);
        assert!(d.validate(None).is_ok());
    }

    #[test]
    fn test_processed_warning_is_not_fatal() {
        let d = Disposition::parse(
            "automatic-action/MDN-sent-automatically; processed/warning: duplicate-document",
        )
        .unwrap();
        assert_eq!(d.severity, Some(Severity::Warning));
        assert_eq!(d.modifier_text.as_deref(), Some("duplicate-document"));
        assert!(d.is_warning());
        assert_eq!(d.validate(None).unwrap(), DispositionCheck::Warning);
    }

    #[test]
    fn test_processed_error_is_fatal() {
        let d = Disposition::parse(
            "automatic-action/MDN-sent-automatically; processed/Error: decryption-failed",
        )
        .unwrap();
        assert_eq!(d.severity, Some(Severity::Error));
        let err = d.validate(Some("could not decrypt")).unwrap_err();
        match err {
            As2Error::Disposition { disposition, text } => {
                assert_eq!(disposition, d);
                assert_eq!(text.as_deref(), Some("could not decrypt"));
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_failed_and_unknown_types_are_fatal() {
        let failed =
            Disposition::parse("automatic-action/MDN-sent-automatically; failed/Failure: unsupported")
                .unwrap();
        assert_eq!(failed.kind, DispositionKind::Failed);
        assert_eq!(failed.check(), DispositionCheck::Fatal);

        let odd = Disposition::parse("robot-action/carrier-pigeon; displayed").unwrap();
        assert_eq!(odd.action, ActionMode::Other("robot-action".to_string()));
        assert_eq!(odd.kind, DispositionKind::Other("displayed".to_string()));
        assert_eq!(odd.check(), DispositionCheck::Fatal);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let d = Disposition::parse("Automatic-Action/mdn-sent-automatically; PROCESSED/Warning: x")
            .unwrap();
        assert_eq!(d.action, ActionMode::Automatic);
        assert_eq!(d.check(), DispositionCheck::Warning);
    }

    #[test]
    fn test_malformed_disposition() {
        assert!(Disposition::parse("").is_err());
        assert!(Disposition::parse("processed").is_err());
        assert!(Disposition::parse("automatic-action; processed").is_err());
        assert!(Disposition::parse("automatic-action/MDN-sent-automatically;").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        let text = "automatic-action/MDN-sent-automatically; processed/warning: duplicate-document";
        let d: Disposition = text.parse().unwrap();
        assert_eq!(d.to_string(), text);
    }
}
