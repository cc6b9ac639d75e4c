//! Pending-receipt store.
//!
//! Correlates an asynchronous MDN, arriving on an unrelated later connection,
//! with the message it confirms. A record is written before the message is
//! sent and consumed exactly once when its receipt is checked.
//!
//! # Record Layout
//!
//! ```text
//! <info area>/<key>      line 1: original MIC ("<base64>, <algorithm>")
//!                        line 2: payload reference
//! <payload area>/<key>   the secured body as sent
//! ```
//!
//! `<key>` is the message ID with whitespace and its angle brackets removed.
//! Records that never see a receipt stay behind; sweeping them is left to an
//! external process.

mod file;

use async_trait::async_trait;

pub use file::FilePendingStore;

use crate::error::{As2Error, Result};

/// Correlation state for one message awaiting an async MDN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRecord {
    /// MIC computed at send time
    pub mic: String,
    /// Reference to the payload kept for the exchange
    pub payload_ref: String,
}

impl PendingRecord {
    /// Create a record
    pub fn new(mic: impl Into<String>, payload_ref: impl Into<String>) -> Self {
        Self {
            mic: mic.into(),
            payload_ref: payload_ref.into(),
        }
    }

    /// Two-line durable form
    pub fn encode(&self) -> String {
        format!("{}\n{}", self.mic, self.payload_ref)
    }

    /// Parse the two-line durable form
    pub fn decode(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        let mic = lines
            .next()
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| As2Error::Storage("Pending record has no MIC line".to_string()))?;
        let payload_ref = lines.next().unwrap_or_default();
        Ok(Self::new(mic.trim_end_matches('\r'), payload_ref.trim_end_matches('\r')))
    }
}

/// Storage key for a message ID.
///
/// Trims whitespace and one pair of surrounding angle brackets. Rejects IDs
/// that would be empty or could escape the store's directory.
pub fn pending_key(message_id: &str) -> Result<String> {
    let trimmed = message_id.trim();
    let unbracketed = trimmed
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(trimmed)
        .trim();

    if unbracketed.is_empty()
        || unbracketed.contains(['/', '\\', '\0'])
        || unbracketed == "."
        || unbracketed.contains("..")
    {
        return Err(As2Error::InvalidMessageId(message_id.to_string()));
    }
    Ok(unbracketed.to_string())
}

/// Durable message-ID keyed store.
///
/// `put` must be durable when it returns. `remove` is idempotent.
#[async_trait]
pub trait PendingStore: Send + Sync {
    /// Persist a record for `message_id`, replacing any existing one.
    async fn put(&self, message_id: &str, record: &PendingRecord) -> Result<()>;

    /// Fetch the record, or [`As2Error::PendingNotFound`].
    async fn get(&self, message_id: &str) -> Result<PendingRecord>;

    /// Delete the record and its referenced payload. Absent keys are not an error.
    async fn remove(&self, message_id: &str) -> Result<()>;

    /// Keep the sent payload and return its reference.
    async fn put_payload(&self, message_id: &str, data: &[u8]) -> Result<String>;
}
