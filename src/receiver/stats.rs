//! Receiver statistics.
//!
//! Tracks inbound receipts by outcome.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::handler::ReceiptStatus;

/// Thread-safe receiver statistics
#[derive(Debug)]
pub struct ReceiverStats {
    /// Receipts received
    receipts: AtomicU64,
    /// Receipts whose MIC matched
    matched: AtomicU64,
    /// Receipts whose MIC did not match
    mismatched: AtomicU64,
    /// Receipts without a pending record
    not_found: AtomicU64,
    /// Receipts rejected before correlation
    malformed: AtomicU64,
    /// Fatal dispositions seen after responding
    fatal_dispositions: AtomicU64,
    /// Warning dispositions
    warnings: AtomicU64,
    /// Start time
    started_at: Instant,
}

impl Default for ReceiverStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiverStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self {
            receipts: AtomicU64::new(0),
            matched: AtomicU64::new(0),
            mismatched: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            fatal_dispositions: AtomicU64::new(0),
            warnings: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Record an inbound receipt
    pub fn record_receipt(&self) {
        self.receipts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the status a receipt was answered with
    pub fn record_status(&self, status: ReceiptStatus) {
        let counter = match status {
            ReceiptStatus::Matched => &self.matched,
            ReceiptStatus::MicMismatch => &self.mismatched,
            ReceiptStatus::NotFound => &self.not_found,
            ReceiptStatus::Malformed => &self.malformed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a fatal disposition
    pub fn record_fatal_disposition(&self) {
        self.fatal_dispositions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a warning disposition
    pub fn record_warning(&self) {
        self.warnings.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total receipts
    pub fn total_receipts(&self) -> u64 {
        self.receipts.load(Ordering::Relaxed)
    }

    /// Get uptime
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Get summary as JSON-compatible struct
    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            receipts: self.total_receipts(),
            matched: self.matched.load(Ordering::Relaxed),
            mismatched: self.mismatched.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            fatal_dispositions: self.fatal_dispositions.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            uptime_secs: self.uptime().as_secs(),
        }
    }
}

/// Statistics summary for serialization.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StatsSummary {
    /// Receipts received.
    pub receipts: u64,
    /// Receipts answered 200.
    pub matched: u64,
    /// Receipts answered 404 for a MIC mismatch.
    pub mismatched: u64,
    /// Receipts answered 404 for a missing pending record.
    pub not_found: u64,
    /// Receipts answered 400.
    pub malformed: u64,
    /// Fatal dispositions logged after responding.
    pub fatal_dispositions: u64,
    /// Warning dispositions.
    pub warnings: u64,
    /// Receiver uptime in seconds.
    pub uptime_secs: u64,
}
