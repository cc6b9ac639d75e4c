//! Bounded resend decisions.
//!
//! The controller only answers "try once more" or "give up". It never
//! sleeps or schedules; pacing belongs to whoever drives the sender.

use crate::error::As2Error;
use crate::message::{attr, Message};

/// Action name for a message send.
pub const ACTION_SEND: &str = "send";

/// Outcome of a resend decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendDecision {
    /// Submit the action again; `retries_left` remain after this one
    Retry {
        /// Retries remaining after the resubmission
        retries_left: u32,
    },
    /// Budget exhausted or the failure is not retryable
    GiveUp,
}

/// Decides whether a failed action is resubmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResendController {
    max_retries: u32,
}

impl ResendController {
    /// Controller allowing `max_retries` resubmissions per message
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Retry budget for a fresh message
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decide whether `action` on `msg` is resubmitted after `cause`.
    ///
    /// Each `Retry` consumes one unit of `retries_left` and bumps the
    /// message's resend counter.
    pub fn resend(
        &self,
        action: &str,
        msg: &mut Message,
        cause: &As2Error,
        retries_left: u32,
    ) -> ResendDecision {
        if !cause.is_retryable() {
            tracing::debug!(
                action,
                message_id = msg.message_id(),
                error = %cause,
                "failure is not retryable"
            );
            return ResendDecision::GiveUp;
        }
        if retries_left == 0 {
            return ResendDecision::GiveUp;
        }

        let resends = msg
            .attribute(attr::RESEND_COUNT)
            .and_then(|c| c.parse::<u32>().ok())
            .unwrap_or(0)
            + 1;
        msg.set_attribute(attr::RESEND_COUNT, resends.to_string());

        let retries_left = retries_left - 1;
        tracing::info!(
            action,
            message_id = msg.message_id(),
            resend = resends,
            retries_left,
            error = %cause,
            "resending message"
        );
        ResendDecision::Retry { retries_left }
    }
}

impl Default for ResendController {
    fn default() -> Self {
        Self::new(crate::config::SenderConfig::default().max_retries)
    }
}
