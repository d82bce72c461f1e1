//! The kernel event channel as presented to the authorization engine.
//!
//! Subscription and delivery mechanics are the platform's concern; the
//! engine only needs to subscribe to its event whitelist, send exactly one
//! response per AUTH-class event, and release the subscription at teardown.
//! Implementations deliver events by calling
//! [`crate::engine::CloudBlocker::handle_event`] from their own threads,
//! possibly concurrently.

use cloudfence_core::{Decision, Event, EventKind};
use thiserror::Error;

/// Failure to acquire or release the event subscription.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChannelError {
    /// The channel rejected the subscription request.
    #[error("event subscription failed: {reason}")]
    SubscriptionFailed {
        /// Channel-reported reason.
        reason: String,
    },

    /// The channel handle is no longer usable.
    #[error("event channel closed")]
    Closed,
}

/// Failure to deliver an authorization response.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RespondError {
    /// The platform deadline expired before the response arrived. The kernel
    /// has already applied its own default for this event; the engine can
    /// only count the loss.
    #[error("response deadline expired for event seq {seq}")]
    DeadlineExpired {
        /// Sequence number of the late event.
        seq: u64,
    },

    /// The channel handle is no longer usable.
    #[error("event channel closed")]
    Closed,
}

/// Kernel event channel interface.
pub trait EventChannel: Send + Sync {
    /// Subscribes to the given event kinds. Delivery may begin before this
    /// returns.
    fn subscribe(&self, kinds: &[EventKind]) -> Result<(), ChannelError>;

    /// Releases the subscription. No event is delivered after this returns.
    fn unsubscribe(&self) -> Result<(), ChannelError>;

    /// Sends the terminal response for an AUTH-class event. Called exactly
    /// once per AUTH event.
    fn respond(&self, event: &Event, decision: Decision) -> Result<(), RespondError>;
}

/// Channel backend that accepts subscriptions and discards responses.
///
/// Used by `cloudfenced` for policy dry runs on hosts where no platform
/// channel is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventChannel;

impl EventChannel for NullEventChannel {
    fn subscribe(&self, _kinds: &[EventKind]) -> Result<(), ChannelError> {
        Ok(())
    }

    fn unsubscribe(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    fn respond(&self, _event: &Event, _decision: Decision) -> Result<(), RespondError> {
        Ok(())
    }
}
