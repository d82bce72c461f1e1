//! Shared test doubles: a recording event channel and a scriptable disk
//! arbitration backend.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use cloudfence_core::{Decision, Event, EventKind};
use cloudfence_daemon::channel::{ChannelError, EventChannel, RespondError};
use cloudfence_daemon::disk::{ArbiterContext, ArbiterError, DiskArbiter, DiskCallbacks};

/// What the recording channel should do with each `respond` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespondBehavior {
    Deliver,
    DeadlineExpired,
}

/// Event channel that records subscriptions and responses.
pub struct RecordingChannel {
    pub fail_subscribe: bool,
    pub respond_behavior: RespondBehavior,
    pub subscribed: Mutex<Option<Vec<EventKind>>>,
    pub unsubscribed: AtomicBool,
    pub responses: Mutex<Vec<(EventKind, u64, Decision)>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self {
            fail_subscribe: false,
            respond_behavior: RespondBehavior::Deliver,
            subscribed: Mutex::new(None),
            unsubscribed: AtomicBool::new(false),
            responses: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_subscribe() -> Self {
        Self {
            fail_subscribe: true,
            ..Self::new()
        }
    }

    pub fn expiring_deadlines() -> Self {
        Self {
            respond_behavior: RespondBehavior::DeadlineExpired,
            ..Self::new()
        }
    }

    pub fn responses(&self) -> Vec<(EventKind, u64, Decision)> {
        self.responses.lock().unwrap().clone()
    }
}

impl EventChannel for RecordingChannel {
    fn subscribe(&self, kinds: &[EventKind]) -> Result<(), ChannelError> {
        if self.fail_subscribe {
            return Err(ChannelError::SubscriptionFailed {
                reason: "scripted failure".to_string(),
            });
        }
        *self.subscribed.lock().unwrap() = Some(kinds.to_vec());
        Ok(())
    }

    fn unsubscribe(&self) -> Result<(), ChannelError> {
        self.unsubscribed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn respond(&self, event: &Event, decision: Decision) -> Result<(), RespondError> {
        self.responses
            .lock()
            .unwrap()
            .push((event.kind, event.seq, decision));
        match self.respond_behavior {
            RespondBehavior::Deliver => Ok(()),
            RespondBehavior::DeadlineExpired => {
                Err(RespondError::DeadlineExpired { seq: event.seq })
            }
        }
    }
}

/// Arbitration backend that captures the registered context and callbacks so
/// tests can drive deliveries the way the real subsystem would.
pub struct RecordingArbiter {
    pub fail_open: bool,
    pub registration: Mutex<Option<(ArbiterContext, DiskCallbacks)>>,
    pub closed: AtomicBool,
}

impl RecordingArbiter {
    pub fn new() -> Self {
        Self {
            fail_open: false,
            registration: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::new()
        }
    }

    pub fn registration(&self) -> Option<(ArbiterContext, DiskCallbacks)> {
        *self.registration.lock().unwrap()
    }
}

impl DiskArbiter for RecordingArbiter {
    fn open(&self, context: ArbiterContext, callbacks: DiskCallbacks) -> Result<(), ArbiterError> {
        if self.fail_open {
            return Err(ArbiterError::SessionUnavailable {
                reason: "scripted failure".to_string(),
            });
        }
        *self.registration.lock().unwrap() = Some((context, callbacks));
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
