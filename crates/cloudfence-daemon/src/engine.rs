//! The authorization engine ("cloud blocker").
//!
//! Hot-path contract: [`CloudBlocker::handle_event`] runs once per event,
//! possibly concurrently across kernel-delivery threads, and must stay
//! bounded: the kernel enforces a response deadline and default-allows on
//! its own if we miss it. The only locks on the path are the configuration
//! read lock (held just long enough to clone the snapshot `Arc`) and the
//! counter lock (scoped to each increment). Neither is ever held across
//! provider decision logic.

use std::sync::{Arc, PoisonError, RwLock};

use cloudfence_core::{
    ConfigError, Configuration, Decision, Event, EventClass, EventPayload, OpClass, OpenFlags,
    PolicyMap, Provider,
};
use tracing::{debug, info, trace, warn};

use crate::channel::{ChannelError, EventChannel, RespondError};
use crate::roots::SyncRoots;
use crate::stats::{CounterKind, CounterReport, EventCounters};

/// Filesystem-event authorization engine.
///
/// Owns the live [`Configuration`] (shared-read, exclusive-write, swapped
/// atomically as an `Arc`) and the operational counters.
pub struct CloudBlocker {
    channel: Arc<dyn EventChannel>,
    config: RwLock<Arc<Configuration>>,
    stats: EventCounters,
}

impl CloudBlocker {
    /// Engine with an empty configuration; nothing is restricted until
    /// [`configure`](Self::configure) installs a policy.
    #[must_use]
    pub fn new(channel: Arc<dyn EventChannel>) -> Self {
        Self {
            channel,
            config: RwLock::new(Arc::new(Configuration::empty())),
            stats: EventCounters::new(),
        }
    }

    /// Subscribes to the full event whitelist.
    pub fn init(&self) -> Result<(), ChannelError> {
        self.channel
            .subscribe(&cloudfence_core::EventKind::ALL)?;
        info!("authorization engine armed");
        Ok(())
    }

    /// Releases the event subscription. No event callback runs after this
    /// returns.
    pub fn uninit(&self) {
        if let Err(err) = self.channel.unsubscribe() {
            warn!(%err, "event channel unsubscribe failed");
        }
        info!("authorization engine disarmed");
    }

    /// Validates `policy`, discovers each provider's sync roots, and
    /// atomically installs the new configuration.
    ///
    /// On any error the previous configuration stays fully intact; a policy
    /// update is never partially applied. Providers whose lookup yields no
    /// roots (not installed on this host) are skipped with a warning.
    pub fn configure(&self, policy: &PolicyMap, roots: &dyn SyncRoots) -> Result<(), ConfigError> {
        Configuration::validate_policy(policy)?;

        let mut providers = Vec::with_capacity(policy.len());
        for (&kind, &level) in policy {
            let paths = roots
                .roots_for(kind)
                .map_err(|err| ConfigError::RootLookup {
                    kind,
                    reason: err.to_string(),
                })?;
            if paths.is_empty() {
                warn!(provider = %kind, "no sync roots found, provider not enforced");
                continue;
            }
            let provider =
                Provider::build(kind, level, paths).ok_or(ConfigError::UnconfigurableKind)?;
            providers.push(provider);
        }
        let next = Arc::new(Configuration::from_providers(providers)?);

        // Swap only after the snapshot is fully formed.
        *self
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);
        info!(providers = next.len(), "policy installed");
        Ok(())
    }

    /// Authorization hot path, invoked once per delivered event.
    ///
    /// Sends exactly one terminal response for AUTH-class events and none
    /// for NOTIFY-class events, which are only acknowledged through the
    /// counters.
    pub fn handle_event(&self, event: &Event) {
        self.stats.record_sequence(event.kind, event.seq);

        let readable = !matches!(event.payload, EventPayload::Unreadable);
        if !readable {
            self.stats.increment(event.kind, CounterKind::CopyError);
            warn!(kind = %event.kind, seq = event.seq, "unreadable event payload");
        }

        if event.kind.class() != EventClass::Auth {
            trace!(kind = %event.kind, seq = event.seq, "notify event acknowledged");
            return;
        }

        // Fail open on an unreadable payload: a non-response would wedge the
        // delivery pipeline.
        let decision = if readable {
            self.decide(event)
        } else {
            Decision::Allow
        };
        match self.channel.respond(event, decision) {
            Ok(()) => {
                trace!(kind = %event.kind, seq = event.seq, %decision, "responded");
            }
            Err(RespondError::DeadlineExpired { .. }) => {
                self.stats
                    .increment(event.kind, CounterKind::DroppedByDeadline);
                warn!(kind = %event.kind, seq = event.seq, "response missed the kernel deadline");
            }
            Err(err) => {
                warn!(kind = %event.kind, seq = event.seq, %err, "failed to deliver response");
            }
        }
    }

    fn decide(&self, event: &Event) -> Decision {
        let config = self.config_snapshot();
        let event_paths = event.paths();
        let Some(matched) = config.resolve(&event_paths) else {
            return Decision::Allow;
        };

        let decision = match event.kind.op_class() {
            OpClass::Read => matched.provider.decide_read(&event.agent),
            OpClass::Write => matched.provider.decide_write(&event.agent, &matched.paths),
            OpClass::Open => {
                let requested = event.open_flags().unwrap_or(OpenFlags::empty());
                matched
                    .provider
                    .decide_open(&event.agent, &matched.paths, requested)
            }
            OpClass::Observe => Decision::Allow,
        };
        if decision != Decision::Allow {
            debug!(
                kind = %event.kind,
                provider = %matched.provider.kind(),
                agent = %event.agent,
                %decision,
                "restricted operation"
            );
        }
        decision
    }

    fn config_snapshot(&self) -> Arc<Configuration> {
        // Readers only ever see the snapshot as it was before or after a
        // swap; the lock is held for the duration of one Arc clone.
        Arc::clone(&self.config.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Point-in-time counter report. Does not block `handle_event` for more
    /// than the counter copy.
    #[must_use]
    pub fn print_stats(&self) -> CounterReport {
        self.stats.snapshot()
    }
}
