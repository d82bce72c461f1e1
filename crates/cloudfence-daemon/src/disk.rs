//! Disk admission controller and its arbitration-session plumbing.
//!
//! The controller decides whether a newly attached disk may mount at all.
//! The pre-mount [`DiskBlocker::probe`] is the only point where mounting can
//! be refused; decisions after mount are ineffective and are never
//! attempted. The add/remove/rename hooks are observational and only update
//! [`DiskStats`].
//!
//! The arbitration subsystem registers C-style callbacks (free function plus
//! opaque context), so the [`trampoline`] module carries the one sanctioned
//! process-wide reference that resolves a context value back to the active
//! controller.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, info, warn};

/// Attributes of a disk as reported at probe and lifecycle points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskDescriptor {
    /// BSD-style device name, e.g. `disk2s1`.
    pub device: String,
    /// Volume or media name, when known.
    pub name: Option<String>,
    /// Whether the media is removable.
    pub removable: bool,
    /// Whether the media is ejectable.
    pub ejectable: bool,
}

impl DiskDescriptor {
    /// True when the descriptor marks external media.
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.removable || self.ejectable
    }
}

/// Refusal of a disk mount, returned only from the pre-mount probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dissent {
    reason: String,
}

impl Dissent {
    /// Dissent refusing the mount outright.
    pub fn not_permitted(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Human-readable refusal reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Lifecycle counters scoped to the disk admission controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskStats {
    /// Disks that appeared (post-mount add notifications).
    pub connected: u64,
    /// Probes that allowed the mount.
    pub allowed: u64,
    /// Probes that refused the mount.
    pub blocked: u64,
    /// Disks that disappeared.
    pub removed: u64,
    /// Disks that were renamed.
    pub renamed: u64,
}

impl fmt::Display for DiskStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "disk counters:")?;
        writeln!(
            f,
            "  connected={} allowed={} blocked={} removed={} renamed={}",
            self.connected, self.allowed, self.blocked, self.removed, self.renamed
        )
    }
}

/// Opaque context value passed through the C-style callback registration.
pub type ArbiterContext = usize;

/// Callback table handed to the arbitration session at registration.
///
/// Plain function pointers: the subsystem has no notion of a bound method or
/// a capturing closure.
#[derive(Debug, Clone, Copy)]
pub struct DiskCallbacks {
    /// Pre-mount probe; `Some` dissent refuses the mount.
    pub probe: fn(ArbiterContext, &DiskDescriptor) -> Option<Dissent>,
    /// Disk appeared.
    pub added: fn(ArbiterContext, &DiskDescriptor),
    /// Disk disappeared.
    pub removed: fn(ArbiterContext, &DiskDescriptor),
    /// Disk renamed.
    pub renamed: fn(ArbiterContext, &DiskDescriptor, &str),
}

/// Failure to open the arbitration session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArbiterError {
    /// The session could not be created or registered.
    #[error("disk arbitration session unavailable: {reason}")]
    SessionUnavailable {
        /// Subsystem-reported reason.
        reason: String,
    },
}

/// Disk-arbitration session as presented to the controller.
///
/// Implementations serialize callback delivery on their own queue and stop
/// delivering before [`DiskArbiter::close`] returns.
pub trait DiskArbiter: Send + Sync {
    /// Opens the session and registers the callback table with the opaque
    /// context.
    fn open(&self, context: ArbiterContext, callbacks: DiskCallbacks) -> Result<(), ArbiterError>;

    /// Closes the session. No callback runs after this returns. Idempotent.
    fn close(&self);
}

/// Arbitration backend that registers nothing and never delivers callbacks.
///
/// Used by `cloudfenced` for dry runs on hosts where no disk-arbitration
/// session is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDiskArbiter;

impl DiskArbiter for NullDiskArbiter {
    fn open(&self, _context: ArbiterContext, _callbacks: DiskCallbacks) -> Result<(), ArbiterError> {
        Ok(())
    }

    fn close(&self) {}
}

/// Pre-mount disk admission controller.
pub struct DiskBlocker {
    arbiter: Arc<dyn DiskArbiter>,
    stats: Mutex<DiskStats>,
    context: Mutex<Option<ArbiterContext>>,
}

impl DiskBlocker {
    /// Controller over the given arbitration backend. Nothing is registered
    /// until [`init`](Self::init).
    #[must_use]
    pub fn new(arbiter: Arc<dyn DiskArbiter>) -> Arc<Self> {
        Arc::new(Self {
            arbiter,
            stats: Mutex::new(DiskStats::default()),
            context: Mutex::new(None),
        })
    }

    /// Registers with the arbitration subsystem through the trampoline slot.
    pub fn init(self: &Arc<Self>) -> Result<(), ArbiterError> {
        let context = trampoline::arm(self)?;
        if let Err(err) = self.arbiter.open(context, trampoline::CALLBACKS) {
            trampoline::disarm(context);
            return Err(err);
        }
        *self.context.lock().unwrap_or_else(PoisonError::into_inner) = Some(context);
        info!("disk admission controller armed");
        Ok(())
    }

    /// Closes the session and releases the trampoline slot. Once this
    /// returns no callback can observe the controller. Idempotent.
    pub fn uninit(&self) {
        // Close first: the subsystem guarantees delivery has stopped before
        // close() returns, so the slot teardown cannot race a callback.
        self.arbiter.close();
        if let Some(context) = self
            .context
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            trampoline::disarm(context);
        }
        info!("disk admission controller disarmed");
    }

    /// Pre-mount admission decision: dissent for removable or ejectable
    /// media, allow for internal disks.
    pub fn probe(&self, disk: &DiskDescriptor) -> Option<Dissent> {
        let external = disk.is_external();
        if let Ok(mut stats) = self.stats.lock() {
            if external {
                stats.blocked += 1;
            } else {
                stats.allowed += 1;
            }
        }
        if external {
            info!(device = %disk.device, "refusing mount of external media");
            Some(Dissent::not_permitted(
                "external media mounts are blocked by policy",
            ))
        } else {
            debug!(device = %disk.device, "allowing internal disk mount");
            None
        }
    }

    /// Observational: a disk appeared.
    pub fn on_added(&self, disk: &DiskDescriptor) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.connected += 1;
        }
        debug!(device = %disk.device, "disk added");
    }

    /// Observational: a disk disappeared.
    pub fn on_removed(&self, disk: &DiskDescriptor) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.removed += 1;
        }
        debug!(device = %disk.device, "disk removed");
    }

    /// Observational: a disk was renamed.
    pub fn on_renamed(&self, disk: &DiskDescriptor, new_name: &str) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.renamed += 1;
        }
        debug!(device = %disk.device, new_name, "disk renamed");
    }

    /// Point-in-time copy of the lifecycle counters.
    #[must_use]
    pub fn print_stats(&self) -> DiskStats {
        self.stats
            .lock()
            .map(|stats| *stats)
            .unwrap_or_default()
    }
}

pub mod trampoline {
    //! Free-function callbacks for the C-style registration interface.
    //!
    //! `ACTIVE` is the single sanctioned process-wide reference: the
    //! arbitration subsystem hands back only the opaque context it was given
    //! at registration, and these functions resolve it to the live
    //! controller. A context that no longer matches (controller torn down)
    //! resolves to nothing and the callback is dropped, never a dangling
    //! decision.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError, Weak};

    use super::{Arc, ArbiterContext, ArbiterError, DiskBlocker, DiskCallbacks, DiskDescriptor,
        Dissent, warn};

    static ACTIVE: Mutex<Option<(ArbiterContext, Weak<DiskBlocker>)>> = Mutex::new(None);
    static NEXT_CONTEXT: AtomicUsize = AtomicUsize::new(1);

    /// Callback table registered with the arbitration session.
    pub const CALLBACKS: DiskCallbacks = DiskCallbacks {
        probe: probe_disk,
        added: disk_added,
        removed: disk_removed,
        renamed: disk_renamed,
    };

    /// Reserves the active slot for `blocker` and mints its context value.
    /// Only one controller can be active at a time.
    pub(super) fn arm(blocker: &Arc<DiskBlocker>) -> Result<ArbiterContext, ArbiterError> {
        let mut slot = ACTIVE.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((_, live)) = slot.as_ref() {
            if live.strong_count() > 0 {
                return Err(ArbiterError::SessionUnavailable {
                    reason: "another disk admission controller is active".to_string(),
                });
            }
        }
        let context = NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed);
        *slot = Some((context, Arc::downgrade(blocker)));
        Ok(context)
    }

    /// Clears the active slot if it still belongs to `context`.
    pub(super) fn disarm(context: ArbiterContext) {
        let mut slot = ACTIVE.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(slot.as_ref(), Some((active, _)) if *active == context) {
            *slot = None;
        }
    }

    /// Resolves a context value to the active controller.
    pub fn resolve(context: ArbiterContext) -> Option<Arc<DiskBlocker>> {
        let slot = ACTIVE.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some((active, blocker)) if *active == context => blocker.upgrade(),
            _ => None,
        }
    }

    fn probe_disk(context: ArbiterContext, disk: &DiskDescriptor) -> Option<Dissent> {
        match resolve(context) {
            Some(blocker) => blocker.probe(disk),
            None => {
                warn!(device = %disk.device, "probe with stale context, allowing");
                None
            }
        }
    }

    fn disk_added(context: ArbiterContext, disk: &DiskDescriptor) {
        if let Some(blocker) = resolve(context) {
            blocker.on_added(disk);
        }
    }

    fn disk_removed(context: ArbiterContext, disk: &DiskDescriptor) {
        if let Some(blocker) = resolve(context) {
            blocker.on_removed(disk);
        }
    }

    fn disk_renamed(context: ArbiterContext, disk: &DiskDescriptor, new_name: &str) {
        if let Some(blocker) = resolve(context) {
            blocker.on_renamed(disk, new_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn external_disk() -> DiskDescriptor {
        DiskDescriptor {
            device: "disk2s1".to_string(),
            name: Some("USB STICK".to_string()),
            removable: true,
            ejectable: true,
        }
    }

    fn internal_disk() -> DiskDescriptor {
        DiskDescriptor {
            device: "disk0s2".to_string(),
            name: Some("Macintosh HD".to_string()),
            removable: false,
            ejectable: false,
        }
    }

    #[test]
    fn probe_refuses_external_media_and_counts_only_blocked() {
        let blocker = DiskBlocker::new(Arc::new(NullDiskArbiter));
        let dissent = blocker.probe(&external_disk());
        assert!(dissent.is_some());
        let stats = blocker.print_stats();
        assert_eq!(stats.blocked, 1);
        assert_eq!(stats.allowed, 0);
        assert_eq!(stats.connected, 0);
    }

    #[test]
    fn probe_allows_internal_disks_and_counts_only_allowed() {
        let blocker = DiskBlocker::new(Arc::new(NullDiskArbiter));
        assert!(blocker.probe(&internal_disk()).is_none());
        let stats = blocker.print_stats();
        assert_eq!(stats.allowed, 1);
        assert_eq!(stats.blocked, 0);
    }

    #[test]
    fn lifecycle_hooks_touch_their_own_counters() {
        let blocker = DiskBlocker::new(Arc::new(NullDiskArbiter));
        let disk = external_disk();
        blocker.on_added(&disk);
        blocker.on_renamed(&disk, "BACKUP");
        blocker.on_removed(&disk);
        let stats = blocker.print_stats();
        assert_eq!(stats.connected, 1);
        assert_eq!(stats.renamed, 1);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.allowed + stats.blocked, 0);
    }
}
