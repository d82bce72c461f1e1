//! Daemon facade: one lifecycle over the authorization engine and the disk
//! admission controller.
//!
//! The invariant the facade exists for: the daemon is never half-armed. If
//! either subsystem fails to initialize, the other is torn down before the
//! failure is returned, and teardown guarantees no further callback from
//! either subsystem fires.

use std::sync::Arc;

use cloudfence_core::{ConfigError, PolicyMap};
use thiserror::Error;
use tracing::info;

use crate::channel::{ChannelError, EventChannel};
use crate::disk::{ArbiterError, DiskArbiter, DiskBlocker};
use crate::engine::CloudBlocker;
use crate::roots::SyncRoots;

/// Startup failure. Both subsystems are torn down before this is returned.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InitError {
    /// The kernel event channel could not be acquired.
    #[error("event channel init failed: {0}")]
    Channel(#[from] ChannelError),

    /// The disk-arbitration session could not be acquired.
    #[error("disk arbitration init failed: {0}")]
    DiskArbitration(#[from] ArbiterError),
}

/// The composed daemon.
pub struct Daemon {
    engine: Arc<CloudBlocker>,
    disks: Arc<DiskBlocker>,
    roots: Box<dyn SyncRoots>,
}

impl Daemon {
    /// Composes the two subsystems over their platform backends. Nothing is
    /// armed until [`init`](Self::init).
    #[must_use]
    pub fn new(
        channel: Arc<dyn EventChannel>,
        arbiter: Arc<dyn DiskArbiter>,
        roots: Box<dyn SyncRoots>,
    ) -> Self {
        Self {
            engine: Arc::new(CloudBlocker::new(channel)),
            disks: DiskBlocker::new(arbiter),
            roots,
        }
    }

    /// Arms both subsystems, or neither.
    pub fn init(&self) -> Result<(), InitError> {
        self.engine.init()?;
        if let Err(err) = self.disks.init() {
            self.engine.uninit();
            return Err(err.into());
        }
        info!("daemon armed");
        Ok(())
    }

    /// Tears down both subsystems; order-independent and safe after a failed
    /// or partial init. No callback from either subsystem fires after this
    /// returns.
    pub fn uninit(&self) {
        self.disks.uninit();
        self.engine.uninit();
        info!("daemon disarmed");
    }

    /// Installs a new policy through the engine.
    pub fn configure(&self, policy: &PolicyMap) -> Result<(), ConfigError> {
        self.engine.configure(policy, self.roots.as_ref())
    }

    /// Snapshot report across both subsystems.
    #[must_use]
    pub fn print_stats(&self) -> String {
        let report = format!("{}{}", self.engine.print_stats(), self.disks.print_stats());
        info!("{report}");
        report
    }

    /// The authorization engine, for event delivery.
    #[must_use]
    pub fn engine(&self) -> &Arc<CloudBlocker> {
        &self.engine
    }

    /// The disk admission controller.
    #[must_use]
    pub fn disks(&self) -> &Arc<DiskBlocker> {
        &self.disks
    }
}
