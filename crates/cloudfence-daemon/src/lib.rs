//! The cloudfence daemon: filesystem-event authorization and disk admission.
//!
//! Two independent subsystems compose into one daemon lifecycle:
//!
//! - [`engine::CloudBlocker`]: resolves kernel filesystem events to a
//!   configured cloud provider and answers every AUTH-class event with
//!   exactly one decision, under the platform's response deadline
//! - [`disk::DiskBlocker`]: decides, at the pre-mount probe, whether a
//!   newly attached disk may mount at all
//!
//! The [`daemon::Daemon`] facade arms both subsystems or neither, and tears
//! both down such that no callback observes a destroyed controller.
//!
//! Platform specifics (the kernel event channel, the disk-arbitration
//! session) stay behind the [`channel::EventChannel`] and
//! [`disk::DiskArbiter`] traits.

pub mod channel;
pub mod daemon;
pub mod disk;
pub mod engine;
pub mod roots;
pub mod stats;

pub use channel::EventChannel;
pub use daemon::{Daemon, InitError};
pub use disk::{DiskArbiter, DiskBlocker, DiskDescriptor, DiskStats, Dissent};
pub use engine::CloudBlocker;
pub use roots::SyncRoots;
