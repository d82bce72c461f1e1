//! Policy model for the cloudfence data-loss-prevention daemon.
//!
//! This crate holds the pure, I/O-free half of the daemon: provider
//! descriptions, block levels, the event model delivered on the kernel
//! channel, authorization decisions, and the immutable configuration
//! snapshot the engine swaps wholesale on policy updates.
//!
//! # Modules
//!
//! - [`provider`]: per-provider policy ([`Provider`], [`ProviderKind`],
//!   [`BlockLevel`]) and the decision methods
//! - [`event`]: event kinds, AUTH/NOTIFY response classes, payloads
//! - [`decision`]: the [`Decision`] tagged union and open-flag masks
//! - [`config`]: the [`Configuration`] snapshot and policy validation

pub mod config;
pub mod decision;
pub mod event;
pub mod provider;

pub use config::{ConfigError, Configuration, EventMatch, PolicyMap};
pub use decision::{Decision, OpenFlags};
pub use event::{AgentId, Event, EventClass, EventKind, EventPayload, OpClass};
pub use provider::{BlockLevel, Provider, ProviderKind};
