//! iCloud Drive rules.

use std::collections::BTreeSet;
use std::path::PathBuf;

use super::{BlockLevel, Provider, ProviderKind};
use crate::event::AgentId;

/// Bundle identifier of the iCloud sync agent (`bird`), exempt by default so
/// the provider's own housekeeping keeps working under a block.
pub const ICLOUD_SYNC_AGENT: &str = "com.apple.bird";

impl Provider {
    /// iCloud provider over the given sync roots.
    #[must_use]
    pub fn icloud(level: BlockLevel, paths: Vec<PathBuf>) -> Self {
        Self::with_rules(
            ProviderKind::ICloud,
            level,
            paths,
            BTreeSet::from([AgentId::new(ICLOUD_SYNC_AGENT)]),
            &[],
        )
    }
}
