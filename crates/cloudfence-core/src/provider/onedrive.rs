//! OneDrive rules: the base decision logic with no extra zones or agents.

use std::collections::BTreeSet;
use std::path::PathBuf;

use super::{BlockLevel, Provider, ProviderKind};

impl Provider {
    /// OneDrive provider over the given sync roots.
    #[must_use]
    pub fn onedrive(level: BlockLevel, paths: Vec<PathBuf>) -> Self {
        Self::with_rules(ProviderKind::OneDrive, level, paths, BTreeSet::new(), &[])
    }
}
