//! Dropbox rules.
//!
//! Dropbox keeps a private cache under each sync root that its engine must
//! be able to rewrite even while the tree is otherwise fully blocked. Both
//! the write and the open decision honor that zone.

use std::collections::BTreeSet;
use std::path::PathBuf;

use super::{BlockLevel, Provider, ProviderKind};

/// Dropbox's private cache subfolder name, directly under each sync root.
pub const DROPBOX_CACHE_DIR: &str = ".dropbox.cache";

impl Provider {
    /// Dropbox provider over the given sync roots.
    #[must_use]
    pub fn dropbox(level: BlockLevel, paths: Vec<PathBuf>) -> Self {
        Self::with_rules(
            ProviderKind::Dropbox,
            level,
            paths,
            BTreeSet::new(),
            &[DROPBOX_CACHE_DIR],
        )
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::decision::{Decision, OpenFlags};
    use crate::event::AgentId;

    fn dropbox_full() -> Provider {
        Provider::dropbox(BlockLevel::Full, vec![PathBuf::from("/Users/u/Dropbox")])
    }

    #[test]
    fn cache_subfolder_stays_writable_under_full_block() {
        let provider = dropbox_full();
        let agent = AgentId::new("com.example.editor");
        let cached = Path::new("/Users/u/Dropbox/.dropbox.cache/tmp/chunk");
        assert_eq!(provider.decide_write(&agent, &[cached]), Decision::Allow);
    }

    #[test]
    fn cache_exemption_requires_every_path_in_the_zone() {
        let provider = dropbox_full();
        let agent = AgentId::new("com.example.editor");
        let cached = Path::new("/Users/u/Dropbox/.dropbox.cache/tmp/chunk");
        let doc = Path::new("/Users/u/Dropbox/doc.txt");
        assert_eq!(provider.decide_write(&agent, &[cached, doc]), Decision::Deny);
    }

    #[test]
    fn open_in_cache_zone_keeps_the_requested_mask() {
        let provider = dropbox_full();
        let agent = AgentId::new("com.example.editor");
        let cached = Path::new("/Users/u/Dropbox/.dropbox.cache/tmp/chunk");
        let requested = OpenFlags::READ | OpenFlags::WRITE | OpenFlags::CREATE;
        assert_eq!(
            provider.decide_open(&agent, &[cached], requested),
            Decision::OpenMask(requested)
        );
    }

    #[test]
    fn open_outside_cache_zone_is_stripped() {
        let provider = dropbox_full();
        let agent = AgentId::new("com.example.editor");
        let doc = Path::new("/Users/u/Dropbox/doc.txt");
        let requested = OpenFlags::READ | OpenFlags::WRITE;
        assert_eq!(
            provider.decide_open(&agent, &[doc], requested),
            Decision::OpenMask(OpenFlags::READ)
        );
    }
}
