//! Cloud-provider policy: watched trees, exemptions, and decision rules.
//!
//! A [`Provider`] is immutable once constructed. Policy changes replace the
//! whole instance through a new [`crate::Configuration`] snapshot; nothing
//! mutates a live provider in place.
//!
//! Per-kind rule differences (default-exempt agents, always-writable cache
//! subfolders) are data carried by the per-kind constructors in the
//! [`icloud`], [`dropbox`], and [`onedrive`] modules, not subtypes.

mod dropbox;
mod icloud;
mod onedrive;

pub use dropbox::DROPBOX_CACHE_DIR;
pub use icloud::ICLOUD_SYNC_AGENT;

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::decision::{Decision, OpenFlags};
use crate::event::AgentId;

/// Identifies which provider's decision rules apply.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// No provider; not configurable.
    None,
    /// Apple iCloud Drive.
    ICloud,
    /// Dropbox.
    Dropbox,
    /// Microsoft OneDrive.
    OneDrive,
}

impl ProviderKind {
    /// Fixed provider-resolution order; the first non-empty path match wins
    /// even when watched trees overlap.
    pub const RESOLUTION_ORDER: [Self; 3] = [Self::ICloud, Self::Dropbox, Self::OneDrive];

    /// Stable lower-case name, used in reports and policy files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ICloud => "icloud",
            Self::Dropbox => "dropbox",
            Self::OneDrive => "onedrive",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Restrictiveness tier applied to a provider's watched paths.
///
/// Ordered by what is denied: `None < ReadOnly < Full`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BlockLevel {
    /// Nothing is denied.
    #[default]
    None,
    /// Writes are denied; reads proceed.
    ReadOnly,
    /// Reads and writes are denied.
    Full,
}

impl fmt::Display for BlockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::ReadOnly => "readonly",
            Self::Full => "full",
        };
        f.write_str(name)
    }
}

/// One provider's live policy: kind, block level, watched path prefixes, and
/// exempt agent identities.
#[derive(Debug, Clone)]
pub struct Provider {
    kind: ProviderKind,
    level: BlockLevel,
    paths: Vec<PathBuf>,
    allowed_agents: BTreeSet<AgentId>,
    /// Subfolder names under a watched root the provider's own engine must
    /// keep rewriting at any block level.
    cache_dirs: &'static [&'static str],
}

impl Provider {
    pub(crate) fn with_rules(
        kind: ProviderKind,
        level: BlockLevel,
        paths: Vec<PathBuf>,
        allowed_agents: BTreeSet<AgentId>,
        cache_dirs: &'static [&'static str],
    ) -> Self {
        Self {
            kind,
            level,
            paths,
            allowed_agents,
            cache_dirs,
        }
    }

    /// Builds the provider for `kind` over the given sync roots.
    ///
    /// Returns `None` for [`ProviderKind::None`], which carries no rules.
    #[must_use]
    pub fn build(kind: ProviderKind, level: BlockLevel, paths: Vec<PathBuf>) -> Option<Self> {
        match kind {
            ProviderKind::None => None,
            ProviderKind::ICloud => Some(Self::icloud(level, paths)),
            ProviderKind::Dropbox => Some(Self::dropbox(level, paths)),
            ProviderKind::OneDrive => Some(Self::onedrive(level, paths)),
        }
    }

    /// Which provider's rules these are.
    #[must_use]
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Configured restrictiveness tier.
    #[must_use]
    pub fn level(&self) -> BlockLevel {
        self.level
    }

    /// Watched filesystem path prefixes, in configured order.
    #[must_use]
    pub fn watched_paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Returns `true` iff `agent` is in this provider's exemption set.
    ///
    /// Exempt identities (the provider's own sync daemon) are never blocked;
    /// blocking them breaks the provider's housekeeping.
    #[must_use]
    pub fn is_agent_allowed(&self, agent: &AgentId) -> bool {
        self.allowed_agents.contains(agent)
    }

    /// Subset of `event_paths` that lie under any watched prefix, in event
    /// order. Containment is component-wise, not substring: `/a/bc` is not
    /// under `/a/b`.
    ///
    /// Empty means this provider does not apply to the event.
    #[must_use]
    pub fn matching_paths<'e>(&self, event_paths: &[&'e Path]) -> Vec<&'e Path> {
        event_paths
            .iter()
            .copied()
            .filter(|p| self.paths.iter().any(|root| p.starts_with(root)))
            .collect()
    }

    /// Decision for read-class operations (readdir, readlink, access).
    ///
    /// Reads proceed at [`BlockLevel::ReadOnly`]; [`BlockLevel::Full`]
    /// denies them for non-exempt identities.
    #[must_use]
    pub fn decide_read(&self, agent: &AgentId) -> Decision {
        if self.level == BlockLevel::Full && !self.is_agent_allowed(agent) {
            Decision::Deny
        } else {
            Decision::Allow
        }
    }

    /// Decision for write-class operations over the matched paths.
    ///
    /// Denied at [`BlockLevel::ReadOnly`] and above unless the identity is
    /// exempt or every matched path falls inside an always-writable cache
    /// subfolder.
    #[must_use]
    pub fn decide_write(&self, agent: &AgentId, matched: &[&Path]) -> Decision {
        if self.level < BlockLevel::ReadOnly {
            return Decision::Allow;
        }
        if self.is_agent_allowed(agent) {
            return Decision::Allow;
        }
        if self.all_in_cache_zone(matched) {
            return Decision::Allow;
        }
        Decision::Deny
    }

    /// Flag-mask decision for open requests over the matched paths.
    ///
    /// Write-class bits are stripped at [`BlockLevel::ReadOnly`] and above
    /// for non-exempt identities outside the cache zone; otherwise the
    /// requested mask is returned unchanged.
    #[must_use]
    pub fn decide_open(&self, agent: &AgentId, matched: &[&Path], requested: OpenFlags) -> Decision {
        let restricted = self.level >= BlockLevel::ReadOnly
            && !self.is_agent_allowed(agent)
            && !self.all_in_cache_zone(matched);
        if restricted {
            Decision::OpenMask(requested.read_only())
        } else {
            Decision::OpenMask(requested)
        }
    }

    /// True iff `matched` is non-empty and every path sits inside a cache
    /// subfolder of a watched root.
    fn all_in_cache_zone(&self, matched: &[&Path]) -> bool {
        !matched.is_empty() && matched.iter().all(|p| self.in_cache_zone(p))
    }

    fn in_cache_zone(&self, path: &Path) -> bool {
        self.cache_dirs.iter().any(|dir| {
            self.paths
                .iter()
                .any(|root| path.starts_with(root.join(dir)))
        })
    }
}
