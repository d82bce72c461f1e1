//! The live configuration snapshot and policy validation.
//!
//! A [`Configuration`] maps each provider kind to at most one [`Provider`]
//! and is immutable: the engine swaps whole `Arc<Configuration>` snapshots,
//! so a decision in flight always observes one fully formed mapping, never a
//! partial update.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use crate::provider::{BlockLevel, Provider, ProviderKind};

/// Requested policy: block level per provider kind.
///
/// This is the shape `configure` accepts at the daemon boundary; sync roots
/// are discovered per provider when the configuration is built.
pub type PolicyMap = BTreeMap<ProviderKind, BlockLevel>;

/// Rejection of a policy update at the `configure` boundary.
///
/// The live configuration is left untouched whenever one of these is
/// returned.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// `ProviderKind::None` cannot carry a policy entry.
    #[error("provider kind 'none' cannot be configured")]
    UnconfigurableKind,

    /// The same provider kind appeared more than once.
    #[error("provider {kind} configured more than once")]
    DuplicateKind {
        /// The repeated kind.
        kind: ProviderKind,
    },

    /// A provider was constructed with no watched paths.
    #[error("provider {kind} has no watched paths")]
    NoWatchedPaths {
        /// The affected kind.
        kind: ProviderKind,
    },

    /// Sync-root discovery failed for a provider.
    #[error("sync-root lookup failed for provider {kind}: {reason}")]
    RootLookup {
        /// The affected kind.
        kind: ProviderKind,
        /// Lookup failure description.
        reason: String,
    },
}

/// A provider matched against one event's paths.
///
/// Transient: constructed per event, never stored.
#[derive(Debug)]
pub struct EventMatch<'c, 'e> {
    /// The provider whose watched prefixes matched.
    pub provider: &'c Provider,
    /// The event paths under those prefixes, in event order.
    pub paths: Vec<&'e Path>,
}

/// Immutable mapping from provider kind to provider.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    providers: BTreeMap<ProviderKind, Provider>,
}

impl Configuration {
    /// The empty configuration installed at daemon start.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a snapshot from fully constructed providers.
    ///
    /// Rejects `ProviderKind::None`, duplicate kinds, and providers without
    /// watched paths.
    pub fn from_providers(
        providers: impl IntoIterator<Item = Provider>,
    ) -> Result<Self, ConfigError> {
        let mut map = BTreeMap::new();
        for provider in providers {
            let kind = provider.kind();
            if kind == ProviderKind::None {
                return Err(ConfigError::UnconfigurableKind);
            }
            if provider.watched_paths().is_empty() {
                return Err(ConfigError::NoWatchedPaths { kind });
            }
            if map.insert(kind, provider).is_some() {
                return Err(ConfigError::DuplicateKind { kind });
            }
        }
        Ok(Self { providers: map })
    }

    /// Shape check for an incoming policy mapping, before any sync-root
    /// lookup work.
    pub fn validate_policy(policy: &PolicyMap) -> Result<(), ConfigError> {
        if policy.contains_key(&ProviderKind::None) {
            return Err(ConfigError::UnconfigurableKind);
        }
        Ok(())
    }

    /// The provider configured for `kind`, if any.
    #[must_use]
    pub fn get(&self, kind: ProviderKind) -> Option<&Provider> {
        self.providers.get(&kind)
    }

    /// Number of configured providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Configured providers in kind order.
    pub fn providers(&self) -> impl Iterator<Item = &Provider> {
        self.providers.values()
    }

    /// Resolves the event paths to the first provider, in the fixed
    /// resolution order, whose watched prefixes match at least one path.
    ///
    /// At most one provider is selected even when watched trees overlap.
    /// `None` means no configured region is touched and the default policy
    /// (allow) applies.
    #[must_use]
    pub fn resolve<'c, 'e>(&'c self, event_paths: &[&'e Path]) -> Option<EventMatch<'c, 'e>> {
        for kind in ProviderKind::RESOLUTION_ORDER {
            if let Some(provider) = self.providers.get(&kind) {
                let paths = provider.matching_paths(event_paths);
                if !paths.is_empty() {
                    return Some(EventMatch { provider, paths });
                }
            }
        }
        None
    }
}
