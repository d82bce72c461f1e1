//! Per-provider sync-root discovery.
//!
//! Each provider keeps its sync tree somewhere under the user's home
//! directory; `configure` asks a [`SyncRoots`] implementation for the roots
//! to watch. [`HomeSyncRoots`] matches each provider's install layout;
//! [`FixedRoots`] serves embedding and tests.

use std::collections::BTreeMap;
use std::path::PathBuf;

use cloudfence_core::ProviderKind;
use serde::Deserialize;
use thiserror::Error;

/// Sync-root lookup failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LookupError {
    /// The current user's home directory could not be resolved.
    #[error("no home directory for the current user")]
    HomeNotFound,

    /// The kind carries no sync-root lookup.
    #[error("provider {0} has no sync-root lookup")]
    Unsupported(ProviderKind),

    /// A provider metadata file could not be read.
    #[error("failed to read {path}")]
    InfoFile {
        /// The unreadable file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A provider metadata file could not be parsed.
    #[error("failed to parse {path}")]
    InfoFormat {
        /// The malformed file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Opaque per-provider lookup of on-disk sync roots.
pub trait SyncRoots: Send + Sync {
    /// Watched roots for one provider. An empty result means the provider is
    /// not present on this host.
    fn roots_for(&self, kind: ProviderKind) -> Result<Vec<PathBuf>, LookupError>;
}

/// Fixed roots per kind, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct FixedRoots {
    roots: BTreeMap<ProviderKind, Vec<PathBuf>>,
}

impl FixedRoots {
    /// Empty lookup; every kind resolves to no roots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the roots for one kind.
    #[must_use]
    pub fn with(mut self, kind: ProviderKind, roots: Vec<PathBuf>) -> Self {
        self.roots.insert(kind, roots);
        self
    }
}

impl SyncRoots for FixedRoots {
    fn roots_for(&self, kind: ProviderKind) -> Result<Vec<PathBuf>, LookupError> {
        Ok(self.roots.get(&kind).cloned().unwrap_or_default())
    }
}

/// One account entry in Dropbox's `info.json`.
#[derive(Debug, Deserialize)]
struct DropboxAccount {
    path: PathBuf,
}

/// Home-directory-based discovery matching each provider's install layout.
#[derive(Debug, Clone)]
pub struct HomeSyncRoots {
    home: PathBuf,
}

impl HomeSyncRoots {
    /// Discovery rooted at the given home directory.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Discovery rooted at the effective user's home directory.
    pub fn for_current_user() -> Result<Self, LookupError> {
        let user = nix::unistd::User::from_uid(nix::unistd::Uid::effective())
            .ok()
            .flatten()
            .ok_or(LookupError::HomeNotFound)?;
        Ok(Self::new(user.dir))
    }

    /// Dropbox publishes its sync roots (one per linked account) in
    /// `~/.dropbox/info.json`. A missing file means Dropbox is not set up.
    fn dropbox_roots(&self) -> Result<Vec<PathBuf>, LookupError> {
        let path = self.home.join(".dropbox").join("info.json");
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&path).map_err(|source| LookupError::InfoFile {
            path: path.clone(),
            source,
        })?;
        let accounts: BTreeMap<String, DropboxAccount> =
            serde_json::from_str(&raw).map_err(|source| LookupError::InfoFormat { path, source })?;
        Ok(accounts.into_values().map(|account| account.path).collect())
    }
}

impl SyncRoots for HomeSyncRoots {
    fn roots_for(&self, kind: ProviderKind) -> Result<Vec<PathBuf>, LookupError> {
        match kind {
            ProviderKind::ICloud => {
                Ok(vec![self.home.join("Library").join("Mobile Documents")])
            }
            ProviderKind::Dropbox => self.dropbox_roots(),
            ProviderKind::OneDrive => Ok(vec![self.home.join("OneDrive")]),
            ProviderKind::None => Err(LookupError::Unsupported(kind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icloud_root_is_under_library() {
        let roots = HomeSyncRoots::new("/Users/u");
        assert_eq!(
            roots.roots_for(ProviderKind::ICloud).unwrap(),
            vec![PathBuf::from("/Users/u/Library/Mobile Documents")]
        );
    }

    #[test]
    fn dropbox_roots_come_from_info_json() {
        let home = tempfile::tempdir().unwrap();
        let dropbox_dir = home.path().join(".dropbox");
        std::fs::create_dir_all(&dropbox_dir).unwrap();
        std::fs::write(
            dropbox_dir.join("info.json"),
            r#"{"personal": {"path": "/Users/u/Dropbox", "host": 42},
                "business": {"path": "/Users/u/Dropbox (Work)", "host": 43}}"#,
        )
        .unwrap();

        let roots = HomeSyncRoots::new(home.path());
        let mut found = roots.roots_for(ProviderKind::Dropbox).unwrap();
        found.sort();
        assert_eq!(
            found,
            vec![
                PathBuf::from("/Users/u/Dropbox"),
                PathBuf::from("/Users/u/Dropbox (Work)"),
            ]
        );
    }

    #[test]
    fn missing_info_json_means_no_dropbox() {
        let home = tempfile::tempdir().unwrap();
        let roots = HomeSyncRoots::new(home.path());
        assert!(roots.roots_for(ProviderKind::Dropbox).unwrap().is_empty());
    }

    #[test]
    fn malformed_info_json_is_an_error() {
        let home = tempfile::tempdir().unwrap();
        let dropbox_dir = home.path().join(".dropbox");
        std::fs::create_dir_all(&dropbox_dir).unwrap();
        std::fs::write(dropbox_dir.join("info.json"), "not json").unwrap();

        let roots = HomeSyncRoots::new(home.path());
        let err = roots.roots_for(ProviderKind::Dropbox).unwrap_err();
        assert!(matches!(err, LookupError::InfoFormat { .. }));
    }

    #[test]
    fn none_kind_has_no_lookup() {
        let roots = HomeSyncRoots::new("/Users/u");
        assert!(matches!(
            roots.roots_for(ProviderKind::None),
            Err(LookupError::Unsupported(ProviderKind::None))
        ));
    }
}
