//! Kernel event model: kinds, response classes, and payloads.
//!
//! The daemon subscribes to a fixed whitelist of filesystem event kinds.
//! Each kind carries two static classifications:
//!
//! - [`EventClass`]: whether the kernel expects exactly one response before
//!   its deadline (AUTH) or none at all (NOTIFY)
//! - [`OpClass`]: which provider decision method applies (read, write, open,
//!   or observe-only)

use std::fmt;
use std::path::{Path, PathBuf};

use crate::decision::OpenFlags;

/// Response protocol class of an event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    /// Requires exactly one allow/deny/flags response before the deadline.
    Auth,
    /// Observational; no response is required or permitted.
    Notify,
}

/// Operation family an event kind belongs to, for decision dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    /// Directory listing, link resolution, access checks.
    Read,
    /// Mutation of file content or namespace.
    Write,
    /// Open request; the grant is a flag mask.
    Open,
    /// No read/write policy applies; always acknowledged.
    Observe,
}

/// Filesystem event kinds of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    Clone,
    Create,
    FileProviderMaterialize,
    FileProviderUpdate,
    Link,
    Mount,
    Open,
    Readdir,
    Readlink,
    Rename,
    Truncate,
    Unlink,
    Access,
    Close,
    ExchangeData,
    Unmount,
    Write,
}

impl EventKind {
    /// Every kind the daemon subscribes to, AUTH kinds first.
    pub const ALL: [Self; 17] = [
        Self::Clone,
        Self::Create,
        Self::FileProviderMaterialize,
        Self::FileProviderUpdate,
        Self::Link,
        Self::Mount,
        Self::Open,
        Self::Readdir,
        Self::Readlink,
        Self::Rename,
        Self::Truncate,
        Self::Unlink,
        Self::Access,
        Self::Close,
        Self::ExchangeData,
        Self::Unmount,
        Self::Write,
    ];

    /// Response protocol class for this kind.
    #[must_use]
    pub const fn class(self) -> EventClass {
        match self {
            Self::Clone
            | Self::Create
            | Self::FileProviderMaterialize
            | Self::FileProviderUpdate
            | Self::Link
            | Self::Mount
            | Self::Open
            | Self::Readdir
            | Self::Readlink
            | Self::Rename
            | Self::Truncate
            | Self::Unlink => EventClass::Auth,
            Self::Access | Self::Close | Self::ExchangeData | Self::Unmount | Self::Write => {
                EventClass::Notify
            }
        }
    }

    /// Decision-dispatch family for this kind.
    #[must_use]
    pub const fn op_class(self) -> OpClass {
        match self {
            Self::Readdir | Self::Readlink | Self::Access => OpClass::Read,
            Self::Clone
            | Self::Create
            | Self::FileProviderMaterialize
            | Self::FileProviderUpdate
            | Self::Link
            | Self::Rename
            | Self::Truncate
            | Self::Unlink
            | Self::ExchangeData
            | Self::Write => OpClass::Write,
            Self::Open => OpClass::Open,
            Self::Mount | Self::Close | Self::Unmount => OpClass::Observe,
        }
    }

    /// Stable lower-case name, used in reports and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Clone => "clone",
            Self::Create => "create",
            Self::FileProviderMaterialize => "file-provider-materialize",
            Self::FileProviderUpdate => "file-provider-update",
            Self::Link => "link",
            Self::Mount => "mount",
            Self::Open => "open",
            Self::Readdir => "readdir",
            Self::Readlink => "readlink",
            Self::Rename => "rename",
            Self::Truncate => "truncate",
            Self::Unlink => "unlink",
            Self::Access => "access",
            Self::Close => "close",
            Self::ExchangeData => "exchange-data",
            Self::Unmount => "unmount",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bundle identifier of the process that triggered an event.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentId(String);

impl AgentId {
    /// Wraps a bundle identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operation payload of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    /// The path or paths the operation targets.
    Paths(Vec<PathBuf>),
    /// Rename with source and destination paths.
    Rename {
        /// Path being renamed.
        source: PathBuf,
        /// Destination path, including an existing file being replaced.
        destination: PathBuf,
    },
    /// Open request with the flag set the caller asked for.
    Open {
        /// Path being opened.
        path: PathBuf,
        /// Requested open flags.
        flags: OpenFlags,
    },
    /// The payload could not be copied from the kernel channel.
    Unreadable,
}

/// One event delivered from the kernel channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event kind tag.
    pub kind: EventKind,
    /// Per-kind sequence number assigned by the event source.
    pub seq: u64,
    /// Identity of the requesting process.
    pub agent: AgentId,
    /// Operation payload; [`EventPayload::Unreadable`] when the copy failed.
    pub payload: EventPayload,
}

impl Event {
    /// All paths the payload references, source before destination.
    ///
    /// Empty for unreadable payloads.
    #[must_use]
    pub fn paths(&self) -> Vec<&Path> {
        match &self.payload {
            EventPayload::Paths(paths) => paths.iter().map(PathBuf::as_path).collect(),
            EventPayload::Rename {
                source,
                destination,
            } => vec![source.as_path(), destination.as_path()],
            EventPayload::Open { path, .. } => vec![path.as_path()],
            EventPayload::Unreadable => Vec::new(),
        }
    }

    /// Requested flags, when the payload is an open request.
    #[must_use]
    pub fn open_flags(&self) -> Option<OpenFlags> {
        match &self.payload {
            EventPayload::Open { flags, .. } => Some(*flags),
            _ => None,
        }
    }
}
