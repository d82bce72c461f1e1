//! Authorization decisions and the open-request flag mask.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Open-request flags as delivered on the kernel event channel.
    ///
    /// The values follow the BSD `fflags` layout used by the event source;
    /// only the bits the policy cares about are named.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        /// Read access requested.
        const READ = 0x0000_0001;
        /// Write access requested.
        const WRITE = 0x0000_0002;
        /// Writes append to the end of the file.
        const APPEND = 0x0000_0008;
        /// Create the file if it does not exist.
        const CREATE = 0x0000_0200;
        /// Truncate the file to zero length.
        const TRUNCATE = 0x0000_0400;
        /// Exclusive create: fail if the file already exists.
        const EXCLUSIVE = 0x0000_0800;
    }
}

impl OpenFlags {
    /// Every bit that grants or implies mutation of the target.
    pub const WRITE_CLASS: Self = Self::WRITE
        .union(Self::APPEND)
        .union(Self::CREATE)
        .union(Self::TRUNCATE)
        .union(Self::EXCLUSIVE);

    /// Returns `true` if any write-class bit is set.
    #[must_use]
    pub const fn requests_write(self) -> bool {
        self.intersects(Self::WRITE_CLASS)
    }

    /// Returns the mask with every write-class bit cleared.
    #[must_use]
    pub const fn read_only(self) -> Self {
        self.difference(Self::WRITE_CLASS)
    }
}

/// Terminal outcome of one authorization decision.
///
/// `OpenMask` carries the granted flag set for open requests. The unit of
/// grant there is a bitmask, not a boolean: a combined read+write request
/// under a read-only block keeps its read bits and loses its write bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The operation proceeds unrestricted.
    Allow,
    /// The operation is refused.
    Deny,
    /// The open request proceeds with exactly these flags granted.
    OpenMask(OpenFlags),
}

impl Decision {
    /// Returns `true` when the decision restricts nothing the caller asked
    /// for, given the flags originally requested.
    #[must_use]
    pub fn grants_all_of(&self, requested: OpenFlags) -> bool {
        match self {
            Self::Allow => true,
            Self::Deny => false,
            Self::OpenMask(granted) => granted.contains(requested),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Deny => write!(f, "deny"),
            Self::OpenMask(flags) => write!(f, "open-mask({:#x})", flags.bits()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_strips_every_write_class_bit() {
        let requested = OpenFlags::READ | OpenFlags::WRITE | OpenFlags::APPEND | OpenFlags::CREATE;
        let granted = requested.read_only();
        assert_eq!(granted, OpenFlags::READ);
        assert!(!granted.requests_write());
    }

    #[test]
    fn read_only_mask_is_identity_for_pure_reads() {
        let requested = OpenFlags::READ;
        assert_eq!(requested.read_only(), requested);
    }

    #[test]
    fn grants_all_of_reflects_mask_containment() {
        let requested = OpenFlags::READ | OpenFlags::WRITE;
        assert!(Decision::Allow.grants_all_of(requested));
        assert!(!Decision::Deny.grants_all_of(requested));
        assert!(!Decision::OpenMask(OpenFlags::READ).grants_all_of(requested));
        assert!(Decision::OpenMask(requested).grants_all_of(requested));
    }
}
