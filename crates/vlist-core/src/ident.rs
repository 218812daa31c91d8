// SPDX-License-Identifier: Apache-2.0
//! Identity and version primitives.
use core::fmt;

/// Stable integer identity of a record.
///
/// Identities are assigned once by the host application and never reused;
/// the framework treats them as opaque. A dedicated wrapper prevents
/// accidental mixing of record identities with version numbers.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Returns the raw identity value.
    #[inline]
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic collection/history version.
///
/// A collection's version is the highest version reachable among its
/// records' history snapshots. `Version::ZERO` means clean: every record
/// holds exactly one snapshot tagged zero.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Version(pub u64);

impl Version {
    /// The clean version.
    pub const ZERO: Self = Self(0);

    /// Returns the next version in the timeline.
    #[inline]
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns `true` when this is the clean version.
    #[inline]
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_is_strictly_increasing() {
        let v = Version::ZERO;
        assert!(v.next() > v);
        assert_eq!(v.next().next(), Version(2));
    }

    #[test]
    fn display_forms() {
        assert_eq!(RecordId(7).to_string(), "#7");
        assert_eq!(Version(3).to_string(), "v3");
    }
}
