//! Protocol versioning
//!
//! Every message envelope carries the sender's version. Compatibility is
//! major-version equality: minor and patch skew is tolerated in both
//! directions, so an older client can talk to a newer server and vice versa
//! within one major line. [`crate::codec::validate_version`] enforces this
//! on receive.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

/// The version this build speaks
pub const CURRENT_VERSION: ProtocolVersion = ProtocolVersion {
    major: 1,
    minor: 0,
    patch: 0,
};

impl ProtocolVersion {
    /// Whether the two versions can exchange messages
    pub fn is_compatible_with(&self, other: &ProtocolVersion) -> bool {
        self.major == other.major
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(major: u8, minor: u8) -> ProtocolVersion {
        ProtocolVersion {
            major,
            minor,
            patch: 0,
        }
    }

    #[test]
    fn test_minor_skew_is_compatible_both_ways() {
        assert!(version(1, 0).is_compatible_with(&version(1, 1)));
        assert!(version(1, 1).is_compatible_with(&version(1, 0)));
    }

    #[test]
    fn test_major_mismatch_is_incompatible() {
        assert!(!version(2, 0).is_compatible_with(&version(1, 0)));
    }
}
