//! Per-family "is at least version V" predicates.
//!
//! Every predicate is defined for every platform: on a different family, or when
//! the version is unknown, it is simply `false`. Callers can therefore combine
//! them freely without first checking which family they are on.
//!
//! Thresholds are encoded with the same formula the platform uses for its own
//! version symbol so that comparisons are plain integer comparisons.

use tracing::trace;

use crate::identity::{PlatformFamily, PlatformIdentity, VersionEncoding};

/// Last `__MAC_OS_X_VERSION_MIN_REQUIRED` value in the old `MMm0` format (10.9).
pub const MACOS_LAST_SHORT_FORMAT: u64 = 1090;

/// `(major << 16) + minor`, the encoding behind `__GLIBC_PREREQ`.
pub fn encode_glibc(major: u64, minor: u64) -> u64 {
    major.saturating_mul(1 << 16).saturating_add(minor)
}

/// `major*100000 + minor*1000`. The `XXX` tail of `__FreeBSD_version` is not represented.
pub fn encode_freebsd(major: u64, minor: u64) -> u64 {
    major
        .saturating_mul(100_000)
        .saturating_add(minor.saturating_mul(1_000))
}

/// `major*100000000 + minor*1000000`. The `rrpp00` tail of `__NetBSD_Version__` is not represented.
pub fn encode_netbsd(major: u64, minor: u64) -> u64 {
    major
        .saturating_mul(100_000_000)
        .saturating_add(minor.saturating_mul(1_000_000))
}

/// Encodes `major.minor` in whichever format `current` itself uses.
///
/// Up to 10.9 the minimum-required macro was `MMm0`; from 10.10 it is `MMmmpp`.
pub fn encode_macos(current: u64, major: u64, minor: u64) -> u64 {
    if current <= MACOS_LAST_SHORT_FORMAT {
        major
            .saturating_mul(100)
            .saturating_add(minor.saturating_mul(10))
    } else {
        major
            .saturating_mul(10_000)
            .saturating_add(minor.saturating_mul(100))
    }
}

impl PlatformIdentity {
    /// True if this is glibc `major.minor` or later.
    pub fn glibc_prereq(&self, major: u64, minor: u64) -> bool {
        let result = match (self.family, self.version) {
            (
                PlatformFamily::Glibc,
                VersionEncoding::Glibc {
                    major: cur_major,
                    minor: cur_minor,
                },
            ) => encode_glibc(cur_major, cur_minor) >= encode_glibc(major, minor),
            _ => false,
        };
        trace!(major, minor, result, "glibc prereq");
        result
    }

    /// True if this is FreeBSD `major.minor` or later.
    pub fn freebsd_prereq(&self, major: u64, minor: u64) -> bool {
        let result = match (self.family, self.version) {
            (PlatformFamily::FreeBsd, VersionEncoding::FreeBsd(current)) => {
                current >= encode_freebsd(major, minor)
            }
            _ => false,
        };
        trace!(major, minor, result, "FreeBSD prereq");
        result
    }

    /// True if this OpenBSD release is dated `yyyymm` or later.
    pub fn openbsd_prereq(&self, yyyymm: u64) -> bool {
        let result = match (self.family, self.version) {
            (PlatformFamily::OpenBsd, VersionEncoding::OpenBsd(current)) => current >= yyyymm,
            _ => false,
        };
        trace!(yyyymm, result, "OpenBSD prereq");
        result
    }

    /// True if this is NetBSD `major.minor` or later.
    pub fn netbsd_prereq(&self, major: u64, minor: u64) -> bool {
        let result = match (self.family, self.version) {
            (PlatformFamily::NetBsd, VersionEncoding::NetBsd(current)) => {
                current >= encode_netbsd(major, minor)
            }
            _ => false,
        };
        trace!(major, minor, result, "NetBSD prereq");
        result
    }

    /// True if the macOS deployment target is `major.minor` or later.
    pub fn macos_prereq(&self, major: u64, minor: u64) -> bool {
        let result = match (self.family, self.version) {
            (PlatformFamily::MacOs, VersionEncoding::MacOs(current)) => {
                current >= encode_macos(current, major, minor)
            }
            _ => false,
        };
        trace!(major, minor, result, "macOS prereq");
        result
    }
}
