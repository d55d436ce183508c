//! Platform family and native version identification.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::symbols::{self, SymbolSource};

/// The platform families whose native version encodings are understood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    Glibc,
    FreeBsd,
    OpenBsd,
    NetBsd,
    MacOs,
    /// None of the identification symbols were defined.
    Other,
}

impl PlatformFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformFamily::Glibc => "glibc",
            PlatformFamily::FreeBsd => "FreeBSD",
            PlatformFamily::OpenBsd => "OpenBSD",
            PlatformFamily::NetBsd => "NetBSD",
            PlatformFamily::MacOs => "macOS",
            PlatformFamily::Other => "other",
        }
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The current platform version, in the family's own native encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "encoding", content = "value")]
pub enum VersionEncoding {
    /// `__GLIBC__` / `__GLIBC_MINOR__`.
    Glibc { major: u64, minor: u64 },
    /// `__FreeBSD_version`, formatted `MMmmXXX`.
    FreeBsd(u64),
    /// `OpenBSD`, formatted `YYYYMM` (release year and month).
    OpenBsd(u64),
    /// `__NetBSD_Version__`, formatted `MMmmrrpp00`.
    NetBsd(u64),
    /// `__MAC_OS_X_VERSION_MIN_REQUIRED`: `MMm0` up to 10.9, `MMmmpp` after.
    MacOs(u64),
    /// No version is known.
    Absent,
}

/// The identified target: a family plus whatever version it reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformIdentity {
    pub family: PlatformFamily,
    pub version: VersionEncoding,
}

impl PlatformIdentity {
    /// An identity that matches no family.
    pub const OTHER: PlatformIdentity = PlatformIdentity {
        family: PlatformFamily::Other,
        version: VersionEncoding::Absent,
    };

    pub fn is_family(&self, family: PlatformFamily) -> bool {
        self.family == family
    }
}

impl fmt::Display for PlatformIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            VersionEncoding::Glibc { major, minor } => write!(f, "{} {}.{}", self.family, major, minor),
            VersionEncoding::FreeBsd(v)
            | VersionEncoding::OpenBsd(v)
            | VersionEncoding::NetBsd(v)
            | VersionEncoding::MacOs(v) => write!(f, "{} {}", self.family, v),
            VersionEncoding::Absent => write!(f, "{} (version unknown)", self.family),
        }
    }
}

/// Identifies the target platform from its predefined symbols.
///
/// Families are tried in a fixed order and the first whose guard symbol is defined
/// wins. A recognised family with missing version symbols still identifies, with
/// [`VersionEncoding::Absent`], except on macOS where the deployment target is
/// mandatory.
pub fn identify<S: SymbolSource + ?Sized>(source: &S) -> Result<PlatformIdentity> {
    let identity = if source.is_defined(symbols::GLIBC) {
        let version = match (source.symbol(symbols::GLIBC), source.symbol(symbols::GLIBC_MINOR)) {
            (Some(major), Some(minor)) => VersionEncoding::Glibc { major, minor },
            _ => VersionEncoding::Absent,
        };
        PlatformIdentity {
            family: PlatformFamily::Glibc,
            version,
        }
    } else if source.is_defined(symbols::FREEBSD) {
        PlatformIdentity {
            family: PlatformFamily::FreeBsd,
            version: source
                .symbol(symbols::FREEBSD_VERSION)
                .map_or(VersionEncoding::Absent, VersionEncoding::FreeBsd),
        }
    } else if source.is_defined(symbols::OPENBSD) {
        PlatformIdentity {
            family: PlatformFamily::OpenBsd,
            version: source
                .symbol(symbols::OPENBSD_RELEASE)
                .map_or(VersionEncoding::Absent, VersionEncoding::OpenBsd),
        }
    } else if source.is_defined(symbols::NETBSD) {
        PlatformIdentity {
            family: PlatformFamily::NetBsd,
            version: source
                .symbol(symbols::NETBSD_VERSION)
                .map_or(VersionEncoding::Absent, VersionEncoding::NetBsd),
        }
    } else if source.is_defined(symbols::APPLE) && source.is_defined(symbols::MACH) {
        let min_required = source.symbol(symbols::MACOS_MIN_REQUIRED).ok_or(
            ConfigError::MissingSymbol {
                family: PlatformFamily::MacOs,
                symbol: symbols::MACOS_MIN_REQUIRED,
            },
        )?;
        PlatformIdentity {
            family: PlatformFamily::MacOs,
            version: VersionEncoding::MacOs(min_required),
        }
    } else {
        PlatformIdentity::OTHER
    };

    debug!(family = %identity.family, version = ?identity.version, "identified platform");
    Ok(identity)
}
