//! Feature flags derived from platform versions.
//!
//! [`RULES`] is the single place where a facility is tied to the platform versions
//! that introduced it. Adding a flag means adding a [`FeatureName`] variant and a
//! row to the table.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use tracing::{trace, warn};

use crate::error::Result;
use crate::identity::{identify, PlatformFamily, PlatformIdentity};
use crate::symbols::SymbolSource;

/// Names of the derived feature flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureName {
    /// `futimes(3)`: set file timestamps through a descriptor.
    HaveFutimes,
    /// `inotify(7)`: filesystem change notification.
    HaveInotify,
}

impl FeatureName {
    pub const ALL: [FeatureName; 2] = [FeatureName::HaveFutimes, FeatureName::HaveInotify];

    /// The configuration macro name, e.g. `HAVE_FUTIMES`.
    pub fn macro_name(&self) -> &'static str {
        match self {
            FeatureName::HaveFutimes => "HAVE_FUTIMES",
            FeatureName::HaveInotify => "HAVE_INOTIFY",
        }
    }

    /// The `--cfg` name used for Rust conditional compilation, e.g. `have_futimes`.
    pub fn cfg_name(&self) -> &'static str {
        match self {
            FeatureName::HaveFutimes => "have_futimes",
            FeatureName::HaveInotify => "have_inotify",
        }
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.macro_name())
    }
}

impl FromStr for FeatureName {
    type Err = String;

    /// Accepts either the macro or the cfg spelling, case-insensitively.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        FeatureName::ALL
            .into_iter()
            .find(|name| s.eq_ignore_ascii_case(name.macro_name()))
            .ok_or_else(|| format!("Unknown feature: {}", s))
    }
}

impl Serialize for FeatureName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.macro_name())
    }
}

/// One row of the rule table.
pub struct FeatureRule {
    pub name: FeatureName,
    pub description: &'static str,
    pub available: fn(&PlatformIdentity) -> bool,
}

impl fmt::Debug for FeatureRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureRule")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

pub static RULES: &[FeatureRule] = &[
    FeatureRule {
        name: FeatureName::HaveFutimes,
        // OpenBSD has had it since 1.2, but the OpenBSD macro only exists from 2.0 (199610).
        description: "futimes(3): glibc 2.3, FreeBSD 3.0, OpenBSD 2.0, NetBSD 1.2, every macOS",
        available: have_futimes,
    },
    FeatureRule {
        name: FeatureName::HaveInotify,
        description: "inotify(7): glibc 2.4",
        available: have_inotify,
    },
];

fn have_futimes(p: &PlatformIdentity) -> bool {
    p.glibc_prereq(2, 3)
        || p.freebsd_prereq(3, 0)
        || p.openbsd_prereq(199610)
        || p.netbsd_prereq(1, 2)
        || p.is_family(PlatformFamily::MacOs)
}

fn have_inotify(p: &PlatformIdentity) -> bool {
    p.glibc_prereq(2, 4)
}

/// The value of every feature flag for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureSet {
    flags: BTreeMap<FeatureName, bool>,
}

impl FeatureSet {
    /// Every flag set to `false`.
    pub fn none() -> Self {
        Self {
            flags: FeatureName::ALL.into_iter().map(|name| (name, false)).collect(),
        }
    }

    pub fn get(&self, name: FeatureName) -> bool {
        self.flags.get(&name).copied().unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureName, bool)> + '_ {
        self.flags.iter().map(|(name, value)| (*name, *value))
    }

    pub fn enabled(&self) -> impl Iterator<Item = FeatureName> + '_ {
        self.iter().filter(|(_, value)| *value).map(|(name, _)| name)
    }
}

/// Evaluates every rule against an identified platform.
pub fn evaluate(identity: &PlatformIdentity) -> FeatureSet {
    if identity.is_family(PlatformFamily::Other) {
        warn!("unrecognised platform, all feature flags default to false");
    }

    let mut set = FeatureSet::none();
    for rule in RULES {
        let value = (rule.available)(identity);
        trace!(feature = %rule.name, value, "evaluated rule");
        set.flags.insert(rule.name, value);
    }
    set
}

/// Identifies the platform from `source` and evaluates every rule.
///
/// Fails only when identification does; no partial set is returned.
pub fn features<S: SymbolSource + ?Sized>(source: &S) -> Result<FeatureSet> {
    let identity = identify(source)?;
    Ok(evaluate(&identity))
}
