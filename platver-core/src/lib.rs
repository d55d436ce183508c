//! # platver core
//!
//! Decides at build-configuration time whether operating-system facilities such as
//! `futimes(3)` or `inotify(7)` exist on the target, from the target's predefined
//! platform symbols alone. Nothing is compiled or run against the target.
//!
//! ## Basic Usage
//!
//! From a `build.rs`:
//!
//! ```rust,no_run
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let features = platver_core::host_features()?;
//!     platver_core::emit::emit_cargo(features)?;
//!     Ok(())
//! }
//! ```
//!
//! Or with explicit symbols:
//!
//! ```rust
//! use platver_core::{features, FeatureName, SymbolTable};
//!
//! let symbols = SymbolTable::from_defines(["__GLIBC__=2", "__GLIBC_MINOR__=3"]).unwrap();
//! let set = features(&symbols).unwrap();
//! assert!(set.get(FeatureName::HaveFutimes));
//! assert!(!set.get(FeatureName::HaveInotify));
//! ```
//!
//! ## Architecture
//!
//! - [`symbols`]: predefined symbol names and the [`SymbolSource`] abstraction
//! - [`identity`]: platform family and native version identification
//! - [`prereq`]: per-family version predicates
//! - [`rules`]: the feature rule table
//! - [`config`]: building symbols from the Cargo build environment
//! - [`emit`]: rendering flags for cargo, C headers, env files and JSON
//! - [`error`]: fatal configuration errors

use std::sync::OnceLock;

pub mod config;
pub mod emit;
pub mod error;
pub mod identity;
pub mod prereq;
pub mod rules;
pub mod symbols;

pub use config::OracleConfig;
pub use error::{ConfigError, Result};
pub use identity::{identify, PlatformFamily, PlatformIdentity, VersionEncoding};
pub use rules::{evaluate, features, FeatureName, FeatureSet, RULES};
pub use symbols::{SymbolSource, SymbolTable};

/// The feature flags of the target described by the process environment.
///
/// Computed on first use and kept for the rest of the process, including a fatal
/// error, so every caller in one configuration pass sees the same answer.
pub fn host_features() -> Result<&'static FeatureSet> {
    static HOST: OnceLock<Result<FeatureSet>> = OnceLock::new();

    HOST.get_or_init(|| {
        let symbols = OracleConfig::from_env().symbols()?;
        features(&symbols)
    })
    .as_ref()
    .map_err(Clone::clone)
}
