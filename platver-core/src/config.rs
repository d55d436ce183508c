//! Host build environment configuration.
//!
//! Rust toolchains do not predefine C platform symbols, so they are reconstructed
//! from what a build script can see: Cargo's `CARGO_CFG_TARGET_*` variables, the
//! deployment target, and explicit version overrides.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{invalid_version, Result};
use crate::prereq::{encode_freebsd, encode_netbsd};
use crate::symbols::{self, SymbolTable};

pub const ENV_TARGET_OS: &str = "CARGO_CFG_TARGET_OS";
pub const ENV_TARGET_ENV: &str = "CARGO_CFG_TARGET_ENV";
pub const ENV_TARGET_ARCH: &str = "CARGO_CFG_TARGET_ARCH";
pub const ENV_MACOS_DEPLOYMENT_TARGET: &str = "MACOSX_DEPLOYMENT_TARGET";
pub const ENV_GLIBC_VERSION: &str = "PLATVER_GLIBC_VERSION";
pub const ENV_FREEBSD_VERSION: &str = "PLATVER_FREEBSD_VERSION";
pub const ENV_OPENBSD_RELEASE: &str = "PLATVER_OPENBSD_RELEASE";
pub const ENV_NETBSD_VERSION: &str = "PLATVER_NETBSD_VERSION";
pub const ENV_DEFINES: &str = "PLATVER_DEFINES";

/// Everything needed to build the symbol table for one target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// `target_os` cfg value, e.g. `linux`.
    pub target_os: Option<String>,
    /// `target_env` cfg value, e.g. `gnu`.
    pub target_env: Option<String>,
    /// `target_arch` cfg value, e.g. `x86_64`.
    pub target_arch: Option<String>,
    /// glibc release as `MAJOR.MINOR`.
    pub glibc_version: Option<String>,
    /// `__FreeBSD_version` as a raw integer, or `MAJOR.MINOR`.
    pub freebsd_version: Option<String>,
    /// OpenBSD release date as `YYYYMM`.
    pub openbsd_release: Option<String>,
    /// `__NetBSD_Version__` as a raw integer, or `MAJOR.MINOR`.
    pub netbsd_version: Option<String>,
    /// macOS deployment target as `MAJOR.MINOR[.PATCH]`.
    pub macos_deployment_target: Option<String>,
    /// Extra `NAME[=VALUE]` / `!NAME` defines applied last.
    pub defines: Vec<String>,
}

impl OracleConfig {
    /// Reads the configuration through `lookup`, which maps variable names to values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            target_os: non_empty(ENV_TARGET_OS),
            target_env: non_empty(ENV_TARGET_ENV),
            target_arch: non_empty(ENV_TARGET_ARCH),
            glibc_version: non_empty(ENV_GLIBC_VERSION),
            freebsd_version: non_empty(ENV_FREEBSD_VERSION),
            openbsd_release: non_empty(ENV_OPENBSD_RELEASE),
            netbsd_version: non_empty(ENV_NETBSD_VERSION),
            macos_deployment_target: non_empty(ENV_MACOS_DEPLOYMENT_TARGET),
            defines: non_empty(ENV_DEFINES)
                .map(|value| value.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// Outside a build script the `CARGO_CFG_TARGET_*` variables are unset, in
    /// which case the host this binary was compiled for is described instead.
    pub fn from_env() -> Self {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok());
        if config.target_os.is_none() {
            config.target_os = Some(std::env::consts::OS.to_string());
            config.target_arch = Some(std::env::consts::ARCH.to_string());
            config.target_env = Some(host_target_env().to_string());
        }
        config
    }

    /// Builds the symbol table this configuration describes.
    pub fn symbols(&self) -> Result<SymbolTable> {
        let mut table = SymbolTable::new();

        match self.target_os.as_deref() {
            Some("linux") => {
                table.define(symbols::LINUX, 1);
                if self.target_env.as_deref() == Some("gnu") {
                    self.define_glibc(&mut table)?;
                }
            }
            Some("freebsd") => self.define_freebsd(&mut table)?,
            Some("openbsd") => {
                table.define(symbols::OPENBSD, 1);
                if let Some(release) = &self.openbsd_release {
                    table.define(
                        symbols::OPENBSD_RELEASE,
                        parse_integer(ENV_OPENBSD_RELEASE, release, "YYYYMM")?,
                    );
                }
            }
            Some("netbsd") => {
                table.define(symbols::NETBSD, 1);
                if let Some(version) = &self.netbsd_version {
                    let encoded = match parse_major_minor(ENV_NETBSD_VERSION, version) {
                        Ok((major, minor)) => encode_netbsd(major, minor),
                        Err(_) => parse_integer(
                            ENV_NETBSD_VERSION,
                            version,
                            "MMmmrrpp00 or MAJOR.MINOR",
                        )?,
                    };
                    table.define(symbols::NETBSD_VERSION, encoded);
                }
            }
            Some("macos") => {
                table.define(symbols::APPLE, 1).define(symbols::MACH, 1);
                if let Some(min_required) = self.macos_min_required()? {
                    table.define(symbols::MACOS_MIN_REQUIRED, min_required);
                }
            }
            _ => {}
        }

        for define in &self.defines {
            table.apply(define)?;
        }

        debug!(target_os = ?self.target_os, symbols = ?table, "built symbol table");
        Ok(table)
    }

    fn define_glibc(&self, table: &mut SymbolTable) -> Result<()> {
        match &self.glibc_version {
            Some(version) => {
                let (major, minor) = parse_major_minor(ENV_GLIBC_VERSION, version)?;
                table.define(symbols::GLIBC, major).define(symbols::GLIBC_MINOR, minor);
            }
            // glibc is known to be there, its version is not
            None => {
                table.define(symbols::GLIBC, 2);
            }
        }
        Ok(())
    }

    fn define_freebsd(&self, table: &mut SymbolTable) -> Result<()> {
        let Some(version) = &self.freebsd_version else {
            table.define(symbols::FREEBSD, 1);
            return Ok(());
        };

        let encoded = match parse_major_minor(ENV_FREEBSD_VERSION, version) {
            Ok((major, minor)) => encode_freebsd(major, minor),
            Err(_) => parse_integer(ENV_FREEBSD_VERSION, version, "MMmmXXX or MAJOR.MINOR")?,
        };
        table
            .define(symbols::FREEBSD, (encoded / 100_000).max(1))
            .define(symbols::FREEBSD_VERSION, encoded);
        Ok(())
    }

    /// `__MAC_OS_X_VERSION_MIN_REQUIRED` as clang derives it from the deployment target.
    fn macos_min_required(&self) -> Result<Option<u64>> {
        let target = match (&self.macos_deployment_target, self.target_arch.as_deref()) {
            (Some(target), _) => target.as_str(),
            (None, Some("x86_64")) => "10.12",
            (None, Some("aarch64")) => "11.0",
            (None, _) => return Ok(None),
        };

        let (major, minor, patch) = parse_deployment_target(target)?;
        let encoded = if major == 10 && minor < 10 {
            1000 + minor * 10 + patch.min(9)
        } else {
            major
                .saturating_mul(10_000)
                .saturating_add(minor * 100)
                .saturating_add(patch)
        };
        Ok(Some(encoded))
    }
}

fn host_target_env() -> &'static str {
    if cfg!(target_env = "gnu") {
        "gnu"
    } else if cfg!(target_env = "musl") {
        "musl"
    } else if cfg!(target_env = "msvc") {
        "msvc"
    } else {
        ""
    }
}

fn parse_integer(variable: &str, value: &str, expected: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid_version(variable, value, expected))
}

fn parse_major_minor(variable: &str, value: &str) -> Result<(u64, u64)> {
    let mut parts = value.trim().split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(major), Some(minor), None) => match (major.parse(), minor.parse()) {
            (Ok(major), Ok(minor)) => Ok((major, minor)),
            _ => Err(invalid_version(variable, value, "MAJOR.MINOR")),
        },
        _ => Err(invalid_version(variable, value, "MAJOR.MINOR")),
    }
}

fn parse_deployment_target(value: &str) -> Result<(u64, u64, u64)> {
    let invalid = || invalid_version(ENV_MACOS_DEPLOYMENT_TARGET, value, "MAJOR[.MINOR[.PATCH]]");

    let parts = value
        .trim()
        .split('.')
        .map(|part| part.parse::<u64>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>>>()?;

    let (major, minor, patch) = match parts.as_slice() {
        [major] => (*major, 0, 0),
        [major, minor] => (*major, *minor, 0),
        [major, minor, patch] => (*major, *minor, *patch),
        _ => return Err(invalid()),
    };

    // minor and patch are two-digit fields of the encoded value
    if minor >= 100 || patch >= 100 {
        return Err(invalid());
    }
    Ok((major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::symbols::SymbolSource;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> OracleConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        OracleConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_from_lookup() {
        let config = config(&[
            (ENV_TARGET_OS, "linux"),
            (ENV_TARGET_ENV, "gnu"),
            (ENV_GLIBC_VERSION, "2.31"),
            (ENV_NETBSD_VERSION, "  "),
            (ENV_DEFINES, "FOO  BAR=2\t!BAZ"),
        ]);
        assert_eq!(config.target_os.as_deref(), Some("linux"));
        assert_eq!(config.glibc_version.as_deref(), Some("2.31"));
        assert_eq!(config.netbsd_version, None);
        assert_eq!(config.defines, vec!["FOO", "BAR=2", "!BAZ"]);
    }

    #[test]
    fn test_glibc_target() {
        let table = config(&[
            (ENV_TARGET_OS, "linux"),
            (ENV_TARGET_ENV, "gnu"),
            (ENV_GLIBC_VERSION, "2.17"),
        ])
        .symbols()
        .unwrap();
        assert_eq!(table.symbol(symbols::GLIBC), Some(2));
        assert_eq!(table.symbol(symbols::GLIBC_MINOR), Some(17));
        assert!(table.is_defined(symbols::LINUX));

        let table = config(&[(ENV_TARGET_OS, "linux"), (ENV_TARGET_ENV, "gnu")])
            .symbols()
            .unwrap();
        assert!(table.is_defined(symbols::GLIBC));
        assert!(!table.is_defined(symbols::GLIBC_MINOR));

        let table = config(&[(ENV_TARGET_OS, "linux"), (ENV_TARGET_ENV, "musl")])
            .symbols()
            .unwrap();
        assert!(!table.is_defined(symbols::GLIBC));
    }

    #[test]
    fn test_bsd_targets() {
        let table = config(&[(ENV_TARGET_OS, "freebsd"), (ENV_FREEBSD_VERSION, "13.2")])
            .symbols()
            .unwrap();
        assert_eq!(table.symbol(symbols::FREEBSD), Some(13));
        assert_eq!(table.symbol(symbols::FREEBSD_VERSION), Some(1_302_000));

        let table = config(&[(ENV_TARGET_OS, "freebsd"), (ENV_FREEBSD_VERSION, "1400097")])
            .symbols()
            .unwrap();
        assert_eq!(table.symbol(symbols::FREEBSD_VERSION), Some(1_400_097));

        let table = config(&[(ENV_TARGET_OS, "openbsd"), (ENV_OPENBSD_RELEASE, "202110")])
            .symbols()
            .unwrap();
        assert!(table.is_defined(symbols::OPENBSD));
        assert_eq!(table.symbol(symbols::OPENBSD_RELEASE), Some(202_110));

        let table = config(&[(ENV_TARGET_OS, "netbsd"), (ENV_NETBSD_VERSION, "9.3")])
            .symbols()
            .unwrap();
        assert_eq!(table.symbol(symbols::NETBSD_VERSION), Some(903_000_000));
    }

    #[test]
    fn test_macos_deployment_target() {
        fn min_required(vars: &[(&str, &str)]) -> Option<u64> {
            config(vars).symbols().unwrap().symbol(symbols::MACOS_MIN_REQUIRED)
        }

        let macos = (ENV_TARGET_OS, "macos");
        assert_eq!(min_required(&[macos, (ENV_MACOS_DEPLOYMENT_TARGET, "10.9")]), Some(1090));
        assert_eq!(min_required(&[macos, (ENV_MACOS_DEPLOYMENT_TARGET, "10.6.8")]), Some(1068));
        assert_eq!(min_required(&[macos, (ENV_MACOS_DEPLOYMENT_TARGET, "10.10")]), Some(101_000));
        assert_eq!(min_required(&[macos, (ENV_MACOS_DEPLOYMENT_TARGET, "10.15.7")]), Some(101_507));
        assert_eq!(min_required(&[macos, (ENV_MACOS_DEPLOYMENT_TARGET, "11")]), Some(110_000));
        assert_eq!(min_required(&[macos, (ENV_TARGET_ARCH, "x86_64")]), Some(101_200));
        assert_eq!(min_required(&[macos, (ENV_TARGET_ARCH, "aarch64")]), Some(110_000));
        assert_eq!(min_required(&[macos, (ENV_TARGET_ARCH, "powerpc")]), None);
    }

    #[test]
    fn test_out_of_range_deployment_target() {
        for target in ["11.999999999999999999", "11.100", "10.15.100", "12.0.0.1", "11..0"] {
            let err = config(&[(ENV_TARGET_OS, "macos"), (ENV_MACOS_DEPLOYMENT_TARGET, target)])
                .symbols()
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidVersion { .. }),
                "{} should be rejected",
                target
            );
        }

        // a huge major saturates instead of overflowing
        let table = config(&[
            (ENV_TARGET_OS, "macos"),
            (ENV_MACOS_DEPLOYMENT_TARGET, "18446744073709551615.99"),
        ])
        .symbols()
        .unwrap();
        assert_eq!(table.symbol(symbols::MACOS_MIN_REQUIRED), Some(u64::MAX));
    }

    #[test]
    fn test_defines_override_target() {
        let table = config(&[
            (ENV_TARGET_OS, "macos"),
            (ENV_TARGET_ARCH, "aarch64"),
            (ENV_DEFINES, "!__MAC_OS_X_VERSION_MIN_REQUIRED"),
        ])
        .symbols()
        .unwrap();
        assert!(table.is_defined(symbols::APPLE));
        assert!(!table.is_defined(symbols::MACOS_MIN_REQUIRED));
    }

    #[test]
    fn test_invalid_versions() {
        let err = config(&[
            (ENV_TARGET_OS, "linux"),
            (ENV_TARGET_ENV, "gnu"),
            (ENV_GLIBC_VERSION, "2"),
        ])
        .symbols()
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVersion { .. }));

        let err = config(&[(ENV_TARGET_OS, "macos"), (ENV_MACOS_DEPLOYMENT_TARGET, "ten")])
            .symbols()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVersion { .. }));

        let err = config(&[(ENV_TARGET_OS, "openbsd"), (ENV_OPENBSD_RELEASE, "7.0")])
            .symbols()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVersion { .. }));
    }

    #[test]
    fn test_unknown_target_defines_nothing() {
        let table = config(&[(ENV_TARGET_OS, "windows")]).symbols().unwrap();
        assert!(table.is_empty());
        assert!(OracleConfig::default().symbols().unwrap().is_empty());
    }

    #[test]
    fn test_from_env_describes_host() {
        // Only meaningful outside a build script.
        if std::env::var(ENV_TARGET_OS).is_err() {
            let config = OracleConfig::from_env();
            assert_eq!(config.target_os.as_deref(), Some(std::env::consts::OS));
        }
    }
}
