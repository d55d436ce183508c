//! Predefined platform symbols.
//!
//! Identification never looks at the machine it runs on. It only reads the values
//! a C compiler would predefine (or that the platform headers would define) for the
//! target, supplied through a [`SymbolSource`].

use std::collections::BTreeMap;

use crate::error::{invalid_define, Result};

pub const GLIBC: &str = "__GLIBC__";
pub const GLIBC_MINOR: &str = "__GLIBC_MINOR__";
pub const FREEBSD: &str = "__FreeBSD__";
pub const FREEBSD_VERSION: &str = "__FreeBSD_version";
pub const OPENBSD: &str = "__OpenBSD__";
pub const OPENBSD_RELEASE: &str = "OpenBSD";
pub const NETBSD: &str = "__NetBSD__";
pub const NETBSD_VERSION: &str = "__NetBSD_Version__";
pub const APPLE: &str = "__APPLE__";
pub const MACH: &str = "__MACH__";
pub const MACOS_MIN_REQUIRED: &str = "__MAC_OS_X_VERSION_MIN_REQUIRED";
pub const LINUX: &str = "__linux__";

/// Anything that can answer "is this symbol defined, and to what".
pub trait SymbolSource {
    /// Returns the value of `name`, or `None` if it is not defined.
    fn symbol(&self, name: &str) -> Option<u64>;

    fn is_defined(&self, name: &str) -> bool {
        self.symbol(name).is_some()
    }
}

/// An ordered set of defined symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: BTreeMap<String, u64>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines `name` as `value`, replacing any earlier definition.
    pub fn define(&mut self, name: impl Into<String>, value: u64) -> &mut Self {
        self.symbols.insert(name.into(), value);
        self
    }

    pub fn undefine(&mut self, name: &str) -> &mut Self {
        self.symbols.remove(name);
        self
    }

    /// Applies a compiler-style define.
    ///
    /// `NAME` defines the symbol as `1`, `NAME=VALUE` defines it as the decimal
    /// `VALUE`, and `!NAME` removes it.
    pub fn apply(&mut self, define: &str) -> Result<&mut Self> {
        let define = define.trim();

        if let Some(name) = define.strip_prefix('!') {
            validate_name(define, name)?;
            return Ok(self.undefine(name));
        }

        let (name, value) = match define.split_once('=') {
            Some((name, value)) => {
                let value = value.trim();
                let parsed = value.parse::<u64>().map_err(|_| {
                    invalid_define(define, format!("'{}' is not a non-negative integer", value))
                })?;
                (name.trim(), parsed)
            }
            None => (define, 1),
        };

        validate_name(define, name)?;
        Ok(self.define(name, value))
    }

    /// Builds a table from a sequence of defines, applied in order.
    pub fn from_defines<I, S>(defines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::new();
        for define in defines {
            table.apply(define.as_ref())?;
        }
        Ok(table)
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.symbols.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

impl SymbolSource for SymbolTable {
    fn symbol(&self, name: &str) -> Option<u64> {
        self.symbols.get(name).copied()
    }
}

impl<S: SymbolSource + ?Sized> SymbolSource for &S {
    fn symbol(&self, name: &str) -> Option<u64> {
        (**self).symbol(name)
    }
}

fn validate_name(define: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid_define(define, "empty symbol name"));
    }
    if name.starts_with(|c: char| c.is_ascii_digit())
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(invalid_define(define, format!("'{}' is not an identifier", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn test_define_forms() {
        let table = SymbolTable::from_defines(["__GLIBC__=2", " __GLIBC_MINOR__ = 31 ", "__linux__"])
            .unwrap();

        assert_eq!(table.symbol(GLIBC), Some(2));
        assert_eq!(table.symbol(GLIBC_MINOR), Some(31));
        assert_eq!(table.symbol(LINUX), Some(1));
        assert!(!table.is_defined(APPLE));
    }

    #[test]
    fn test_later_defines_override() {
        let table = SymbolTable::from_defines(["OpenBSD=199604", "OpenBSD=199610", "!__linux__"])
            .unwrap();
        assert_eq!(table.symbol(OPENBSD_RELEASE), Some(199610));

        let table = SymbolTable::from_defines(["__APPLE__", "!__APPLE__"]).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_invalid_defines() {
        for bad in ["=1", "__GLIBC__=two", "__GLIBC__=-1", "1abc", "foo-bar=2", "!"] {
            let err = SymbolTable::from_defines([bad]).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidDefine { .. }),
                "{} should be rejected",
                bad
            );
        }
    }
}
