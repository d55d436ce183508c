//! Error types for platform identification.
//!
//! Only conditions that must stop build configuration are errors. An unrecognised
//! platform is not one of them: it identifies as `PlatformFamily::Other` and every
//! flag evaluates to `false`.

use crate::identity::PlatformFamily;
use thiserror::Error;

/// Fatal build-configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The platform family was identified but a version symbol it cannot do without is absent.
    #[error("{symbol} not defined (required on {family})")]
    MissingSymbol {
        family: PlatformFamily,
        symbol: &'static str,
    },

    /// A `NAME[=VALUE]` define could not be parsed.
    #[error("Invalid define '{define}': {reason}")]
    InvalidDefine {
        define: String,
        reason: String,
    },

    /// A version string supplied by the host environment could not be parsed.
    #[error("Invalid version '{value}' for {variable}: expected {expected}")]
    InvalidVersion {
        variable: String,
        value: String,
        expected: String,
    },
}

/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

pub(crate) fn invalid_define(define: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidDefine {
        define: define.to_string(),
        reason: reason.into(),
    }
}

pub(crate) fn invalid_version(variable: &str, value: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidVersion {
        variable: variable.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}
