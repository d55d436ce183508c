//! Rendering a [`FeatureSet`] for downstream build systems.
//!
//! Every format states every flag, true or false, so consumers only ever test a
//! value and never whether a flag exists.

use std::fmt::{self, Write as _};
use std::io::{self, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::rules::FeatureSet;

/// Output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// `cargo::rustc-check-cfg` / `cargo::rustc-cfg` build script directives.
    Cargo,
    /// A C configuration header.
    Header,
    /// `HAVE_X=0|1` lines.
    #[default]
    Env,
    /// A JSON object keyed by macro name.
    Json,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Cargo => "cargo",
            Format::Header => "header",
            Format::Env => "env",
            Format::Json => "json",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cargo" => Ok(Format::Cargo),
            "header" | "h" => Ok(Format::Header),
            "env" => Ok(Format::Env),
            "json" => Ok(Format::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Renders `set` in `format`. Only the JSON format can fail.
pub fn render(set: &FeatureSet, format: Format) -> serde_json::Result<String> {
    let mut out = String::new();
    match format {
        Format::Cargo => {
            for (name, _) in set.iter() {
                let _ = writeln!(out, "cargo::rustc-check-cfg=cfg({})", name.cfg_name());
            }
            for name in set.enabled() {
                let _ = writeln!(out, "cargo::rustc-cfg={}", name.cfg_name());
            }
        }
        Format::Header => {
            for (name, value) in set.iter() {
                let _ = writeln!(out, "#undef {}", name.macro_name());
                let _ = writeln!(out, "#define {} {}", name.macro_name(), u8::from(value));
            }
        }
        Format::Env => {
            for (name, value) in set.iter() {
                let _ = writeln!(out, "{}={}", name.macro_name(), u8::from(value));
            }
        }
        Format::Json => {
            out = serde_json::to_string(set)?;
            out.push('\n');
        }
    }
    Ok(out)
}

/// Writes the cargo directives for `set` to stdout. Call from a `build.rs`.
pub fn emit_cargo(set: &FeatureSet) -> io::Result<()> {
    let rendered = render(set, Format::Cargo)?;
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    lock.write_all(rendered.as_bytes())?;
    lock.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{PlatformFamily, PlatformIdentity, VersionEncoding};
    use crate::rules::{evaluate, FeatureName};

    fn glibc_2_3() -> FeatureSet {
        evaluate(&PlatformIdentity {
            family: PlatformFamily::Glibc,
            version: VersionEncoding::Glibc { major: 2, minor: 3 },
        })
    }

    #[test]
    fn test_render_cargo() {
        assert_eq!(
            render(&glibc_2_3(), Format::Cargo).unwrap(),
            "cargo::rustc-check-cfg=cfg(have_futimes)\n\
             cargo::rustc-check-cfg=cfg(have_inotify)\n\
             cargo::rustc-cfg=have_futimes\n"
        );
    }

    #[test]
    fn test_render_header() {
        assert_eq!(
            render(&glibc_2_3(), Format::Header).unwrap(),
            "#undef HAVE_FUTIMES\n\
             #define HAVE_FUTIMES 1\n\
             #undef HAVE_INOTIFY\n\
             #define HAVE_INOTIFY 0\n"
        );
    }

    #[test]
    fn test_render_env_and_json() {
        let set = FeatureSet::none();
        assert_eq!(render(&set, Format::Env).unwrap(), "HAVE_FUTIMES=0\nHAVE_INOTIFY=0\n");
        assert_eq!(
            render(&glibc_2_3(), Format::Json).unwrap(),
            "{\"HAVE_FUTIMES\":true,\"HAVE_INOTIFY\":false}\n"
        );
    }

    #[test]
    fn test_render_json_is_valid() {
        let rendered = render(&glibc_2_3(), Format::Json).unwrap();
        let parsed: std::collections::BTreeMap<String, bool> =
            serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed.len(), FeatureName::ALL.len());
        assert_eq!(parsed.get("HAVE_FUTIMES"), Some(&true));
        assert_eq!(parsed.get("HAVE_INOTIFY"), Some(&false));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<Format>(), Ok(Format::Json));
        assert_eq!("h".parse::<Format>(), Ok(Format::Header));
        assert!("yaml".parse::<Format>().is_err());
        assert_eq!(Format::default(), Format::Env);
    }
}
