//! Process-wide engine state: plugin and font registration, log severity,
//! and the engine version.
//!
//! Registration mutates global engine registries. The calls are idempotent,
//! but they are not safe to race with a first concurrent render, so invoke
//! them from startup code before rendering begins. [`register_defaults`]
//! makes the usual one-shot setup explicit instead of hiding it behind first
//! use.

use std::sync::{Once, OnceLock};

use crate::error::{Error, Result};
use crate::sys;

/// Datasource plugin directory detected at build time (empty if unknown).
pub const DEFAULT_PLUGIN_DIR: &str = env!("MAPNIK_DEFAULT_PLUGIN_DIR");

/// Font directory detected at build time (empty if unknown).
pub const DEFAULT_FONT_DIR: &str = env!("MAPNIK_DEFAULT_FONT_DIR");

/// Adds `path` to the engine's datasource plugin search path.
pub fn register_datasources(path: &str) -> Result<()> {
    let c_path = sys::c_string(path)?;
    if unsafe { sys::mapnik_register_datasources(c_path.as_ptr()) } != 0 {
        return Err(Error::Config(register_last_error()));
    }
    log::debug!("registered mapnik datasource plugins from {path}");
    Ok(())
}

/// Adds `path` to the engine's font search path.
pub fn register_fonts(path: &str) -> Result<()> {
    let c_path = sys::c_string(path)?;
    if unsafe { sys::mapnik_register_fonts(c_path.as_ptr()) } != 0 {
        return Err(Error::Config(register_last_error()));
    }
    log::debug!("registered mapnik fonts from {path}");
    Ok(())
}

/// Registers the build-time default plugin and font directories.
///
/// Runs at most once per process; later calls are no-ops and report `Ok`.
/// Directories the build script could not detect are skipped.
pub fn register_defaults() -> Result<()> {
    static DEFAULTS: Once = Once::new();
    let mut outcome = Ok(());
    DEFAULTS.call_once(|| {
        outcome = (|| {
            if !DEFAULT_PLUGIN_DIR.is_empty() {
                register_datasources(DEFAULT_PLUGIN_DIR)?;
            }
            if !DEFAULT_FONT_DIR.is_empty() {
                register_fonts(DEFAULT_FONT_DIR)?;
            }
            Ok(())
        })();
    });
    outcome
}

fn register_last_error() -> String {
    unsafe { sys::cstr_to_string(sys::mapnik_register_last_error()) }
}

/// Severity threshold for the engine's own logging. Requires an engine build
/// with logging enabled.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LogLevel {
    /// Disable engine logging.
    None,
    Debug,
    Warn,
    Error,
}

impl LogLevel {
    fn to_native(self) -> libc::c_int {
        match self {
            Self::None => sys::MAPNIK_NONE,
            Self::Debug => sys::MAPNIK_DEBUG,
            Self::Warn => sys::MAPNIK_WARN,
            Self::Error => sys::MAPNIK_ERROR,
        }
    }
}

/// Sets the global log severity of the engine. Process-wide state.
pub fn set_log_severity(level: LogLevel) {
    unsafe { sys::mapnik_logging_set_severity(level.to_native()) };
}

/// Version of the linked engine, for callers that branch on engine behavior
/// that differs between major releases.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Version {
    /// Packed numeric form (`major * 100000 + minor * 100 + patch`).
    pub numeric: i32,
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
    /// Human-readable form, e.g. `"3.1.0"`.
    pub string: String,
}

/// Returns the version of the linked engine. Read once and cached.
pub fn version() -> &'static Version {
    static VERSION: OnceLock<Version> = OnceLock::new();
    VERSION.get_or_init(|| unsafe {
        Version {
            numeric: sys::mapnik_version,
            major: sys::mapnik_version_major,
            minor: sys::mapnik_version_minor,
            patch: sys::mapnik_version_patch,
            string: sys::cstr_to_string(sys::mapnik_version_string),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_levels_match_engine_constants() {
        assert_eq!(LogLevel::None.to_native(), 0);
        assert_eq!(LogLevel::Debug.to_native(), 1);
        assert_eq!(LogLevel::Warn.to_native(), 2);
        assert_eq!(LogLevel::Error.to_native(), 3);
    }
}
