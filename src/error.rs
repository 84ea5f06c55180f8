//! Error types for the binding.
//!
//! Every fallible native call is checked immediately after it returns; a
//! nonzero status or null handle becomes one of the variants below, carrying
//! the engine's diagnostic text verbatim where the C API exposes one. All
//! failures are deterministic functions of their input — nothing here is
//! retried, and nothing aborts the process.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the engine or by argument marshalling.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed or unreadable stylesheet (path or string form).
    #[error("failed to load stylesheet: {0}")]
    Load(String),

    /// Extent computation failed, e.g. zoom-to-all with no usable layers.
    #[error("zoom failed: {0}")]
    Zoom(String),

    /// A configuration value the engine (or the marshalling layer) rejected.
    #[error("rejected configuration: {0}")]
    Config(String),

    /// Unrecognized render or encode output format string.
    #[error("image encoding failed: {0}")]
    Format(String),

    /// Unsupported pixel buffer layout passed to the encode utility.
    #[error("unsupported pixel buffer: {0}")]
    Input(String),

    /// Rasterization failed after the map state itself was accepted.
    #[error("render failed: {0}")]
    Render(String),

    /// Native object construction returned no handle. Construction has no
    /// per-object diagnostic channel, so only the object kind is known.
    #[error("{0} construction returned no handle")]
    Construction(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_native_diagnostic() {
        let err = Error::Load("map.xml:3: Unknown child node 'Lyer'".into());
        assert_eq!(
            err.to_string(),
            "failed to load stylesheet: map.xml:3: Unknown child node 'Lyer'"
        );
    }

    #[test]
    fn construction_names_the_object_kind() {
        assert_eq!(
            Error::Construction("datasource").to_string(),
            "datasource construction returned no handle"
        );
    }
}
