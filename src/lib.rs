//! Safe bindings to the [Mapnik](https://mapnik.org) map rendering engine
//! through its C API.
//!
//! All projection math, symbolizer styling, and image codecs live in the
//! engine; this crate wraps its handles, marshals arguments, converts status
//! codes into [`Error`] values, and releases every native resource exactly
//! once.
//!
//! # Modules
//!
//! - [`engine`] — process-wide plugin/font registration, log severity, version
//! - [`datasource`] — parameter marshalling and datasource handles
//! - [`layer`] — layer handles
//! - [`map`] — map lifecycle, aspect fix mode, layer activation, rendering
//! - [`image`] — decoded pixel buffers and the standalone encode utility
//! - [`sys`] — the raw C API surface
//!
//! # Example
//!
//! ```no_run
//! use mapnik::{Map, RenderOpts};
//!
//! # fn main() -> mapnik::Result<()> {
//! mapnik::register_defaults()?;
//!
//! let mut map = Map::new()?;
//! map.load("map.xml")?;
//! map.zoom_all()?;
//! let png = map.render(&RenderOpts { format: "png24".into(), ..Default::default() })?;
//! # let _ = png;
//! # Ok(())
//! # }
//! ```

pub mod datasource;
pub mod engine;
pub mod error;
pub mod image;
pub mod layer;
pub mod map;
pub mod sys;

pub use datasource::Datasource;
pub use engine::{
    LogLevel, Version, register_datasources, register_defaults, register_fonts, set_log_severity,
    version,
};
pub use error::{Error, Result};
pub use image::{PixelBuffer, encode};
pub use layer::Layer;
pub use map::{AspectFixMode, Color, LayerSelector, LayerStatus, Map, RenderOpts};
