//! The root rendering context: canvas, projection, extent, layers,
//! background, and the render pipeline.
//!
//! Two parts of this module carry state across calls and deserve attention:
//!
//! - The **layer activation snapshot** ([`Map::select_layers`] /
//!   [`Map::reset_layers`]): a transactional "render a layer subset, then
//!   revert" mechanism. The baseline is captured at most once between resets;
//!   a second overlapping selection keeps the original baseline.
//! - The **render pipeline**: [`Map::render`], [`Map::render_image`], and
//!   [`Map::render_file`] all rasterize once through the same native entry
//!   point, so identical map state and options produce identical pixels on
//!   every path.

use std::fs;
use std::path::Path;
use std::ptr;

use crate::error::{Error, Result};
use crate::image::{Image, PixelBuffer};
use crate::layer::Layer;
use crate::sys;

/// Default SRS of a fresh map: WGS84 long/lat.
pub const DEFAULT_SRS: &str = "+proj=longlat +ellps=WGS84 +datum=WGS84 +no_defs";

/// Codec used when [`RenderOpts::format`] is empty.
const DEFAULT_FORMAT: &str = "png256";

/// Pseudo-format returning the undecoded pixel buffer, bypassing the codecs.
const RAW_FORMAT: &str = "raw";

/// 8-bit RGBA color, non-premultiplied.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Fully transparent black, the default map background.
    pub const TRANSPARENT: Self = Self { r: 0, g: 0, b: 0, a: 0 };

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// How the engine reconciles a requested extent's aspect ratio against the
/// canvas aspect ratio.
///
/// Read at zoom/resize time — set it before the [`Map::resize`],
/// [`Map::zoom_all`], or [`Map::zoom_to`] calls it should affect.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum AspectFixMode {
    /// Widen the shorter extent dimension to fill the canvas. Default.
    #[default]
    GrowBbox,
    /// Widen the shorter canvas dimension to accommodate the extent.
    GrowCanvas,
    /// Narrow the longer extent dimension to fill the canvas.
    ShrinkBbox,
    /// Narrow the longer canvas dimension to accommodate the extent.
    ShrinkCanvas,
    /// Adjust extent width only; height and canvas stay unchanged.
    AdjustBboxWidth,
    /// Adjust extent height only; width and canvas stay unchanged.
    AdjustBboxHeight,
    /// Adjust canvas width only; height and extent stay unchanged.
    AdjustCanvasWidth,
    /// Adjust canvas height only; width and extent stay unchanged.
    AdjustCanvasHeight,
    /// No reconciliation.
    Respect,
}

impl AspectFixMode {
    fn to_native(self) -> libc::c_int {
        match self {
            Self::GrowBbox => 0,
            Self::GrowCanvas => 1,
            Self::ShrinkBbox => 2,
            Self::ShrinkCanvas => 3,
            Self::AdjustBboxWidth => 4,
            Self::AdjustBboxHeight => 5,
            Self::AdjustCanvasWidth => 6,
            Self::AdjustCanvasHeight => 7,
            Self::Respect => 8,
        }
    }

    fn from_native(value: libc::c_int) -> Option<Self> {
        Some(match value {
            0 => Self::GrowBbox,
            1 => Self::GrowCanvas,
            2 => Self::ShrinkBbox,
            3 => Self::ShrinkCanvas,
            4 => Self::AdjustBboxWidth,
            5 => Self::AdjustBboxHeight,
            6 => Self::AdjustCanvasWidth,
            7 => Self::AdjustCanvasHeight,
            8 => Self::Respect,
            _ => return None,
        })
    }
}

/// Per-layer decision of a [`LayerSelector`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum LayerStatus {
    /// Deactivate the layer.
    Exclude,
    /// Keep the layer's current activation.
    #[default]
    Default,
    /// Activate the layer.
    Include,
}

/// Selection policy for [`Map::select_layers`], evaluated once per layer in
/// index order. Any `Fn(&str) -> LayerStatus` closure qualifies.
pub trait LayerSelector {
    fn select(&self, layer_name: &str) -> LayerStatus;
}

impl<F> LayerSelector for F
where
    F: Fn(&str) -> LayerStatus,
{
    fn select(&self, layer_name: &str) -> LayerStatus {
        self(layer_name)
    }
}

/// Per-render configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderOpts {
    /// Fixed scale denominator; `0.0` uses the map's current computed scale.
    /// Overrides apply to this render only and never mutate the map.
    pub scale: f64,
    /// Multiplier for symbol, line, and font sizes (high-DPI or print
    /// output); `0.0` is normalized to `1.0`.
    pub scale_factor: f64,
    /// Engine codec identifier (`"png256"`, `"png24"`, `"jpeg80"`, ...), or
    /// `"raw"` for the undecoded pixel buffer. Empty selects `"png256"`.
    pub format: String,
}

fn effective_scale_factor(scale_factor: f64) -> f64 {
    if scale_factor == 0.0 {
        1.0
    } else {
        scale_factor
    }
}

fn effective_format(format: &str) -> &str {
    if format.is_empty() {
        DEFAULT_FORMAT
    } else {
        format
    }
}

/// Scoped wrapper for the native bounding box handle.
struct Bbox {
    ptr: *mut sys::mapnik_bbox_t,
}

impl Bbox {
    fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Result<Self> {
        let ptr = unsafe { sys::mapnik_bbox(minx, miny, maxx, maxy) };
        if ptr.is_null() {
            return Err(Error::Construction("bounding box"));
        }
        Ok(Self { ptr })
    }
}

impl Drop for Bbox {
    fn drop(&mut self) {
        unsafe { sys::mapnik_bbox_free(self.ptr) };
    }
}

/// The root rendering context.
///
/// Starts as an 800×600 canvas with the [`DEFAULT_SRS`] projection and a
/// transparent background. The canvas size is tracked on this side as well,
/// because the C API cannot report image dimensions back.
pub struct Map {
    ptr: *mut sys::mapnik_map_t,
    width: u32,
    height: u32,
    layer_status: Option<Vec<bool>>,
}

// One handle per logical task; the engine allows moving handles between
// threads but not sharing them. Concurrent renders need distinct maps.
unsafe impl Send for Map {}

impl Map {
    /// Creates a map with the default 800×600 canvas.
    pub fn new() -> Result<Self> {
        Self::with_size(800, 600)
    }

    /// Creates a map with the given canvas size in pixels.
    pub fn with_size(width: u32, height: u32) -> Result<Self> {
        let ptr = unsafe { sys::mapnik_map(width, height) };
        if ptr.is_null() {
            return Err(Error::Construction("map"));
        }
        Ok(Self { ptr, width, height, layer_status: None })
    }

    fn raw(&self) -> *mut sys::mapnik_map_t {
        assert!(!self.ptr.is_null(), "map used after close");
        self.ptr
    }

    fn last_error(&self) -> String {
        unsafe { sys::cstr_to_string(sys::mapnik_map_last_error(self.raw())) }
    }

    /// Releases the native handle. Idempotent; later calls are no-ops.
    pub fn close(&mut self) {
        if !self.ptr.is_null() {
            unsafe { sys::mapnik_map_free(self.ptr) };
            self.ptr = ptr::null_mut();
        }
    }

    /// True once [`close`](Self::close) has released the handle.
    pub fn is_closed(&self) -> bool {
        self.ptr.is_null()
    }

    // ── Lifecycle & query ───────────────────────────────────────────────

    /// Loads a stylesheet from a filesystem path.
    pub fn load(&mut self, stylesheet: &str) -> Result<()> {
        let c_path = sys::c_string(stylesheet)?;
        if unsafe { sys::mapnik_map_load(self.raw(), c_path.as_ptr()) } != 0 {
            return Err(Error::Load(self.last_error()));
        }
        Ok(())
    }

    /// Loads a stylesheet from an in-memory XML string. `base_path` resolves
    /// relative resource references inside the document.
    pub fn load_string(&mut self, xml: &str, base_path: &str) -> Result<()> {
        let c_xml = sys::c_string(xml)?;
        let c_base = sys::c_string(base_path)?;
        let rc =
            unsafe { sys::mapnik_map_load_string(self.raw(), c_xml.as_ptr(), c_base.as_ptr()) };
        if rc != 0 {
            return Err(Error::Load(self.last_error()));
        }
        Ok(())
    }

    /// Changes the canvas size in pixels. Does not touch SRS or extent.
    pub fn resize(&mut self, width: u32, height: u32) {
        unsafe { sys::mapnik_map_resize(self.raw(), width, height) };
        self.width = width;
        self.height = height;
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The map's projection string.
    pub fn srs(&self) -> String {
        unsafe { sys::cstr_to_string(sys::mapnik_map_get_srs(self.raw())) }
    }

    /// Sets the projection as a PROJ string (`"+init=epsg:3857"`, ...).
    /// Direct overwrite; only the engine validates it.
    pub fn set_srs(&mut self, srs: &str) -> Result<()> {
        let c_srs = sys::c_string(srs)?;
        if unsafe { sys::mapnik_map_set_srs(self.raw(), c_srs.as_ptr()) } != 0 {
            return Err(Error::Config(self.last_error()));
        }
        Ok(())
    }

    /// Zooms to the union extent of all layers' datasources.
    pub fn zoom_all(&mut self) -> Result<()> {
        if unsafe { sys::mapnik_map_zoom_all(self.raw()) } != 0 {
            return Err(Error::Zoom(self.last_error()));
        }
        Ok(())
    }

    /// Sets the view extent to the given bounding box.
    pub fn zoom_to(&mut self, minx: f64, miny: f64, maxx: f64, maxy: f64) -> Result<()> {
        let bbox = Bbox::new(minx, miny, maxx, maxy)?;
        unsafe { sys::mapnik_map_zoom_to_box(self.raw(), bbox.ptr) };
        Ok(())
    }

    /// Clamps the pannable extent.
    pub fn set_max_extent(&mut self, minx: f64, miny: f64, maxx: f64, maxy: f64) {
        unsafe { sys::mapnik_map_set_maximum_extent(self.raw(), minx, miny, maxx, maxy) };
    }

    /// Removes the pannable extent clamp.
    pub fn reset_max_extent(&mut self) {
        unsafe { sys::mapnik_map_reset_maximum_extent(self.raw()) };
    }

    /// Pixel margin beyond the canvas edges that label placement still
    /// considers, to avoid clipped labels at tile seams.
    pub fn set_buffer_size(&mut self, pixels: i32) {
        unsafe { sys::mapnik_map_set_buffer_size(self.raw(), pixels) };
    }

    /// The background color; [`Color::TRANSPARENT`] when none was set.
    pub fn background(&self) -> Color {
        let mut c = Color::TRANSPARENT;
        unsafe { sys::mapnik_map_background(self.raw(), &mut c.r, &mut c.g, &mut c.b, &mut c.a) };
        c
    }

    /// Sets the background color.
    pub fn set_background(&mut self, color: Color) {
        unsafe { sys::mapnik_map_set_background(self.raw(), color.r, color.g, color.b, color.a) };
    }

    /// The current scale denominator. Meaningful after both a resize and a
    /// zoom have been applied.
    pub fn scale_denominator(&self) -> f64 {
        unsafe { sys::mapnik_map_get_scale_denominator(self.raw()) }
    }

    // ── Aspect fix mode ─────────────────────────────────────────────────

    /// Sets the aspect fix policy. Takes effect at the next zoom or resize,
    /// never retroactively.
    pub fn set_aspect_fix_mode(&mut self, mode: AspectFixMode) -> Result<()> {
        if unsafe { sys::mapnik_map_set_aspect_fix_mode(self.raw(), mode.to_native()) } != 0 {
            let detail = unsafe { sys::cstr_to_string(sys::mapnik_register_last_error()) };
            return Err(Error::Config(detail));
        }
        Ok(())
    }

    /// The current aspect fix policy.
    pub fn aspect_fix_mode(&self) -> AspectFixMode {
        let value = unsafe { sys::mapnik_map_get_aspect_fix_mode(self.raw()) };
        // The engine only ever stores values set through this enum.
        AspectFixMode::from_native(value).unwrap_or_default()
    }

    // ── Layers ──────────────────────────────────────────────────────────

    /// Adds a layer. The engine copies it; the caller keeps ownership of
    /// `layer`.
    pub fn add_layer(&mut self, layer: &Layer) {
        unsafe { sys::mapnik_map_add_layer(self.raw(), layer.raw()) };
    }

    /// Number of layers the engine currently reports.
    ///
    /// Always read live: engine majors before 3 report an extra synthetic
    /// status-off entry that newer majors omit, so the count is a property of
    /// the linked engine, not of this wrapper.
    pub fn layer_count(&self) -> usize {
        unsafe { sys::mapnik_map_layer_count(self.raw()) }.max(0) as usize
    }

    /// Name of the layer at `index`.
    pub fn layer_name(&self, index: usize) -> String {
        unsafe { sys::cstr_to_string(sys::mapnik_map_layer_name(self.raw(), index)) }
    }

    /// Whether the layer at `index` is rendered.
    pub fn layer_active(&self, index: usize) -> bool {
        (unsafe { sys::mapnik_map_layer_is_active(self.raw(), index) }) == 1
    }

    /// Activates or deactivates the layer at `index`.
    pub fn set_layer_active(&mut self, index: usize, active: bool) {
        unsafe { sys::mapnik_map_layer_set_active(self.raw(), index, active as libc::c_int) };
    }

    /// Live per-layer activation flags, in layer index order.
    pub fn current_layer_status(&self) -> Vec<bool> {
        (0..self.layer_count()).map(|i| self.layer_active(i)).collect()
    }

    // ── Layer activation snapshot ───────────────────────────────────────

    /// Captures the current per-layer activation flags as the baseline for
    /// [`reset_layers`](Self::reset_layers).
    ///
    /// No-op when a snapshot is already held, so an overlapping selection
    /// session cannot clobber the original baseline.
    pub fn store_layer_status(&mut self) {
        if self.layer_status.is_none() {
            self.layer_status = Some(self.current_layer_status());
        }
    }

    /// Whether a baseline snapshot is currently held.
    pub fn has_stored_layer_status(&self) -> bool {
        self.layer_status.is_some()
    }

    /// Applies a selection policy to every layer in index order, snapshotting
    /// the baseline first. `Include` activates, `Exclude` deactivates,
    /// `Default` leaves the layer as it is.
    pub fn select_layers<S: LayerSelector + ?Sized>(&mut self, selector: &S) {
        self.store_layer_status();
        for i in 0..self.layer_count() {
            let name = self.layer_name(i);
            match selector.select(&name) {
                LayerStatus::Include => self.set_layer_active(i, true),
                LayerStatus::Exclude => self.set_layer_active(i, false),
                LayerStatus::Default => {}
            }
        }
    }

    /// Restores the snapshot taken by the first
    /// [`store_layer_status`](Self::store_layer_status) /
    /// [`select_layers`](Self::select_layers) and discards it. No-op without
    /// a snapshot.
    ///
    /// If the layer count has grown since the snapshot the restore is
    /// refused and the snapshot kept, rather than writing out of range.
    pub fn reset_layers(&mut self) {
        let Some(saved) = self.layer_status.take() else {
            return;
        };
        let count = self.layer_count();
        if count > saved.len() {
            log::warn!(
                "layer count grew from {} to {count} since the activation snapshot; not restoring",
                saved.len()
            );
            self.layer_status = Some(saved);
            return;
        }
        for i in 0..count {
            self.set_layer_active(i, saved[i]);
        }
    }

    // ── Render pipeline ─────────────────────────────────────────────────

    fn render_to_native_image(&self, opts: &RenderOpts) -> Result<Image> {
        let factor = effective_scale_factor(opts.scale_factor);
        let ptr = unsafe { sys::mapnik_map_render_to_image(self.raw(), opts.scale, factor) };
        Image::from_ptr(ptr).ok_or_else(|| Error::Render(self.last_error()))
    }

    /// Renders the current map state to encoded bytes.
    ///
    /// Format `"raw"` returns the undecoded RGBA buffer instead of running a
    /// codec; an unrecognized format fails with [`Error::Format`].
    pub fn render(&self, opts: &RenderOpts) -> Result<Vec<u8>> {
        let image = self.render_to_native_image(opts)?;
        if opts.format == RAW_FORMAT {
            return image.to_raw();
        }
        image.to_blob(effective_format(&opts.format))
    }

    /// Renders the current map state to a decoded [`PixelBuffer`]
    /// (straight-alpha RGBA, stride = width × 4). `opts.format` is ignored.
    pub fn render_image(&self, opts: &RenderOpts) -> Result<PixelBuffer> {
        let image = self.render_to_native_image(opts)?;
        PixelBuffer::from_rgba8(self.width, self.height, image.to_raw()?)
    }

    /// Renders the current map state to a file.
    ///
    /// Encodes in memory first and only then writes, so an unrecognized
    /// format (or any render failure) leaves no partial file, and the bytes
    /// on disk are identical to what [`render`](Self::render) returns for the
    /// same state and options.
    pub fn render_file<P: AsRef<Path>>(&self, opts: &RenderOpts, path: P) -> Result<()> {
        let encoded = self.render(opts)?;
        fs::write(path.as_ref(), encoded).map_err(|e| {
            Error::Render(format!("cannot write {}: {e}", path.as_ref().display()))
        })
    }
}

impl Drop for Map {
    fn drop(&mut self) {
        self.close();
    }
}
