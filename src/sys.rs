//! Raw declarations for the `mapnik_c_api` shim.
//!
//! Mirrors `mapnik_c_api.h` one to one. Everything here is an opaque handle
//! or a direct function import; the safe wrappers in the sibling modules own
//! all lifetime and error-checking logic.

#![allow(non_camel_case_types)]

use std::ffi::{CStr, CString};

use libc::{c_char, c_double, c_int, c_uint, size_t};

use crate::error::{Error, Result};

/// Opaque bounding box handle.
#[repr(C)]
pub struct mapnik_bbox_t {
    _private: [u8; 0],
}

/// Opaque image handle.
#[repr(C)]
pub struct mapnik_image_t {
    _private: [u8; 0],
}

/// Opaque datasource parameter list handle.
#[repr(C)]
pub struct mapnik_parameters_t {
    _private: [u8; 0],
}

/// Opaque datasource handle.
#[repr(C)]
pub struct mapnik_datasource_t {
    _private: [u8; 0],
}

/// Opaque layer handle.
#[repr(C)]
pub struct mapnik_layer_t {
    _private: [u8; 0],
}

/// Opaque map handle.
#[repr(C)]
pub struct mapnik_map_t {
    _private: [u8; 0],
}

/// Encoded image bytes owned by the engine. Release with
/// [`mapnik_image_blob_free`].
#[repr(C)]
pub struct mapnik_image_blob_t {
    pub ptr: *mut c_char,
    pub len: c_uint,
}

pub const MAPNIK_NONE: c_int = 0;
pub const MAPNIK_DEBUG: c_int = 1;
pub const MAPNIK_WARN: c_int = 2;
pub const MAPNIK_ERROR: c_int = 3;

unsafe extern "C" {
    pub static mapnik_version: c_int;
    pub static mapnik_version_string: *const c_char;
    pub static mapnik_version_major: c_int;
    pub static mapnik_version_minor: c_int;
    pub static mapnik_version_patch: c_int;

    pub fn mapnik_register_datasources(path: *const c_char) -> c_int;
    pub fn mapnik_register_fonts(path: *const c_char) -> c_int;
    pub fn mapnik_register_last_error() -> *const c_char;

    pub fn mapnik_logging_set_severity(level: c_int);

    pub fn mapnik_bbox(
        minx: c_double,
        miny: c_double,
        maxx: c_double,
        maxy: c_double,
    ) -> *mut mapnik_bbox_t;
    pub fn mapnik_bbox_free(b: *mut mapnik_bbox_t);

    pub fn mapnik_image_free(i: *mut mapnik_image_t);
    pub fn mapnik_image_last_error(i: *mut mapnik_image_t) -> *const c_char;
    pub fn mapnik_image_blob_free(b: *mut mapnik_image_blob_t);
    pub fn mapnik_image_to_blob(
        i: *mut mapnik_image_t,
        format: *const c_char,
    ) -> *mut mapnik_image_blob_t;
    pub fn mapnik_image_to_raw(i: *mut mapnik_image_t, size: *mut size_t) -> *const u8;
    pub fn mapnik_image_from_raw(raw: *const u8, width: c_int, height: c_int)
    -> *mut mapnik_image_t;

    pub fn mapnik_parameters() -> *mut mapnik_parameters_t;
    pub fn mapnik_parameters_free(p: *mut mapnik_parameters_t);
    pub fn mapnik_parameters_set(
        p: *mut mapnik_parameters_t,
        key: *const c_char,
        value: *const c_char,
    );

    pub fn mapnik_datasource(p: *mut mapnik_parameters_t) -> *mut mapnik_datasource_t;
    pub fn mapnik_datasource_free(ds: *mut mapnik_datasource_t);

    pub fn mapnik_layer(name: *const c_char, srs: *const c_char) -> *mut mapnik_layer_t;
    pub fn mapnik_layer_free(l: *mut mapnik_layer_t);
    pub fn mapnik_layer_add_style(l: *mut mapnik_layer_t, stylename: *const c_char);
    pub fn mapnik_layer_set_datasource(l: *mut mapnik_layer_t, ds: *mut mapnik_datasource_t);

    pub fn mapnik_map(width: c_uint, height: c_uint) -> *mut mapnik_map_t;
    pub fn mapnik_map_free(m: *mut mapnik_map_t);
    pub fn mapnik_map_last_error(m: *mut mapnik_map_t) -> *const c_char;
    pub fn mapnik_map_load(m: *mut mapnik_map_t, stylesheet: *const c_char) -> c_int;
    pub fn mapnik_map_load_string(
        m: *mut mapnik_map_t,
        s: *const c_char,
        base_path: *const c_char,
    ) -> c_int;
    pub fn mapnik_map_get_srs(m: *mut mapnik_map_t) -> *const c_char;
    pub fn mapnik_map_set_srs(m: *mut mapnik_map_t, srs: *const c_char) -> c_int;
    pub fn mapnik_map_set_aspect_fix_mode(m: *mut mapnik_map_t, afm: c_int) -> c_int;
    pub fn mapnik_map_get_aspect_fix_mode(m: *mut mapnik_map_t) -> c_int;
    pub fn mapnik_map_resize(m: *mut mapnik_map_t, width: c_uint, height: c_uint);
    pub fn mapnik_map_get_scale_denominator(m: *mut mapnik_map_t) -> c_double;
    pub fn mapnik_map_set_buffer_size(m: *mut mapnik_map_t, buffer_size: c_int);
    pub fn mapnik_map_background(
        m: *mut mapnik_map_t,
        r: *mut u8,
        g: *mut u8,
        b: *mut u8,
        a: *mut u8,
    ) -> c_int;
    pub fn mapnik_map_set_background(m: *mut mapnik_map_t, r: u8, g: u8, b: u8, a: u8);
    pub fn mapnik_map_zoom_all(m: *mut mapnik_map_t) -> c_int;
    pub fn mapnik_map_zoom_to_box(m: *mut mapnik_map_t, b: *mut mapnik_bbox_t);
    pub fn mapnik_map_set_maximum_extent(
        m: *mut mapnik_map_t,
        x0: c_double,
        y0: c_double,
        x1: c_double,
        y1: c_double,
    );
    pub fn mapnik_map_reset_maximum_extent(m: *mut mapnik_map_t);
    pub fn mapnik_map_render_to_file(
        m: *mut mapnik_map_t,
        filepath: *const c_char,
        scale: c_double,
        scale_factor: c_double,
        format: *const c_char,
    ) -> c_int;
    pub fn mapnik_map_render_to_image(
        m: *mut mapnik_map_t,
        scale: c_double,
        scale_factor: c_double,
    ) -> *mut mapnik_image_t;
    pub fn mapnik_map_add_layer(m: *mut mapnik_map_t, l: *mut mapnik_layer_t);
    pub fn mapnik_map_layer_count(m: *mut mapnik_map_t) -> c_int;
    pub fn mapnik_map_layer_name(m: *mut mapnik_map_t, idx: size_t) -> *const c_char;
    pub fn mapnik_map_layer_is_active(m: *mut mapnik_map_t, idx: size_t) -> c_int;
    pub fn mapnik_map_layer_set_active(m: *mut mapnik_map_t, idx: size_t, active: c_int);
}

/// Marshals a Rust string for the C side. Interior NUL bytes cannot cross the
/// boundary and are rejected as configuration errors.
pub(crate) fn c_string(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| Error::Config(format!("string contains interior NUL byte: {s:?}")))
}

/// Copies an engine-owned C string. Null pointers become the empty string so
/// diagnostic channels stay total.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that outlives the
/// call.
pub(crate) unsafe fn cstr_to_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}
