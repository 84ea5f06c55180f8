//! Map layers: a name, a coordinate reference system, style references, and
//! an optional datasource.

use std::ptr;

use crate::datasource::Datasource;
use crate::error::{Error, Result};
use crate::sys;

/// A named map layer.
///
/// Styles and a datasource are attached after construction. Adding the layer
/// to a [`Map`](crate::Map) copies it into the map, so the layer can be
/// closed (or dropped) independently afterwards.
pub struct Layer {
    ptr: *mut sys::mapnik_layer_t,
}

// One handle per logical task; the engine allows moving handles between
// threads but not sharing them.
unsafe impl Send for Layer {}

impl Layer {
    /// Creates a layer with a name and a PROJ projection string
    /// (`"+init=epsg:4326"`, ...).
    pub fn new(name: &str, srs: &str) -> Result<Self> {
        let c_name = sys::c_string(name)?;
        let c_srs = sys::c_string(srs)?;
        let ptr = unsafe { sys::mapnik_layer(c_name.as_ptr(), c_srs.as_ptr()) };
        if ptr.is_null() {
            return Err(Error::Construction("layer"));
        }
        Ok(Self { ptr })
    }

    /// Appends a style reference. The name must match a style in the map the
    /// layer is added to; the engine resolves it at render time.
    pub fn add_style(&mut self, style_name: &str) -> Result<()> {
        let c_name = sys::c_string(style_name)?;
        unsafe { sys::mapnik_layer_add_style(self.raw(), c_name.as_ptr()) };
        Ok(())
    }

    /// Attaches a datasource. The engine copies the reference; the
    /// datasource stays owned by the caller.
    pub fn set_datasource(&mut self, datasource: &Datasource) {
        unsafe { sys::mapnik_layer_set_datasource(self.raw(), datasource.raw()) };
    }

    /// Releases the native handle. Idempotent; later calls are no-ops.
    pub fn close(&mut self) {
        if !self.ptr.is_null() {
            unsafe { sys::mapnik_layer_free(self.ptr) };
            self.ptr = ptr::null_mut();
        }
    }

    /// True once [`close`](Self::close) has released the handle.
    pub fn is_closed(&self) -> bool {
        self.ptr.is_null()
    }

    pub(crate) fn raw(&self) -> *mut sys::mapnik_layer_t {
        assert!(!self.ptr.is_null(), "layer used after close");
        self.ptr
    }
}

impl Drop for Layer {
    fn drop(&mut self) {
        self.close();
    }
}
