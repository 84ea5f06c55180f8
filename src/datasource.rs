//! Datasource construction and parameter marshalling.

use std::ptr;

use crate::error::{Error, Result};
use crate::sys;

/// Native parameter list, built from key/value pairs and consumed once by
/// datasource construction. Duplicate keys are last-write-wins.
struct Parameters {
    ptr: *mut sys::mapnik_parameters_t,
}

impl Parameters {
    fn new<K, V, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let ptr = unsafe { sys::mapnik_parameters() };
        if ptr.is_null() {
            return Err(Error::Construction("parameter list"));
        }
        let params = Self { ptr };
        for (key, value) in pairs {
            let c_key = sys::c_string(key.as_ref())?;
            let c_value = sys::c_string(value.as_ref())?;
            unsafe { sys::mapnik_parameters_set(params.ptr, c_key.as_ptr(), c_value.as_ptr()) };
        }
        Ok(params)
    }
}

impl Drop for Parameters {
    fn drop(&mut self) {
        unsafe { sys::mapnik_parameters_free(self.ptr) };
    }
}

/// A bound data source configuration (file, database, ...).
///
/// Which keys are recognized is entirely up to the engine's plugin set; no
/// validation happens on this side. The handle is freed on drop;
/// [`close`](Self::close) releases it earlier and is safe to call repeatedly.
#[derive(Debug)]
pub struct Datasource {
    ptr: *mut sys::mapnik_datasource_t,
}

// One handle per logical task; the engine allows moving handles between
// threads but not sharing them.
unsafe impl Send for Datasource {}

impl Datasource {
    /// Creates a datasource from key/value parameters, e.g.
    /// `[("type", "ogr"), ("file", "tracks.gpx"), ("layer", "tracks")]`.
    ///
    /// The engine reports construction failure only as a missing handle, so
    /// a rejected parameter set surfaces as [`Error::Construction`] without
    /// further detail.
    pub fn new<K, V, I>(params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let native_params = Parameters::new(params)?;
        // The engine copies the parameter list; `native_params` is released
        // when it drops at the end of this scope.
        let ptr = unsafe { sys::mapnik_datasource(native_params.ptr) };
        if ptr.is_null() {
            return Err(Error::Construction("datasource"));
        }
        Ok(Self { ptr })
    }

    /// Releases the native handle. Idempotent; later calls are no-ops.
    pub fn close(&mut self) {
        if !self.ptr.is_null() {
            unsafe { sys::mapnik_datasource_free(self.ptr) };
            self.ptr = ptr::null_mut();
        }
    }

    /// True once [`close`](Self::close) has released the handle.
    pub fn is_closed(&self) -> bool {
        self.ptr.is_null()
    }

    pub(crate) fn raw(&self) -> *mut sys::mapnik_datasource_t {
        assert!(!self.ptr.is_null(), "datasource used after close");
        self.ptr
    }
}

impl Drop for Datasource {
    fn drop(&mut self) {
        self.close();
    }
}
