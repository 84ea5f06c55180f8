//! Decoded pixel buffers and the standalone encode utility.
//!
//! The engine works on one pixel layout: 8-bit RGBA, non-premultiplied,
//! row-major, stride = width × 4. [`PixelBuffer`] enforces that layout at
//! construction so everything downstream can rely on it; premultiplied input
//! is normalized away on the way in.

use std::ptr;
use std::slice;

use crate::error::{Error, Result};
use crate::sys;

/// An owned, decoded image: 8-bit RGBA, non-premultiplied, row-major,
/// stride = width × 4.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps a straight (non-premultiplied) RGBA buffer.
    ///
    /// Fails with [`Error::Input`] when `data` is not exactly
    /// `width * height * 4` bytes.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(Error::Input(format!(
                "RGBA buffer for {width}x{height} must be {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    /// Wraps a premultiplied RGBA buffer, un-premultiplying each pixel so
    /// the encoder receives the straight-alpha layout it expects.
    pub fn from_rgba8_premultiplied(width: u32, height: u32, mut data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(Error::Input(format!(
                "RGBA buffer for {width}x{height} must be {expected} bytes, got {}",
                data.len()
            )));
        }
        for px in data.chunks_exact_mut(4) {
            let a = px[3] as u16;
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                px_unmul(c, a);
            }
        }
        Ok(Self { width, height, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The raw RGBA bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the buffer, returning the raw RGBA bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// RGBA of the pixel at `(x, y)`. Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }
}

/// Reverses `c * a / 255` with round-to-nearest, saturating at 255.
fn px_unmul(c: &mut u8, a: u16) {
    let v = (*c as u16 * 255 + a / 2) / a;
    *c = v.min(255) as u8;
}

/// RAII wrapper over a native image handle.
pub(crate) struct Image {
    ptr: *mut sys::mapnik_image_t,
}

unsafe impl Send for Image {}

impl Image {
    pub(crate) fn from_ptr(ptr: *mut sys::mapnik_image_t) -> Option<Self> {
        if ptr.is_null() {
            None
        } else {
            Some(Self { ptr })
        }
    }

    /// Copies a straight-alpha RGBA buffer into a native image.
    fn from_pixels(buffer: &PixelBuffer) -> Result<Self> {
        let ptr = unsafe {
            sys::mapnik_image_from_raw(
                buffer.data().as_ptr(),
                buffer.width() as libc::c_int,
                buffer.height() as libc::c_int,
            )
        };
        Self::from_ptr(ptr).ok_or(Error::Construction("image"))
    }

    fn last_error(&self) -> String {
        unsafe { sys::cstr_to_string(sys::mapnik_image_last_error(self.ptr)) }
    }

    /// Encodes through the engine's codec registry.
    pub(crate) fn to_blob(&self, format: &str) -> Result<Vec<u8>> {
        let c_format = sys::c_string(format)
            .map_err(|_| Error::Format(format!("invalid format string {format:?}")))?;
        let blob = unsafe { sys::mapnik_image_to_blob(self.ptr, c_format.as_ptr()) };
        if blob.is_null() {
            return Err(Error::Format(self.last_error()));
        }
        let bytes = unsafe {
            let b = &*blob;
            slice::from_raw_parts(b.ptr as *const u8, b.len as usize).to_vec()
        };
        unsafe { sys::mapnik_image_blob_free(blob) };
        Ok(bytes)
    }

    /// Copies out the undecoded pixel buffer, bypassing the codecs.
    pub(crate) fn to_raw(&self) -> Result<Vec<u8>> {
        let mut size: libc::size_t = 0;
        let raw = unsafe { sys::mapnik_image_to_raw(self.ptr, &mut size) };
        if raw.is_null() {
            return Err(Error::Render(self.last_error()));
        }
        Ok(unsafe { slice::from_raw_parts(raw, size) }.to_vec())
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { sys::mapnik_image_free(self.ptr) };
            self.ptr = ptr::null_mut();
        }
    }
}

/// Encodes a decoded image through the engine's codec registry, independent
/// of any map.
///
/// `format` is an engine codec identifier (`"png256"`, `"png24"`,
/// `"jpeg80"`, ...). Unknown formats fail with [`Error::Format`] and produce
/// no output.
pub fn encode(image: &PixelBuffer, format: &str) -> Result<Vec<u8>> {
    Image::from_pixels(image)?.to_blob(format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_buffer_length() {
        let err = PixelBuffer::from_rgba8(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
        let err = PixelBuffer::from_rgba8_premultiplied(2, 2, vec![0; 17]).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn straight_alpha_passes_through_unchanged() {
        let data = vec![10, 20, 30, 40, 200, 150, 100, 255];
        let buf = PixelBuffer::from_rgba8(2, 1, data.clone()).unwrap();
        assert_eq!(buf.data(), &data[..]);
        assert_eq!(buf.pixel(1, 0), [200, 150, 100, 255]);
    }

    #[test]
    fn premultiplied_input_is_normalized() {
        // Alpha 51 = 20%: premultiplied (10, 20, 30) came from (50, 100, 150).
        let buf = PixelBuffer::from_rgba8_premultiplied(1, 1, vec![10, 20, 30, 51]).unwrap();
        assert_eq!(buf.pixel(0, 0), [50, 100, 150, 51]);
    }

    #[test]
    fn opaque_and_fully_transparent_pixels_are_untouched() {
        let data = vec![10, 20, 30, 255, 10, 20, 30, 0];
        let buf = PixelBuffer::from_rgba8_premultiplied(2, 1, data.clone()).unwrap();
        assert_eq!(buf.data(), &data[..]);
    }

    #[test]
    fn unmultiply_saturates_inconsistent_input() {
        // Premultiplied channel larger than its alpha cannot round-trip;
        // clamp instead of wrapping.
        let buf = PixelBuffer::from_rgba8_premultiplied(1, 1, vec![200, 0, 0, 51]).unwrap();
        assert_eq!(buf.pixel(0, 0)[0], 255);
    }
}
