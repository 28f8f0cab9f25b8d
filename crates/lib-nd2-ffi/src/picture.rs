//! SDK-owned picture storage.

use crate::error::{Nd2Error, Nd2Result};
use crate::loader::Nd2Library;
use crate::records::{LimPicture, PlainRecord};
use std::sync::Arc;

/// A picture allocated with `Lim_InitPicture`.
///
/// The reader keeps one of these per open file and decodes every frame
/// into it. Storage is returned to the SDK on [`DecodeBuffer::release`] or
/// drop, exactly once.
pub struct DecodeBuffer {
    library: Arc<Nd2Library>,
    picture: LimPicture,
    live: bool,
}

impl DecodeBuffer {
    pub fn new(
        library: Arc<Nd2Library>,
        width: u32,
        height: u32,
        bits_per_component: u32,
        components: u32,
    ) -> Nd2Result<Self> {
        let mut picture = LimPicture::zeroed();
        // SAFETY: the picture is freshly zeroed and owns nothing.
        let size = unsafe {
            library.init_picture(&mut picture, width, height, bits_per_component, components)?
        };
        let buffer = Self {
            library,
            picture,
            live: true,
        };

        let stride = picture.width_bytes as usize;
        if stride < buffer.row_len() || stride * height as usize > size {
            return Err(Nd2Error::InvalidRecord(format!(
                "picture of {size} bytes with stride {} cannot hold {width}x{height}x{components} at {bits_per_component} bits",
                picture.width_bytes
            )));
        }

        tracing::debug!(
            width,
            height,
            components,
            bits_per_component,
            size,
            "Allocated decode buffer"
        );
        Ok(buffer)
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn picture(&self) -> &LimPicture {
        &self.picture
    }

    /// Picture to decode into. `None` once released.
    pub(crate) fn picture_mut(&mut self) -> Option<&mut LimPicture> {
        self.live.then_some(&mut self.picture)
    }

    /// Bytes of pixel data per row, without padding.
    pub fn row_len(&self) -> usize {
        let p = &self.picture;
        p.width as usize * p.components as usize * (p.bits_per_comp as usize / 8)
    }

    /// Raw storage, including row padding. Empty once released.
    pub fn bytes(&self) -> &[u8] {
        if !self.live {
            return &[];
        }
        // SAFETY: the SDK allocated `size` bytes at `image_data`, which stay
        // valid until `Lim_DestroyPicture`.
        unsafe {
            std::slice::from_raw_parts(self.picture.image_data as *const u8, self.picture.size)
        }
    }

    /// Copy the pixels out, dropping the row padding.
    pub fn copy_pixels(&self) -> Nd2Result<Vec<u8>> {
        if !self.live {
            return Err(Nd2Error::Closed);
        }
        copy_rows(
            self.bytes(),
            self.picture.width_bytes as usize,
            self.row_len(),
            self.picture.height as usize,
        )
    }

    /// Return the storage to the SDK. Later calls do nothing.
    pub fn release(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        // SAFETY: the picture came from `init_picture` and is destroyed once.
        unsafe { self.library.destroy_picture(&mut self.picture) };
        tracing::debug!("Released decode buffer");
    }
}

// SAFETY: the storage is only touched through `&mut self` or while the
// owning reader is borrowed, never from two threads at once.
unsafe impl Send for DecodeBuffer {}

impl Drop for DecodeBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

/// Gather `rows` rows of `row_len` bytes from a buffer with a stride of
/// `stride` bytes.
pub fn copy_rows(src: &[u8], stride: usize, row_len: usize, rows: usize) -> Nd2Result<Vec<u8>> {
    if rows == 0 || row_len == 0 {
        return Ok(Vec::new());
    }
    let needed = stride * (rows - 1) + row_len;
    if stride < row_len || src.len() < needed {
        return Err(Nd2Error::InvalidRecord(format!(
            "buffer of {} bytes with stride {stride} too small for {rows} rows of {row_len} bytes",
            src.len()
        )));
    }

    let mut out = Vec::with_capacity(row_len * rows);
    for row in src.chunks(stride).take(rows) {
        out.extend_from_slice(&row[..row_len]);
    }
    Ok(out)
}

/// Row length rounded up to the 4-byte alignment the SDK uses.
pub fn aligned_stride(row_len: usize) -> usize {
    row_len.div_ceil(4) * 4
}
