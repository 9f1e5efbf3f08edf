// ============================================================================
// PIXEL BUFFER — owned RGBA grid with region read / write / blit
// ============================================================================

use image::{Rgba, RgbaImage};

use crate::error::EditorError;

/// A rectangular grid of 8-bit RGBA samples, row-major, origin top-left.
///
/// Backed by an [`RgbaImage`] so the byte length is always `w * h * 4`.
/// Resizing never happens in place: a new buffer is allocated instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    /// Allocate a fully transparent black buffer.
    pub fn allocate(width: u32, height: u32) -> Result<Self, EditorError> {
        if width == 0 || height == 0 {
            return Err(EditorError::invalid_dimension(width, height));
        }
        Ok(Self { image: RgbaImage::new(width, height) })
    }

    /// Wrap decoded RGBA bytes. The length must be exactly `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, EditorError> {
        if width == 0 || height == 0 || data.len() as u64 != width as u64 * height as u64 * 4 {
            return Err(EditorError::invalid_dimension(width, height));
        }
        RgbaImage::from_raw(width, height, data)
            .map(|image| Self { image })
            .ok_or_else(|| EditorError::invalid_dimension(width, height))
    }

    pub fn from_image(image: RgbaImage) -> Result<Self, EditorError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(EditorError::invalid_dimension(image.width(), image.height()));
        }
        Ok(Self { image })
    }

    /// Buffer of the given size with every pixel set to `color`.
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Result<Self, EditorError> {
        let mut buf = Self::allocate(width, height)?;
        buf.fill(color);
        Ok(buf)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.image
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Stride of one row in bytes.
    pub fn stride(&self) -> usize {
        self.image.width() as usize * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        self.image.put_pixel(x, y, Rgba(rgba));
    }

    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.as_raw_mut().chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// `true` when the `w`×`h` rectangle at (x, y) lies fully inside the buffer.
    pub fn contains_region(&self, x: i64, y: i64, w: i64, h: i64) -> bool {
        x >= 0
            && y >= 0
            && w >= 0
            && h >= 0
            && x + w <= self.width() as i64
            && y + h <= self.height() as i64
    }

    fn check_region(&self, x: i64, y: i64, w: i64, h: i64) -> Result<(), EditorError> {
        if self.contains_region(x, y, w, h) {
            Ok(())
        } else {
            Err(EditorError::OutOfBounds {
                x,
                y,
                w,
                h,
                buf_w: self.width(),
                buf_h: self.height(),
            })
        }
    }

    /// Copy the `w`×`h` sub-rectangle at (x, y) into a new buffer.
    pub fn read_region(&self, x: i32, y: i32, w: i32, h: i32) -> Result<PixelBuffer, EditorError> {
        if w <= 0 || h <= 0 {
            return Err(EditorError::invalid_dimension(w, h));
        }
        self.check_region(x.into(), y.into(), w.into(), h.into())?;

        let (x, y, w, h) = (x as usize, y as usize, w as usize, h as usize);
        let src_stride = self.stride();
        let row_len = w * 4;
        let src = self.as_raw();
        let mut out = Vec::with_capacity(row_len * h);
        for row in y..y + h {
            let off = row * src_stride + x * 4;
            out.extend_from_slice(&src[off..off + row_len]);
        }
        PixelBuffer::from_rgba(w as u32, h as u32, out)
    }

    /// Copy all of `source` into this buffer with its top-left corner at (x, y).
    pub fn write_region(&mut self, source: &PixelBuffer, x: i32, y: i32) -> Result<(), EditorError> {
        self.blit(source, x, y, 0, 0, source.width() as i32, source.height() as i32)
    }

    /// Copy the `w`×`h` rectangle at (sx, sy) of `source` to (dx, dy) here, 1:1.
    pub fn blit(
        &mut self,
        source: &PixelBuffer,
        dx: i32,
        dy: i32,
        sx: i32,
        sy: i32,
        w: i32,
        h: i32,
    ) -> Result<(), EditorError> {
        source.check_region(sx.into(), sy.into(), w.into(), h.into())?;
        self.check_region(dx.into(), dy.into(), w.into(), h.into())?;
        if w == 0 || h == 0 {
            return Ok(());
        }

        let row_len = w as usize * 4;
        let src_stride = source.stride();
        let dst_stride = self.stride();
        let src = source.as_raw();
        let dst = self.as_raw_mut();
        for row in 0..h as usize {
            let s = (sy as usize + row) * src_stride + sx as usize * 4;
            let d = (dy as usize + row) * dst_stride + dx as usize * 4;
            dst[d..d + row_len].copy_from_slice(&src[s..s + row_len]);
        }
        Ok(())
    }
}
