// ============================================================================
// TRANSFORM OPERATIONS — crop to a selection, resample to a new size
// ============================================================================

use image::imageops;

use crate::canvas::PixelBuffer;
use crate::error::EditorError;
use crate::ops::selection::SelectionRect;

/// Interpolation method for resize operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
    Lanczos3,
}

impl Interpolation {
    pub fn label(&self) -> &'static str {
        match self {
            Interpolation::Nearest  => "Nearest",
            Interpolation::Bilinear => "Bilinear",
            Interpolation::Bicubic  => "Bicubic",
            Interpolation::Lanczos3 => "Lanczos3",
        }
    }

    pub fn all() -> &'static [Interpolation] {
        &[
            Interpolation::Nearest,
            Interpolation::Bilinear,
            Interpolation::Bicubic,
            Interpolation::Lanczos3,
        ]
    }

    /// Config-file name.
    pub fn key(&self) -> &'static str {
        match self {
            Interpolation::Nearest  => "nearest",
            Interpolation::Bilinear => "bilinear",
            Interpolation::Bicubic  => "bicubic",
            Interpolation::Lanczos3 => "lanczos3",
        }
    }

    pub fn from_key(key: &str) -> Option<Interpolation> {
        match key.trim().to_lowercase().as_str() {
            "nearest"            => Some(Interpolation::Nearest),
            "bilinear" | "linear" => Some(Interpolation::Bilinear),
            "bicubic" | "cubic"  => Some(Interpolation::Bicubic),
            "lanczos3" | "lanczos" => Some(Interpolation::Lanczos3),
            _                    => None,
        }
    }

    pub fn to_filter(&self) -> imageops::FilterType {
        match self {
            Interpolation::Nearest  => imageops::FilterType::Nearest,
            Interpolation::Bilinear => imageops::FilterType::Triangle,
            Interpolation::Bicubic  => imageops::FilterType::CatmullRom,
            Interpolation::Lanczos3 => imageops::FilterType::Lanczos3,
        }
    }
}

/// Inclusive bounds a resize target is clamped into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResizeBounds {
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
}

impl Default for ResizeBounds {
    fn default() -> Self {
        Self { min_width: 1, max_width: 8192, min_height: 1, max_height: 8192 }
    }
}

impl ResizeBounds {
    /// Bounds must be non-empty and never allow a zero-sized result.
    pub fn new(min_width: u32, max_width: u32, min_height: u32, max_height: u32) -> Result<Self, EditorError> {
        if min_width == 0 || min_height == 0 || min_width > max_width || min_height > max_height {
            return Err(EditorError::invalid_dimension(min_width, min_height));
        }
        Ok(Self { min_width, max_width, min_height, max_height })
    }

    /// Clamp a requested size (possibly negative or fractional, as typed into a
    /// form) into the bounds. Fractions are truncated.
    pub fn clamp(&self, width: f64, height: f64) -> (u32, u32) {
        let clamp_axis = |v: f64, lo: u32, hi: u32| -> u32 {
            if v.is_nan() {
                return lo;
            }
            v.trunc().clamp(lo as f64, hi as f64) as u32
        };
        (
            clamp_axis(width, self.min_width, self.max_width),
            clamp_axis(height, self.min_height, self.max_height),
        )
    }
}

/// Width / height of a buffer.
pub fn aspect_ratio(buf: &PixelBuffer) -> f64 {
    buf.width() as f64 / buf.height() as f64
}

/// Height that keeps `buf`'s proportions for the given width.
pub fn height_for_width(buf: &PixelBuffer, width: f64) -> f64 {
    width / aspect_ratio(buf)
}

/// Width that keeps `buf`'s proportions for the given height.
pub fn width_for_height(buf: &PixelBuffer, height: f64) -> f64 {
    height * aspect_ratio(buf)
}

/// Resample `buf` to `new_w`×`new_h`. Same size is an identity copy.
pub fn resize_buffer(
    buf: &PixelBuffer,
    new_w: u32,
    new_h: u32,
    interp: Interpolation,
) -> Result<PixelBuffer, EditorError> {
    if new_w == 0 || new_h == 0 {
        return Err(EditorError::invalid_dimension(new_w, new_h));
    }
    if buf.dimensions() == (new_w, new_h) {
        return Ok(buf.clone());
    }
    let resized = imageops::resize(buf.as_image(), new_w, new_h, interp.to_filter());
    PixelBuffer::from_image(resized)
}

/// Extract the pixels under `rect` as a new buffer. The part of `rect`
/// outside the image is clipped away, the same as for filters.
/// Rejects zero / negative sized rectangles before touching any pixel.
pub fn crop_buffer(buf: &PixelBuffer, rect: &SelectionRect) -> Result<PixelBuffer, EditorError> {
    let degenerate = || EditorError::DegenerateSelection { width: rect.width(), height: rect.height() };
    if rect.is_degenerate() {
        return Err(degenerate());
    }
    let (x, y, w, h) = rect.clipped_region(buf.width(), buf.height()).ok_or_else(degenerate)?;
    buf.read_region(x, y, w, h)
}
