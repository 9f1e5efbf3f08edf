// ============================================================================
// IMAGE FILTERS — grayscale, red-only, sepia, threshold, invert, delete
// ============================================================================

use rayon::prelude::*;

use crate::canvas::PixelBuffer;

/// Luma level above which [`Filter::Threshold`] turns a pixel white.
pub const THRESHOLD_LEVEL: u8 = 128;

/// Per-pixel filter. Every variant maps a region to a region of the same
/// size and never touches the alpha channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Filter {
    #[default]
    Normal,
    Grayscale,
    RedOnly,
    Sepia,
    Threshold,
    Invert,
    /// Fill white.
    Delete,
}

impl Filter {
    pub fn label(&self) -> &'static str {
        match self {
            Filter::Normal    => "Normal",
            Filter::Grayscale => "Grayscale",
            Filter::RedOnly   => "Red Only",
            Filter::Sepia     => "Sepia",
            Filter::Threshold => "Threshold",
            Filter::Invert    => "Invert",
            Filter::Delete    => "Delete",
        }
    }

    pub fn all() -> &'static [Filter] {
        &[
            Filter::Normal,
            Filter::Grayscale,
            Filter::RedOnly,
            Filter::Sepia,
            Filter::Threshold,
            Filter::Invert,
            Filter::Delete,
        ]
    }

    /// Run the filter on `region`, returning a new buffer of identical size.
    pub fn apply(&self, region: &PixelBuffer) -> PixelBuffer {
        let mut out = region.clone();
        self.apply_in_place(&mut out);
        out
    }

    /// Run the filter over a buffer the caller already owns.
    /// Rows are processed in parallel; each worker only writes its own row.
    pub fn apply_in_place(&self, buf: &mut PixelBuffer) {
        if *self == Filter::Normal {
            return;
        }
        let filter = *self;
        let stride = buf.stride();
        buf.as_raw_mut().par_chunks_mut(stride).for_each(|row| {
            for px in row.chunks_exact_mut(4) {
                filter.map_pixel(px);
            }
        });
    }

    /// Transform one RGBA pixel in place.
    #[inline]
    fn map_pixel(self, px: &mut [u8]) {
        let (r, g, b) = (px[0], px[1], px[2]);
        match self {
            Filter::Normal => {}
            Filter::Grayscale => {
                let v = average_luma(r, g, b);
                px[0] = v;
                px[1] = v;
                px[2] = v;
            }
            Filter::RedOnly => {
                px[1] = 0;
                px[2] = 0;
            }
            Filter::Sepia => {
                let (r, g, b) = (r as f64, g as f64, b as f64);
                px[0] = clamp_channel(0.393 * r + 0.769 * g + 0.189 * b);
                px[1] = clamp_channel(0.349 * r + 0.686 * g + 0.168 * b);
                px[2] = clamp_channel(0.272 * r + 0.534 * g + 0.131 * b);
            }
            Filter::Threshold => {
                let v = if bt709_luma(r, g, b) > THRESHOLD_LEVEL { 255 } else { 0 };
                px[0] = v;
                px[1] = v;
                px[2] = v;
            }
            Filter::Invert => {
                px[0] = 255 - r;
                px[1] = 255 - g;
                px[2] = 255 - b;
            }
            Filter::Delete => {
                px[0] = 255;
                px[1] = 255;
                px[2] = 255;
            }
        }
    }
}

/// Run `filter` over `region` (free-function form used by the session).
pub fn apply_filter(filter: Filter, region: &PixelBuffer) -> PixelBuffer {
    filter.apply(region)
}

/// Unweighted brightness: round((R + G + B) / 3).
/// Used by Grayscale and by the histogram.
#[inline]
pub fn average_luma(r: u8, g: u8, b: u8) -> u8 {
    let sum = r as u32 + g as u32 + b as u32;
    (sum as f64 / 3.0).round() as u8
}

/// BT.709 luminance: round(0.2126 R + 0.7152 G + 0.0722 B).
#[inline]
pub fn bt709_luma(r: u8, g: u8, b: u8) -> u8 {
    clamp_channel(0.2126 * r as f64 + 0.7152 * g as f64 + 0.0722 * b as f64)
}

/// Round half away from zero, then clamp into 0..=255.
#[inline]
fn clamp_channel(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
