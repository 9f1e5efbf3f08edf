// ============================================================================
// HISTOGRAM — 256-bucket brightness counts and a bar-chart rendering
// ============================================================================

use crate::canvas::PixelBuffer;
use crate::error::EditorError;
use crate::ops::filters::average_luma;

pub const BUCKETS: usize = 256;

/// Bar colour, rgba(255, 0, 0, 0.8).
pub const BAR_COLOR: [u8; 4] = [255, 0, 0, 204];

/// Brightness histogram of a region: one count per luma value 0..=255.
///
/// Computing it is O(width × height), so it is only ever done on request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Histogram {
    counts: [u32; BUCKETS],
}

impl Default for Histogram {
    fn default() -> Self {
        Self { counts: [0; BUCKETS] }
    }
}

impl Histogram {
    /// Count every pixel of `region` by round((R + G + B) / 3).
    pub fn compute(region: &PixelBuffer) -> Self {
        let mut counts = [0u32; BUCKETS];
        for px in region.as_raw().chunks_exact(4) {
            counts[average_luma(px[0], px[1], px[2]) as usize] += 1;
        }
        Self { counts }
    }

    pub fn counts(&self) -> &[u32; BUCKETS] {
        &self.counts
    }

    pub fn count(&self, luma: u8) -> u32 {
        self.counts[luma as usize]
    }

    /// Number of pixels counted.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// Largest bucket count.
    pub fn max_count(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Luma value of the largest bucket (lowest value wins ties).
    pub fn peak(&self) -> Option<u8> {
        let max = self.max_count();
        if max == 0 {
            return None;
        }
        self.counts.iter().position(|&c| c == max).map(|i| i as u8)
    }

    /// Mean luma, or `None` for an empty histogram.
    pub fn mean(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let weighted: u64 = self
            .counts
            .iter()
            .enumerate()
            .map(|(i, &c)| i as u64 * c as u64)
            .sum();
        Some(weighted as f64 / total as f64)
    }

    /// Draw the histogram as bottom-aligned bars scaled so the tallest bucket
    /// fills the full height. Bucket 0 is on the left.
    pub fn render(&self, width: u32, height: u32) -> Result<PixelBuffer, EditorError> {
        let mut out = PixelBuffer::allocate(width, height)?;
        let max = self.max_count();
        if max == 0 {
            return Ok(out);
        }

        let bar_w = width as f64 / BUCKETS as f64;
        let scale = height as f64 / max as f64;
        for x in 0..width {
            let bucket = ((x as f64 + 0.5) / bar_w) as usize;
            let count = self.counts[bucket.min(BUCKETS - 1)];
            let bar_h = (count as f64 * scale).round() as u32;
            for y in height - bar_h.min(height)..height {
                out.put_pixel(x, y, BAR_COLOR);
            }
        }
        Ok(out)
    }
}
