// ============================================================================
// TEXT OVERLAY — font lookup, single-line layout, glyph rasterization
// ============================================================================

use std::path::Path;

use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};

use crate::canvas::PixelBuffer;

/// Resolves a font family name (as typed into a form) to a loaded font.
pub trait FontProvider {
    fn resolve(&self, family: &str) -> Option<FontArc>;
}

/// Fonts installed on the system, looked up through `font-kit`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemFonts;

impl FontProvider for SystemFonts {
    fn resolve(&self, family: &str) -> Option<FontArc> {
        load_system_font(family)
    }
}

/// Always hands out the same font, whatever family is asked for.
/// Used for `--font-file` and wherever no system fonts can be relied on.
#[derive(Clone)]
pub struct SingleFont(pub FontArc);

impl FontProvider for SingleFont {
    fn resolve(&self, _family: &str) -> Option<FontArc> {
        Some(self.0.clone())
    }
}

impl std::fmt::Debug for SingleFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SingleFont(..)")
    }
}

/// Load a font by family name from the system. CSS generic families
/// (`serif`, `sans-serif`, `monospace`, `cursive`, `fantasy`) are understood.
/// Returns None if the font cannot be found.
pub fn load_system_font(family: &str) -> Option<FontArc> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::Properties;
    use font_kit::source::SystemSource;

    let name = family.trim().trim_matches(|c| c == '"' || c == '\'');
    let family_name = match name.to_lowercase().as_str() {
        "serif"      => FamilyName::Serif,
        "sans-serif" => FamilyName::SansSerif,
        "monospace"  => FamilyName::Monospace,
        "cursive"    => FamilyName::Cursive,
        "fantasy"    => FamilyName::Fantasy,
        _            => FamilyName::Title(name.to_string()),
    };

    let handle = SystemSource::new()
        .select_best_match(&[family_name], &Properties::new())
        .ok()?;
    let font = handle.load().ok()?;
    let bytes: Vec<u8> = (*font.copy_font_data()?).clone();
    FontArc::try_from_vec(bytes).ok()
}

/// Load a TrueType / OpenType file from disk.
pub fn load_font_file(path: &Path) -> Option<FontArc> {
    let bytes = std::fs::read(path).ok()?;
    FontArc::try_from_vec(bytes).ok()
}

/// Parse a CSS colour: `#rgb`, `#rrggbb`, `#rrggbbaa` or a handful of names.
pub fn parse_css_color(s: &str) -> Option<[u8; 4]> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        if !hex.is_ascii() {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
        return match hex.len() {
            3 => Some([nibble(0)?, nibble(1)?, nibble(2)?, 255]),
            6 => Some([byte(0)?, byte(2)?, byte(4)?, 255]),
            8 => Some([byte(0)?, byte(2)?, byte(4)?, byte(6)?]),
            _ => None,
        };
    }
    match s.to_lowercase().as_str() {
        "black"   => Some([0, 0, 0, 255]),
        "white"   => Some([255, 255, 255, 255]),
        "red"     => Some([255, 0, 0, 255]),
        "green"   => Some([0, 128, 0, 255]),
        "blue"    => Some([0, 0, 255, 255]),
        "yellow"  => Some([255, 255, 0, 255]),
        "crimson" => Some([220, 20, 60, 255]),
        "gray" | "grey" => Some([128, 128, 128, 255]),
        _ => None,
    }
}

/// Scale at which one em is `size_px` pixels, the way a CSS `"<n>px"` font is sized.
pub fn em_scale(font: &FontArc, size_px: f32) -> PxScale {
    match font.units_per_em() {
        Some(upm) if upm > 0.0 => PxScale::from(size_px * font.height_unscaled() / upm),
        _ => PxScale::from(size_px),
    }
}

/// Lay out a single line of text starting at x = 0.
/// Returns `(glyph ids with x offsets, total advance)`.
pub fn layout_line(font: &FontArc, text: &str, scale: PxScale) -> (Vec<(GlyphId, f32)>, f32) {
    let scaled = font.as_scaled(scale);
    let mut glyphs = Vec::with_capacity(text.len());
    let mut cursor_x = 0.0f32;
    let mut last_glyph: Option<GlyphId> = None;

    for ch in text.chars() {
        // Line breaks and tabs render as plain spaces on a single line.
        let ch = if ch.is_control() { ' ' } else { ch };
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = last_glyph {
            cursor_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, cursor_x));
        cursor_x += scaled.h_advance(glyph_id);
        last_glyph = Some(glyph_id);
    }
    (glyphs, cursor_x)
}

/// Rasterized text clipped to the canvas, positioned at (`off_x`, `off_y`).
#[derive(Clone, Debug, Default)]
pub struct RasterizedText {
    /// Non-premultiplied RGBA, `buf_w * buf_h * 4` bytes.
    pub buf: Vec<u8>,
    pub buf_w: u32,
    pub buf_h: u32,
    pub off_x: i32,
    pub off_y: i32,
}

impl RasterizedText {
    pub fn is_empty(&self) -> bool {
        self.buf_w == 0 || self.buf_h == 0
    }
}

/// Rasterize one line of text into an RGBA buffer.
///
/// `origin_x` is the left edge of the first glyph's advance box and
/// `baseline_y` the baseline, both in canvas coordinates. Output is clipped to
/// a `canvas_w`×`canvas_h` canvas.
pub fn rasterize_text(
    font: &FontArc,
    text: &str,
    size_px: f32,
    origin_x: f32,
    baseline_y: f32,
    color: [u8; 4],
    canvas_w: u32,
    canvas_h: u32,
) -> RasterizedText {
    if text.is_empty() || size_px <= 0.0 {
        return RasterizedText::default();
    }
    let scale = em_scale(font, size_px);
    let (glyphs, _) = layout_line(font, text, scale);

    let outlined: Vec<_> = glyphs
        .iter()
        .filter_map(|&(id, gx)| {
            font.outline_glyph(id.with_scale_and_position(scale, point(origin_x + gx, baseline_y)))
        })
        .collect();
    if outlined.is_empty() {
        return RasterizedText::default();
    }

    // Bounding box of all glyphs, clamped to the canvas.
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    for g in &outlined {
        let b = g.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }
    let x0 = (min_x.floor() as i32).max(0);
    let y0 = (min_y.floor() as i32).max(0);
    let x1 = (max_x.ceil() as i32).min(canvas_w as i32);
    let y1 = (max_y.ceil() as i32).min(canvas_h as i32);
    if x1 <= x0 || y1 <= y0 {
        return RasterizedText::default();
    }
    let buf_w = (x1 - x0) as u32;
    let buf_h = (y1 - y0) as u32;

    let mut coverage = vec![0.0f32; buf_w as usize * buf_h as usize];
    for g in &outlined {
        let b = g.px_bounds();
        let gx0 = b.min.x as i32;
        let gy0 = b.min.y as i32;
        g.draw(|px, py, cov| {
            let ix = gx0 + px as i32 - x0;
            let iy = gy0 + py as i32 - y0;
            if ix >= 0 && iy >= 0 && (ix as u32) < buf_w && (iy as u32) < buf_h {
                let idx = iy as usize * buf_w as usize + ix as usize;
                coverage[idx] = coverage[idx].max(cov.min(1.0));
            }
        });
    }

    // Convert coverage to RGBA
    let mut buf = vec![0u8; coverage.len() * 4];
    for (i, &cov) in coverage.iter().enumerate() {
        if cov > 0.001 {
            let idx = i * 4;
            buf[idx] = color[0];
            buf[idx + 1] = color[1];
            buf[idx + 2] = color[2];
            buf[idx + 3] = (color[3] as f32 * cov).round().min(255.0) as u8;
        }
    }

    RasterizedText { buf, buf_w, buf_h, off_x: x0, off_y: y0 }
}

/// Rasterize `text` and blend it over `dst`. Returns `true` if any pixel was touched.
pub fn draw_text(
    dst: &mut PixelBuffer,
    font: &FontArc,
    text: &str,
    size_px: f32,
    color: [u8; 4],
    x: f32,
    baseline_y: f32,
) -> bool {
    let (w, h) = dst.dimensions();
    let raster = rasterize_text(font, text, size_px, x, baseline_y, color, w, h);
    if raster.is_empty() {
        return false;
    }
    composite_over(dst, &raster);
    true
}

/// Source-over blend a rasterized block onto `dst`.
pub fn composite_over(dst: &mut PixelBuffer, raster: &RasterizedText) {
    let stride = dst.stride();
    let raw = dst.as_raw_mut();
    for row in 0..raster.buf_h as usize {
        for col in 0..raster.buf_w as usize {
            let s = (row * raster.buf_w as usize + col) * 4;
            let src = [raster.buf[s], raster.buf[s + 1], raster.buf[s + 2], raster.buf[s + 3]];
            if src[3] == 0 {
                continue;
            }
            let d = (raster.off_y as usize + row) * stride + (raster.off_x as usize + col) * 4;
            blend_over(&mut raw[d..d + 4], src);
        }
    }
}

/// Non-premultiplied source-over for a single pixel.
pub fn blend_over(dst: &mut [u8], src: [u8; 4]) {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        dst.copy_from_slice(&[0, 0, 0, 0]);
        return;
    }
    for c in 0..3 {
        let v = (src[c] as f32 * sa + dst[c] as f32 * da * (1.0 - sa)) / out_a;
        dst[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_named_colors() {
        assert_eq!(parse_css_color("#ff8000"), Some([255, 128, 0, 255]));
        assert_eq!(parse_css_color("#F80"), Some([255, 136, 0, 255]));
        assert_eq!(parse_css_color("#00000080"), Some([0, 0, 0, 128]));
        assert_eq!(parse_css_color(" Crimson "), Some([220, 20, 60, 255]));
        assert_eq!(parse_css_color("#12345"), None);
        assert_eq!(parse_css_color("#gg0000"), None);
        assert_eq!(parse_css_color("teal-ish"), None);
    }

    #[test]
    fn blend_over_opaque_and_transparent() {
        let mut px = [10, 20, 30, 255];
        blend_over(&mut px, [200, 100, 50, 255]);
        assert_eq!(px, [200, 100, 50, 255]);

        let mut px = [0, 0, 0, 0];
        blend_over(&mut px, [255, 0, 0, 128]);
        assert_eq!(px, [255, 0, 0, 128]);

        let mut px = [0, 0, 255, 255];
        blend_over(&mut px, [255, 0, 0, 0]);
        assert_eq!(px, [0, 0, 255, 255]);
    }

    #[test]
    fn composite_respects_offset() {
        let mut dst = PixelBuffer::filled(4, 4, [0, 0, 0, 255]).unwrap();
        let raster = RasterizedText {
            buf: vec![255, 255, 255, 255, 0, 0, 0, 0],
            buf_w: 2,
            buf_h: 1,
            off_x: 1,
            off_y: 2,
        };
        composite_over(&mut dst, &raster);
        assert_eq!(dst.pixel(1, 2), [255, 255, 255, 255]);
        assert_eq!(dst.pixel(2, 2), [0, 0, 0, 255]);
        assert_eq!(dst.pixel(0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn draws_with_a_system_font_when_one_exists() {
        let Some(font) = SystemFonts.resolve("sans-serif") else { return };
        let mut dst = PixelBuffer::filled(120, 40, [255, 255, 255, 255]).unwrap();
        assert!(draw_text(&mut dst, &font, "Hello", 24.0, [0, 0, 0, 255], 4.0, 30.0));
        assert!(dst.as_raw().chunks_exact(4).any(|p| p[0] < 128));
        // alpha of an opaque background never drops
        assert!(dst.as_raw().chunks_exact(4).all(|p| p[3] == 255));

        let (_, advance) = layout_line(&font, "Hello", em_scale(&font, 24.0));
        assert!(advance > 0.0);
        assert!(!draw_text(&mut dst, &font, "", 24.0, [0, 0, 0, 255], 4.0, 30.0));
        assert!(!draw_text(&mut dst, &font, "Hi", 24.0, [0, 0, 0, 255], 500.0, 30.0));
    }
}
