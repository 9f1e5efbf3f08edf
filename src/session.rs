// ============================================================================
// EDITOR SESSION — canonical/visible buffers, active effect, selection
// ============================================================================
//
// The canonical buffer is the source of truth for pixel content. The visible
// buffer is what the user sees: the active filter run over the canonical
// buffer (whole image, or only the selected sub-rectangle), plus any text
// drawn on top. Crop and resize read from the visible buffer and the result
// becomes the new canonical image.
//
// Every failure is non-fatal: it is logged, handed back as an `Err`, and the
// session is left exactly as it was.

use std::fmt;
use std::str::FromStr;

use crate::canvas::PixelBuffer;
use crate::error::EditorError;
use crate::io::{self, CodecError};
use crate::ops::filters::{apply_filter, Filter};
use crate::ops::histogram::Histogram;
use crate::ops::selection::{
    Corner, CornerHandle, ScreenPoint, ScreenRect, SelectionModel, SelectionRect, SelectionState,
};
use crate::ops::text::{self, FontProvider, SystemFonts};
use crate::ops::transform::{self, Interpolation, ResizeBounds};
use crate::settings::EditorSettings;
use crate::{log_info, log_warn};

/// Which filter or session action is active. Exactly one at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum EffectKind {
    #[default]
    Normal,
    Grayscale,
    RedOnly,
    Sepia,
    Threshold,
    Invert,
    Delete,
    Crop,
    Resize,
    AddText,
    Select,
    Deselect,
    ShowHistogram,
    HideHistogram,
}

impl EffectKind {
    pub fn all() -> &'static [EffectKind] {
        &[
            EffectKind::Normal,
            EffectKind::Grayscale,
            EffectKind::RedOnly,
            EffectKind::Sepia,
            EffectKind::Threshold,
            EffectKind::Invert,
            EffectKind::Delete,
            EffectKind::Crop,
            EffectKind::Resize,
            EffectKind::AddText,
            EffectKind::Select,
            EffectKind::Deselect,
            EffectKind::ShowHistogram,
            EffectKind::HideHistogram,
        ]
    }

    /// The string tag a front end sends for this kind.
    pub fn tag(&self) -> &'static str {
        match self {
            EffectKind::Normal        => "normal",
            EffectKind::Grayscale     => "grayscale",
            EffectKind::RedOnly       => "redonly",
            EffectKind::Sepia         => "sepia",
            EffectKind::Threshold     => "threshold",
            EffectKind::Invert        => "invert",
            EffectKind::Delete        => "delete",
            EffectKind::Crop          => "crop",
            EffectKind::Resize        => "resize",
            EffectKind::AddText       => "addtext",
            EffectKind::Select        => "select",
            EffectKind::Deselect      => "deselect",
            EffectKind::ShowHistogram => "showhistogram",
            EffectKind::HideHistogram => "hidehistogram",
        }
    }

    /// The pixel filter behind this kind, `None` for session actions.
    pub fn filter(&self) -> Option<Filter> {
        match self {
            EffectKind::Normal    => Some(Filter::Normal),
            EffectKind::Grayscale => Some(Filter::Grayscale),
            EffectKind::RedOnly   => Some(Filter::RedOnly),
            EffectKind::Sepia     => Some(Filter::Sepia),
            EffectKind::Threshold => Some(Filter::Threshold),
            EffectKind::Invert    => Some(Filter::Invert),
            EffectKind::Delete    => Some(Filter::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for EffectKind {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "normal"        => EffectKind::Normal,
            "grayscale"     => EffectKind::Grayscale,
            "redonly"       => EffectKind::RedOnly,
            "sepia"         => EffectKind::Sepia,
            "threshold"     => EffectKind::Threshold,
            "invert"        => EffectKind::Invert,
            "delete"        => EffectKind::Delete,
            "crop"          => EffectKind::Crop,
            "resize" | "re-resize"   => EffectKind::Resize,
            "addtext" | "addedtext"  => EffectKind::AddText,
            "select"        => EffectKind::Select,
            "deselect"      => EffectKind::Deselect,
            "showhistogram" => EffectKind::ShowHistogram,
            "hidehistogram" => EffectKind::HideHistogram,
            _ => return Err(EditorError::UnknownEffect(Some(s.to_string()))),
        };
        Ok(kind)
    }
}

/// Log a failed operation and pass the result through unchanged.
fn logged<T>(op: &str, result: Result<T, EditorError>) -> Result<T, EditorError> {
    if let Err(e) = &result {
        log_warn!("{}: {}", op, e);
    }
    result
}

/// One open image and everything the editor knows about it.
pub struct EditorSession {
    canonical: Option<PixelBuffer>,
    visible: Option<PixelBuffer>,
    /// Selection border layer, same size as the visible buffer.
    overlay: Option<PixelBuffer>,
    selection: SelectionModel,
    effect: EffectKind,
    histogram_visible: bool,
    histogram: Option<Histogram>,
    /// Where the visible surface is shown on screen. `None` means 1:1 at the origin.
    display: Option<ScreenRect>,
    settings: EditorSettings,
    fonts: Box<dyn FontProvider>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    pub fn new() -> Self {
        Self::with_settings(EditorSettings::default())
    }

    pub fn with_settings(settings: EditorSettings) -> Self {
        Self {
            canonical: None,
            visible: None,
            overlay: None,
            selection: SelectionModel::new(),
            effect: EffectKind::Normal,
            histogram_visible: false,
            histogram: None,
            display: None,
            settings,
            fonts: Box::new(SystemFonts),
        }
    }

    /// Replace the font source used by [`EditorSession::add_text`].
    pub fn with_fonts(mut self, fonts: impl FontProvider + 'static) -> Self {
        self.fonts = Box::new(fonts);
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn canonical(&self) -> Option<&PixelBuffer> {
        self.canonical.as_ref()
    }

    pub fn visible(&self) -> Option<&PixelBuffer> {
        self.visible.as_ref()
    }

    pub fn overlay(&self) -> Option<&PixelBuffer> {
        self.overlay.as_ref()
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn selection_state(&self) -> SelectionState {
        self.selection.state()
    }

    pub fn effect(&self) -> EffectKind {
        self.effect
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut EditorSettings {
        &mut self.settings
    }

    pub fn is_histogram_visible(&self) -> bool {
        self.histogram_visible
    }

    /// Last histogram computed while the histogram was shown.
    pub fn histogram(&self) -> Option<&Histogram> {
        self.histogram.as_ref()
    }

    /// On-screen bounds of the visible surface.
    pub fn display_bounds(&self) -> Option<ScreenRect> {
        self.display
    }

    fn surface(&self) -> ScreenRect {
        match (self.display, &self.visible) {
            (Some(rect), _) => rect,
            (None, Some(buf)) => ScreenRect::unscaled(buf.width(), buf.height()),
            (None, None) => ScreenRect::default(),
        }
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Load decoded RGBA pixels as the new image.
    pub fn load_image(&mut self, pixels: Vec<u8>, width: u32, height: u32) -> Result<(), EditorError> {
        let buf = logged("load_image", PixelBuffer::from_rgba(width, height, pixels))?;
        self.load_buffer(buf);
        Ok(())
    }

    /// Replace the canonical buffer and reset effect, selection and histogram.
    pub fn load_buffer(&mut self, buf: PixelBuffer) {
        log_info!("Loaded {}x{} image", buf.width(), buf.height());
        self.effect = EffectKind::Normal;
        self.histogram = None;
        self.install(buf);
    }

    /// Make `buf` both canonical and visible, dropping the selection.
    fn install(&mut self, buf: PixelBuffer) {
        let (w, h) = buf.dimensions();
        // Same size as `buf`, which already passed the dimension check.
        self.overlay = PixelBuffer::allocate(w, h).ok();
        self.selection.deselect();
        self.display = None;
        self.visible = Some(buf.clone());
        self.canonical = Some(buf);
        self.refresh_histogram();
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    /// Make `kind` the active effect and re-render. Selecting the effect that
    /// is already active does nothing.
    pub fn set_effect(&mut self, kind: EffectKind) -> Result<(), EditorError> {
        logged("set_effect", self.set_effect_inner(kind))
    }

    /// [`EditorSession::set_effect`] from a string tag. A missing or unknown
    /// tag is reported as [`EditorError::UnknownEffect`].
    pub fn set_effect_by_name(&mut self, name: Option<&str>) -> Result<(), EditorError> {
        let kind = match name {
            Some(tag) => tag.parse::<EffectKind>(),
            None => Err(EditorError::UnknownEffect(None)),
        };
        logged("set_effect", kind.and_then(|k| self.set_effect_inner(k)))
    }

    fn set_effect_inner(&mut self, kind: EffectKind) -> Result<(), EditorError> {
        if kind == self.effect {
            return Ok(());
        }
        let previous = self.effect;
        self.effect = kind;
        if let Err(e) = self.render_inner() {
            self.effect = previous;
            return Err(e);
        }
        log_info!("Effect: {}", kind);
        Ok(())
    }

    /// Re-derive the visible buffer for the active effect.
    pub fn render(&mut self) -> Result<(), EditorError> {
        logged("render", self.render_inner())
    }

    fn render_inner(&mut self) -> Result<(), EditorError> {
        if let Some(filter) = self.effect.filter() {
            return self.render_filter(filter);
        }
        match self.effect {
            EffectKind::Select => {
                if !self.selection.is_active() {
                    self.enter_selection(None)?;
                }
                Ok(())
            }
            EffectKind::Deselect => {
                self.leave_selection();
                Ok(())
            }
            EffectKind::Crop => self.crop_inner(),
            EffectKind::ShowHistogram => self.show_histogram_inner(),
            EffectKind::HideHistogram => {
                self.hide_histogram();
                Ok(())
            }
            // Form driven: applied through `resize` / `add_text`.
            EffectKind::Resize | EffectKind::AddText => {
                self.require_image()?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Run `filter` over the canonical buffer into the visible one. With an
    /// active selection only the selected rectangle is replaced; everything
    /// outside keeps its last rendered content.
    fn render_filter(&mut self, filter: Filter) -> Result<(), EditorError> {
        let region = self.active_region()?;
        let canonical = self.canonical.as_ref().ok_or(EditorError::NoImageLoaded)?;
        let visible = self.visible.as_mut().ok_or(EditorError::NoImageLoaded)?;
        match region {
            None => *visible = apply_filter(filter, canonical),
            Some((x, y, w, h)) => {
                let src = canonical.read_region(x, y, w, h)?;
                visible.write_region(&apply_filter(filter, &src), x, y)?;
            }
        }
        self.refresh_histogram();
        Ok(())
    }

    fn require_image(&self) -> Result<&PixelBuffer, EditorError> {
        self.visible.as_ref().ok_or(EditorError::NoImageLoaded)
    }

    /// The selected pixel rectangle clipped to the image, `None` without a
    /// selection.
    fn active_region(&self) -> Result<Option<(i32, i32, i32, i32)>, EditorError> {
        let visible = self.require_image()?;
        let Some(rect) = self.selection.rect() else { return Ok(None) };

        let (w, h) = visible.dimensions();
        match rect.normalized().clipped_region(w, h) {
            Some(region) => Ok(Some(region)),
            None => Err(EditorError::DegenerateSelection { width: rect.width(), height: rect.height() }),
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Enter selection mode with the whole image selected.
    pub fn select(&mut self) -> Result<(), EditorError> {
        logged("select", self.enter_selection(None))?;
        self.effect = EffectKind::Select;
        Ok(())
    }

    /// Enter selection mode with an explicit rectangle in image coordinates.
    pub fn select_rect(&mut self, rect: SelectionRect) -> Result<(), EditorError> {
        logged("select", self.enter_selection(Some(rect)))?;
        self.effect = EffectKind::Select;
        Ok(())
    }

    /// Leave selection mode, discarding the rectangle, its handles and border.
    pub fn deselect(&mut self) {
        self.leave_selection();
        self.effect = EffectKind::Deselect;
    }

    fn enter_selection(&mut self, rect: Option<SelectionRect>) -> Result<(), EditorError> {
        let (w, h) = self.require_image()?.dimensions();
        let rect = rect.unwrap_or_else(|| SelectionRect::full(w, h));
        self.selection.set_rect(rect, w, h);
        self.redraw_border();
        self.refresh_histogram();
        Ok(())
    }

    fn leave_selection(&mut self) {
        self.selection.deselect();
        self.redraw_border();
        self.refresh_histogram();
    }

    fn redraw_border(&mut self) {
        if let Some(overlay) = self.overlay.as_mut() {
            self.selection.draw_border(overlay);
        }
    }

    /// Record where the visible surface is displayed; handle positions and
    /// drag coordinates are mapped through it.
    pub fn set_display_bounds(&mut self, bounds: ScreenRect) {
        self.display = Some(bounds);
    }

    /// The four corner handles in screen space, `None` while not selecting.
    pub fn handles(&self) -> Option<[CornerHandle; 4]> {
        self.selection.handles(&self.surface())
    }

    /// Pointer pressed on `corner`'s handle. Returns `true` when a drag started.
    pub fn press_handle(&mut self, corner: Corner, button: u8) -> bool {
        self.selection.press(corner, button)
    }

    /// Pointer moved over `corner`'s handle while dragging. Returns `true`
    /// when the selection changed.
    pub fn drag_handle(&mut self, corner: Corner, point: ScreenPoint) -> bool {
        let surface = self.surface();
        if !self.selection.move_corner(corner, point, &surface) {
            return false;
        }
        self.redraw_border();
        true
    }

    /// Pointer pressed anywhere: starts a drag when it lands on a handle.
    pub fn pointer_down(&mut self, point: ScreenPoint, button: u8) -> bool {
        match self.selection.hit_test(point, &self.surface()) {
            Some(corner) => self.press_handle(corner, button),
            None => false,
        }
    }

    /// Pointer moved anywhere: drags the pressed handle, if any.
    pub fn pointer_move(&mut self, point: ScreenPoint) -> bool {
        match self.selection.dragged_corner() {
            Some(corner) => self.drag_handle(corner, point),
            None => false,
        }
    }

    /// Global pointer release. Ends any drag and refreshes the histogram for
    /// the new region.
    pub fn release_pointer(&mut self) {
        let was_dragging = self.selection.is_dragging();
        self.selection.release();
        if was_dragging {
            self.refresh_histogram();
        }
    }

    // ------------------------------------------------------------------
    // Crop / resize
    // ------------------------------------------------------------------

    /// Replace the image with the selected rectangle of what is currently
    /// shown. Without a selection this silently does nothing.
    pub fn crop(&mut self) -> Result<(), EditorError> {
        logged("crop", self.crop_inner())
    }

    fn crop_inner(&mut self) -> Result<(), EditorError> {
        let visible = self.require_image()?;
        let Some(rect) = self.selection.rect() else { return Ok(()) };
        let cropped = transform::crop_buffer(visible, &rect)?;
        log_info!("Cropped to {}x{}", cropped.width(), cropped.height());
        self.install(cropped);
        self.effect = EffectKind::Crop;
        Ok(())
    }

    /// Resize using the bounds and interpolation from the settings.
    pub fn resize(&mut self, width: f64, height: f64) -> Result<(), EditorError> {
        let bounds = self.settings.resize_bounds;
        let interp = self.settings.interpolation;
        self.resize_with(width, height, bounds, interp)
    }

    /// Resample what is currently shown to `width`×`height`, clamped into
    /// `bounds`. The result becomes the new image and any selection ends.
    pub fn resize_with(
        &mut self,
        width: f64,
        height: f64,
        bounds: ResizeBounds,
        interp: Interpolation,
    ) -> Result<(), EditorError> {
        let result = self.require_image().and_then(|visible| {
            let (w, h) = bounds.clamp(width, height);
            transform::resize_buffer(visible, w, h, interp)
        });
        let resized = logged("resize", result)?;
        log_info!("Resized to {}x{} ({})", resized.width(), resized.height(), interp.label());
        self.install(resized);
        self.effect = EffectKind::Resize;
        Ok(())
    }

    /// Visible width / height, for keeping a resize form proportional.
    pub fn aspect_ratio(&self) -> Result<f64, EditorError> {
        logged("aspect_ratio", self.require_image().map(transform::aspect_ratio))
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    /// Draw one line of text onto the visible buffer with its baseline at
    /// `baseline_y`. The canonical buffer is untouched, so the next filter
    /// render discards the text. Returns whether any pixel was painted.
    pub fn add_text(
        &mut self,
        text: &str,
        family: &str,
        size_px: f32,
        color: [u8; 4],
        x: f32,
        baseline_y: f32,
    ) -> Result<bool, EditorError> {
        let result = self.require_image().and_then(|_| {
            self.fonts
                .resolve(family)
                .ok_or_else(|| EditorError::FontUnavailable(family.to_string()))
        });
        let font = logged("add_text", result)?;
        let Some(visible) = self.visible.as_mut() else { return Ok(false) };
        let painted = text::draw_text(visible, &font, text, size_px, color, x, baseline_y);
        if painted {
            self.refresh_histogram();
        }
        Ok(painted)
    }

    // ------------------------------------------------------------------
    // Histogram
    // ------------------------------------------------------------------

    /// Luma histogram of what is shown: the selected rectangle if there is
    /// one, else the whole image. O(pixels), so only on request.
    pub fn compute_histogram(&self) -> Result<Histogram, EditorError> {
        logged("histogram", self.compute_histogram_inner())
    }

    fn compute_histogram_inner(&self) -> Result<Histogram, EditorError> {
        let visible = self.require_image()?;
        match self.active_region()? {
            None => Ok(Histogram::compute(visible)),
            Some((x, y, w, h)) => Ok(Histogram::compute(&visible.read_region(x, y, w, h)?)),
        }
    }

    pub fn show_histogram(&mut self) -> Result<(), EditorError> {
        logged("show_histogram", self.show_histogram_inner())
    }

    fn show_histogram_inner(&mut self) -> Result<(), EditorError> {
        let hist = self.compute_histogram_inner()?;
        self.histogram_visible = true;
        self.histogram = Some(hist);
        Ok(())
    }

    pub fn hide_histogram(&mut self) {
        self.histogram_visible = false;
        self.histogram = None;
    }

    /// Recompute the cached histogram if it is shown. Returns whether it was
    /// recomputed.
    pub fn refresh_histogram(&mut self) -> bool {
        if !self.histogram_visible {
            return false;
        }
        self.histogram = self.compute_histogram_inner().ok();
        self.histogram.is_some()
    }

    /// The shown histogram drawn as a bar chart at the configured size.
    pub fn histogram_image(&self) -> Result<Option<PixelBuffer>, EditorError> {
        let Some(hist) = self.histogram.as_ref() else { return Ok(None) };
        let img = hist.render(self.settings.histogram_width, self.settings.histogram_height);
        logged("histogram", img).map(Some)
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    /// The visible buffer with the selection border blended on top, as the
    /// user sees it.
    pub fn composited(&self) -> Result<PixelBuffer, EditorError> {
        let mut out = logged("composite", self.require_image())?.clone();
        if self.selection.is_active()
            && let Some(overlay) = self.overlay.as_ref()
        {
            for (dst, src) in out.as_raw_mut().chunks_exact_mut(4).zip(overlay.as_raw().chunks_exact(4)) {
                if src[3] > 0 {
                    text::blend_over(dst, [src[0], src[1], src[2], src[3]]);
                }
            }
        }
        Ok(out)
    }

    /// Encode what is shown as JPEG. `None` uses the configured quality.
    pub fn export_jpeg(&self, quality: Option<u8>) -> Result<Vec<u8>, CodecError> {
        let visible = logged("export", self.require_image())?;
        let q = quality.unwrap_or(self.settings.jpeg_quality);
        let bytes = io::encode_jpeg(visible, q)?;
        log_info!("Exported {} ({} bytes, quality {})", self.settings.export_name, bytes.len(), q);
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::selection::PRIMARY_BUTTON;

    fn session_with(w: u32, h: u32, rgba: [u8; 4]) -> EditorSession {
        let mut session = EditorSession::new();
        session.load_buffer(PixelBuffer::filled(w, h, rgba).unwrap());
        session
    }

    #[test]
    fn tags_parse_case_insensitively_with_aliases() {
        for kind in EffectKind::all() {
            assert_eq!(kind.tag().parse::<EffectKind>().unwrap(), *kind);
            assert_eq!(kind.tag().to_uppercase().parse::<EffectKind>().unwrap(), *kind);
        }
        assert_eq!("re-resize".parse::<EffectKind>().unwrap(), EffectKind::Resize);
        assert_eq!("addedText".parse::<EffectKind>().unwrap(), EffectKind::AddText);
        assert_eq!(
            "blur".parse::<EffectKind>(),
            Err(EditorError::UnknownEffect(Some("blur".to_string())))
        );
    }

    #[test]
    fn operations_before_load_fail() {
        let mut session = EditorSession::new();
        assert_eq!(session.set_effect(EffectKind::Invert), Err(EditorError::NoImageLoaded));
        assert_eq!(session.effect(), EffectKind::Normal);
        assert_eq!(session.select(), Err(EditorError::NoImageLoaded));
        assert_eq!(session.crop(), Err(EditorError::NoImageLoaded));
        assert_eq!(session.resize(10.0, 10.0), Err(EditorError::NoImageLoaded));
        assert!(session.compute_histogram().is_err());
        assert!(session.export_jpeg(None).is_err());
    }

    #[test]
    fn load_rejects_wrong_length() {
        let mut session = EditorSession::new();
        assert!(session.load_image(vec![0; 15], 2, 2).is_err());
        assert!(session.visible().is_none());
        session.load_image(vec![7; 16], 2, 2).unwrap();
        assert_eq!(session.canonical().unwrap().pixel(1, 1), [7, 7, 7, 7]);
    }

    #[test]
    fn unknown_or_missing_effect_leaves_state() {
        let mut session = session_with(2, 2, [10, 20, 30, 255]);
        session.set_effect(EffectKind::Invert).unwrap();
        let before = session.visible().unwrap().clone();
        assert!(session.set_effect_by_name(Some("posterize")).is_err());
        assert_eq!(session.set_effect_by_name(None), Err(EditorError::UnknownEffect(None)));
        assert_eq!(session.effect(), EffectKind::Invert);
        assert_eq!(session.visible().unwrap(), &before);
    }

    #[test]
    fn filter_applies_inside_selection_only() {
        let mut session = session_with(6, 6, [200, 100, 50, 255]);
        session.select_rect(SelectionRect::new(4.0, 4.0, 2.0, 2.0)).unwrap();
        session.set_effect(EffectKind::Invert).unwrap();
        let visible = session.visible().unwrap();
        assert_eq!(visible.pixel(2, 2), [55, 155, 205, 255]);
        assert_eq!(visible.pixel(3, 3), [55, 155, 205, 255]);
        assert_eq!(visible.pixel(4, 4), [200, 100, 50, 255]);
        assert_eq!(visible.pixel(1, 1), [200, 100, 50, 255]);
        // canonical is never touched by a filter
        assert_eq!(session.canonical().unwrap().pixel(2, 2), [200, 100, 50, 255]);
    }

    #[test]
    fn outside_selection_keeps_last_render() {
        let mut session = session_with(4, 4, [255, 0, 0, 255]);
        session.set_effect(EffectKind::Grayscale).unwrap();
        session.select_rect(SelectionRect::new(0.0, 0.0, 2.0, 2.0)).unwrap();
        session.set_effect(EffectKind::Invert).unwrap();
        let visible = session.visible().unwrap();
        assert_eq!(visible.pixel(0, 0), [0, 255, 255, 255]);
        assert_eq!(visible.pixel(3, 3), [85, 85, 85, 255]);
    }

    #[test]
    fn degenerate_selection_rejected_by_filters() {
        let mut session = session_with(4, 4, [0, 0, 0, 255]);
        session.select_rect(SelectionRect::new(1.0, 1.0, 1.0, 3.0)).unwrap();
        assert!(matches!(
            session.set_effect(EffectKind::Invert),
            Err(EditorError::DegenerateSelection { .. })
        ));
        assert_eq!(session.effect(), EffectKind::Select);
    }

    #[test]
    fn crop_takes_selection_from_visible() {
        let mut session = session_with(8, 8, [0, 0, 0, 255]);
        session.set_effect(EffectKind::Invert).unwrap();
        session.select_rect(SelectionRect::new(2.0, 2.0, 5.0, 6.0)).unwrap();
        session.crop().unwrap();
        assert_eq!(session.canonical().unwrap().dimensions(), (3, 4));
        assert_eq!(session.canonical().unwrap().pixel(0, 0), [255, 255, 255, 255]);
        assert_eq!(session.visible(), session.canonical());
        assert_eq!(session.overlay().unwrap().dimensions(), (3, 4));
        assert_eq!(session.selection_state(), SelectionState::Inactive);
    }

    #[test]
    fn crop_without_selection_is_silent() {
        let mut session = session_with(5, 5, [1, 2, 3, 255]);
        assert_eq!(session.crop(), Ok(()));
        assert_eq!(session.canonical().unwrap().dimensions(), (5, 5));
    }

    #[test]
    fn degenerate_crop_changes_nothing() {
        let mut session = session_with(5, 5, [1, 2, 3, 255]);
        session.select_rect(SelectionRect::new(3.0, 1.0, 3.0, 4.0)).unwrap();
        assert!(matches!(session.crop(), Err(EditorError::DegenerateSelection { .. })));
        assert_eq!(session.canonical().unwrap().dimensions(), (5, 5));
        assert!(session.selection().is_active());
    }

    #[test]
    fn resize_clamps_and_exits_selection() {
        let mut session = session_with(10, 10, [9, 9, 9, 255]);
        session.select().unwrap();
        let bounds = ResizeBounds::new(1, 20, 1, 20).unwrap();
        session.resize_with(50.0, 4.0, bounds, Interpolation::Nearest).unwrap();
        assert_eq!(session.canonical().unwrap().dimensions(), (20, 4));
        assert_eq!(session.visible().unwrap().pixel(19, 3), [9, 9, 9, 255]);
        assert!(!session.selection().is_active());
        assert_eq!(session.aspect_ratio(), Ok(5.0));
    }

    #[test]
    fn crop_clips_selection_hanging_off_the_image() {
        let mut session = session_with(10, 10, [4, 5, 6, 255]);
        session.select_rect(SelectionRect::new(5.0, 5.0, 12.0, 12.0)).unwrap();
        session.set_effect(EffectKind::Invert).unwrap();
        session.crop().unwrap();
        let canonical = session.canonical().unwrap();
        assert_eq!(canonical.dimensions(), (5, 5));
        assert!(canonical.as_raw().chunks_exact(4).all(|px| px == [251, 250, 249, 255]));
    }

    #[test]
    fn select_after_direct_crop_reenters_selection() {
        let mut session = session_with(10, 10, [0, 0, 0, 255]);
        session.select_rect(SelectionRect::new(2.0, 2.0, 8.0, 8.0)).unwrap();
        session.crop().unwrap();
        assert_eq!(session.effect(), EffectKind::Crop);
        assert_eq!(session.selection_state(), SelectionState::Inactive);

        session.set_effect(EffectKind::Select).unwrap();
        assert_eq!(session.selection_state(), SelectionState::Active);
        assert_eq!(session.selection().rect(), Some(SelectionRect::full(6, 6)));
    }

    #[test]
    fn select_after_direct_resize_reenters_selection() {
        let mut session = session_with(10, 10, [0, 0, 0, 255]);
        session.set_effect(EffectKind::Select).unwrap();
        session.resize(5.0, 5.0).unwrap();
        assert_eq!(session.effect(), EffectKind::Resize);
        assert_eq!(session.selection_state(), SelectionState::Inactive);

        session.set_effect(EffectKind::Select).unwrap();
        assert_eq!(session.selection_state(), SelectionState::Active);
        assert!(session.handles().is_some());
        assert_eq!(session.selection().rect(), Some(SelectionRect::full(5, 5)));
    }

    #[test]
    fn repeating_active_effect_leaves_visible_alone() {
        let mut session = session_with(10, 10, [0, 0, 0, 255]);
        session.select().unwrap();
        assert!(session.press_handle(Corner::BottomRight, PRIMARY_BUTTON));
        assert!(session.drag_handle(Corner::BottomRight, ScreenPoint::new(5.0, 5.0)));
        session.release_pointer();
        session.set_effect(EffectKind::Invert).unwrap();
        assert_eq!(session.visible().unwrap().pixel(4, 4), [255, 255, 255, 255]);
        assert_eq!(session.visible().unwrap().pixel(7, 7), [0, 0, 0, 255]);

        // grow the selection; only a real effect change re-renders into it
        assert!(session.press_handle(Corner::BottomRight, PRIMARY_BUTTON));
        assert!(session.drag_handle(Corner::BottomRight, ScreenPoint::new(9.0, 9.0)));
        session.release_pointer();
        let before = session.visible().unwrap().clone();
        session.set_effect(EffectKind::Invert).unwrap();
        assert_eq!(session.visible().unwrap(), &before);
        assert_eq!(session.visible().unwrap().pixel(7, 7), [0, 0, 0, 255]);

        session.set_effect(EffectKind::Grayscale).unwrap();
        assert_eq!(session.visible().unwrap().pixel(7, 7), [0, 0, 0, 255]);
        session.set_effect(EffectKind::Invert).unwrap();
        assert_eq!(session.visible().unwrap().pixel(7, 7), [255, 255, 255, 255]);
    }

    #[test]
    fn drag_through_session_redraws_border() {
        let mut session = session_with(100, 100, [0, 0, 0, 255]);
        session.select().unwrap();
        session.set_display_bounds(ScreenRect::new(0.0, 0.0, 50.0, 50.0));
        assert!(session.pointer_down(ScreenPoint::new(2.0, 2.0), PRIMARY_BUTTON));
        assert!(session.pointer_move(ScreenPoint::new(10.0, 20.0)));
        session.release_pointer();
        assert!(!session.selection().is_dragging());
        assert_eq!(session.selection().rect(), Some(SelectionRect::new(20.0, 40.0, 100.0, 100.0)));

        let overlay = session.overlay().unwrap();
        assert_eq!(overlay.pixel(20, 40)[3], 255);
        assert_eq!(overlay.pixel(5, 5), [0, 0, 0, 0]);
        let shown = session.composited().unwrap();
        assert_eq!(shown.pixel(25, 45), crate::ops::selection::BORDER_COLOR);
    }

    #[test]
    fn drag_outside_surface_is_ignored() {
        let mut session = session_with(10, 10, [0, 0, 0, 255]);
        session.select().unwrap();
        assert!(session.press_handle(Corner::BottomRight, PRIMARY_BUTTON));
        assert!(!session.drag_handle(Corner::BottomRight, ScreenPoint::new(15.0, 5.0)));
        assert_eq!(session.selection().rect(), Some(SelectionRect::full(10, 10)));
    }

    #[test]
    fn secondary_button_does_not_drag() {
        let mut session = session_with(10, 10, [0, 0, 0, 255]);
        session.select().unwrap();
        assert!(!session.press_handle(Corner::TopLeft, 2));
        assert!(!session.drag_handle(Corner::TopLeft, ScreenPoint::new(5.0, 5.0)));
    }

    #[test]
    fn histogram_follows_visibility_flag() {
        let mut session = session_with(4, 4, [255, 0, 0, 255]);
        assert!(!session.refresh_histogram());
        assert!(session.histogram().is_none());

        session.set_effect(EffectKind::ShowHistogram).unwrap();
        assert!(session.is_histogram_visible());
        assert_eq!(session.histogram().unwrap().count(85), 16);

        session.select_rect(SelectionRect::new(0.0, 0.0, 2.0, 1.0)).unwrap();
        assert_eq!(session.histogram().unwrap().total(), 2);
        assert_eq!(session.histogram_image().unwrap().unwrap().dimensions(), (256, 100));

        session.set_effect(EffectKind::HideHistogram).unwrap();
        assert!(session.histogram().is_none());
        assert_eq!(session.histogram_image(), Ok(None));
    }

    #[test]
    fn histogram_reads_selection_at_its_offset() {
        let mut session = session_with(4, 4, [0, 0, 0, 255]);
        let mut img = session.canonical().unwrap().clone();
        img.put_pixel(3, 3, [255, 255, 255, 255]);
        session.load_buffer(img);
        session.select_rect(SelectionRect::new(2.0, 2.0, 4.0, 4.0)).unwrap();
        let hist = session.compute_histogram().unwrap();
        assert_eq!(hist.total(), 4);
        assert_eq!(hist.count(255), 1);
        assert_eq!(hist.count(0), 3);
    }

    #[test]
    fn missing_font_is_reported() {
        struct NoFonts;
        impl FontProvider for NoFonts {
            fn resolve(&self, _family: &str) -> Option<ab_glyph::FontArc> {
                None
            }
        }
        let mut session = EditorSession::new().with_fonts(NoFonts);
        session.load_buffer(PixelBuffer::filled(8, 8, [255, 255, 255, 255]).unwrap());
        let before = session.visible().unwrap().clone();
        assert_eq!(
            session.add_text("hi", "Nope Sans", 12.0, [0, 0, 0, 255], 0.0, 10.0),
            Err(EditorError::FontUnavailable("Nope Sans".to_string()))
        );
        assert_eq!(session.visible().unwrap(), &before);
    }

    #[test]
    fn export_uses_configured_quality() {
        let mut session = session_with(8, 8, [10, 200, 10, 255]);
        session.settings_mut().jpeg_quality = 50;
        let low = session.export_jpeg(None).unwrap();
        let high = session.export_jpeg(Some(100)).unwrap();
        assert_eq!(&low[..2], &[0xFF, 0xD8]);
        assert!(high.len() >= low.len());
    }
}
