// ============================================================================
// RECTANGULAR SELECTION — region of interest, corner handles, drag resize
// ============================================================================
//
// The rectangle is the only piece of state. The four corner handles are
// derived from it (and from where the surface is shown on screen) every time
// they are asked for, so dragging one corner can never leave a sibling handle
// out of sync.

use crate::canvas::PixelBuffer;

/// Side length of a corner handle, in screen pixels.
pub const HANDLE_SIZE: f64 = 10.0;

/// Width of the selection border stroke, in buffer pixels.
pub const BORDER_WIDTH: u32 = 10;

/// Crimson.
pub const BORDER_COLOR: [u8; 4] = [220, 20, 60, 255];

/// Only the primary pointer button starts a handle drag.
pub const PRIMARY_BUTTON: u8 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in screen space, e.g. the on-screen bounds of the
/// selection surface.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl ScreenRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, right: left + width, bottom: top + height }
    }

    /// Surface shown 1:1 at the screen origin.
    pub fn unscaled(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f64, height as f64)
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Strict containment: points on the edge are outside.
    pub fn contains_strict(&self, p: ScreenPoint) -> bool {
        p.x > self.left && p.x < self.right && p.y > self.top && p.y < self.bottom
    }

    /// Half-open containment, used for handle hit testing.
    pub fn contains(&self, p: ScreenPoint) -> bool {
        p.x >= self.left && p.x < self.right && p.y >= self.top && p.y < self.bottom
    }
}

/// Selection rectangle in canonical-buffer coordinates. Coordinates may be
/// fractional and, mid-drag, start may pass end.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionRect {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
}

impl SelectionRect {
    pub fn new(start_x: f64, start_y: f64, end_x: f64, end_y: f64) -> Self {
        Self { start_x, start_y, end_x, end_y }
    }

    /// Whole-buffer bounds.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f64, height as f64)
    }

    pub fn width(&self) -> f64 {
        self.end_x - self.start_x
    }

    pub fn height(&self) -> f64 {
        self.end_y - self.start_y
    }

    /// Zero or negative area.
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Same area with `start <= end` on both axes.
    pub fn normalized(&self) -> Self {
        Self {
            start_x: self.start_x.min(self.end_x),
            start_y: self.start_y.min(self.end_y),
            end_x: self.start_x.max(self.end_x),
            end_y: self.start_y.max(self.end_y),
        }
    }

    /// Integer `(x, y, w, h)` region. Each value is truncated toward zero,
    /// which is how a 2D canvas converts fractional region arguments.
    pub fn pixel_region(&self) -> (i32, i32, i32, i32) {
        (
            self.start_x.trunc() as i32,
            self.start_y.trunc() as i32,
            self.width().trunc() as i32,
            self.height().trunc() as i32,
        )
    }

    /// [`SelectionRect::pixel_region`] intersected with a `width`×`height`
    /// image. `None` when nothing of the rectangle lies inside it.
    pub fn clipped_region(&self, width: u32, height: u32) -> Option<(i32, i32, i32, i32)> {
        let (x, y, w, h) = self.pixel_region();
        let (x, y, w, h) = (x as i64, y as i64, w as i64, h as i64);
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(width as i64);
        let y1 = (y + h).min(height as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as i32, y0 as i32, (x1 - x0) as i32, (y1 - y0) as i32))
    }

    /// Buffer-space position of one corner.
    pub fn corner_point(&self, corner: Corner) -> (f64, f64) {
        let x = if corner.is_left() { self.start_x } else { self.end_x };
        let y = if corner.is_top() { self.start_y } else { self.end_y };
        (x, y)
    }
}

/// One of the four corner handles, indexed 0..=3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub fn all() -> [Corner; 4] {
        [Corner::TopLeft, Corner::TopRight, Corner::BottomLeft, Corner::BottomRight]
    }

    pub fn index(self) -> usize {
        match self {
            Corner::TopLeft     => 0,
            Corner::TopRight    => 1,
            Corner::BottomLeft  => 2,
            Corner::BottomRight => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Corner> {
        Corner::all().get(index).copied()
    }

    pub fn is_left(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::BottomLeft)
    }

    pub fn is_top(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::TopRight)
    }
}

/// A corner handle as it appears on screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CornerHandle {
    pub corner: Corner,
    /// Screen position of the rectangle corner this handle controls.
    pub anchor: ScreenPoint,
}

impl CornerHandle {
    /// The handle box, tucked inside the rectangle at its corner.
    pub fn bounds(&self) -> ScreenRect {
        let left = if self.corner.is_left() { self.anchor.x } else { self.anchor.x - HANDLE_SIZE };
        let top = if self.corner.is_top() { self.anchor.y } else { self.anchor.y - HANDLE_SIZE };
        ScreenRect::new(left, top, HANDLE_SIZE, HANDLE_SIZE)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionState {
    Inactive,
    Active,
}

/// Active selection rectangle plus the global drag flag.
#[derive(Clone, Debug, Default)]
pub struct SelectionModel {
    rect: Option<SelectionRect>,
    /// Canonical buffer size the rectangle lives in.
    extent: (u32, u32),
    /// Corner whose handle is being dragged.
    drag: Option<Corner>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        if self.rect.is_some() { SelectionState::Active } else { SelectionState::Inactive }
    }

    pub fn is_active(&self) -> bool {
        self.rect.is_some()
    }

    pub fn rect(&self) -> Option<SelectionRect> {
        self.rect
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn dragged_corner(&self) -> Option<Corner> {
        self.drag
    }

    /// Enter selection mode with the rectangle covering the whole buffer.
    pub fn select(&mut self, width: u32, height: u32) {
        self.set_rect(SelectionRect::full(width, height), width, height);
    }

    /// Enter selection mode with an explicit rectangle.
    pub fn set_rect(&mut self, rect: SelectionRect, width: u32, height: u32) {
        self.extent = (width, height);
        self.rect = Some(rect);
        self.drag = None;
    }

    /// Leave selection mode, dropping the rectangle and its handles.
    pub fn deselect(&mut self) {
        self.rect = None;
        self.drag = None;
    }

    /// Buffer → screen, through the surface's displayed bounds.
    pub fn to_screen(&self, x: f64, y: f64, surface: &ScreenRect) -> ScreenPoint {
        let (w, h) = self.extent;
        ScreenPoint {
            x: surface.left + x * surface.width() / w.max(1) as f64,
            y: surface.top + y * surface.height() / h.max(1) as f64,
        }
    }

    /// Screen → buffer: `(screen - origin) * extent / displayed_extent`.
    pub fn to_buffer(&self, p: ScreenPoint, surface: &ScreenRect) -> (f64, f64) {
        let (w, h) = self.extent;
        (
            (p.x - surface.left) * w as f64 / surface.width(),
            (p.y - surface.top) * h as f64 / surface.height(),
        )
    }

    /// All four handles, or `None` while inactive.
    pub fn handles(&self, surface: &ScreenRect) -> Option<[CornerHandle; 4]> {
        let rect = self.rect?;
        Some(Corner::all().map(|corner| {
            let (x, y) = rect.corner_point(corner);
            CornerHandle { corner, anchor: self.to_screen(x, y, surface) }
        }))
    }

    /// The handle under `point`, if any.
    pub fn hit_test(&self, point: ScreenPoint, surface: &ScreenRect) -> Option<Corner> {
        self.handles(surface)?
            .into_iter()
            .find(|h| h.bounds().contains(point))
            .map(|h| h.corner)
    }

    /// Pointer pressed on a handle. Returns `true` when a drag started.
    pub fn press(&mut self, corner: Corner, button: u8) -> bool {
        if self.rect.is_none() || button != PRIMARY_BUTTON {
            return false;
        }
        self.drag = Some(corner);
        true
    }

    /// Pointer moved over `corner`'s handle. Moves that corner to the pointer
    /// and returns `true` when the rectangle changed.
    ///
    /// Nothing happens unless a drag is in progress and the pointer is strictly
    /// inside the displayed surface; outside it the rectangle simply stops
    /// following (no clamping).
    pub fn move_corner(&mut self, corner: Corner, point: ScreenPoint, surface: &ScreenRect) -> bool {
        if self.drag.is_none() {
            return false;
        }
        if surface.width() <= 0.0 || surface.height() <= 0.0 || !surface.contains_strict(point) {
            return false;
        }
        let (bx, by) = self.to_buffer(point, surface);
        let Some(rect) = self.rect.as_mut() else { return false };

        if corner.is_left() { rect.start_x = bx } else { rect.end_x = bx }
        if corner.is_top() { rect.start_y = by } else { rect.end_y = by }
        true
    }

    /// Global pointer release: ends the drag whichever handle started it.
    pub fn release(&mut self) {
        self.drag = None;
    }

    /// Clear `overlay` and stroke the selection border inside the rectangle.
    pub fn draw_border(&self, overlay: &mut PixelBuffer) {
        overlay.fill([0, 0, 0, 0]);
        let Some(rect) = self.rect else { return };

        let r = rect.normalized();
        let (ow, oh) = (overlay.width() as f64, overlay.height() as f64);
        let x0 = r.start_x.max(0.0).floor() as u32;
        let y0 = r.start_y.max(0.0).floor() as u32;
        let x1 = r.end_x.min(ow).ceil().max(0.0) as u32;
        let y1 = r.end_y.min(oh).ceil().max(0.0) as u32;
        let bw = BORDER_WIDTH as f64;

        for y in y0..y1 {
            let cy = y as f64 + 0.5;
            let near_y = cy < r.start_y + bw || cy > r.end_y - bw;
            for x in x0..x1 {
                let cx = x as f64 + 0.5;
                if near_y || cx < r.start_x + bw || cx > r.end_x - bw {
                    overlay.put_pixel(x, y, BORDER_COLOR);
                }
            }
        }
    }
}
