//! Canvas: a thin wrapper around a [`RenderBackend`] that clamps drawing to an
//! ambient clip rectangle and translates node-local coordinates to the screen.
//!
//! Why this exists
//! - Widgets compute cell positions relative to their own bounds and routinely
//!   drift outside them. The canvas drops every cell that falls outside the
//!   current clip, so drawing never fails for out-of-range coordinates.
//! - The redraw walk narrows the clip for each node to the intersection of all
//!   ancestor frames. Narrowing goes through [`ClipGuard`], which restores the
//!   previous clip and origin when dropped, including during unwinding.

use std::ops::{Deref, DerefMut};

use ratatui::layout::Rect;
use ratatui::style::Style;

use crate::drivers::RenderBackend;
use crate::region::{clip_rect, rect_contains};

pub struct Canvas<'a> {
    backend: &'a mut dyn RenderBackend,
    /// Screen position of the local origin.
    origin: (u16, u16),
    /// Screen-space clip; `None` when everything is clipped away.
    clip: Option<Rect>,
}

impl<'a> Canvas<'a> {
    /// Canvas covering the whole backend screen.
    pub fn new(backend: &'a mut dyn RenderBackend) -> Self {
        let screen = Rect::new(0, 0, backend.cols(), backend.rows());
        backend.set_clip(screen);
        Self {
            backend,
            origin: (0, 0),
            clip: (!screen.is_empty()).then_some(screen),
        }
    }

    pub fn clip(&self) -> Option<Rect> {
        self.clip
    }

    pub fn origin(&self) -> (u16, u16) {
        self.origin
    }

    /// Moves the local origin to `area.x/area.y` and narrows the clip to
    /// `clip` intersected with the current one, both in screen coordinates.
    pub fn scoped(&mut self, area: Rect, clip: Rect) -> ClipGuard<'_, 'a> {
        let narrowed = self.clip.and_then(|current| clip_rect(current, clip));
        let prev_backend = self.backend.set_clip(narrowed.unwrap_or_default());
        let guard = ClipGuard {
            prev_origin: self.origin,
            prev_clip: self.clip,
            prev_backend,
            canvas: self,
        };
        guard.canvas.origin = (area.x, area.y);
        guard.canvas.clip = narrowed;
        guard
    }

    /// Runs `f` with the clip narrowed to `local` (node coordinates).
    pub fn with_clip<R>(&mut self, local: Rect, f: impl FnOnce(&mut Canvas<'a>) -> R) -> R {
        let area = self.to_screen(local);
        let (x, y) = self.origin;
        let mut guard = self.scoped(Rect::new(x, y, 0, 0), area);
        f(&mut guard)
    }

    pub fn to_screen(&self, local: Rect) -> Rect {
        Rect::new(
            self.origin.0.saturating_add(local.x),
            self.origin.1.saturating_add(local.y),
            local.width,
            local.height,
        )
    }

    pub fn set_style(&mut self, style: Style) {
        self.backend.set_attribute(style);
    }

    /// Writes one grapheme cluster at a local cell. Cells outside the clip
    /// are ignored.
    pub fn put(&mut self, column: u16, row: u16, grapheme: &str) {
        let Some(clip) = self.clip else {
            return;
        };
        let (Some(x), Some(y)) = (
            self.origin.0.checked_add(column),
            self.origin.1.checked_add(row),
        ) else {
            return;
        };
        if !rect_contains(clip, x, y) {
            return;
        }
        self.backend.move_to(x, y);
        self.backend.write_grapheme(grapheme);
    }

    /// Writes pre-segmented cells left to right starting at a local cell.
    pub fn put_cells<S: AsRef<str>>(&mut self, column: u16, row: u16, cells: &[S], style: Style) {
        self.set_style(style);
        for (offset, cell) in cells.iter().enumerate() {
            let Ok(offset) = u16::try_from(offset) else {
                break;
            };
            let Some(col) = column.checked_add(offset) else {
                break;
            };
            self.put(col, row, cell.as_ref());
        }
    }

    /// Fills a local rectangle with one grapheme.
    pub fn fill(&mut self, area: Rect, grapheme: &str, style: Style) {
        self.set_style(style);
        for row in area.y..area.bottom() {
            for col in area.x..area.right() {
                self.put(col, row, grapheme);
            }
        }
    }
}

/// Scoped clip narrowing. Dereferences to the canvas; restores the previous
/// origin and clip on drop.
pub struct ClipGuard<'c, 'a> {
    canvas: &'c mut Canvas<'a>,
    prev_origin: (u16, u16),
    prev_clip: Option<Rect>,
    prev_backend: Rect,
}

impl<'a> Deref for ClipGuard<'_, 'a> {
    type Target = Canvas<'a>;

    fn deref(&self) -> &Self::Target {
        self.canvas
    }
}

impl DerefMut for ClipGuard<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.canvas
    }
}

impl Drop for ClipGuard<'_, '_> {
    fn drop(&mut self) {
        self.canvas.backend.set_clip(self.prev_backend);
        self.canvas.origin = self.prev_origin;
        self.canvas.clip = self.prev_clip;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::buffer::BufferBackend;
    use ratatui::buffer::Buffer;

    fn symbol(buffer: &Buffer, x: u16, y: u16) -> String {
        buffer.cell((x, y)).map(|c| c.symbol().to_string()).unwrap_or_default()
    }

    #[test]
    fn put_clips_to_scoped_area() {
        let mut buffer = Buffer::empty(Rect::new(0, 0, 6, 3));
        let mut backend = BufferBackend::new(&mut buffer);
        let mut canvas = Canvas::new(&mut backend);
        {
            let area = Rect::new(2, 1, 2, 1);
            let mut scoped = canvas.scoped(area, area);
            scoped.put_cells(0, 0, &["a", "b", "c"], Style::default());
            // Row outside the clip is dropped silently.
            scoped.put(0, 1, "z");
        }
        assert_eq!(canvas.clip(), Some(Rect::new(0, 0, 6, 3)));
        assert_eq!(canvas.origin(), (0, 0));
        drop(canvas);
        assert_eq!(symbol(&buffer, 2, 1), "a");
        assert_eq!(symbol(&buffer, 3, 1), "b");
        assert_eq!(symbol(&buffer, 4, 1), " ");
        assert_eq!(symbol(&buffer, 2, 2), " ");
    }

    #[test]
    fn nested_scopes_only_narrow() {
        let mut buffer = Buffer::empty(Rect::new(0, 0, 8, 8));
        let mut backend = BufferBackend::new(&mut buffer);
        let mut canvas = Canvas::new(&mut backend);
        let mut outer = canvas.scoped(Rect::new(1, 1, 4, 4), Rect::new(1, 1, 4, 4));
        {
            // Wider than the outer clip: clamped to it.
            let inner = outer.scoped(Rect::new(3, 3, 10, 10), Rect::new(3, 3, 10, 10));
            assert_eq!(inner.clip(), Some(Rect::new(3, 3, 2, 2)));
        }
        assert_eq!(outer.clip(), Some(Rect::new(1, 1, 4, 4)));
        let disjoint = outer.scoped(Rect::new(6, 6, 1, 1), Rect::new(6, 6, 1, 1));
        assert_eq!(disjoint.clip(), None);
    }

    #[test]
    fn clip_restored_when_scope_unwinds() {
        let mut buffer = Buffer::empty(Rect::new(0, 0, 4, 4));
        let mut backend = BufferBackend::new(&mut buffer);
        let mut canvas = Canvas::new(&mut backend);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            canvas.with_clip(Rect::new(1, 1, 1, 1), |_| panic!("draw failed"));
        }));
        assert!(result.is_err());
        assert_eq!(canvas.clip(), Some(Rect::new(0, 0, 4, 4)));
        canvas.put(3, 3, "x");
        drop(canvas);
        assert_eq!(symbol(&buffer, 3, 3), "x");
    }
}
