//! [`RenderBackend`] over an off-screen `ratatui` buffer.
//!
//! The event loop keeps one persistent screen buffer and redraws only damaged
//! cells into it, so undamaged cells keep whatever was painted in earlier
//! ticks. The finished buffer is handed to an `OutputDriver` for presentation.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;

use super::RenderBackend;
use crate::region::rect_contains;

pub struct BufferBackend<'a> {
    buffer: &'a mut Buffer,
    cursor: (u16, u16),
    style: Style,
    clip: Rect,
}

impl<'a> BufferBackend<'a> {
    pub fn new(buffer: &'a mut Buffer) -> Self {
        let clip = buffer.area;
        Self {
            buffer,
            cursor: (clip.x, clip.y),
            style: Style::default(),
            clip,
        }
    }

    pub fn cursor(&self) -> (u16, u16) {
        self.cursor
    }
}

impl RenderBackend for BufferBackend<'_> {
    fn set_attribute(&mut self, style: Style) {
        self.style = style;
    }

    fn move_to(&mut self, col: u16, row: u16) {
        self.cursor = (col, row);
    }

    fn write_grapheme(&mut self, cluster: &str) {
        let (x, y) = self.cursor;
        if rect_contains(self.clip, x, y)
            && let Some(cell) = self.buffer.cell_mut((x, y))
        {
            // Attributes replace whatever the cell held before.
            cell.reset();
            cell.set_symbol(cluster).set_style(self.style);
        }
        self.cursor.0 = x.saturating_add(1);
    }

    fn set_clip(&mut self, clip: Rect) -> Rect {
        std::mem::replace(&mut self.clip, clip)
    }

    fn cols(&self) -> u16 {
        self.buffer.area.right()
    }

    fn rows(&self) -> u16 {
        self.buffer.area.bottom()
    }
}
