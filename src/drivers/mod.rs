pub mod buffer;
pub mod console;

use ::crossterm::event::Event;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use std::io;
use std::time::Duration;

pub trait InputDriver {
    fn poll(&mut self, timeout: Duration) -> io::Result<bool>;
    fn read(&mut self) -> io::Result<Event>;
    fn set_mouse_capture(&mut self, _enabled: bool) -> io::Result<()> {
        Ok(())
    }
}

impl<T: InputDriver + ?Sized> InputDriver for &mut T {
    fn poll(&mut self, timeout: Duration) -> io::Result<bool> {
        (**self).poll(timeout)
    }

    fn read(&mut self) -> io::Result<Event> {
        (**self).read()
    }

    fn set_mouse_capture(&mut self, enabled: bool) -> io::Result<()> {
        (**self).set_mouse_capture(enabled)
    }
}

/// Cell-level drawing surface the redraw walk paints through.
///
/// Implementations must ignore writes outside the current clip and outside
/// their own extent; callers never check.
pub trait RenderBackend {
    fn set_attribute(&mut self, style: Style);
    fn move_to(&mut self, col: u16, row: u16);
    /// Writes one grapheme cluster at the cursor and advances it one cell.
    fn write_grapheme(&mut self, cluster: &str);
    /// Replaces the clip rectangle, returning the previous one.
    fn set_clip(&mut self, clip: Rect) -> Rect;
    fn cols(&self) -> u16;
    fn rows(&self) -> u16;
}

/// Presents finished frames to the user.
pub trait OutputDriver {
    fn enter(&mut self) -> io::Result<()>;
    fn exit(&mut self) -> io::Result<()>;
    fn size(&self) -> io::Result<Rect>;
    fn present(&mut self, screen: &Buffer) -> io::Result<()>;
}
