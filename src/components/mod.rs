//! Capabilities a node's widget can provide.
//!
//! The tree never names concrete widget types. It stores a `Box<dyn Widget>`
//! and calls through the four capability traits below; every method except
//! `draw` has a do-nothing default so simple widgets stay small.

use crossterm::event::{KeyEvent, MouseEvent};

pub mod text_block;

pub use text_block::TextBlock;

use std::any::Any;

pub use crate::component_context::DrawContext;
use crate::ui::Canvas;

/// What a widget wants done with the mouse after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseReply {
    #[default]
    Ignored,
    Handled,
    /// Handled; route every following mouse event here until released.
    Grab,
    /// Handled; give up a grab held by this node.
    Release,
}

impl MouseReply {
    pub fn handled(self) -> bool {
        !matches!(self, MouseReply::Ignored)
    }
}

pub trait Drawable {
    /// Paints the node. Coordinates are local to the node's bounds; the
    /// canvas drops anything outside the clip.
    fn draw(&mut self, canvas: &mut Canvas<'_>, ctx: &DrawContext);
}

pub trait Focusable {
    fn on_focus_change(&mut self, _focused: bool) {}
}

pub trait KeyHandled {
    fn on_key(&mut self, _key: &KeyEvent) -> bool {
        false
    }

    fn on_hot_key(&mut self, _key: &KeyEvent) -> bool {
        false
    }

    fn on_cold_key(&mut self, _key: &KeyEvent) -> bool {
        false
    }
}

pub trait MouseHandled {
    /// `event` column/row are relative to the node's bounds.
    fn on_mouse(&mut self, _event: &MouseEvent) -> MouseReply {
        MouseReply::Ignored
    }
}

pub trait Widget: Drawable + Focusable + KeyHandled + MouseHandled + Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Drawable + Focusable + KeyHandled + MouseHandled + Any> Widget for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
