//! Shared draw context
//!
//! `DrawContext` carries the node state a widget needs while painting. It
//! keeps the `Drawable` trait stable and spares widgets from reaching back
//! into the tree for focus or geometry.

use ratatui::layout::Rect;

/// Context passed to `Drawable::draw` describing the node being painted.
///
/// - `bounds`: the node's own rectangle, origin always (0,0).
/// - `damage`: the part of `bounds` that must be repainted.
/// - `focused`: whether the node is on the active focus path.
/// - `enabled`: whether the node accepts input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawContext {
    bounds: Rect,
    damage: Rect,
    focused: bool,
    enabled: bool,
}

impl DrawContext {
    /// Create a context that damages the whole of `bounds`.
    pub const fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            damage: bounds,
            focused: false,
            enabled: true,
        }
    }

    pub const fn bounds(&self) -> Rect {
        self.bounds
    }

    pub const fn damage(&self) -> Rect {
        self.damage
    }

    pub const fn focused(&self) -> bool {
        self.focused
    }

    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    pub const fn with_damage(mut self, damage: Rect) -> Self {
        self.damage = damage;
        self
    }

    pub const fn with_focus(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
