//! Positions already-shaped lines inside a node.
//!
//! Shaping and wrapping happen upstream; each line arrives as a list of
//! grapheme clusters, one per cell. The block paints them top-left aligned,
//! blanks the rest of the damaged area and lets the canvas clip overflow.

use crossterm::event::KeyEvent;
use ratatui::style::Style;

use super::{DrawContext, Drawable, Focusable, KeyHandled, MouseHandled};
use crate::constants::BLANK_GRAPHEME;
use crate::ui::Canvas;

#[derive(Debug, Clone, Default)]
pub struct TextBlock {
    lines: Vec<Vec<String>>,
    style: Style,
    focused_style: Option<Style>,
    has_focus: bool,
    keys_seen: usize,
}

impl TextBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// One cell per `char`. Callers with multi-codepoint clusters should use
    /// [`TextBlock::from_cells`].
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines = lines
            .into_iter()
            .map(|line| line.as_ref().chars().map(String::from).collect())
            .collect();
        Self {
            lines,
            ..Self::default()
        }
    }

    pub fn from_cells(lines: Vec<Vec<String>>) -> Self {
        Self {
            lines,
            ..Self::default()
        }
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_focused_style(mut self, style: Style) -> Self {
        self.focused_style = Some(style);
        self
    }

    pub fn set_lines(&mut self, lines: Vec<Vec<String>>) {
        self.lines = lines;
    }

    pub fn lines(&self) -> &[Vec<String>] {
        &self.lines
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    /// Keys offered to this block through the normal phase.
    pub fn keys_seen(&self) -> usize {
        self.keys_seen
    }
}

impl Drawable for TextBlock {
    fn draw(&mut self, canvas: &mut Canvas<'_>, ctx: &DrawContext) {
        let style = match (ctx.focused(), self.focused_style) {
            (true, Some(style)) => style,
            _ => self.style,
        };
        canvas.fill(ctx.damage(), BLANK_GRAPHEME, style);
        let damage = ctx.damage();
        for (row, line) in self.lines.iter().enumerate() {
            let Ok(row) = u16::try_from(row) else {
                break;
            };
            if row < damage.y || row >= damage.bottom() {
                continue;
            }
            canvas.put_cells(0, row, line, style);
        }
    }
}

impl Focusable for TextBlock {
    fn on_focus_change(&mut self, focused: bool) {
        self.has_focus = focused;
    }
}

impl KeyHandled for TextBlock {
    fn on_key(&mut self, _key: &KeyEvent) -> bool {
        self.keys_seen += 1;
        false
    }
}

impl MouseHandled for TextBlock {}
