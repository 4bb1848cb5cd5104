//! Per-node state stored in the tree arena.

use std::collections::HashMap;
use std::fmt;

use ratatui::layout::Rect;

use crate::actions::Command;
use crate::components::Widget;
use crate::keybindings::KeyBindings;
use crate::layout::Expr;
use crate::observers::Hooks;
use crate::tree::Tree;

slotmap::new_key_type! {
    /// Stable handle to a node. Stays valid until the node is destroyed.
    pub struct NodeId;
}

/// How the node's frame is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    /// The frame is set directly and never touched by the resolver.
    #[default]
    Absolute,
    /// The frame is computed from the X/Y/Width/Height expressions.
    Computed,
}

/// Handler for a bound [`Command`]. `None` means the command does not apply
/// right now and the next bound command should be tried.
pub type CommandHandler = Box<dyn FnMut(&mut Tree, NodeId) -> Option<bool>>;

pub struct Node {
    pub(crate) name: String,
    pub(crate) frame: Rect,
    pub(crate) layout_mode: LayoutMode,
    pub(crate) x: Option<Expr>,
    pub(crate) y: Option<Expr>,
    pub(crate) width: Option<Expr>,
    pub(crate) height: Option<Expr>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) tab_order: Vec<NodeId>,
    pub(crate) focused: Option<NodeId>,
    pub(crate) has_focus: bool,
    pub(crate) can_focus: bool,
    pub(crate) tab_stop: bool,
    pub(crate) visible: bool,
    pub(crate) enabled: bool,
    pub(crate) damage: Option<Rect>,
    pub(crate) child_damage: bool,
    pub(crate) layout_needed: bool,
    pub(crate) commands: HashMap<Command, CommandHandler>,
    pub(crate) bindings: KeyBindings,
    pub(crate) widget: Option<Box<dyn Widget>>,
    pub(crate) hooks: Hooks,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frame: Rect::default(),
            layout_mode: LayoutMode::Absolute,
            x: None,
            y: None,
            width: None,
            height: None,
            parent: None,
            children: Vec::new(),
            tab_order: Vec::new(),
            focused: None,
            has_focus: false,
            can_focus: false,
            tab_stop: true,
            visible: true,
            enabled: true,
            damage: None,
            child_damage: false,
            layout_needed: true,
            commands: HashMap::new(),
            bindings: KeyBindings::new(),
            widget: None,
            hooks: Hooks::default(),
        }
    }

    pub fn with_frame(mut self, frame: Rect) -> Self {
        self.frame = frame;
        self.layout_mode = LayoutMode::Absolute;
        self
    }

    pub fn with_x(mut self, expr: impl Into<Expr>) -> Self {
        self.x = Some(expr.into());
        self.layout_mode = LayoutMode::Computed;
        self
    }

    pub fn with_y(mut self, expr: impl Into<Expr>) -> Self {
        self.y = Some(expr.into());
        self.layout_mode = LayoutMode::Computed;
        self
    }

    pub fn with_width(mut self, expr: impl Into<Expr>) -> Self {
        self.width = Some(expr.into());
        self.layout_mode = LayoutMode::Computed;
        self
    }

    pub fn with_height(mut self, expr: impl Into<Expr>) -> Self {
        self.height = Some(expr.into());
        self.layout_mode = LayoutMode::Computed;
        self
    }

    pub fn focusable(mut self, can_focus: bool) -> Self {
        self.can_focus = can_focus;
        self
    }

    pub fn tab_stop(mut self, tab_stop: bool) -> Self {
        self.tab_stop = tab_stop;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_widget(mut self, widget: impl Widget) -> Self {
        self.widget = Some(Box::new(widget));
        self
    }

    pub fn with_bindings(mut self, bindings: KeyBindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    /// The frame moved to the origin.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.frame.width, self.frame.height)
    }

    pub fn layout_mode(&self) -> LayoutMode {
        self.layout_mode
    }

    pub fn x(&self) -> Option<&Expr> {
        self.x.as_ref()
    }

    pub fn y(&self) -> Option<&Expr> {
        self.y.as_ref()
    }

    pub fn width(&self) -> Option<&Expr> {
        self.width.as_ref()
    }

    pub fn height(&self) -> Option<&Expr> {
        self.height.as_ref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Paint order; the last child is topmost.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn tab_order(&self) -> &[NodeId] {
        &self.tab_order
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    pub fn can_focus(&self) -> bool {
        self.can_focus
    }

    pub fn is_tab_stop(&self) -> bool {
        self.tab_stop
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn damage(&self) -> Option<Rect> {
        self.damage
    }

    pub fn child_damage(&self) -> bool {
        self.child_damage
    }

    pub fn layout_needed(&self) -> bool {
        self.layout_needed
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut KeyBindings {
        &mut self.bindings
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    pub fn has_widget(&self) -> bool {
        self.widget.is_some()
    }

    /// Whether tab navigation may land here.
    pub(crate) fn is_tab_candidate(&self) -> bool {
        self.can_focus && self.tab_stop && self.visible && self.enabled
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("frame", &self.frame)
            .field("layout_mode", &self.layout_mode)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("focused", &self.focused)
            .field("has_focus", &self.has_focus)
            .field("can_focus", &self.can_focus)
            .field("damage", &self.damage)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_switches_layout_mode() {
        let node = Node::new("a").with_x(Expr::Center).with_width(10);
        assert_eq!(node.layout_mode(), LayoutMode::Computed);
        assert!(node.x().is_some());
        let node = node.with_frame(Rect::new(3, 4, 5, 6));
        assert_eq!(node.layout_mode(), LayoutMode::Absolute);
        assert_eq!(node.bounds(), Rect::new(0, 0, 5, 6));
    }

    #[test]
    fn tab_candidate_requires_every_flag() {
        assert!(!Node::new("a").is_tab_candidate());
        assert!(Node::new("a").focusable(true).is_tab_candidate());
        assert!(!Node::new("a").focusable(true).tab_stop(false).is_tab_candidate());
        assert!(!Node::new("a").focusable(true).visible(false).is_tab_candidate());
        assert!(!Node::new("a").focusable(true).enabled(false).is_tab_candidate());
    }
}
