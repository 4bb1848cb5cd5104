//! The containment tree.
//!
//! Nodes live in a slot-map arena owned by [`Tree`]; parent and child links
//! are plain [`NodeId`]s, so there are no reference cycles and a destroyed
//! node's id simply stops resolving. Layout, focus, damage and input are
//! implemented as further `impl Tree` blocks in their own modules.

use std::time::Instant;

use ratatui::layout::Rect;
use slotmap::SlotMap;
use tracing::{debug, warn};

use crate::error::{Result, TreeError};
use crate::layout::Expr;
use crate::node::{LayoutMode, Node, NodeId};
use crate::observers::{Hooks, Membership};
use crate::region::rect_contains;
use crate::state::Runtime;

#[derive(Debug, Default)]
pub struct Tree {
    pub(crate) nodes: SlotMap<NodeId, Node>,
    pub(crate) runtime: Runtime,
}

/// Axis slot addressed by the expression setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    X,
    Y,
    Width,
    Height,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a detached node and returns its handle.
    pub fn insert(&mut self, node: Node) -> NodeId {
        let name = node.name.clone();
        let id = self.nodes.insert(node);
        debug!(node = ?id, name = %name, "node created");
        id
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id).ok_or(TreeError::MissingNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id).ok_or(TreeError::MissingNode(id))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Children in paint order; empty for unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |n| n.children.as_slice())
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.nodes.get(id).map_or("<destroyed>", |n| n.name.as_str())
    }

    pub fn frame(&self, id: NodeId) -> Option<Rect> {
        self.nodes.get(id).map(|n| n.frame)
    }

    pub fn hooks_mut(&mut self, id: NodeId) -> Result<&mut Hooks> {
        Ok(&mut self.node_mut(id)?.hooks)
    }

    /// Borrows the node's widget as its concrete type.
    pub fn widget<T: 'static>(&self, id: NodeId) -> Option<&T> {
        self.nodes
            .get(id)?
            .widget
            .as_ref()?
            .as_any()
            .downcast_ref::<T>()
    }

    pub fn widget_mut<T: 'static>(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes
            .get_mut(id)?
            .widget
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.runtime
    }

    /// Registers `top` as the top-level node input is dispatched to.
    pub fn set_top(&mut self, top: NodeId) -> Result<()> {
        self.node(top)?;
        self.runtime.set_top(Some(top));
        Ok(())
    }

    /// Whether `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = self.parent(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Parent, grandparent, ... up to the root.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.parent(node);
        while let Some(current) = cursor {
            out.push(current);
            cursor = self.parent(current);
        }
        out
    }

    pub fn root_of(&self, node: NodeId) -> NodeId {
        self.ancestors(node).last().copied().unwrap_or(node)
    }

    /// Attaches `child` as the topmost child of `parent`.
    pub fn add(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(parent)?;
        let existing = self.node(child)?.parent;
        if let Some(current) = existing {
            warn!(child = ?child, parent = ?current, "node already attached");
            return Err(TreeError::AlreadyAttached {
                child,
                parent: current,
            });
        }
        if child == parent || self.is_ancestor(child, parent) {
            warn!(child = ?child, parent = ?parent, "attach would create a cycle");
            return Err(TreeError::WouldCycle { child, parent });
        }

        let (child_can_focus, child_frame) = {
            let node = self.node_mut(child)?;
            node.parent = Some(parent);
            (node.can_focus, node.frame)
        };
        {
            let node = self.node_mut(parent)?;
            node.children.push(child);
            node.tab_order.push(child);
        }
        if child_can_focus {
            self.promote_can_focus(parent);
        }
        self.set_needs_layout(parent)?;
        self.set_needs_display(child)?;
        self.set_needs_display_rect(parent, child_frame)?;
        debug!(parent = ?parent, child = ?child, name = %self.name(child), "node attached");
        self.node_mut(parent)?
            .hooks
            .added
            .emit(&Membership { parent, child });
        Ok(())
    }

    /// Detaches `child` from its parent. Returns `false` when it was not
    /// attached.
    pub fn remove(&mut self, child: NodeId) -> Result<bool> {
        let Some(parent) = self.node(child)?.parent else {
            return Ok(false);
        };
        if self.node(child)?.has_focus {
            self.set_has_focus(child, false)?;
        }
        if let Some(grab) = self.runtime.mouse_grab()
            && (grab == child || self.is_ancestor(child, grab))
        {
            self.runtime.release_mouse();
        }
        let old_frame = {
            let node = self.node_mut(child)?;
            node.parent = None;
            node.frame
        };
        {
            let node = self.node_mut(parent)?;
            node.children.retain(|c| *c != child);
            node.tab_order.retain(|c| *c != child);
            if node.focused == Some(child) {
                node.focused = None;
            }
        }
        self.set_needs_layout(parent)?;
        self.set_needs_display_rect(parent, old_frame)?;
        debug!(parent = ?parent, child = ?child, "node detached");
        self.node_mut(parent)?
            .hooks
            .removed
            .emit(&Membership { parent, child });
        Ok(true)
    }

    /// Detaches and frees `node` and its whole subtree, children first.
    pub fn destroy(&mut self, node: NodeId) -> Result<()> {
        let children = self.node(node)?.children.clone();
        for child in children {
            self.destroy(child)?;
        }
        self.remove(node)?;
        if self.runtime.top() == Some(node) {
            self.runtime.set_top(None);
        }
        if self.runtime.mouse_grab() == Some(node) {
            self.runtime.release_mouse();
        }
        self.nodes.remove(node);
        debug!(node = ?node, "node destroyed");
        Ok(())
    }

    /// Removes every node and resets the runtime context.
    pub fn shutdown(&mut self) {
        self.nodes.clear();
        self.runtime.reset();
        debug!("tree shut down");
    }

    /// Runs queued invocations, then timers due at `now`. Returns how many
    /// callbacks ran.
    pub fn run_pending(&mut self, now: Instant) -> usize {
        let mut ran = 0;
        for job in self.runtime.take_jobs() {
            job(self);
            ran += 1;
        }
        for (token, period, mut callback) in self.runtime.take_due(now) {
            ran += 1;
            if callback(self) {
                self.runtime.rearm(token, now, period, callback);
            }
        }
        ran
    }

    fn reorder(&mut self, node: NodeId, f: impl FnOnce(&mut Vec<NodeId>, usize)) -> Result<()> {
        let Some(parent) = self.node(node)?.parent else {
            return Ok(());
        };
        let frame = self.node(node)?.frame;
        let siblings = &mut self.node_mut(parent)?.children;
        if let Some(index) = siblings.iter().position(|c| *c == node) {
            f(siblings, index);
        }
        self.set_needs_display_rect(parent, frame)
    }

    pub fn bring_to_front(&mut self, node: NodeId) -> Result<()> {
        self.reorder(node, |list, index| {
            let id = list.remove(index);
            list.push(id);
        })
    }

    pub fn send_to_back(&mut self, node: NodeId) -> Result<()> {
        self.reorder(node, |list, index| {
            let id = list.remove(index);
            list.insert(0, id);
        })
    }

    pub fn bring_forward(&mut self, node: NodeId) -> Result<()> {
        self.reorder(node, |list, index| {
            if index + 1 < list.len() {
                list.swap(index, index + 1);
            }
        })
    }

    pub fn send_backward(&mut self, node: NodeId) -> Result<()> {
        self.reorder(node, |list, index| {
            if index > 0 {
                list.swap(index, index - 1);
            }
        })
    }

    /// Places the node at `frame` and stops computing it from expressions.
    pub fn set_frame(&mut self, node: NodeId, frame: Rect) -> Result<()> {
        self.node_mut(node)?.layout_mode = LayoutMode::Absolute;
        self.apply_frame(node, frame)?;
        self.set_needs_layout(node)
    }

    fn set_expr(&mut self, node: NodeId, slot: Slot, expr: Expr) -> Result<()> {
        let n = self.node_mut(node)?;
        let target = match slot {
            Slot::X => &mut n.x,
            Slot::Y => &mut n.y,
            Slot::Width => &mut n.width,
            Slot::Height => &mut n.height,
        };
        *target = Some(expr);
        n.layout_mode = LayoutMode::Computed;
        match self.parent(node) {
            Some(parent) => self.set_needs_layout(parent),
            None => self.set_needs_layout(node),
        }
    }

    pub fn set_x(&mut self, node: NodeId, expr: impl Into<Expr>) -> Result<()> {
        self.set_expr(node, Slot::X, expr.into())
    }

    pub fn set_y(&mut self, node: NodeId, expr: impl Into<Expr>) -> Result<()> {
        self.set_expr(node, Slot::Y, expr.into())
    }

    pub fn set_width(&mut self, node: NodeId, expr: impl Into<Expr>) -> Result<()> {
        self.set_expr(node, Slot::Width, expr.into())
    }

    pub fn set_height(&mut self, node: NodeId, expr: impl Into<Expr>) -> Result<()> {
        self.set_expr(node, Slot::Height, expr.into())
    }

    /// Hiding a node drops focus from its subtree.
    pub fn set_visible(&mut self, node: NodeId, visible: bool) -> Result<()> {
        if self.node(node)?.visible == visible {
            return Ok(());
        }
        self.node_mut(node)?.visible = visible;
        if !visible {
            self.drop_focus(node)?;
        }
        self.damage_in_parent(node)
    }

    /// Disabling a node drops focus from its subtree.
    pub fn set_enabled(&mut self, node: NodeId, enabled: bool) -> Result<()> {
        if self.node(node)?.enabled == enabled {
            return Ok(());
        }
        self.node_mut(node)?.enabled = enabled;
        if !enabled {
            self.drop_focus(node)?;
        }
        self.set_needs_display(node)
    }

    fn damage_in_parent(&mut self, node: NodeId) -> Result<()> {
        match self.parent(node) {
            Some(parent) => {
                let frame = self.node(node)?.frame;
                self.set_needs_display_rect(parent, frame)
            }
            None => self.set_needs_display(node),
        }
    }

    /// The node's frame in screen coordinates.
    pub fn screen_frame(&self, node: NodeId) -> Result<Rect> {
        let frame = self.node(node)?.frame;
        self.view_to_screen_rect(node, Rect::new(0, 0, frame.width, frame.height))
    }

    /// Translates a rectangle in `node`'s own coordinates to the screen.
    pub fn view_to_screen_rect(&self, node: NodeId, rect: Rect) -> Result<Rect> {
        let (x, y) = self.view_to_screen(node, i32::from(rect.x), i32::from(rect.y))?;
        Ok(Rect::new(
            clamp_u16(x),
            clamp_u16(y),
            rect.width,
            rect.height,
        ))
    }

    /// Translates a point in `node`'s own coordinates to the screen.
    pub fn view_to_screen(&self, node: NodeId, col: i32, row: i32) -> Result<(i32, i32)> {
        let mut x = col;
        let mut y = row;
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            let n = self.node(current)?;
            x += i32::from(n.frame.x);
            y += i32::from(n.frame.y);
            cursor = n.parent;
        }
        Ok((x, y))
    }

    /// Translates a screen point into `node`'s own coordinates. The result
    /// is negative for points above or left of the node.
    pub fn screen_to_view(&self, node: NodeId, col: i32, row: i32) -> Result<(i32, i32)> {
        let (ox, oy) = self.view_to_screen(node, 0, 0)?;
        Ok((col - ox, row - oy))
    }

    /// Deepest visible node under a screen cell, preferring the topmost
    /// sibling. `None` when the cell is outside `top`.
    pub fn find_deepest(&self, top: NodeId, col: u16, row: u16) -> Option<NodeId> {
        let screen = self.screen_frame(top).ok()?;
        let top_node = self.nodes.get(top)?;
        if !top_node.visible || !rect_contains(screen, col, row) {
            return None;
        }
        let mut current = top;
        'descend: loop {
            for child in self.children(current).iter().rev() {
                let Some(node) = self.nodes.get(*child) else {
                    continue;
                };
                if !node.visible {
                    continue;
                }
                if let Ok(frame) = self.screen_frame(*child)
                    && rect_contains(frame, col, row)
                {
                    current = *child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }
}

fn clamp_u16(value: i32) -> u16 {
    u16::try_from(value.max(0)).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn with_frame(tree: &mut Tree, name: &str, frame: Rect) -> NodeId {
        tree.insert(Node::new(name).with_frame(frame))
    }

    #[test]
    fn add_rejects_attached_and_cyclic_children() {
        let mut tree = Tree::new();
        let a = with_frame(&mut tree, "a", Rect::new(0, 0, 10, 10));
        let b = with_frame(&mut tree, "b", Rect::new(0, 0, 5, 5));
        let c = with_frame(&mut tree, "c", Rect::new(0, 0, 2, 2));
        tree.add(a, b).unwrap();
        tree.add(b, c).unwrap();
        assert_eq!(
            tree.add(a, c),
            Err(TreeError::AlreadyAttached { child: c, parent: b })
        );
        assert_eq!(
            tree.add(c, a),
            Err(TreeError::WouldCycle { child: a, parent: c })
        );
        assert_eq!(tree.add(a, a), Err(TreeError::WouldCycle { child: a, parent: a }));
        assert_eq!(tree.children(a), &[b]);
        assert_eq!(tree.node(a).unwrap().tab_order(), &[b]);
        assert!(tree.is_ancestor(a, c));
        assert_eq!(tree.ancestors(c), vec![b, a]);
        assert_eq!(tree.root_of(c), a);
    }

    #[test]
    fn add_promotes_can_focus_and_notifies() {
        let mut tree = Tree::new();
        let root = with_frame(&mut tree, "root", Rect::new(0, 0, 10, 10));
        let mid = with_frame(&mut tree, "mid", Rect::new(0, 0, 10, 10));
        let leaf = tree.insert(Node::new("leaf").focusable(true));
        tree.add(root, mid).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        tree.hooks_mut(mid).unwrap().added.subscribe(move |m| {
            sink.borrow_mut().push(m.child);
            false
        });
        tree.add(mid, leaf).unwrap();
        assert!(tree.node(mid).unwrap().can_focus());
        assert!(tree.node(root).unwrap().can_focus());
        assert_eq!(*seen.borrow(), vec![leaf]);
        assert!(tree.node(root).unwrap().child_damage());
    }

    #[test]
    fn remove_detaches_and_damages_old_frame() {
        let mut tree = Tree::new();
        let root = with_frame(&mut tree, "root", Rect::new(0, 0, 20, 20));
        let child = with_frame(&mut tree, "child", Rect::new(2, 3, 4, 5));
        tree.add(root, child).unwrap();
        tree.clear_needs_display(root).unwrap();
        assert!(tree.remove(child).unwrap());
        assert!(!tree.remove(child).unwrap());
        assert_eq!(tree.parent(child), None);
        assert!(tree.children(root).is_empty());
        assert_eq!(tree.node(root).unwrap().damage(), Some(Rect::new(2, 3, 4, 5)));
    }

    #[test]
    fn destroy_frees_subtree_and_clears_top() {
        let mut tree = Tree::new();
        let root = with_frame(&mut tree, "root", Rect::new(0, 0, 20, 20));
        let child = with_frame(&mut tree, "child", Rect::new(0, 0, 5, 5));
        let grandchild = with_frame(&mut tree, "grandchild", Rect::new(0, 0, 1, 1));
        tree.add(root, child).unwrap();
        tree.add(child, grandchild).unwrap();
        tree.set_top(root).unwrap();
        tree.destroy(child).unwrap();
        assert!(!tree.contains(child));
        assert!(!tree.contains(grandchild));
        assert_eq!(tree.runtime().top(), Some(root));
        tree.destroy(root).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.runtime().top(), None);
        assert_eq!(tree.node(root).err(), Some(TreeError::MissingNode(root)));
    }

    #[test]
    fn z_order_operations_leave_tab_order_alone() {
        let mut tree = Tree::new();
        let root = with_frame(&mut tree, "root", Rect::new(0, 0, 20, 20));
        let kids: Vec<NodeId> = (0..3)
            .map(|i| with_frame(&mut tree, &format!("k{i}"), Rect::new(i, 0, 1, 1)))
            .collect();
        for k in &kids {
            tree.add(root, *k).unwrap();
        }
        tree.bring_to_front(kids[0]).unwrap();
        assert_eq!(tree.children(root), &[kids[1], kids[2], kids[0]]);
        tree.send_to_back(kids[0]).unwrap();
        assert_eq!(tree.children(root), &[kids[0], kids[1], kids[2]]);
        tree.bring_forward(kids[1]).unwrap();
        assert_eq!(tree.children(root), &[kids[0], kids[2], kids[1]]);
        tree.send_backward(kids[2]).unwrap();
        assert_eq!(tree.children(root), &[kids[2], kids[0], kids[1]]);
        assert_eq!(tree.node(root).unwrap().tab_order(), kids.as_slice());
    }

    #[test]
    fn coordinates_map_through_ancestors() {
        let mut tree = Tree::new();
        let root = with_frame(&mut tree, "root", Rect::new(1, 1, 30, 30));
        let panel = with_frame(&mut tree, "panel", Rect::new(5, 2, 10, 10));
        let button = with_frame(&mut tree, "button", Rect::new(1, 1, 3, 1));
        tree.add(root, panel).unwrap();
        tree.add(panel, button).unwrap();
        assert_eq!(tree.screen_frame(button).unwrap(), Rect::new(7, 4, 3, 1));
        assert_eq!(tree.view_to_screen(button, 2, 0).unwrap(), (9, 4));
        assert_eq!(tree.screen_to_view(button, 6, 4).unwrap(), (-1, 0));
    }

    #[test]
    fn find_deepest_prefers_topmost_visible() {
        let mut tree = Tree::new();
        let root = with_frame(&mut tree, "root", Rect::new(0, 0, 10, 10));
        let under = with_frame(&mut tree, "under", Rect::new(0, 0, 5, 5));
        let over = with_frame(&mut tree, "over", Rect::new(2, 2, 5, 5));
        tree.add(root, under).unwrap();
        tree.add(root, over).unwrap();
        assert_eq!(tree.find_deepest(root, 3, 3), Some(over));
        assert_eq!(tree.find_deepest(root, 1, 1), Some(under));
        assert_eq!(tree.find_deepest(root, 9, 0), Some(root));
        assert_eq!(tree.find_deepest(root, 10, 0), None);
        tree.set_visible(over, false).unwrap();
        assert_eq!(tree.find_deepest(root, 3, 3), Some(under));
    }

    #[test]
    fn run_pending_drains_invocations_and_timers() {
        let mut tree = Tree::new();
        let root = with_frame(&mut tree, "root", Rect::new(0, 0, 4, 4));
        let invoker = tree.runtime().invoker();
        std::thread::spawn(move || {
            invoker.invoke(move |tree| {
                tree.set_frame(root, Rect::new(0, 0, 8, 8)).unwrap();
            })
        })
        .join()
        .unwrap();
        let start = Instant::now();
        let fired = Rc::new(RefCell::new(0));
        let counter = fired.clone();
        tree.runtime_mut()
            .add_timeout(start, Duration::from_millis(5), move |_| {
                *counter.borrow_mut() += 1;
                *counter.borrow() < 2
            });
        assert_eq!(tree.run_pending(start), 1);
        assert_eq!(tree.frame(root), Some(Rect::new(0, 0, 8, 8)));
        assert_eq!(tree.run_pending(start + Duration::from_millis(5)), 1);
        assert_eq!(tree.runtime().timer_count(), 1);
        assert_eq!(tree.run_pending(start + Duration::from_millis(10)), 1);
        assert_eq!(*fired.borrow(), 2);
        assert_eq!(tree.runtime().timer_count(), 0);
    }
}
