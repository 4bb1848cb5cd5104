//! Focus chain and tab navigation.
//!
//! Every node remembers which child is on the focus path. Focusing a node
//! points each ancestor at the link below it, so the chain always runs from
//! the root down to the most focused node; unfocusing a node clears the chain
//! beneath it.

use tracing::{debug, warn};

use crate::error::{Result, TreeError};
use crate::node::NodeId;
use crate::observers::FocusChange;
use crate::state::NavigationDirection;
use crate::tree::Tree;

/// Direction for spatial focus moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Left,
    Right,
    Up,
    Down,
}

impl Tree {
    pub fn has_focus(&self, node: NodeId) -> bool {
        self.nodes.get(node).is_some_and(|n| n.has_focus)
    }

    pub fn focused_child(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|n| n.focused)
    }

    /// Deepest node on the focus chain below `node`.
    pub fn most_focused(&self, node: NodeId) -> Option<NodeId> {
        let mut deepest = self.focused_child(node)?;
        while let Some(next) = self.focused_child(deepest) {
            deepest = next;
        }
        Some(deepest)
    }

    /// Turning focusability on makes every ancestor focusable too. Turning it
    /// off takes focus away from the node.
    pub fn set_can_focus(&mut self, node: NodeId, can_focus: bool) -> Result<()> {
        if can_focus {
            self.promote_can_focus(node);
            return Ok(());
        }
        self.node_mut(node)?.can_focus = false;
        self.drop_focus(node)
    }

    pub fn set_tab_stop(&mut self, node: NodeId, tab_stop: bool) -> Result<()> {
        self.node_mut(node)?.tab_stop = tab_stop;
        Ok(())
    }

    pub(crate) fn promote_can_focus(&mut self, node: NodeId) {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            let Some(n) = self.nodes.get_mut(current) else {
                return;
            };
            n.can_focus = true;
            cursor = n.parent;
        }
    }

    /// Position among the siblings that can take focus.
    pub fn tab_index(&self, node: NodeId) -> Option<usize> {
        let n = self.nodes.get(node)?;
        if !n.can_focus {
            return None;
        }
        self.node(n.parent?)
            .ok()?
            .tab_order
            .iter()
            .filter(|id| self.nodes.get(**id).is_some_and(|s| s.can_focus))
            .position(|id| *id == node)
    }

    /// Moves `node` to `index` among its focusable siblings, clamping to the
    /// last slot. Returns the index it ended up at.
    pub fn set_tab_index(&mut self, node: NodeId, index: usize) -> Result<usize> {
        let n = self.node(node)?;
        let (Some(parent), true) = (n.parent, n.can_focus) else {
            warn!(node = ?node, index, "tab index on detached or unfocusable node");
            return Err(TreeError::TabIndexOutOfRange { node, index });
        };
        let mut order = self.node(parent)?.tab_order.clone();
        order.retain(|id| *id != node);
        let participates = |id: &NodeId| self.nodes.get(*id).is_some_and(|s| s.can_focus);
        let participants = order.iter().filter(|id| participates(id)).count();
        let index = index.min(participants);
        let insert_at = order
            .iter()
            .enumerate()
            .filter(|(_, id)| participates(id))
            .nth(index)
            .map_or(order.len(), |(pos, _)| pos);
        order.insert(insert_at, node);
        self.node_mut(parent)?.tab_order = order;
        Ok(index)
    }

    /// Focuses `node` starting from its root.
    pub fn focus(&mut self, node: NodeId) -> Result<bool> {
        match self.parent(node) {
            Some(_) => {
                let root = self.root_of(node);
                self.set_focus(root, node)
            }
            None => {
                self.set_has_focus(node, true)?;
                self.ensure_focus(node)?;
                Ok(true)
            }
        }
    }

    /// Focuses `node`, which must be a strict descendant of `receiver`.
    ///
    /// The previous chain is unfocused and every link from the root down to
    /// `node` is focused. Returns `false` when `node` cannot take focus.
    pub fn set_focus(&mut self, receiver: NodeId, node: NodeId) -> Result<bool> {
        self.node(receiver)?;
        if !self.is_ancestor(receiver, node) {
            warn!(node = ?node, receiver = ?receiver, "focus target outside receiver");
            return Err(TreeError::NotInHierarchy {
                node,
                ancestor: receiver,
            });
        }
        if !self.can_receive_focus(node) {
            return Ok(false);
        }
        let Some(parent) = self.parent(node) else {
            return Ok(false);
        };
        self.focus_child(parent, node)?;
        Ok(true)
    }

    /// Gives a freshly focused container a focused child when it has none,
    /// first or last depending on the direction of travel.
    pub fn ensure_focus(&mut self, node: NodeId) -> Result<()> {
        if self.node(node)?.focused.is_some() {
            return Ok(());
        }
        match self.runtime.direction() {
            NavigationDirection::Forward => self.focus_first(node)?,
            NavigationDirection::Backward => self.focus_last(node)?,
        };
        Ok(())
    }

    pub fn focus_first(&mut self, node: NodeId) -> Result<bool> {
        let candidate = self
            .node(node)?
            .tab_order
            .iter()
            .copied()
            .find(|id| self.nodes.get(*id).is_some_and(|n| n.is_tab_candidate()));
        match candidate {
            Some(child) => {
                self.focus_child(node, child)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn focus_last(&mut self, node: NodeId) -> Result<bool> {
        let candidate = self
            .node(node)?
            .tab_order
            .iter()
            .rev()
            .copied()
            .find(|id| self.nodes.get(*id).is_some_and(|n| n.is_tab_candidate()));
        match candidate {
            Some(child) => {
                self.focus_child(node, child)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Moves focus to the next tab stop below `node`. The focused child gets
    /// the first chance; when this level runs out its focus is cleared and
    /// `false` is returned so the caller can move on.
    pub fn focus_next(&mut self, node: NodeId) -> Result<bool> {
        self.runtime.set_direction(NavigationDirection::Forward);
        self.advance(node, false)
    }

    pub fn focus_prev(&mut self, node: NodeId) -> Result<bool> {
        self.runtime.set_direction(NavigationDirection::Backward);
        self.advance(node, true)
    }

    fn advance(&mut self, node: NodeId, backward: bool) -> Result<bool> {
        let mut order = self.node(node)?.tab_order.clone();
        if order.is_empty() {
            return Ok(false);
        }
        if backward {
            order.reverse();
        }
        let Some(current) = self.node(node)?.focused else {
            return if backward {
                self.focus_last(node)
            } else {
                self.focus_first(node)
            };
        };
        if self.advance(current, backward)? {
            return Ok(true);
        }
        let start = order.iter().position(|id| *id == current).map_or(0, |i| i + 1);
        let next = order[start..]
            .iter()
            .copied()
            .find(|id| self.nodes.get(*id).is_some_and(|n| n.is_tab_candidate()));
        if let Some(next) = next {
            self.focus_child(node, next)?;
            return Ok(true);
        }
        self.set_has_focus(current, false)?;
        self.node_mut(node)?.focused = None;
        Ok(false)
    }

    /// Moves focus to the nearest eligible sibling of the focused child in
    /// `heading`. Deeper levels get the first chance. Never wraps.
    pub fn focus_direction(&mut self, node: NodeId, heading: Heading) -> Result<bool> {
        self.runtime.set_direction(match heading {
            Heading::Right | Heading::Down => NavigationDirection::Forward,
            Heading::Left | Heading::Up => NavigationDirection::Backward,
        });
        let Some(current) = self.node(node)?.focused else {
            return self.focus_first(node);
        };
        if self.focus_direction(current, heading)? {
            return Ok(true);
        }
        let from = self.node(current)?.frame;
        let (cx, cy) = center(from);
        let mut best: Option<(i32, NodeId)> = None;
        for id in self.node(node)?.tab_order.iter().copied() {
            if id == current {
                continue;
            }
            let Some(candidate) = self.nodes.get(id) else {
                continue;
            };
            if !candidate.is_tab_candidate() {
                continue;
            }
            let to = candidate.frame;
            let (tx, ty) = center(to);
            let (ahead, primary, secondary) = match heading {
                Heading::Right => (to.x >= from.right(), tx - cx, ty - cy),
                Heading::Left => (to.right() <= from.x, cx - tx, ty - cy),
                Heading::Down => (to.y >= from.bottom(), ty - cy, tx - cx),
                Heading::Up => (to.bottom() <= from.y, cy - ty, tx - cx),
            };
            if !ahead {
                continue;
            }
            let score = primary + 2 * secondary.abs();
            if best.is_none_or(|(s, _)| score < s) {
                best = Some((score, id));
            }
        }
        match best {
            Some((_, target)) => {
                self.focus_child(node, target)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Takes focus away from `node` and unhooks it from its parent.
    pub(crate) fn drop_focus(&mut self, node: NodeId) -> Result<()> {
        if !self.node(node)?.has_focus {
            return Ok(());
        }
        self.set_has_focus(node, false)?;
        if let Some(parent) = self.parent(node) {
            let p = self.node_mut(parent)?;
            if p.focused == Some(node) {
                p.focused = None;
            }
        }
        Ok(())
    }

    fn can_receive_focus(&self, node: NodeId) -> bool {
        let Some(n) = self.nodes.get(node) else {
            return false;
        };
        if !(n.can_focus && n.visible && n.enabled) {
            return false;
        }
        self.ancestors(node)
            .iter()
            .all(|id| self.nodes.get(*id).is_some_and(|a| a.visible && a.enabled))
    }

    /// Points `parent` at `child`, unfocusing the previous link, and carries
    /// focus up until the chain reaches an already focused node.
    fn focus_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let previous = self.node(parent)?.focused;
        if previous == Some(child) && self.node(child)?.has_focus {
            return Ok(());
        }
        if let Some(previous) = previous
            && previous != child
        {
            self.set_has_focus(previous, false)?;
        }
        self.node_mut(parent)?.focused = Some(child);
        self.set_has_focus(child, true)?;
        self.ensure_focus(child)?;
        debug!(parent = ?parent, child = ?child, name = %self.name(child), "focus moved");

        if !self.node(parent)?.has_focus {
            match self.parent(parent) {
                Some(grandparent) => self.focus_child(grandparent, parent)?,
                None => self.set_has_focus(parent, true)?,
            }
        }
        Ok(())
    }

    /// Flips the focus flag, notifying the widget and observers. Losing
    /// focus clears the chain below.
    pub(crate) fn set_has_focus(&mut self, node: NodeId, focused: bool) -> Result<()> {
        let n = self.node_mut(node)?;
        if n.has_focus == focused {
            return Ok(());
        }
        n.has_focus = focused;
        let below = if focused { None } else { n.focused.take() };
        if let Some(widget) = n.widget.as_mut() {
            widget.on_focus_change(focused);
        }
        n.hooks.focus_changed.emit(&FocusChange { node, focused });
        if let Some(child) = below {
            self.set_has_focus(child, false)?;
        }
        self.set_needs_display(node)
    }
}

fn center(rect: ratatui::layout::Rect) -> (i32, i32) {
    (
        i32::from(rect.x) + i32::from(rect.width) / 2,
        i32::from(rect.y) + i32::from(rect.height) / 2,
    )
}
