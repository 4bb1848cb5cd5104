//! Turns position/size expressions into frames.
//!
//! A pass over one host collects its Computed children, orders them so every
//! `RelativeTo` target is resolved before the nodes reading it, then resolves
//! each one against the host bounds and recurses. The whole subtree is
//! checked for dependency cycles before any frame is written.

use std::collections::{BTreeSet, HashMap};

use ratatui::layout::Rect;
use tracing::{trace, warn};

use super::{Anchor, Expr};
use crate::error::{Result, TreeError};
use crate::node::{LayoutMode, NodeId};
use crate::tree::Tree;

/// Position and size of one axis.
struct Axis<'e> {
    position: Option<&'e Expr>,
    size: Option<&'e Expr>,
    total: i32,
    current_position: i32,
    current_size: i32,
}

impl Axis<'_> {
    fn resolve(&self, frame_of: &dyn Fn(NodeId) -> Option<Rect>) -> (i32, i32) {
        let eval = |expr: &Expr, position: i32, size: i32| {
            expr.anchor(&Anchor {
                total: self.total,
                position,
                size,
                frame_of,
            })
        };
        match self.position {
            Some(pos) if pos.needs_size() => {
                let mut size = match self.size {
                    Some(expr) => eval(expr, 0, self.current_size),
                    None if pos.is_center() => self.total,
                    None => self.current_size,
                };
                let position = eval(pos, 0, size);
                if let Some(expr) = self.size
                    && expr.needs_position()
                {
                    size = eval(expr, position, size);
                }
                (position, size)
            }
            _ => {
                let position = self
                    .position
                    .map_or(self.current_position, |pos| eval(pos, 0, self.current_size));
                let size = self
                    .size
                    .map_or(self.current_size, |expr| eval(expr, position, self.current_size));
                (position, size)
            }
        }
    }
}

fn clamp(value: i32) -> u16 {
    u16::try_from(value.max(0)).unwrap_or(u16::MAX)
}

impl Tree {
    /// Order in which `host`'s Computed children must be resolved.
    ///
    /// Targets outside that set (the host itself, its ancestors, Absolute
    /// siblings) never constrain the order. Ready nodes are taken in child
    /// order.
    pub fn resolution_order(&self, host: NodeId) -> Result<Vec<NodeId>> {
        let members: Vec<NodeId> = self
            .node(host)?
            .children
            .iter()
            .copied()
            .filter(|c| {
                self.nodes
                    .get(*c)
                    .is_some_and(|n| n.layout_mode == LayoutMode::Computed)
            })
            .collect();
        let index: HashMap<NodeId, usize> =
            members.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut edges: BTreeSet<(usize, usize)> = BTreeSet::new();
        let mut refs = Vec::new();
        for (dependent, id) in members.iter().enumerate() {
            let node = self.node(*id)?;
            refs.clear();
            for expr in [&node.x, &node.y, &node.width, &node.height]
                .into_iter()
                .flatten()
            {
                expr.references(&mut refs);
            }
            for target in &refs {
                if let Some(&target) = index.get(target) {
                    edges.insert((target, dependent));
                }
            }
        }

        let mut incoming = vec![0usize; members.len()];
        for (_, dependent) in &edges {
            incoming[*dependent] += 1;
        }
        let mut ready: BTreeSet<usize> = (0..members.len()).filter(|i| incoming[*i] == 0).collect();
        let mut order = Vec::with_capacity(members.len());
        while let Some(next) = ready.pop_first() {
            order.push(members[next]);
            let outgoing: Vec<(usize, usize)> =
                edges.range((next, 0)..=(next, usize::MAX)).copied().collect();
            for edge in outgoing {
                edges.remove(&edge);
                incoming[edge.1] -= 1;
                if incoming[edge.1] == 0 {
                    ready.insert(edge.1);
                }
            }
        }

        if let Some(&(_, stuck)) = edges.iter().next() {
            let node = members[stuck];
            let name = self.name(node).to_string();
            warn!(host = ?host, node = ?node, name = %name, "layout dependency cycle");
            return Err(TreeError::LayoutCycle { node, name });
        }
        Ok(order)
    }

    /// Frame `node` would get inside `host`, without applying it.
    pub fn resolve_frame(&self, node: NodeId, host: Rect) -> Result<Rect> {
        let n = self.node(node)?;
        if n.layout_mode == LayoutMode::Absolute {
            return Ok(n.frame);
        }
        let frame_of = |id: NodeId| self.nodes.get(id).map(|n| n.frame);
        let (x, width) = Axis {
            position: n.x.as_ref(),
            size: n.width.as_ref(),
            total: i32::from(host.width),
            current_position: i32::from(n.frame.x) - i32::from(host.x),
            current_size: i32::from(n.frame.width),
        }
        .resolve(&frame_of);
        let (y, height) = Axis {
            position: n.y.as_ref(),
            size: n.height.as_ref(),
            total: i32::from(host.height),
            current_position: i32::from(n.frame.y) - i32::from(host.y),
            current_size: i32::from(n.frame.height),
        }
        .resolve(&frame_of);
        Ok(Rect::new(
            clamp(x + i32::from(host.x)),
            clamp(y + i32::from(host.y)),
            clamp(width),
            clamp(height),
        ))
    }

    /// Writes a new frame, damaging the node and the area it left behind in
    /// its parent. Returns whether anything changed.
    pub(crate) fn apply_frame(&mut self, node: NodeId, frame: Rect) -> Result<bool> {
        let old = self.node(node)?.frame;
        if old == frame {
            return Ok(false);
        }
        {
            let n = self.node_mut(node)?;
            n.frame = frame;
            if old.width != frame.width || old.height != frame.height {
                n.layout_needed = true;
            }
        }
        trace!(node = ?node, ?old, new = ?frame, "frame changed");
        self.set_needs_display(node)?;
        if let Some(parent) = self.parent(node) {
            self.set_needs_display_rect(parent, old)?;
        }
        Ok(true)
    }

    /// Marks `node` and its ancestors as needing a layout pass.
    pub fn set_needs_layout(&mut self, node: NodeId) -> Result<()> {
        self.node_mut(node)?.layout_needed = true;
        for ancestor in self.ancestors(node) {
            self.node_mut(ancestor)?.layout_needed = true;
        }
        Ok(())
    }

    /// Lays out `node`'s children against its bounds, recursively.
    pub fn layout(&mut self, node: NodeId) -> Result<()> {
        self.check_cycles(node)?;
        self.layout_children(node)
    }

    /// Resolves `node` itself against `host`, then its children.
    pub fn layout_in(&mut self, node: NodeId, host: Rect) -> Result<()> {
        self.check_cycles(node)?;
        let frame = self.resolve_frame(node, host)?;
        self.apply_frame(node, frame)?;
        self.layout_children(node)
    }

    /// [`Tree::layout_in`] when something below `node` asked for layout.
    pub fn layout_if_needed(&mut self, node: NodeId, host: Rect) -> Result<bool> {
        if !self.node(node)?.layout_needed {
            return Ok(false);
        }
        self.layout_in(node, host)?;
        Ok(true)
    }

    fn check_cycles(&self, node: NodeId) -> Result<()> {
        self.resolution_order(node)?;
        for child in self.children(node) {
            self.check_cycles(*child)?;
        }
        Ok(())
    }

    fn layout_children(&mut self, node: NodeId) -> Result<()> {
        let host = self.node(node)?.bounds();
        for child in self.resolution_order(node)? {
            let frame = self.resolve_frame(child, host)?;
            self.apply_frame(child, frame)?;
            self.layout_children(child)?;
        }
        let absolute: Vec<NodeId> = self
            .children(node)
            .iter()
            .copied()
            .filter(|c| {
                self.nodes
                    .get(*c)
                    .is_some_and(|n| n.layout_mode == LayoutMode::Absolute)
            })
            .collect();
        for child in absolute {
            self.layout_children(child)?;
        }
        let n = self.node_mut(node)?;
        n.layout_needed = false;
        n.hooks.layout_complete.emit(&host);
        Ok(())
    }
}
