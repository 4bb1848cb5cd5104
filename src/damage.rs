//! Damage tracking and the clipped redraw walk.
//!
//! Each node keeps one bounding box of pending damage in its own coordinates
//! plus a flag saying some descendant is damaged. The redraw walk only
//! enters flagged subtrees and only paints nodes with their own damage, so an
//! unchanged screen costs a single check at the top.

use ratatui::layout::Rect;
use tracing::trace;

use crate::component_context::DrawContext;
use crate::drivers::RenderBackend;
use crate::error::Result;
use crate::node::NodeId;
use crate::region::{Region, clip_rect};
use crate::tree::Tree;
use crate::ui::Canvas;

fn offset(screen: Rect, local: Rect) -> Rect {
    Rect::new(
        screen.x.saturating_add(local.x),
        screen.y.saturating_add(local.y),
        local.width,
        local.height,
    )
}

impl Tree {
    /// Damages the whole node.
    pub fn set_needs_display(&mut self, node: NodeId) -> Result<()> {
        let bounds = self.node(node)?.bounds();
        self.set_needs_display_rect(node, bounds)
    }

    /// Grows `node`'s damage box to cover `rect` (own coordinates), flags
    /// every ancestor and pushes the damage down into overlapped children.
    pub fn set_needs_display_rect(&mut self, node: NodeId, rect: Rect) -> Result<()> {
        if rect.is_empty() {
            self.node(node)?;
            return Ok(());
        }
        {
            let n = self.node_mut(node)?;
            n.damage = Some(match n.damage {
                Some(existing) => existing.union(rect),
                None => rect,
            });
        }
        let mut cursor = self.parent(node);
        while let Some(ancestor) = cursor {
            let n = self.node_mut(ancestor)?;
            n.child_damage = true;
            cursor = n.parent;
        }
        let children = self.node(node)?.children.clone();
        for child in children {
            let frame = self.node(child)?.frame;
            let Some(overlap) = clip_rect(frame, rect) else {
                continue;
            };
            let local = Rect::new(
                overlap.x - frame.x,
                overlap.y - frame.y,
                overlap.width,
                overlap.height,
            );
            self.set_needs_display_rect(child, local)?;
        }
        Ok(())
    }

    pub fn needs_display(&self, node: NodeId) -> bool {
        self.nodes.get(node).is_some_and(|n| n.damage.is_some())
    }

    pub fn child_needs_display(&self, node: NodeId) -> bool {
        self.nodes.get(node).is_some_and(|n| n.child_damage)
    }

    pub fn clear_needs_display(&mut self, node: NodeId) -> Result<()> {
        let n = self.node_mut(node)?;
        n.damage = None;
        n.child_damage = false;
        Ok(())
    }

    /// Repaints damaged nodes under `top` through `backend`.
    ///
    /// `region` limits the walk to children overlapping it and clips painting
    /// to it (screen coordinates); `None` redraws all damage. Damage the
    /// region left unpainted stays pending for a later pass.
    pub fn redraw(
        &mut self,
        top: NodeId,
        backend: &mut dyn RenderBackend,
        region: Option<&Region>,
    ) -> Result<()> {
        let screen = self.screen_frame(top)?;
        let mut canvas = Canvas::new(backend);
        self.draw_node(top, &mut canvas, screen, region)?;
        Ok(())
    }

    /// Paints `node` and its flagged children, then resets the node's flags
    /// to whatever is still pending. Returns whether anything is.
    fn draw_node(
        &mut self,
        node: NodeId,
        canvas: &mut Canvas<'_>,
        screen: Rect,
        region: Option<&Region>,
    ) -> Result<bool> {
        let (visible, damage, child_damage) = {
            let n = self.node(node)?;
            (n.visible, n.damage, n.child_damage)
        };
        if !visible {
            self.clear_needs_display(node)?;
            return Ok(false);
        }
        if damage.is_none() && !child_damage {
            return Ok(false);
        }
        let mut scoped = canvas.scoped(screen, screen);
        let mut leftover = None;

        if let Some(damage) = damage {
            let n = self.node_mut(node)?;
            let bounds = n.bounds();
            if let Some(local) = clip_rect(damage, bounds) {
                let paint = offset(screen, local);
                let pieces = match region {
                    Some(region) => {
                        let mut limited = Region::from_rect(paint);
                        limited.intersect_region(region);
                        if let Some(reachable) = scoped.clip().and_then(|c| clip_rect(paint, c)) {
                            let mut rest = Region::from_rect(reachable);
                            rest.exclude_region(region);
                            if !rest.is_empty() {
                                let missed = rest.bounds();
                                leftover = Some(Rect::new(
                                    missed.x - screen.x,
                                    missed.y - screen.y,
                                    missed.width,
                                    missed.height,
                                ));
                            }
                        }
                        limited.rects().to_vec()
                    }
                    None => vec![paint],
                };
                let ctx = DrawContext::new(bounds)
                    .with_damage(local)
                    .with_focus(n.has_focus)
                    .with_enabled(n.enabled);
                if let Some(widget) = n.widget.as_mut() {
                    for piece in pieces.into_iter().filter(|p| !p.is_empty()) {
                        trace!(node = ?node, damage = ?local, clip = ?piece, "draw");
                        let mut painter = scoped.scoped(screen, piece);
                        widget.draw(&mut painter, &ctx);
                    }
                }
            }
        }

        let mut pending_below = false;
        let children = self.node(node)?.children.clone();
        for child in children {
            let (frame, dirty) = {
                let c = self.node(child)?;
                (c.frame, c.damage.is_some() || c.child_damage)
            };
            let child_screen = offset(screen, frame);
            let in_clip = scoped
                .clip()
                .is_some_and(|clip| clip.intersects(child_screen));
            if !in_clip {
                // Nothing of it is reachable; moving it back in damages it again.
                self.clear_needs_display(child)?;
                continue;
            }
            if !region.is_none_or(|r| r.intersects(child_screen)) {
                pending_below |= dirty;
                continue;
            }
            pending_below |= self.draw_node(child, &mut scoped, child_screen, region)?;
        }

        let n = self.node_mut(node)?;
        n.damage = leftover;
        n.child_damage = pending_below;
        Ok(leftover.is_some() || pending_below)
    }
}
