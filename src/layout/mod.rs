pub mod resolver;

use std::fmt;
use std::ops::{Add, Sub};
use std::rc::Rc;

use ratatui::layout::Rect;

use crate::node::NodeId;

/// Edge or extent of another node's frame read by [`Expr::RelativeTo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Top,
    Right,
    Bottom,
    Width,
    Height,
}

impl Side {
    pub fn of(self, frame: Rect) -> i32 {
        match self {
            Side::Left => i32::from(frame.x),
            Side::Top => i32::from(frame.y),
            Side::Right => i32::from(frame.x) + i32::from(frame.width),
            Side::Bottom => i32::from(frame.y) + i32::from(frame.height),
            Side::Width => i32::from(frame.width),
            Side::Height => i32::from(frame.height),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Subtract,
}

impl Op {
    fn apply(self, left: i32, right: i32) -> i32 {
        match self {
            Op::Add => left.saturating_add(right),
            Op::Subtract => left.saturating_sub(right),
        }
    }
}

/// Symbolic position or size of a node along one axis.
///
/// Expressions are evaluated against the host extent along that axis (the
/// parent's width for X/Width, its height for Y/Height).
#[derive(Clone)]
pub enum Expr {
    Absolute(i32),
    /// Fraction of the host extent, `0.5` for half.
    Percent(f32),
    Center,
    AnchorEnd(i32),
    Fill(i32),
    Combine(Box<Expr>, Op, Box<Expr>),
    Function(Rc<dyn Fn(i32) -> i32>),
    RelativeTo {
        node: NodeId,
        side: Side,
        factor: f32,
    },
}

impl Expr {
    /// `Percent` from a value in `0..=100`.
    pub fn percent(value: f32) -> Self {
        Expr::Percent(value / 100.0)
    }

    pub fn function(f: impl Fn(i32) -> i32 + 'static) -> Self {
        Expr::Function(Rc::new(f))
    }

    pub fn relative(node: NodeId, side: Side) -> Self {
        Expr::RelativeTo {
            node,
            side,
            factor: 1.0,
        }
    }

    pub fn left_of(node: NodeId) -> Self {
        Self::relative(node, Side::Left)
    }

    pub fn top_of(node: NodeId) -> Self {
        Self::relative(node, Side::Top)
    }

    pub fn right_of(node: NodeId) -> Self {
        Self::relative(node, Side::Right)
    }

    pub fn bottom_of(node: NodeId) -> Self {
        Self::relative(node, Side::Bottom)
    }

    pub fn width_of(node: NodeId) -> Self {
        Self::relative(node, Side::Width)
    }

    pub fn height_of(node: NodeId) -> Self {
        Self::relative(node, Side::Height)
    }

    /// Nodes this expression reads from.
    pub fn references(&self, out: &mut Vec<NodeId>) {
        match self {
            Expr::RelativeTo { node, .. } => out.push(*node),
            Expr::Combine(left, _, right) => {
                left.references(out);
                right.references(out);
            }
            _ => {}
        }
    }

    /// Whether evaluating this as a position requires the size first.
    pub(crate) fn needs_size(&self) -> bool {
        match self {
            Expr::Center | Expr::AnchorEnd(_) => true,
            Expr::Combine(left, _, right) => left.needs_size() || right.needs_size(),
            _ => false,
        }
    }

    /// Whether evaluating this as a size requires the final position.
    pub(crate) fn needs_position(&self) -> bool {
        match self {
            Expr::Fill(_) => true,
            Expr::Combine(left, _, right) => left.needs_position() || right.needs_position(),
            _ => false,
        }
    }

    pub(crate) fn is_center(&self) -> bool {
        matches!(self, Expr::Center)
    }

    pub(crate) fn anchor(&self, ctx: &Anchor<'_>) -> i32 {
        match self {
            Expr::Absolute(n) => *n,
            Expr::Percent(fraction) => (ctx.total as f32 * fraction).round() as i32,
            Expr::Center => (ctx.total - ctx.size) / 2,
            Expr::AnchorEnd(margin) => ctx.total - ctx.size - margin,
            Expr::Fill(margin) => ctx.total - ctx.position - margin,
            Expr::Combine(left, op, right) => op.apply(left.anchor(ctx), right.anchor(ctx)),
            Expr::Function(f) => f(ctx.total),
            Expr::RelativeTo { node, side, factor } => (ctx.frame_of)(*node)
                .map(|frame| (side.of(frame) as f32 * factor).round() as i32)
                .unwrap_or(0),
        }
    }
}

/// Inputs to one expression evaluation.
pub(crate) struct Anchor<'a> {
    pub total: i32,
    pub position: i32,
    pub size: i32,
    pub frame_of: &'a dyn Fn(NodeId) -> Option<Rect>,
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Absolute(n) => write!(f, "Absolute({n})"),
            Expr::Percent(p) => write!(f, "Percent({})", p * 100.0),
            Expr::Center => write!(f, "Center"),
            Expr::AnchorEnd(m) => write!(f, "AnchorEnd({m})"),
            Expr::Fill(m) => write!(f, "Fill({m})"),
            Expr::Combine(l, op, r) => write!(f, "Combine({l:?} {op:?} {r:?})"),
            Expr::Function(_) => write!(f, "Function(..)"),
            Expr::RelativeTo { node, side, factor } => {
                write!(f, "RelativeTo({node:?}, {side:?}, {factor})")
            }
        }
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::Absolute(value)
    }
}

impl Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        Expr::Combine(Box::new(self), Op::Add, Box::new(rhs))
    }
}

impl Add<i32> for Expr {
    type Output = Expr;

    fn add(self, rhs: i32) -> Expr {
        self + Expr::Absolute(rhs)
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::Combine(Box::new(self), Op::Subtract, Box::new(rhs))
    }
}

impl Sub<i32> for Expr {
    type Output = Expr;

    fn sub(self, rhs: i32) -> Expr {
        self - Expr::Absolute(rhs)
    }
}
