//! Rectangle-set algebra over character cells.
//!
//! A [`Region`] is a list of pairwise non-overlapping rectangles describing an
//! arbitrary covered area. Every mutating operation re-normalises the list
//! through [`merge_rectangles`], so two regions covering the same cells built
//! through the same sequence of operations compare equal.

use ratatui::layout::Rect;

/// Returns whether the cell at (`column`, `row`) lies inside `rect`.
pub fn rect_contains(rect: Rect, column: u16, row: u16) -> bool {
    if rect.width == 0 || rect.height == 0 {
        return false;
    }
    let max_x = rect.x.saturating_add(rect.width);
    let max_y = rect.y.saturating_add(rect.height);
    column >= rect.x && column < max_x && row >= rect.y && row < max_y
}

/// Number of cells covered by `rect`.
pub fn cell_area(rect: Rect) -> u32 {
    u32::from(rect.width) * u32::from(rect.height)
}

/// Returns whether the two rectangles share at least one cell.
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    !a.is_empty() && !b.is_empty() && a.intersects(b)
}

/// Intersection that collapses to `None` instead of a zero-area rectangle.
pub fn clip_rect(rect: Rect, clip: Rect) -> Option<Rect> {
    if !rects_overlap(rect, clip) {
        return None;
    }
    let clipped = rect.intersection(clip);
    (!clipped.is_empty()).then_some(clipped)
}

/// Cells of `a` not covered by `b`, as at most four rectangles.
fn subtract(a: Rect, b: Rect) -> Vec<Rect> {
    let Some(hole) = clip_rect(a, b) else {
        return vec![a];
    };
    let mut pieces = Vec::with_capacity(4);
    if hole.y > a.y {
        pieces.push(Rect::new(a.x, a.y, a.width, hole.y - a.y));
    }
    if a.bottom() > hole.bottom() {
        pieces.push(Rect::new(
            a.x,
            hole.bottom(),
            a.width,
            a.bottom() - hole.bottom(),
        ));
    }
    if hole.x > a.x {
        pieces.push(Rect::new(a.x, hole.y, hole.x - a.x, hole.height));
    }
    if a.right() > hole.right() {
        pieces.push(Rect::new(
            hole.right(),
            hole.y,
            a.right() - hole.right(),
            hole.height,
        ));
    }
    pieces
}

/// Normalises arbitrary, possibly overlapping rectangles into non-overlapping
/// rectangles covering exactly the same cells.
///
/// The plane is cut at every distinct vertical edge into bands. Each band is
/// cut again at the top and bottom edges of the rectangles crossing it,
/// ignoring rectangles whose span is enclosed by another crossing span, and
/// every covered piece between two cuts becomes one output rectangle.
/// Rectangles ending exactly at the band's left edge still contribute their
/// cuts unless a crossing span encloses them, so partial overlaps stay split
/// on both sides of the seam. Output is ordered by band, then by top edge.
pub fn merge_rectangles(rects: &[Rect]) -> Vec<Rect> {
    let rects: Vec<Rect> = rects.iter().copied().filter(|r| !r.is_empty()).collect();
    let mut edges: Vec<u16> = rects.iter().flat_map(|r| [r.x, r.right()]).collect();
    edges.sort_unstable();
    edges.dedup();

    let mut merged = Vec::new();
    for band in edges.windows(2) {
        let (left, right) = (band[0], band[1]);
        let mut crossing: Vec<(u16, u16)> = rects
            .iter()
            .filter(|r| r.x <= left && r.right() >= right)
            .map(|r| (r.y, r.bottom()))
            .collect();
        crossing.sort_unstable();
        crossing.dedup();
        if crossing.is_empty() {
            continue;
        }
        let encloses = |outer: &(u16, u16), inner: &(u16, u16)| {
            outer != inner && outer.0 <= inner.0 && inner.1 <= outer.1
        };
        let outermost: Vec<(u16, u16)> = crossing
            .iter()
            .copied()
            .filter(|span| !crossing.iter().any(|other| encloses(other, span)))
            .collect();
        let trailing = rects
            .iter()
            .filter(|r| r.right() == left)
            .map(|r| (r.y, r.bottom()))
            .filter(|span| !crossing.iter().any(|c| c.0 <= span.0 && span.1 <= c.1));

        let mut cuts: Vec<u16> = outermost
            .iter()
            .copied()
            .chain(trailing)
            .flat_map(|(top, bottom)| [top, bottom])
            .collect();
        cuts.sort_unstable();
        cuts.dedup();
        for piece in cuts.windows(2) {
            let (top, bottom) = (piece[0], piece[1]);
            if outermost.iter().any(|(t, b)| *t <= top && bottom <= *b) {
                merged.push(Rect::new(left, top, right - left, bottom - top));
            }
        }
    }
    merged
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self::from_rects([rect])
    }

    pub fn from_rects(rects: impl IntoIterator<Item = Rect>) -> Self {
        let rects: Vec<Rect> = rects.into_iter().collect();
        Self {
            rects: merge_rectangles(&rects),
        }
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Number of covered cells.
    pub fn area(&self) -> u32 {
        self.rects.iter().copied().map(cell_area).sum()
    }

    /// Smallest rectangle enclosing the region, `Rect::ZERO` when empty.
    pub fn bounds(&self) -> Rect {
        let mut it = self.rects.iter().copied();
        let Some(first) = it.next() else {
            return Rect::ZERO;
        };
        it.fold(first, |acc, r| acc.union(r))
    }

    pub fn union(&mut self, rect: Rect) {
        let mut all = std::mem::take(&mut self.rects);
        all.push(rect);
        self.rects = merge_rectangles(&all);
    }

    pub fn union_region(&mut self, other: &Region) {
        let mut all = std::mem::take(&mut self.rects);
        all.extend_from_slice(&other.rects);
        self.rects = merge_rectangles(&all);
    }

    pub fn intersect(&mut self, rect: Rect) {
        let clipped: Vec<Rect> = self
            .rects
            .iter()
            .filter_map(|r| clip_rect(*r, rect))
            .collect();
        self.rects = merge_rectangles(&clipped);
    }

    pub fn intersect_region(&mut self, other: &Region) {
        let clipped: Vec<Rect> = self
            .rects
            .iter()
            .flat_map(|a| other.rects.iter().filter_map(move |b| clip_rect(*a, *b)))
            .collect();
        self.rects = merge_rectangles(&clipped);
    }

    pub fn exclude(&mut self, rect: Rect) {
        let remaining: Vec<Rect> = self.rects.iter().flat_map(|r| subtract(*r, rect)).collect();
        self.rects = merge_rectangles(&remaining);
    }

    pub fn exclude_region(&mut self, other: &Region) {
        for rect in &other.rects {
            self.exclude(*rect);
        }
    }

    /// Replaces the region with the cells of `bounds` it does not cover.
    pub fn complement(&mut self, bounds: Rect) {
        let mut inverse = Region::from_rect(bounds);
        inverse.exclude_region(self);
        *self = inverse;
    }

    /// Whether any cell of `rect` is covered.
    pub fn intersects(&self, rect: Rect) -> bool {
        self.rects.iter().any(|r| rects_overlap(*r, rect))
    }

    pub fn contains_point(&self, column: u16, row: u16) -> bool {
        self.rects.iter().any(|r| rect_contains(*r, column, row))
    }

    /// Whether every cell of `rect` is covered. Empty rectangles are trivially
    /// contained.
    pub fn contains_rect(&self, rect: Rect) -> bool {
        if rect.is_empty() {
            return true;
        }
        let covered: u32 = self
            .rects
            .iter()
            .filter_map(|r| clip_rect(*r, rect))
            .map(cell_area)
            .sum();
        covered == cell_area(rect)
    }
}
