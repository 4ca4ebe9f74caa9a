//! # Geometry
//!
//! Axis-aligned rectangles and points in page millimeters, plus the segment clipper used to trim
//! primitives against viewports. All rectangle predicates are inclusive: geometry touching an
//! edge counts as overlapping, so boundary-aligned items are never dropped.

#[derive(Copy, Clone, Debug, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct PointMm {
    pub x: f32,
    pub y: f32,
}
impl PointMm {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}
impl From<(f32, f32)> for PointMm {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle. Width and height are never negative.
#[derive(Copy, Clone, Debug, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct RectMm {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}
impl RectMm {
    /// Create from origin and size. A negative size extends the other way from the origin.
    #[must_use]
    pub fn from_xywh(x: f32, y: f32, w: f32, h: f32) -> Self {
        let (x, w) = if w < 0.0 { (x + w, -w) } else { (x, w) };
        let (y, h) = if h < 0.0 { (y + h, -h) } else { (y, h) };
        Self { x, y, w, h }
    }
    #[must_use]
    pub fn from_ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::from_xywh(left, top, right - left, bottom - top)
    }
    /// The smallest rectangle containing every point, or `None` if there are none.
    #[must_use]
    pub fn bounding(points: &[PointMm]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let (mut min, mut max) = (*first, *first);
        for p in rest {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some(Self::from_ltrb(min.x, min.y, max.x, max.y))
    }
    #[must_use]
    pub fn left(&self) -> f32 {
        self.x
    }
    #[must_use]
    pub fn top(&self) -> f32 {
        self.y
    }
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }
    #[must_use]
    pub fn area(&self) -> f32 {
        self.w * self.h
    }
    /// No interior. Degenerate rectangles still take part in inclusive overlap tests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }
    /// Inclusive overlap test. Rectangles sharing only an edge or a corner overlap.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.left() <= other.right()
            && other.left() <= self.right()
            && self.top() <= other.bottom()
            && other.top() <= self.bottom()
    }
    /// The overlapping region, or `None` if the rectangles are disjoint.
    /// Touching rectangles give a zero-width or zero-height result.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.intersects(other) {
            return None;
        }
        Some(Self::from_ltrb(
            self.left().max(other.left()),
            self.top().max(other.top()),
            self.right().min(other.right()),
            self.bottom().min(other.bottom()),
        ))
    }
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::from_ltrb(
            self.left().min(other.left()),
            self.top().min(other.top()),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }
    /// Inclusive on all four sides.
    #[must_use]
    pub fn contains(&self, point: PointMm) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }
    /// Grow outward by `by` on every side. Negative values shrink, never past zero size.
    #[must_use]
    pub fn inflate(&self, by: f32) -> Self {
        let w = (self.w + 2.0 * by).max(0.0);
        let h = (self.h + 2.0 * by).max(0.0);
        Self {
            x: self.x - by + (self.w + 2.0 * by - w) / 2.0,
            y: self.y - by + (self.h + 2.0 * by - h) / 2.0,
            w,
            h,
        }
    }
}

/// Which rectangle edge a clipped endpoint was moved onto.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

/// A segment after trimming, with the parametric range kept from the original.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClippedSegment {
    pub start: PointMm,
    pub end: PointMm,
    /// Parameter of `start` along the original segment, `0.0` if untouched.
    pub t_start: f32,
    /// Parameter of `end` along the original segment, `1.0` if untouched.
    pub t_end: f32,
    /// Edge `start` was moved onto, if it was moved.
    pub start_edge: Option<Edge>,
    /// Edge `end` was moved onto, if it was moved.
    pub end_edge: Option<Edge>,
}
impl ClippedSegment {
    #[must_use]
    pub fn start_trimmed(&self) -> bool {
        self.start_edge.is_some()
    }
    #[must_use]
    pub fn end_trimmed(&self) -> bool {
        self.end_edge.is_some()
    }
}

/// Liang–Barsky clipping of segment `a`-`b` against `rect`.
///
/// Returns `None` if no part of the segment lies within the rectangle (boundary inclusive).
/// An endpoint moved by clipping lands *exactly* on the edge that moved it: the coordinate along
/// that edge's axis is copied from the rectangle rather than recomputed from the parameter.
#[must_use]
pub fn clip_segment(a: PointMm, b: PointMm, rect: &RectMm) -> Option<ClippedSegment> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let p = [-dx, dx, -dy, dy];
    let q = [
        a.x - rect.left(),
        rect.right() - a.x,
        a.y - rect.top(),
        rect.bottom() - a.y,
    ];
    const EDGES: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom];

    let mut u1 = 0.0f32;
    let mut u2 = 1.0f32;
    let mut start_edge = None;
    let mut end_edge = None;
    for ((p, q), edge) in p.into_iter().zip(q).zip(EDGES) {
        if p == 0.0 {
            if q < 0.0 {
                // Parallel to this edge and outside of it.
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > u2 {
                return None;
            }
            if t > u1 {
                u1 = t;
                start_edge = Some(edge);
            }
        } else {
            if t < u1 {
                return None;
            }
            if t < u2 {
                u2 = t;
                end_edge = Some(edge);
            }
        }
    }

    let at = |u: f32, edge: Option<Edge>| -> PointMm {
        let mut point = PointMm::new(a.x + u * dx, a.y + u * dy);
        match edge {
            Some(Edge::Left) => point.x = rect.left(),
            Some(Edge::Right) => point.x = rect.right(),
            Some(Edge::Top) => point.y = rect.top(),
            Some(Edge::Bottom) => point.y = rect.bottom(),
            None => (),
        }
        point
    };

    Some(ClippedSegment {
        start: if start_edge.is_some() { at(u1, start_edge) } else { a },
        end: if end_edge.is_some() { at(u2, end_edge) } else { b },
        t_start: u1,
        t_end: u2,
        start_edge,
        end_edge,
    })
}

/// Convert a page coordinate to a device pixel coordinate relative to `origin_px`.
///
/// Done in double precision so that renders of adjacent viewports sharing a pixel-aligned
/// origin agree on every coordinate.
#[must_use]
pub fn mm_to_px(mm: f32, px_per_mm: f32, origin_px: f64) -> f32 {
    (f64::from(mm) * f64::from(px_per_mm) - origin_px) as f32
}

/// Inverse of [`mm_to_px`].
#[must_use]
pub fn px_to_mm(px: f32, px_per_mm: f32, origin_px: f64) -> f32 {
    ((f64::from(px) + origin_px) / f64::from(px_per_mm)) as f32
}
