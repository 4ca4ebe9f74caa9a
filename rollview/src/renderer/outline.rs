//! Pixel-exact outlines for [`ClipMode::PixelTrim`](super::ClipMode::PixelTrim).
//!
//! Vertices are snapped to a grid of 1/256 device pixel anchored at the page origin, so a tile
//! and a full render of the same page work with identical numbers, only offset by whole pixels.
//! Every sloped edge is then cut where it crosses a pixel line of the raster, and each contour is
//! clipped to the raster before tiny-skia sees it. tiny-skia never has to clip anything itself,
//! and a tile rasterizes exactly the edges the full render has inside that tile.

use std::cmp::Ordering;
use std::f64::consts::TAU;

use rollview_core::geom::{self, PointMm, RectMm};
use tiny_skia::PathSegment;

/// Grid steps per device pixel. tiny-skia keeps edges at this precision with its 4x
/// supersampling, so grid coordinates reach it unrounded.
const SUBPIXEL: i64 = 256;
#[allow(clippy::cast_precision_loss)]
const SUBPIXEL_F: f64 = SUBPIXEL as f64;
/// Bounds grid coordinates so a product of two differences fits an `i128`.
const LIMIT: i64 = 1 << 40;
/// Flattened curves stray at most this far from the true outline, in device pixels.
const TOLERANCE_PX: f64 = 0.05;

type GridPoint = [i64; 2];

fn snap(px: f64) -> i64 {
    // `as` saturates, and sends NaN to zero.
    #[allow(clippy::cast_possible_truncation)]
    let units = (px * SUBPIXEL_F).round() as i64;
    units.clamp(-LIMIT, LIMIT)
}
fn snap_point([x, y]: [f64; 2]) -> GridPoint {
    [snap(x), snap(y)]
}
/// Round a page pixel coordinate onto the grid.
#[must_use]
pub(super) fn on_grid(px: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let px = snap(px) as f64 / SUBPIXEL_F;
    px
}
/// A page point in device pixels, before any raster offset.
#[must_use]
pub(super) fn page_px(p: PointMm, px_per_mm: f32) -> [f64; 2] {
    let scale = f64::from(px_per_mm);
    [f64::from(p.x) * scale, f64::from(p.y) * scale]
}
/// `num / den` rounded to nearest. `den` is nonzero.
fn div_round(num: i128, den: i128) -> i64 {
    let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
    #[allow(clippy::cast_possible_truncation)]
    let quotient = (2 * num + den).div_euclid(2 * den) as i64;
    quotient
}
/// Twice the signed area.
fn twice_area(ring: &[GridPoint]) -> i128 {
    let Some(&last) = ring.last() else {
        return 0;
    };
    let mut prev = last;
    let mut sum = 0i128;
    for &p in ring {
        sum += i128::from(prev[0]) * i128::from(p[1]) - i128::from(p[0]) * i128::from(prev[1]);
        prev = p;
    }
    sum
}
/// Drop repeated vertices, including a last one repeating the first.
fn tidy(ring: &mut Vec<GridPoint>) {
    ring.dedup();
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
}

/// Where a raster sits on the page grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) struct Grid {
    /// Top-left corner of the raster.
    origin: GridPoint,
    /// Bottom-right corner.
    end: GridPoint,
}
impl Grid {
    pub(super) fn new(origin_px: [f64; 2], size: [u32; 2]) -> Self {
        let origin = snap_point(origin_px);
        Self {
            origin,
            end: [
                origin[0] + i64::from(size[0]) * SUBPIXEL,
                origin[1] + i64::from(size[1]) * SUBPIXEL,
            ],
        }
    }
    fn local(&self, p: GridPoint) -> (f32, f32) {
        // Exact, clipped points are at most a raster's size away from the origin.
        #[allow(clippy::cast_precision_loss)]
        let (x, y) = (
            (p[0] - self.origin[0]) as f32,
            (p[1] - self.origin[1]) as f32,
        );
        #[allow(clippy::cast_precision_loss)]
        let step = SUBPIXEL as f32;
        (x / step, y / step)
    }
    /// The raster's pixel lines on `axis` lying strictly between `lo` and `hi`.
    fn lines(&self, axis: usize, lo: i64, hi: i64) -> impl Iterator<Item = i64> {
        let origin = self.origin[axis];
        let count = (self.end[axis] - origin) / SUBPIXEL;
        let first = (lo - origin).div_euclid(SUBPIXEL) + 1;
        let last = (hi - origin - 1).div_euclid(SUBPIXEL);
        (first.max(0)..=last.min(count)).map(move |m| origin + m * SUBPIXEL)
    }
    /// `a`-`b` lies strictly outside the raster on some side.
    fn misses(&self, a: GridPoint, b: GridPoint) -> bool {
        (0..2).any(|axis| {
            a[axis].max(b[axis]) < self.origin[axis] || a[axis].min(b[axis]) > self.end[axis]
        })
    }
    /// Cut every sloped edge of the closed `ring` where it crosses a pixel line of the raster.
    ///
    /// Cuts are computed from the edge's own endpoints and rounded to nearest, so an edge is cut
    /// at the same page points whichever raster it is cut for.
    fn subdivide(&self, ring: &[GridPoint]) -> Vec<GridPoint> {
        let mut out = Vec::with_capacity(ring.len() * 2);
        // (distance along the edge's axis, that axis' run, cut)
        let mut cuts: Vec<(i128, i128, GridPoint)> = Vec::new();
        for (i, &a) in ring.iter().enumerate() {
            let b = ring[(i + 1) % ring.len()];
            out.push(a);
            // Axis-aligned edges clip exactly as they are.
            if a[0] == b[0] || a[1] == b[1] || self.misses(a, b) {
                continue;
            }
            cuts.clear();
            for axis in 0..2 {
                let other = 1 - axis;
                let run = b[axis] - a[axis];
                let rise = b[other] - a[other];
                for line in self.lines(axis, a[axis].min(b[axis]), a[axis].max(b[axis])) {
                    let along = line - a[axis];
                    let mut cut = [0; 2];
                    cut[axis] = line;
                    cut[other] = a[other]
                        + div_round(i128::from(along) * i128::from(rise), i128::from(run));
                    cuts.push((i128::from(along.abs()), i128::from(run.abs()), cut));
                }
            }
            cuts.sort_by(|x, y| (x.0 * y.1).cmp(&(y.0 * x.1)));
            out.extend(cuts.iter().map(|&(.., cut)| cut));
        }
        out.dedup();
        out
    }
    /// Sutherland–Hodgman against the raster. Once subdivided, no sloped edge crosses a raster
    /// border strictly, so new vertices only come from axis-aligned edges and are exact.
    fn clip(&self, mut ring: Vec<GridPoint>) -> Vec<GridPoint> {
        for axis in 0..2 {
            ring = clip_half(&ring, axis, self.origin[axis], Ordering::Greater);
            ring = clip_half(&ring, axis, self.end[axis], Ordering::Less);
        }
        ring
    }
}

/// Keep the part of `ring` on the `keep` side of the line `p[axis] == at`, the line included.
fn clip_half(ring: &[GridPoint], axis: usize, at: i64, keep: Ordering) -> Vec<GridPoint> {
    let inside = |p: GridPoint| p[axis].cmp(&at) != keep.reverse();
    let crossing = |p: GridPoint, q: GridPoint| {
        let other = 1 - axis;
        let mut c = [0; 2];
        c[axis] = at;
        c[other] = p[other]
            + div_round(
                i128::from(at - p[axis]) * i128::from(q[other] - p[other]),
                i128::from(q[axis] - p[axis]),
            );
        c
    };
    let mut out = Vec::with_capacity(ring.len() + 2);
    let Some(&last) = ring.last() else {
        return out;
    };
    let mut prev = last;
    for &cur in ring {
        match (inside(prev), inside(cur)) {
            (true, true) => out.push(cur),
            (true, false) => out.push(crossing(prev, cur)),
            (false, true) => {
                out.push(crossing(prev, cur));
                out.push(cur);
            }
            (false, false) => {}
        }
        prev = cur;
    }
    out.dedup();
    out
}

/// Closed contours cut to one raster, filled together with the nonzero rule.
pub(super) struct Outline {
    grid: Grid,
    rings: Vec<Vec<GridPoint>>,
}
impl Outline {
    pub(super) fn new(grid: Grid) -> Self {
        Self {
            grid,
            rings: Vec::new(),
        }
    }
    /// Add a closed contour in page pixels, keeping its direction.
    pub(super) fn contour(&mut self, points: impl IntoIterator<Item = [f64; 2]>) {
        self.push(points.into_iter().map(snap_point).collect());
    }
    /// Add a convex stroke piece. Pieces all wind the same way, so overlaps merge.
    fn piece(&mut self, points: &[[f64; 2]]) {
        let mut ring: Vec<GridPoint> = points.iter().copied().map(snap_point).collect();
        match twice_area(&ring).cmp(&0) {
            Ordering::Equal => return,
            Ordering::Less => ring.reverse(),
            Ordering::Greater => {}
        }
        self.push(ring);
    }
    fn push(&mut self, mut ring: Vec<GridPoint>) {
        tidy(&mut ring);
        if ring.len() < 3 {
            return;
        }
        let mut ring = self.grid.clip(self.grid.subdivide(&ring));
        tidy(&mut ring);
        if ring.len() >= 3 {
            self.rings.push(ring);
        }
    }
    /// `None` if nothing with an area is left inside the raster.
    pub(super) fn finish(self) -> Option<tiny_skia::Path> {
        let mut builder = tiny_skia::PathBuilder::new();
        for ring in &self.rings {
            let mut points = ring.iter().map(|&p| self.grid.local(p));
            let Some((x, y)) = points.next() else {
                continue;
            };
            builder.move_to(x, y);
            for (x, y) in points {
                builder.line_to(x, y);
            }
            builder.close();
        }
        // tiny-skia refuses to fill flat paths, and says so in the log.
        builder
            .finish()
            .filter(|path| path.bounds().width() > 0.0 && path.bounds().height() > 0.0)
    }
}

/// A dash pattern laid along the whole path from its first vertex, in device pixels.
#[derive(Clone, Debug, PartialEq)]
pub(super) struct Dash {
    /// Alternating on and off lengths, starting with on. Even in count.
    intervals: Vec<f64>,
    period: f64,
    offset: f64,
}
impl Dash {
    /// `None` for an odd count, negative or non-finite lengths, or a period too short to draw.
    pub(super) fn new(intervals: Vec<f64>, offset: f64) -> Option<Self> {
        if intervals.is_empty() || intervals.len() % 2 == 1 || !offset.is_finite() {
            return None;
        }
        if intervals.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return None;
        }
        let period: f64 = intervals.iter().sum();
        // Any shorter and every dash snaps onto a single grid point.
        if !period.is_finite() || period < 1.0 / SUBPIXEL_F {
            return None;
        }
        Some(Self {
            intervals,
            period,
            offset,
        })
    }
    /// Whether `distance` along the path is inside a dash.
    fn covers(&self, distance: f64) -> bool {
        let mut phase = (distance + self.offset).rem_euclid(self.period);
        for pair in self.intervals.chunks_exact(2) {
            if phase < pair[0] {
                return true;
            }
            phase -= pair[0] + pair[1];
            if phase < 0.0 {
                return false;
            }
        }
        false
    }
    /// Dashes overlapping `from..=to`, as distances along the path.
    ///
    /// Each dash is placed from the index of its period, so its ends do not depend on the range
    /// asked for.
    fn dashes(&self, from: f64, to: f64) -> Vec<(f64, f64)> {
        let mut dashes = Vec::new();
        #[allow(clippy::cast_possible_truncation)]
        let mut index = ((from + self.offset) / self.period).floor() as i64;
        loop {
            #[allow(clippy::cast_precision_loss)]
            let mut at = index as f64 * self.period - self.offset;
            if at > to {
                break;
            }
            for pair in self.intervals.chunks_exact(2) {
                let end = at + pair[0];
                if pair[0] > 0.0 && end >= from && at <= to {
                    dashes.push((at, end));
                }
                at = end + pair[1];
            }
            index += 1;
        }
        dashes
    }
}

/// How a polyline is stroked, in device pixels.
#[derive(Clone, Debug, PartialEq)]
pub(super) struct Pen {
    pub half_width: f64,
    pub dash: Option<Dash>,
}

fn lerp(a: [f64; 2], b: [f64; 2], t: f64) -> [f64; 2] {
    [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t]
}
fn offset(p: [f64; 2], by: [f64; 2], sign: f64) -> [f64; 2] {
    [p[0] + by[0] * sign, p[1] + by[1] * sign]
}

/// Stroke `points` with butt caps and bevel joins into `outline`.
///
/// Segments are trimmed with Liang–Barsky against `visible`, in page millimeters: parts outside
/// it emit nothing, and a dash is kept whole if any of it is inside. `visible` must be the
/// viewport grown by more than the pen's half width.
pub(super) fn stroke(
    outline: &mut Outline,
    points: &[PointMm],
    closed: bool,
    pen: &Pen,
    px_per_mm: f32,
    visible: &RectMm,
) {
    let mut points = points.to_vec();
    points.dedup();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    let closed = closed && points.len() > 2;
    if points.len() < 2 {
        return;
    }
    let px: Vec<[f64; 2]> = points.iter().map(|&p| page_px(p, px_per_mm)).collect();
    let segments = if closed { px.len() } else { px.len() - 1 };
    // Unit direction and length of each segment.
    let directions: Vec<([f64; 2], f64)> = (0..segments)
        .map(|i| {
            let (a, b) = (px[i], px[(i + 1) % px.len()]);
            let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
            let length = dx.hypot(dy);
            ([dx / length, dy / length], length)
        })
        .collect();
    let normal = |u: [f64; 2]| [-u[1] * pen.half_width, u[0] * pen.half_width];

    let mut along = 0.0f64;
    for (i, &(u, length)) in directions.iter().enumerate() {
        let j = (i + 1) % px.len();
        let (a, b) = (px[i], px[j]);
        let n = normal(u);
        if let Some(trimmed) = geom::clip_segment(points[i], points[j], visible) {
            let quad = |from: [f64; 2], to: [f64; 2]| {
                [
                    offset(from, n, 1.0),
                    offset(to, n, 1.0),
                    offset(to, n, -1.0),
                    offset(from, n, -1.0),
                ]
            };
            match &pen.dash {
                None => outline.piece(&quad(a, b)),
                Some(dash) => {
                    let from = along + f64::from(trimmed.t_start) * length;
                    let to = along + f64::from(trimmed.t_end) * length;
                    for (start, end) in dash.dashes(from, to) {
                        let start = (start.max(along) - along) / length;
                        let end = (end.min(along + length) - along) / length;
                        if end > start {
                            outline.piece(&quad(lerp(a, b, start), lerp(a, b, end)));
                        }
                    }
                }
            }
        }
        along += length;

        let Some(&(next, _)) = directions.get(j).filter(|_| closed || j > 0) else {
            continue;
        };
        let joined = pen
            .dash
            .as_ref()
            .map_or(true, |dash| dash.covers(along) && (j > 0 || dash.covers(0.0)));
        if !joined || !visible.contains(points[j]) {
            continue;
        }
        let turn = u[0] * next[1] - u[1] * next[0];
        if turn.abs() < 1e-12 {
            continue;
        }
        // The gap opens on the outside of the turn.
        let side = if turn > 0.0 { -1.0 } else { 1.0 };
        let v = px[j];
        outline.piece(&[v, offset(v, n, side), offset(v, normal(next), side)]);
    }
}

/// Segments needed to keep an arc of `radius_px` within tolerance, a multiple of four.
fn arc_steps(radius_px: f64) -> usize {
    if radius_px.is_nan() || radius_px <= TOLERANCE_PX {
        return 8;
    }
    // A chord spanning `angle` strays r * (1 - cos(angle / 2)) from its arc.
    let angle = 2.0 * (1.0 - TOLERANCE_PX / radius_px).acos();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = (TAU / angle).ceil() as usize;
    steps.clamp(8, 4096).next_multiple_of(4)
}

/// The ellipse inscribed in `rect`, as a closed polygon fine enough for `px_per_mm`.
#[must_use]
pub(super) fn oval_points(rect: &RectMm, px_per_mm: f32) -> Vec<PointMm> {
    let (rx, ry) = (f64::from(rect.w) / 2.0, f64::from(rect.h) / 2.0);
    let (cx, cy) = (f64::from(rect.x) + rx, f64::from(rect.y) + ry);
    let steps = arc_steps(rx.max(ry) * f64::from(px_per_mm));
    #[allow(clippy::cast_precision_loss)]
    let step = TAU / steps as f64;
    (0..steps)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let (sin, cos) = (i as f64 * step).sin_cos();
            #[allow(clippy::cast_possible_truncation)]
            PointMm::new((cx + rx * cos) as f32, (cy + ry * sin) as f32)
        })
        .collect()
}

/// Segments for a curve whose control polygon bends by `bend`, the largest second difference.
fn curve_steps(bend: f64, factor: f64) -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = (bend * factor / TOLERANCE_PX).sqrt().ceil() as u32;
    steps.clamp(1, 64)
}
fn second_difference(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (a[0] - 2.0 * b[0] + c[0]).hypot(a[1] - 2.0 * b[1] + c[1])
}

/// Flatten the contours of `path`, in page pixels, into closed polygons.
#[must_use]
pub(super) fn flatten(path: &tiny_skia::Path) -> Vec<Vec<[f64; 2]>> {
    let point = |p: tiny_skia::Point| [f64::from(p.x), f64::from(p.y)];
    let mut contours = Vec::new();
    let mut current: Vec<[f64; 2]> = Vec::new();
    let mut last = [0.0; 2];
    for segment in path.segments() {
        match segment {
            PathSegment::MoveTo(p) => {
                if current.len() > 2 {
                    contours.push(std::mem::take(&mut current));
                }
                current.clear();
                last = point(p);
                current.push(last);
            }
            PathSegment::LineTo(p) => {
                last = point(p);
                current.push(last);
            }
            PathSegment::QuadTo(c, p) => {
                let (p0, c, p) = (last, point(c), point(p));
                // Chord error is at most bend / (4 n^2).
                let steps = curve_steps(second_difference(p0, c, p), 0.25);
                for i in 1..=steps {
                    let t = f64::from(i) / f64::from(steps);
                    let s = 1.0 - t;
                    current.push([
                        s * s * p0[0] + 2.0 * s * t * c[0] + t * t * p[0],
                        s * s * p0[1] + 2.0 * s * t * c[1] + t * t * p[1],
                    ]);
                }
                last = p;
            }
            PathSegment::CubicTo(c1, c2, p) => {
                let (p0, c1, c2, p) = (last, point(c1), point(c2), point(p));
                // Chord error is at most 3 bend / (4 n^2).
                let bend = second_difference(p0, c1, c2).max(second_difference(c1, c2, p));
                let steps = curve_steps(bend, 0.75);
                for i in 1..=steps {
                    let t = f64::from(i) / f64::from(steps);
                    let s = 1.0 - t;
                    let (w0, w1, w2, w3) = (s * s * s, 3.0 * s * s * t, 3.0 * s * t * t, t * t * t);
                    current.push([
                        w0 * p0[0] + w1 * c1[0] + w2 * c2[0] + w3 * p[0],
                        w0 * p0[1] + w1 * c1[1] + w2 * c2[1] + w3 * p[1],
                    ]);
                }
                last = p;
            }
            PathSegment::Close => {
                if current.len() > 2 {
                    contours.push(std::mem::take(&mut current));
                }
                current.clear();
            }
        }
    }
    if current.len() > 2 {
        contours.push(current);
    }
    contours
}

#[cfg(test)]
mod test {
    use super::*;

    fn grid(x: f64, y: f64, w: u32, h: u32) -> Grid {
        Grid::new([x, y], [w, h])
    }
    fn px(units: GridPoint) -> [f64; 2] {
        #[allow(clippy::cast_precision_loss)]
        let p = [units[0] as f64 / SUBPIXEL_F, units[1] as f64 / SUBPIXEL_F];
        p
    }
    /// No sloped edge of `ring` crosses a pixel line strictly.
    fn within_cells(ring: &[GridPoint]) -> bool {
        (0..ring.len()).all(|i| {
            let (a, b) = (ring[i], ring[(i + 1) % ring.len()]);
            if a[0] == b[0] || a[1] == b[1] {
                return true;
            }
            (0..2).all(|axis| {
                let (lo, hi) = (a[axis].min(b[axis]), a[axis].max(b[axis]));
                lo.div_euclid(SUBPIXEL) == (hi - 1).div_euclid(SUBPIXEL)
            })
        })
    }

    #[test]
    fn snapping() {
        assert_eq!(snap(1.0), 256);
        assert_eq!(snap(-0.5 / 256.0 - 1e-9), -1);
        assert_eq!(snap(f64::NAN), 0);
        assert_eq!(snap(f64::INFINITY), LIMIT);
        assert_eq!(on_grid(10.001), 10.0);
        assert_eq!(on_grid(0.75), 0.75);
        assert_eq!(div_round(7, 2), 4);
        assert_eq!(div_round(-7, 2), -3);
        assert_eq!(div_round(5, -3), -2);
    }
    #[test]
    fn cuts_at_every_pixel_line() {
        let grid = grid(0.0, 0.0, 8, 8);
        let ring = grid.subdivide(&[[0, 0], [3 * 256, 256], [0, 512]]);
        // Two vertical lines on the way out, the same two on the way back.
        assert_eq!(ring.len(), 3 + 2 + 2);
        assert!(within_cells(&ring));
        assert_eq!(ring[1..3], [[256, 85], [512, 171]]);
        assert_eq!(ring[4..6], [[512, 341], [256, 427]]);
        // The axis-aligned closing edge is left alone.
        assert_eq!(ring.last(), Some(&[0, 512]));
    }
    #[test]
    fn cuts_ignore_the_raster_position() {
        // Cut for two rasters a whole number of pixels apart, the shared cuts are the same points.
        let edge = [[-300, 1000], [4000, 3100], [-300, 3100]];
        let a = grid(0.0, 0.0, 20, 20).subdivide(&edge);
        let b = grid(5.0, 3.0, 4, 6).subdivide(&edge);
        assert!(b.iter().all(|p| a.contains(p)));
        assert!(b.len() < a.len());
    }
    #[test]
    fn clipped_to_raster() {
        let mut outline = Outline::new(grid(10.0, 10.0, 10, 10));
        // Big triangle covering the raster's top-left corner.
        outline.contour([[0.0, 0.0], [30.5, 0.0], [0.0, 30.5]]);
        assert_eq!(outline.rings.len(), 1);
        let ring = &outline.rings[0];
        assert!(within_cells(ring));
        assert!(ring.iter().all(|&p| {
            let [x, y] = px(p);
            (10.0..=20.0).contains(&x) && (10.0..=20.0).contains(&y)
        }));
        // The corner at (10, 10) is covered, so it appears as a vertex.
        assert!(ring.contains(&[2560, 2560]));
        assert!(outline.finish().is_some());
    }
    #[test]
    fn outside_leaves_nothing() {
        let mut outline = Outline::new(grid(0.0, 0.0, 10, 10));
        outline.contour([[20.0, 20.0], [30.0, 20.0], [25.0, 40.0]]);
        outline.contour([[-5.0, -5.0], [-1.0, -5.0], [-3.0, 5.0]]);
        assert!(outline.rings.is_empty());
        assert!(outline.finish().is_none());
        // Flat on the raster's border.
        let mut outline = Outline::new(grid(0.0, 0.0, 10, 10));
        outline.contour([[-5.0, 0.0], [5.0, 0.0], [0.0, -5.0]]);
        assert!(outline.finish().is_none());
    }
    #[test]
    fn pieces_wind_positive() {
        let mut outline = Outline::new(grid(0.0, 0.0, 10, 10));
        outline.piece(&[[1.0, 1.0], [1.0, 5.0], [5.0, 5.0]]);
        outline.piece(&[[1.0, 1.0], [5.0, 5.0], [1.0, 5.0]]);
        outline.piece(&[[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]]);
        assert_eq!(outline.rings.len(), 2);
        assert!(outline.rings.iter().all(|ring| twice_area(ring) > 0));
    }
    #[test]
    fn dash_layout() {
        assert!(Dash::new(vec![1.0], 0.0).is_none());
        assert!(Dash::new(vec![1.0, -1.0], 0.0).is_none());
        assert!(Dash::new(vec![0.0, 0.0], 0.0).is_none());
        let dash = Dash::new(vec![3.0, 2.0], 1.0).unwrap();
        // The pattern starts one unit in, the first dash is cut to two.
        assert!(dash.covers(0.0) && dash.covers(1.9) && !dash.covers(2.0) && dash.covers(4.0));
        assert_eq!(dash.dashes(0.0, 10.0), vec![(-1.0, 2.0), (4.0, 7.0), (9.0, 12.0)]);
        // A narrower range finds the same dashes, not shortened ones.
        assert_eq!(dash.dashes(5.0, 9.5), vec![(4.0, 7.0), (9.0, 12.0)]);
        assert!(dash.dashes(7.5, 8.5).is_empty());
    }
    #[test]
    fn stroke_corner_gets_a_bevel() {
        let pen = Pen {
            half_width: 1.0,
            dash: None,
        };
        let visible = RectMm::from_xywh(-10.0, -10.0, 40.0, 40.0);
        let mut outline = Outline::new(grid(0.0, 0.0, 20, 20));
        let corner = [
            PointMm::new(2.0, 5.0),
            PointMm::new(10.0, 5.0),
            PointMm::new(10.0, 15.0),
        ];
        stroke(&mut outline, &corner, false, &pen, 1.0, &visible);
        // Two segment quads and the join.
        assert_eq!(outline.rings.len(), 3);
        let join = &outline.rings[1];
        assert!(join.contains(&[2560, 1024]) && join.contains(&[2816, 1280]));

        // Closed, every vertex joins.
        let mut outline = Outline::new(grid(0.0, 0.0, 20, 20));
        stroke(&mut outline, &corner, true, &pen, 1.0, &visible);
        assert_eq!(outline.rings.len(), 6);
    }
    #[test]
    fn stroke_outside_visible_is_skipped() {
        let pen = Pen {
            half_width: 0.5,
            dash: Dash::new(vec![1.0, 1.0], 0.0),
        };
        let mut outline = Outline::new(grid(0.0, 0.0, 10, 10));
        let visible = RectMm::from_xywh(-2.0, -2.0, 14.0, 14.0);
        let line = [PointMm::new(-1000.0, 5.0), PointMm::new(1000.0, 5.0)];
        stroke(&mut outline, &line, false, &pen, 1.0, &visible);
        // Of the dashes reaching into the grown viewport, five are inside the raster.
        assert_eq!(outline.rings.len(), 5);
        let far = [PointMm::new(50.0, 50.0), PointMm::new(60.0, 60.0)];
        let mut outline = Outline::new(grid(0.0, 0.0, 10, 10));
        stroke(&mut outline, &far, false, &pen, 1.0, &visible);
        assert!(outline.rings.is_empty());
    }
    #[test]
    fn ovals_close_enough() {
        let rect = RectMm::from_xywh(10.0, 20.0, 40.0, 20.0);
        let points = oval_points(&rect, 4.0);
        assert_eq!(points.len() % 4, 0);
        assert!(points.len() >= 8);
        for p in &points {
            let (x, y) = ((p.x - 30.0) / 20.0, (p.y - 30.0) / 10.0);
            assert!((x * x + y * y - 1.0).abs() < 1e-4);
        }
        // Bigger on screen, more segments.
        assert!(oval_points(&rect, 16.0).len() > points.len());
        assert_eq!(arc_steps(0.0), 8);
    }
    #[test]
    fn flattens_curves() {
        let mut builder = tiny_skia::PathBuilder::new();
        builder.move_to(0.0, 0.0);
        builder.quad_to(10.0, 20.0, 20.0, 0.0);
        builder.close();
        builder.move_to(30.0, 0.0);
        builder.line_to(40.0, 0.0);
        builder.cubic_to(40.0, 10.0, 30.0, 10.0, 30.0, 0.0);
        builder.close();
        let path = builder.finish().unwrap();
        let contours = flatten(&path);
        assert_eq!(contours.len(), 2);
        assert!(contours[0].len() > 4);
        assert_eq!(contours[0].first(), Some(&[0.0, 0.0]));
        assert_eq!(contours[0].last(), Some(&[20.0, 0.0]));
        // The quad's peak is at t = 1/2, height 10.
        assert!(contours[0].iter().any(|p| (p[1] - 10.0).abs() < TOLERANCE_PX));
        assert_eq!(contours[1].last(), Some(&[30.0, 0.0]));
    }
}
