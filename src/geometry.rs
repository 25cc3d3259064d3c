//! Floating-point geometry: points, sizes, rectangles, anchors and polygon math.
//!
//! All layout math happens in `f64`. Rounding to whole pixels happens once,
//! late, through [`round_half_away`] and [`SizeF::to_pixels`].

use alloc::vec::Vec;

use num_traits::Float;

use crate::edges::BoxEdges;

/// Round half away from zero (`2.5 → 3`, `-2.5 → -3`).
///
/// This is the single rounding rule used for every pixel snap in the crate.
pub fn round_half_away(v: f64) -> f64 {
    <f64 as Float>::round(v)
}

/// Slack allowed by [`SizeF::fits_inside`], in pixels.
const FIT_EPSILON: f64 = 1e-6;

fn is_usable(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// A point in layout space.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

impl PointF {
    /// Create a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates rounded half away from zero.
    pub fn rounded(self) -> Self {
        Self::new(round_half_away(self.x), round_half_away(self.y))
    }
}

/// Integer pixel dimensions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a new size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Swap width and height.
    pub const fn transposed(self) -> Self {
        Self::new(self.height, self.width)
    }

    /// Convert to floating-point size.
    pub fn to_f64(self) -> SizeF {
        SizeF::new(self.width as f64, self.height as f64)
    }
}

/// Floating-point dimensions.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SizeF {
    pub width: f64,
    pub height: f64,
}

impl SizeF {
    /// Create a size.
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Width divided by height.
    ///
    /// A zero, negative or non-finite dimension yields `1.0` so that aspect
    /// math on degenerate sources never produces NaN or infinity.
    pub fn aspect_ratio(self) -> f64 {
        if is_usable(self.width) && is_usable(self.height) {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// Multiply both dimensions.
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }

    /// Largest size with this aspect ratio that fits inside `bounds`.
    ///
    /// One dimension matches `bounds`; the other is ≤ its bound.
    pub fn scale_inside(self, bounds: SizeF) -> SizeF {
        let inner = self.aspect_ratio();
        let outer = bounds.aspect_ratio();
        if outer > inner {
            // Bounds are wider: height constrains.
            SizeF::new(inner * bounds.height, bounds.height)
        } else {
            SizeF::new(bounds.width, bounds.width / inner)
        }
    }

    /// Whether this size fits inside `outer` on both axes (equality fits).
    ///
    /// Differences below a millionth of a pixel count as equal, so an aspect
    /// round trip such as `3.0 / 7.0 * 7.0` still fits inside `3.0`.
    pub fn fits_inside(self, outer: SizeF) -> bool {
        self.width - outer.width <= FIT_EPSILON && self.height - outer.height <= FIT_EPSILON
    }

    /// Componentwise minimum.
    pub fn min(self, other: SizeF) -> SizeF {
        SizeF::new(self.width.min(other.width), self.height.min(other.height))
    }

    /// Round both dimensions and clamp each to at least 1.
    ///
    /// NaN and non-positive values become 1.
    pub fn round_min_one(self) -> SizeF {
        let snap = |v: f64| {
            let r = round_half_away(v);
            if r.is_nan() || r < 1.0 { 1.0 } else { r }
        };
        SizeF::new(snap(self.width), snap(self.height))
    }

    /// Round to whole pixels, at least 1×1, saturating at `u32::MAX`.
    pub fn to_pixels(self) -> Size {
        let s = self.round_min_one();
        Size::new(
            s.width.min(u32::MAX as f64) as u32,
            s.height.min(u32::MAX as f64) as u32,
        )
    }
}

/// Axis-aligned rectangle in layout space.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RectF {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RectF {
    /// Create a rectangle.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle at the origin with the given size.
    pub const fn from_size(size: SizeF) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    /// Top-left corner.
    pub fn origin(&self) -> PointF {
        PointF::new(self.x, self.y)
    }

    /// Width and height.
    pub fn size(&self) -> SizeF {
        SizeF::new(self.width, self.height)
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Corner points in ring order: top-left, top-right, bottom-right, bottom-left.
    pub fn to_polygon(&self) -> Vec<PointF> {
        alloc::vec![
            PointF::new(self.x, self.y),
            PointF::new(self.right(), self.y),
            PointF::new(self.right(), self.bottom()),
            PointF::new(self.x, self.bottom()),
        ]
    }

    /// The point inside this rectangle selected by `anchor`.
    pub fn anchor_point(&self, anchor: Anchor) -> PointF {
        let (fx, fy) = anchor.fractions();
        PointF::new(self.x + self.width * fx, self.y + self.height * fy)
    }

    /// Round all four edges to whole pixels (edges, not origin + size).
    pub fn rounded(&self) -> RectF {
        let x = round_half_away(self.x);
        let y = round_half_away(self.y);
        RectF::new(
            x,
            y,
            round_half_away(self.right()) - x,
            round_half_away(self.bottom()) - y,
        )
    }
}

/// Nine-way alignment of one box relative to another.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    #[default]
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Anchor {
    /// Horizontal and vertical position as fractions: 0 = near, 0.5 = center, 1 = far.
    pub fn fractions(self) -> (f64, f64) {
        use Anchor::*;
        let x = match self {
            TopLeft | MiddleLeft | BottomLeft => 0.0,
            TopCenter | MiddleCenter | BottomCenter => 0.5,
            TopRight | MiddleRight | BottomRight => 1.0,
        };
        let y = match self {
            TopLeft | TopCenter | TopRight => 0.0,
            MiddleLeft | MiddleCenter | MiddleRight => 0.5,
            BottomLeft | BottomCenter | BottomRight => 1.0,
        };
        (x, y)
    }
}

// ============================================================================
// Polygon operations
// ============================================================================

/// Smallest axis-aligned rectangle containing every point.
///
/// Returns `None` for an empty point set.
pub fn bounding_box<'a, I>(points: I) -> Option<RectF>
where
    I: IntoIterator<Item = &'a PointF>,
{
    let mut iter = points.into_iter();
    let first = iter.next()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in iter {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(RectF::new(min_x, min_y, max_x - min_x, max_y - min_y))
}

/// Translate `polygon` so the `anchor` point of its bounding box coincides
/// with the `anchor` point of `relative_to`'s bounding box.
pub fn align_with(polygon: &[PointF], relative_to: &[PointF], anchor: Anchor) -> Vec<PointF> {
    let (Some(own), Some(other)) = (bounding_box(polygon), bounding_box(relative_to)) else {
        return polygon.to_vec();
    };
    let from = own.anchor_point(anchor);
    let to = other.anchor_point(anchor);
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    polygon
        .iter()
        .map(|p| PointF::new(p.x + dx, p.y + dy))
        .collect()
}

/// Align a rectangle inside (or around) another by anchor.
pub fn align_rect(rect: RectF, relative_to: RectF, anchor: Anchor) -> RectF {
    let from = rect.anchor_point(anchor);
    let to = relative_to.anchor_point(anchor);
    RectF::new(
        rect.x + to.x - from.x,
        rect.y + to.y - from.y,
        rect.width,
        rect.height,
    )
}

/// Cosine and sine for a clockwise rotation (y axis pointing down).
///
/// Quarter turns are exact so axis-aligned rings stay axis-aligned.
pub fn rotation_cos_sin(degrees: f64) -> (f64, f64) {
    let wrapped = degrees % 360.0;
    let normalized = if wrapped < 0.0 { wrapped + 360.0 } else { wrapped };
    if normalized % 90.0 == 0.0 {
        match (normalized / 90.0) as u32 {
            1 => (0.0, 1.0),
            2 => (-1.0, 0.0),
            3 => (0.0, -1.0),
            _ => (1.0, 0.0),
        }
    } else {
        let rad = <f64 as Float>::to_radians(normalized);
        (<f64 as Float>::cos(rad), <f64 as Float>::sin(rad))
    }
}

/// Rotate a point clockwise around `pivot`.
pub fn rotate_point(p: PointF, degrees: f64, pivot: PointF) -> PointF {
    let (cos, sin) = rotation_cos_sin(degrees);
    let (dx, dy) = (p.x - pivot.x, p.y - pivot.y);
    PointF::new(
        pivot.x + dx * cos - dy * sin,
        pivot.y + dx * sin + dy * cos,
    )
}

/// Push each edge of a ring polygon outward by its own width.
///
/// Expects ring order (top-left, top-right, bottom-right, bottom-left), in
/// which edge 0 is top, 1 right, 2 bottom and 3 left. Each new corner is the
/// intersection of the two adjacent offset edges, so corners stay mitered
/// even when the ring has been rotated. Other polygons are inflated through
/// their bounding box.
pub fn inflate_polygon(polygon: &[PointF], edges: &BoxEdges) -> Vec<PointF> {
    if polygon.len() != 4 {
        let Some(b) = bounding_box(polygon) else {
            return Vec::new();
        };
        return RectF::new(
            b.x - edges.left,
            b.y - edges.top,
            b.width + edges.left + edges.right,
            b.height + edges.top + edges.bottom,
        )
        .to_polygon();
    }

    let widths = [edges.top, edges.right, edges.bottom, edges.left];
    if let Some(corners) = inflate_axis_aligned(polygon, widths) {
        return corners;
    }

    // Offset line for each edge: (point on line, direction).
    let mut lines = [(PointF::default(), PointF::default()); 4];
    for i in 0..4 {
        let a = polygon[i];
        let b = polygon[(i + 1) % 4];
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let len = <f64 as Float>::sqrt(dx * dx + dy * dy);
        let (nx, ny) = if len > 0.0 {
            (dy / len, -dx / len)
        } else {
            (0.0, 0.0)
        };
        let w = widths[i];
        lines[i] = (PointF::new(a.x + nx * w, a.y + ny * w), PointF::new(dx, dy));
    }

    (0..4)
        .map(|i| {
            let prev = lines[(i + 3) % 4];
            let cur = lines[i];
            intersect(prev, cur).unwrap_or(cur.0)
        })
        .collect()
}

/// Offset of one axis-aligned edge: the new `x` of a vertical edge or the new
/// `y` of a horizontal one.
#[derive(Copy, Clone)]
enum AxisOffset {
    X(f64),
    Y(f64),
}

/// Exact inflation when every edge is horizontal or vertical.
///
/// Corners come straight from the offset coordinates, so whole-pixel input
/// stays whole. `None` for rotated or degenerate quads.
fn inflate_axis_aligned(polygon: &[PointF], widths: [f64; 4]) -> Option<Vec<PointF>> {
    let mut offsets = [AxisOffset::X(0.0); 4];
    for i in 0..4 {
        let a = polygon[i];
        let b = polygon[(i + 1) % 4];
        offsets[i] = if a.y == b.y && a.x != b.x {
            AxisOffset::Y(a.y - <f64 as Float>::signum(b.x - a.x) * widths[i])
        } else if a.x == b.x && a.y != b.y {
            AxisOffset::X(a.x + <f64 as Float>::signum(b.y - a.y) * widths[i])
        } else {
            return None;
        };
    }

    (0..4)
        .map(|i| match (offsets[(i + 3) % 4], offsets[i]) {
            (AxisOffset::X(x), AxisOffset::Y(y)) | (AxisOffset::Y(y), AxisOffset::X(x)) => {
                Some(PointF::new(x, y))
            }
            _ => None,
        })
        .collect()
}

/// Intersection of two lines given as (point, direction).
fn intersect(a: (PointF, PointF), b: (PointF, PointF)) -> Option<PointF> {
    let (p, r) = a;
    let (q, s) = b;
    let denom = r.x * s.y - r.y * s.x;
    if <f64 as Float>::abs(denom) < 1e-12 {
        return None;
    }
    let t = ((q.x - p.x) * s.y - (q.y - p.y) * s.x) / denom;
    Some(PointF::new(p.x + t * r.x, p.y + t * r.y))
}
