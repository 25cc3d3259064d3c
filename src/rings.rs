//! Ring layout: named, nested polygons transformed together.
//!
//! A layout starts with the "image" ring, then grows outward through
//! "imageArea", "padding", "border" and "margin". Every transform
//! ([`shift`](RingLayout::shift), [`rotate`](RingLayout::rotate),
//! [`normalize`](RingLayout::normalize), [`round`](RingLayout::round)) applies
//! to all rings and all invisible polygons at once, so they never drift apart.
//!
//! Invisible polygons follow the same transforms but never contribute to the
//! bounding box. They carry caller points (annotations, face rectangles) from
//! source space into output space.
//!
//! ```
//! use zenrings::{BoxEdges, RectF, RingLayout, SizeF, rings::IMAGE};
//!
//! let mut layout = RingLayout::new();
//! layout.add_ring(IMAGE, RectF::from_size(SizeF::new(100.0, 50.0)).to_polygon());
//! layout.add_ring_edges("padding", &BoxEdges::uniform(10.0)).unwrap();
//! layout.rotate(90.0, Default::default());
//! layout.normalize(Default::default());
//!
//! let b = layout.bounding_box();
//! assert_eq!((b.width, b.height), (70.0, 120.0));
//! ```

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::edges::BoxEdges;
use crate::error::{Error, Result};
use crate::geometry::{self, Anchor, PointF, RectF};

/// The resized source pixels.
pub const IMAGE: &str = "image";
/// The area the image sits in (larger than the image in pad mode).
pub const IMAGE_AREA: &str = "imageArea";
/// Padding around the image area.
pub const PADDING: &str = "padding";
/// Border around the padding.
pub const BORDER: &str = "border";
/// Margin around the border.
pub const MARGIN: &str = "margin";

/// A named polygon.
#[derive(Clone, Debug, PartialEq)]
pub struct Ring {
    pub name: String,
    pub points: Vec<PointF>,
}

impl Ring {
    /// Bounding box of this ring's points.
    pub fn bounds(&self) -> RectF {
        geometry::bounding_box(&self.points).unwrap_or_default()
    }
}

/// Ordered set of rings plus invisible tracked polygons.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RingLayout {
    rings: Vec<Ring>,
    invisible: Vec<Ring>,
}

impl RingLayout {
    /// Empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a ring, or replace an existing one of the same name.
    ///
    /// A replaced ring moves to the outermost position.
    pub fn add_ring(&mut self, name: &str, points: Vec<PointF>) -> &Ring {
        self.rings.retain(|r| r.name != name);
        self.rings.push(Ring {
            name: name.to_string(),
            points,
        });
        &self.rings[self.rings.len() - 1]
    }

    /// Add a ring by pushing the outermost ring's edges outward.
    ///
    /// The base is the last ring added, falling back to "image".
    pub fn add_ring_edges(&mut self, name: &str, edges: &BoxEdges) -> Result<&Ring> {
        let base = self
            .last_ring()
            .or_else(|| self.get(IMAGE))
            .ok_or_else(|| Error::MissingRing {
                name: IMAGE.to_string(),
            })?;
        let inflated = geometry::inflate_polygon(&base.points, edges);
        Ok(self.add_ring(name, inflated))
    }

    /// Track a polygon through every transform without affecting bounds.
    pub fn add_invisible_polygon(&mut self, name: &str, points: Vec<PointF>) {
        self.invisible.retain(|r| r.name != name);
        self.invisible.push(Ring {
            name: name.to_string(),
            points,
        });
    }

    /// Points of a visible ring.
    pub fn ring(&self, name: &str) -> Option<&[PointF]> {
        self.get(name).map(|r| r.points.as_slice())
    }

    /// Mutable points of a visible ring.
    pub fn ring_mut(&mut self, name: &str) -> Option<&mut Vec<PointF>> {
        self.rings
            .iter_mut()
            .find(|r| r.name == name)
            .map(|r| &mut r.points)
    }

    /// Points of an invisible polygon.
    pub fn invisible(&self, name: &str) -> Option<&[PointF]> {
        self.invisible
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.points.as_slice())
    }

    /// Bounding box of a visible ring.
    pub fn ring_bounds(&self, name: &str) -> Option<RectF> {
        self.get(name).map(Ring::bounds)
    }

    /// The most recently added ring (outermost so far).
    pub fn last_ring(&self) -> Option<&Ring> {
        self.rings.last()
    }

    /// Visible rings in insertion order.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        self.rings.iter()
    }

    /// Invisible polygons in insertion order.
    pub fn invisible_polygons(&self) -> impl Iterator<Item = &Ring> {
        self.invisible.iter()
    }

    /// Whether a visible ring exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn get(&self, name: &str) -> Option<&Ring> {
        self.rings.iter().find(|r| r.name == name)
    }

    /// Move ring `name` so its anchor point matches that of ring `relative_to`.
    pub fn align_ring_with(&mut self, name: &str, relative_to: &str, anchor: Anchor) -> Result<()> {
        let target = self
            .ring(relative_to)
            .ok_or_else(|| Error::MissingRing {
                name: relative_to.to_string(),
            })?
            .to_vec();
        let points = self.ring_mut(name).ok_or_else(|| Error::MissingRing {
            name: name.to_string(),
        })?;
        *points = geometry::align_with(points, &target, anchor);
        Ok(())
    }

    // ---- Whole-layout transforms ----

    fn for_each_point(&mut self, mut f: impl FnMut(PointF) -> PointF) {
        for ring in self.rings.iter_mut().chain(self.invisible.iter_mut()) {
            for p in ring.points.iter_mut() {
                *p = f(*p);
            }
        }
    }

    /// Map every point from `from` space into `to` space.
    ///
    /// Translation and per-axis scale; a zero-sized `from` axis keeps scale 1.
    pub fn shift(&mut self, from: RectF, to: RectF) {
        let sx = if from.width != 0.0 {
            to.width / from.width
        } else {
            1.0
        };
        let sy = if from.height != 0.0 {
            to.height / from.height
        } else {
            1.0
        };
        self.for_each_point(|p| {
            PointF::new((p.x - from.x) * sx + to.x, (p.y - from.y) * sy + to.y)
        });
    }

    /// Scale every point about the origin.
    pub fn scale(&mut self, factor: f64) {
        self.for_each_point(|p| PointF::new(p.x * factor, p.y * factor));
    }

    /// Rotate every point clockwise around `pivot`.
    pub fn rotate(&mut self, degrees: f64, pivot: PointF) {
        if degrees % 360.0 == 0.0 {
            return;
        }
        self.for_each_point(|p| geometry::rotate_point(p, degrees, pivot));
    }

    /// Translate everything so the bounding box starts at `origin`.
    pub fn normalize(&mut self, origin: PointF) {
        let b = self.bounding_box();
        let (dx, dy) = (origin.x - b.x, origin.y - b.y);
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        self.for_each_point(|p| PointF::new(p.x + dx, p.y + dy));
    }

    /// Snap every visible ring to whole pixels.
    ///
    /// Invisible polygons keep sub-pixel precision.
    pub fn round(&mut self) {
        for ring in self.rings.iter_mut() {
            for p in ring.points.iter_mut() {
                *p = p.rounded();
            }
        }
    }

    /// Apply an arbitrary point mapping to every ring and invisible polygon.
    pub fn map_points(&mut self, f: impl FnMut(PointF) -> PointF) {
        self.for_each_point(f);
    }

    /// Smallest rectangle containing every visible ring.
    ///
    /// An empty layout has an empty box at the origin.
    pub fn bounding_box(&self) -> RectF {
        geometry::bounding_box(self.rings.iter().flat_map(|r| r.points.iter())).unwrap_or_default()
    }
}
