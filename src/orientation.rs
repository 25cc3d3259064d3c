//! Quarter-turn orientation (D4 dihedral group) for source rotate/flip.
//!
//! Source rotation and flip change the effective original size before any
//! layout math runs, so they are modeled as one group element that can be
//! applied to sizes, points and (in the renderer) pixels alike.

use crate::geometry::{PointF, SizeF, round_half_away};
use crate::instructions::FlipMode;

/// A clockwise rotation by a multiple of 90°, optionally followed by a
/// horizontal flip.
///
/// Vertical flip is `ROTATE_180` followed by a horizontal flip, so all eight
/// rotate/flip combinations are representable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Orientation {
    /// Clockwise quarter turns (0-3).
    pub rotation: u8,
    /// Horizontal flip applied after rotation.
    pub flip: bool,
}

impl Default for Orientation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Orientation {
    /// No transformation.
    pub const IDENTITY: Self = Self::new(0, false);
    /// Mirror left-right.
    pub const FLIP_H: Self = Self::new(0, true);
    /// Mirror top-bottom.
    pub const FLIP_V: Self = Self::new(2, true);
    /// 90° clockwise.
    pub const ROTATE_90: Self = Self::new(1, false);
    /// 180°.
    pub const ROTATE_180: Self = Self::new(2, false);
    /// 270° clockwise.
    pub const ROTATE_270: Self = Self::new(3, false);
    /// Reflect over the main diagonal.
    pub const TRANSPOSE: Self = Self::new(1, true);
    /// Reflect over the anti-diagonal.
    pub const TRANSVERSE: Self = Self::new(3, true);

    const fn new(rotation: u8, flip: bool) -> Self {
        Self {
            rotation: rotation & 3,
            flip,
        }
    }

    /// Rotation by `degrees` clockwise, rounded to the nearest quarter turn.
    ///
    /// Non-finite input is treated as zero.
    pub fn from_degrees(degrees: f64) -> Self {
        if !degrees.is_finite() {
            return Self::IDENTITY;
        }
        let quarters = round_half_away(degrees / 90.0) % 4.0;
        let quarters = if quarters < 0.0 { quarters + 4.0 } else { quarters };
        Self::new(quarters as u8, false)
    }

    /// The orientation equivalent to a flip.
    pub fn from_flip(flip: FlipMode) -> Self {
        match flip {
            FlipMode::None => Self::IDENTITY,
            FlipMode::X => Self::FLIP_H,
            FlipMode::Y => Self::FLIP_V,
            FlipMode::XY => Self::ROTATE_180,
        }
    }

    /// Rotate first, then flip: the order source instructions apply in.
    pub fn from_rotate_flip(degrees: Option<f64>, flip: Option<FlipMode>) -> Self {
        let rotation = degrees.map(Self::from_degrees).unwrap_or_default();
        rotation.compose(Self::from_flip(flip.unwrap_or_default()))
    }

    /// Whether this is the identity transformation.
    pub fn is_identity(self) -> bool {
        self.rotation == 0 && !self.flip
    }

    /// Whether width and height trade places.
    pub fn swaps_axes(self) -> bool {
        self.rotation % 2 == 1
    }

    /// Apply `self` first, then `other`.
    pub fn compose(self, other: Self) -> Self {
        if !self.flip {
            Self::new(self.rotation.wrapping_add(other.rotation), other.flip)
        } else {
            Self::new(self.rotation.wrapping_sub(other.rotation), !other.flip)
        }
    }

    /// The orientation that undoes this one.
    pub fn inverse(self) -> Self {
        if self.flip {
            // Flips are self-inverse, including flip-after-rotation.
            self
        } else {
            Self::new(4 - self.rotation, false)
        }
    }

    /// Dimensions after this orientation is applied.
    pub fn transform_size(self, size: SizeF) -> SizeF {
        if self.swaps_axes() {
            SizeF::new(size.height, size.width)
        } else {
            size
        }
    }

    /// Map a point of a `source`-sized image into oriented coordinates.
    ///
    /// Coordinates are continuous: `(0, 0)` is the top-left corner and
    /// `(w, h)` the bottom-right corner of the image.
    pub fn transform_point(self, p: PointF, source: SizeF) -> PointF {
        let (w, h) = (source.width, source.height);
        let rotated = match self.rotation {
            1 => PointF::new(h - p.y, p.x),
            2 => PointF::new(w - p.x, h - p.y),
            3 => PointF::new(p.y, w - p.x),
            _ => p,
        };
        if self.flip {
            let out_w = self.transform_size(source).width;
            PointF::new(out_w - rotated.x, rotated.y)
        } else {
            rotated
        }
    }
}
