//! Layout engine: instructions + source size → copy rectangle, image size, area size.
//!
//! Pure geometry. Given the original size, the manual crop rectangle and the
//! instructions, [`resolve()`] decides which source pixels are copied
//! (`copy_rect`), how large they become (`target_size`) and how large the area
//! around them is (`area_size`, larger than the target only when padding).
//! [`LayoutResult::apply_to()`] then seeds a [`RingLayout`] with the "image" and
//! "imageArea" rings.
//!
//! ```
//! use zenrings::{Instructions, RectF, SizeF, engine};
//!
//! let original = SizeF::new(400.0, 200.0);
//! let i = Instructions::new().width(100.0).height(100.0);
//! let r = engine::resolve(original, RectF::from_size(original), &i).unwrap();
//!
//! assert_eq!(r.target_size, SizeF::new(100.0, 50.0));
//! assert_eq!(r.area_size, SizeF::new(100.0, 100.0));
//! ```

use crate::error::{Error, Result};
use crate::geometry::{self, Anchor, RectF, SizeF};
use crate::instructions::{FitMode, Instructions, ScaleMode, UNSET_DIMENSION};
use crate::rings::{self, RingLayout};

/// Output of [`resolve()`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LayoutResult {
    /// The fit mode actually used (never [`FitMode::None`]).
    pub fit_mode: FitMode,
    /// Source region to copy, in (oriented) source pixels.
    pub copy_rect: RectF,
    /// Size the copied region is resampled to. Whole pixels, at least 1×1.
    pub target_size: SizeF,
    /// Size of the area the image sits in. Whole pixels, at least 1×1.
    pub area_size: SizeF,
    /// Alignment of the image inside its area.
    pub anchor: Anchor,
}

impl LayoutResult {
    /// Shift existing geometry into output space and add the "image" and
    /// "imageArea" rings.
    ///
    /// Points already in the layout (tracked points, typically) are in source
    /// space; after this call they are in the same space as the image ring.
    pub fn apply_to(&self, layout: &mut RingLayout) -> Result<()> {
        let image = RectF::from_size(self.target_size);
        layout.shift(self.copy_rect, image);
        layout.add_ring(rings::IMAGE, image.to_polygon());
        layout.add_ring(
            rings::IMAGE_AREA,
            RectF::from_size(self.area_size).to_polygon(),
        );
        layout.align_ring_with(rings::IMAGE_AREA, rings::IMAGE, self.anchor)
    }
}

/// Resolve the `crop` instruction against the source size.
///
/// Without a crop the whole source is used. Coordinates are first scaled from
/// crop units into pixels, then negative `x1`/`y1` count from the right and
/// bottom edges and non-positive `x2`/`y2` count back from them (0 is the
/// edge itself). The result is clamped to the source.
pub fn resolve_manual_crop(original: SizeF, instructions: &Instructions) -> Result<RectF> {
    let Some(crop) = instructions.crop else {
        return Ok(RectF::from_size(original));
    };
    let degenerate = || Error::DegenerateCrop {
        crop,
        width: original.width,
        height: original.height,
    };
    if crop.iter().all(|&v| v == 0.0) || crop.iter().any(|v| !v.is_finite()) {
        return Err(degenerate());
    }

    let unit_scale = |units: Option<f64>, extent: f64| match units {
        Some(u) if u.is_finite() && u > 0.0 => extent / u,
        _ => 1.0,
    };
    let sx = unit_scale(instructions.crop_x_units, original.width);
    let sy = unit_scale(instructions.crop_y_units, original.height);
    let (mut x1, mut y1) = (crop[0] * sx, crop[1] * sy);
    let (mut x2, mut y2) = (crop[2] * sx, crop[3] * sy);

    if x1 < 0.0 {
        x1 += original.width;
    }
    if y1 < 0.0 {
        y1 += original.height;
    }
    if x2 <= 0.0 {
        x2 += original.width;
    }
    if y2 <= 0.0 {
        y2 += original.height;
    }

    let x1 = x1.clamp(0.0, original.width);
    let y1 = y1.clamp(0.0, original.height);
    let x2 = x2.clamp(0.0, original.width);
    let y2 = y2.clamp(0.0, original.height);
    if x2 <= x1 || y2 <= y1 {
        return Err(degenerate());
    }
    Ok(RectF::new(x1, y1, x2 - x1, y2 - y1))
}

/// Pick the fit mode when none is given.
pub fn infer_fit_mode(instructions: &Instructions) -> FitMode {
    match instructions.mode {
        Some(mode) if mode != FitMode::None => mode,
        _ if instructions.requested_width().is_none()
            && instructions.requested_height().is_none() =>
        {
            FitMode::Max
        }
        _ if instructions.stretch_fill => FitMode::Stretch,
        _ if instructions.crop_auto => FitMode::Crop,
        _ if instructions.carve => FitMode::Carve,
        _ => FitMode::Pad,
    }
}

/// Validate one requested dimension. `-1` means unset.
fn dimension(name: &'static str, value: Option<f64>) -> Result<Option<f64>> {
    match value {
        Some(v) if v == UNSET_DIMENSION => Ok(None),
        Some(v) if !(v.is_finite() && v > 0.0) => Err(Error::InvalidInstruction {
            name,
            reason: alloc::format!("{v} is not a positive finite size"),
        }),
        v => Ok(v),
    }
}

/// Reduce width, height, max_width and max_height to at most one box.
///
/// Returns `None` when no dimension is given. `ratio` is the crop aspect ratio.
fn requested_box(instructions: &Instructions, ratio: f64) -> Result<Option<SizeF>> {
    let mut w = dimension("width", instructions.width)?;
    let mut h = dimension("height", instructions.height)?;
    let mut max_w = dimension("maxwidth", instructions.max_width)?;
    let mut max_h = dimension("maxheight", instructions.max_height)?;

    // An exact value overrides its own maximum.
    if w.is_some() {
        max_w = None;
    }
    if h.is_some() {
        max_h = None;
    }

    // A maximum on the other axis limits the derived dimension.
    if let (Some(w), Some(mh)) = (w, max_h) {
        max_h = Some(mh.min(w / ratio));
    }
    if let (Some(h), Some(mw)) = (h, max_w) {
        max_w = Some(mw.min(h * ratio));
    }

    // Two maxima and no values: keep the one that yields the smaller image.
    if let (Some(mw), Some(mh)) = (max_w, max_h) {
        if mw / mh > ratio {
            max_w = None;
        } else {
            max_h = None;
        }
    }

    w = w.or(max_w);
    h = h.or(max_h);

    Ok(match (w, h) {
        (Some(w), Some(h)) => Some(SizeF::new(w, h)),
        (Some(w), None) => Some(SizeF::new(w, w / ratio)),
        (None, Some(h)) => Some(SizeF::new(h * ratio, h)),
        (None, None) => None,
    })
}

/// Compute the image layout.
///
/// `manual_crop` is normally the result of [`resolve_manual_crop()`]; it is
/// the region of `original` the layout works from.
pub fn resolve(
    original: SizeF,
    manual_crop: RectF,
    instructions: &Instructions,
) -> Result<LayoutResult> {
    let fit_mode = infer_fit_mode(instructions);
    let scale = instructions.scale_mode();
    let anchor = instructions.anchor_or_default();

    let mut manual_crop = manual_crop;
    let crop_size = manual_crop.size();
    let ratio = crop_size.aspect_ratio();
    let mut copy_rect = manual_crop;

    // Step 1: requested box, then per-mode target and area.
    let (mut area, mut target) = match requested_box(instructions, ratio)? {
        None => (crop_size, crop_size),
        Some(wh) => match fit_mode {
            FitMode::Max => {
                let t = crop_size.scale_inside(wh);
                (t, t)
            }
            FitMode::Pad => (wh, crop_size.scale_inside(wh)),
            FitMode::Crop => {
                let width_smaller = crop_size.width <= wh.width;
                let height_smaller = crop_size.height <= wh.height;
                let partial = match scale {
                    ScaleMode::DownscaleOnly => width_smaller != height_smaller,
                    ScaleMode::UpscaleCanvas => width_smaller || height_smaller,
                    _ => false,
                };
                if partial {
                    // Source smaller than the box on some axis: crop only the
                    // overflowing axis instead of upscaling.
                    let t = crop_size.min(wh);
                    copy_rect =
                        geometry::align_rect(RectF::from_size(t), manual_crop, anchor);
                    manual_crop = copy_rect;
                    let area = if scale == ScaleMode::DownscaleOnly {
                        t
                    } else {
                        wh
                    };
                    (area, t)
                } else {
                    let copy = wh.scale_inside(crop_size).round_min_one();
                    copy_rect =
                        geometry::align_rect(RectF::from_size(copy), manual_crop, anchor);
                    (wh, wh)
                }
            }
            FitMode::Stretch | FitMode::Carve | FitMode::None => (wh, wh),
        },
    };

    // Step 2: zoom.
    let zoom = instructions.zoom_factor();
    area = area.scaled(zoom);
    target = target.scaled(zoom);

    // Step 3: scale mode may undo the resize.
    let source = manual_crop.size();
    let fits = source.fits_inside(target);
    match scale {
        ScaleMode::DownscaleOnly if fits => {
            area = source;
            target = source;
            copy_rect = manual_crop;
        }
        ScaleMode::UpscaleOnly if !fits => {
            area = source;
            target = source;
            copy_rect = manual_crop;
        }
        ScaleMode::UpscaleCanvas if fits => {
            target = source;
            copy_rect = manual_crop;
        }
        _ => {}
    }

    // Step 4: whole pixels, never empty.
    let area_size = area.round_min_one();
    let target_size = target.round_min_one();

    tracing::trace!(
        original_w = original.width,
        original_h = original.height,
        ?fit_mode,
        ?scale,
        copy = ?copy_rect,
        target_w = target_size.width,
        target_h = target_size.height,
        area_w = area_size.width,
        area_h = area_size.height,
        "resolved image layout"
    );

    Ok(LayoutResult {
        fit_mode,
        copy_rect,
        target_size,
        area_size,
        anchor,
    })
}

/// [`resolve_manual_crop()`] followed by [`resolve()`].
pub fn resolve_for(original: SizeF, instructions: &Instructions) -> Result<LayoutResult> {
    let manual_crop = resolve_manual_crop(original, instructions)?;
    resolve(original, manual_crop, instructions)
}
