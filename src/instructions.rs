//! Typed processing instructions: size, fit, scale, crop, rings, rotation, colors.
//!
//! Produced by [`crate::riapi::parse()`] or built directly, consumed by the
//! layout engine and the pipeline.

use alloc::collections::BTreeMap;
use alloc::string::String;

use crate::edges::BoxEdges;
use crate::geometry::Anchor;

/// How to reconcile the source aspect ratio with the requested box.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum FitMode {
    /// Not specified; inferred from the other instructions.
    #[default]
    None,
    /// Scale proportionally to fit within the box.
    Max,
    /// Scale proportionally to fit within the box, pad the remainder.
    Pad,
    /// Scale proportionally to fill the box, crop the overflow.
    Crop,
    /// Content-aware resize. Seam carving is not available, so this stretches.
    Carve,
    /// Scale to the exact box, distorting aspect ratio.
    Stretch,
}

/// Which scaling directions are permitted.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum ScaleMode {
    /// Never upscale.
    #[default]
    DownscaleOnly,
    /// Never downscale.
    UpscaleOnly,
    /// Scale either way.
    Both,
    /// Never upscale the image, but grow the canvas to the requested area.
    UpscaleCanvas,
}

/// Mirror axes.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum FlipMode {
    #[default]
    None,
    /// Mirror left-right.
    X,
    /// Mirror top-bottom.
    Y,
    /// Both axes (equivalent to a 180° rotation).
    XY,
}

impl FlipMode {
    /// `(horizontal, vertical)`.
    pub fn axes(self) -> (bool, bool) {
        match self {
            Self::None => (false, false),
            Self::X => (true, false),
            Self::Y => (false, true),
            Self::XY => (true, true),
        }
    }
}

/// An sRGB color with straight alpha.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);
    /// Opaque black.
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);

    /// Create a color.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Whether alpha is zero.
    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Channel array in RGBA order.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Dimension value meaning "not set" for width, height and their maxima.
pub const UNSET_DIMENSION: f64 = -1.0;

/// Processing instructions.
///
/// Every field is optional; accessors such as [`scale_mode()`](Self::scale_mode)
/// and [`zoom_factor()`](Self::zoom_factor) apply the defaults.
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct Instructions {
    /// Requested width (`w`, `width`).
    pub width: Option<f64>,
    /// Requested height (`h`, `height`).
    pub height: Option<f64>,
    /// Upper bound on width (`maxwidth`).
    pub max_width: Option<f64>,
    /// Upper bound on height (`maxheight`).
    pub max_height: Option<f64>,
    /// Fit mode (`mode`).
    pub mode: Option<FitMode>,
    /// Scale mode (`scale`).
    pub scale: Option<ScaleMode>,
    /// Alignment for crop and pad (`anchor`).
    pub anchor: Option<Anchor>,
    /// Output rotation in degrees, clockwise (`rotate`).
    pub rotate: Option<f64>,
    /// Source rotation in degrees, clockwise (`srotate`). Quarter turns only.
    pub source_rotate: Option<f64>,
    /// Output flip (`flip`).
    pub flip: Option<FlipMode>,
    /// Source flip (`sflip`).
    pub source_flip: Option<FlipMode>,
    /// Crop rectangle `[x1, y1, x2, y2]` in crop-unit space (`crop`, `c`).
    pub crop: Option<[f64; 4]>,
    /// Horizontal crop coordinate space; 0 or absent = source pixels.
    pub crop_x_units: Option<f64>,
    /// Vertical crop coordinate space; 0 or absent = source pixels.
    pub crop_y_units: Option<f64>,
    /// Size multiplier (`zoom`, `dpr`).
    pub zoom: Option<f64>,
    /// Padding ring (`paddingwidth`).
    pub padding: Option<BoxEdges>,
    /// Border ring (`borderwidth`).
    pub border: Option<BoxEdges>,
    /// Margin ring (`margin`).
    pub margin: Option<BoxEdges>,
    /// Canvas fill (`bgcolor`).
    pub background_color: Option<Color>,
    /// Border stroke color (`bordercolor`).
    pub border_color: Option<Color>,
    /// Padding fill (`paddingcolor`); defaults to the background color.
    pub padding_color: Option<Color>,
    /// Legacy `stretch=fill`.
    pub stretch_fill: bool,
    /// Legacy `crop=auto`.
    pub crop_auto: bool,
    /// Legacy `carve=true`.
    pub carve: bool,
    /// 1-based frame of a multi-frame source (`frame`).
    pub frame: Option<u32>,
    /// 1-based page of a multi-page source (`page`).
    pub page: Option<u32>,
    /// Output resolution metadata (`dpi`).
    pub dpi: Option<f64>,
    /// Non-layout parameters preserved for downstream consumers.
    pub extras: BTreeMap<String, String>,
}

impl Instructions {
    /// Create empty instructions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the requested width.
    pub fn width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    /// Set the requested height.
    pub fn height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    /// Set the maximum width.
    pub fn max_width(mut self, max_width: f64) -> Self {
        self.max_width = Some(max_width);
        self
    }

    /// Set the maximum height.
    pub fn max_height(mut self, max_height: f64) -> Self {
        self.max_height = Some(max_height);
        self
    }

    /// Set the fit mode.
    pub fn mode(mut self, mode: FitMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set the scale mode.
    pub fn scale(mut self, scale: ScaleMode) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Set the anchor.
    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Set the output rotation in degrees.
    pub fn rotate(mut self, degrees: f64) -> Self {
        self.rotate = Some(degrees);
        self
    }

    /// Set the source rotation in degrees.
    pub fn source_rotate(mut self, degrees: f64) -> Self {
        self.source_rotate = Some(degrees);
        self
    }

    /// Set the output flip.
    pub fn flip(mut self, flip: FlipMode) -> Self {
        self.flip = Some(flip);
        self
    }

    /// Set the source flip.
    pub fn source_flip(mut self, flip: FlipMode) -> Self {
        self.source_flip = Some(flip);
        self
    }

    /// Set the crop rectangle in source pixels.
    pub fn crop(mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        self.crop = Some([x1, y1, x2, y2]);
        self
    }

    /// Set the crop coordinate space.
    pub fn crop_units(mut self, x_units: f64, y_units: f64) -> Self {
        self.crop_x_units = Some(x_units);
        self.crop_y_units = Some(y_units);
        self
    }

    /// Set the zoom multiplier.
    pub fn zoom(mut self, zoom: f64) -> Self {
        self.zoom = Some(zoom);
        self
    }

    /// Set the padding ring.
    pub fn padding(mut self, edges: BoxEdges) -> Self {
        self.padding = Some(edges);
        self
    }

    /// Set the border ring.
    pub fn border(mut self, edges: BoxEdges) -> Self {
        self.border = Some(edges);
        self
    }

    /// Set the margin ring.
    pub fn margin(mut self, edges: BoxEdges) -> Self {
        self.margin = Some(edges);
        self
    }

    /// Set the background color.
    pub fn background_color(mut self, color: Color) -> Self {
        self.background_color = Some(color);
        self
    }

    /// Set the border color.
    pub fn border_color(mut self, color: Color) -> Self {
        self.border_color = Some(color);
        self
    }

    /// Set the padding color.
    pub fn padding_color(mut self, color: Color) -> Self {
        self.padding_color = Some(color);
        self
    }

    /// Select a frame (1-based).
    pub fn frame(mut self, frame: u32) -> Self {
        self.frame = Some(frame);
        self
    }

    // ---- Resolved accessors ----

    /// Whether any of width, height, max_width or max_height is set.
    pub fn has_dimensions(&self) -> bool {
        [self.width, self.height, self.max_width, self.max_height]
            .iter()
            .any(|v| v.is_some_and(|v| v != UNSET_DIMENSION))
    }

    /// Scale mode, defaulting to [`ScaleMode::DownscaleOnly`].
    pub fn scale_mode(&self) -> ScaleMode {
        self.scale.unwrap_or_default()
    }

    /// Anchor, defaulting to [`Anchor::MiddleCenter`].
    pub fn anchor_or_default(&self) -> Anchor {
        self.anchor.unwrap_or_default()
    }

    /// Requested width, with [`UNSET_DIMENSION`] read as absent.
    pub fn requested_width(&self) -> Option<f64> {
        self.width.filter(|&v| v != UNSET_DIMENSION)
    }

    /// Requested height, with [`UNSET_DIMENSION`] read as absent.
    pub fn requested_height(&self) -> Option<f64> {
        self.height.filter(|&v| v != UNSET_DIMENSION)
    }

    /// Zoom clamped to `[0.00008, 80000]`; unusable values become 1.
    pub fn zoom_factor(&self) -> f64 {
        match self.zoom {
            Some(z) if z.is_finite() && z > 0.0 => z.clamp(0.000_08, 80_000.0),
            _ => 1.0,
        }
    }

    /// Output rotation in degrees (0 when unset or non-finite).
    pub fn rotate_degrees(&self) -> f64 {
        self.rotate.filter(|d| d.is_finite()).unwrap_or(0.0)
    }

    /// Padding edges, empty when unset.
    pub fn padding_edges(&self) -> BoxEdges {
        self.padding.unwrap_or_default()
    }

    /// Border edges, empty when unset.
    pub fn border_edges(&self) -> BoxEdges {
        self.border.unwrap_or_default()
    }

    /// Margin edges, empty when unset.
    pub fn margin_edges(&self) -> BoxEdges {
        self.margin.unwrap_or_default()
    }

    /// Background color, transparent when unset.
    pub fn background(&self) -> Color {
        self.background_color.unwrap_or(Color::TRANSPARENT)
    }

    /// 0-based frame index requested by `frame` (or `page` when `frame` is unset).
    pub fn frame_index(&self) -> usize {
        self.frame
            .or(self.page)
            .map(|f| f.saturating_sub(1) as usize)
            .unwrap_or(0)
    }

    /// Access non-layout parameters preserved during parsing.
    pub fn extras(&self) -> &BTreeMap<String, String> {
        &self.extras
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let i = Instructions::new();
        assert!(!i.has_dimensions());
        assert_eq!(i.scale_mode(), ScaleMode::DownscaleOnly);
        assert_eq!(i.anchor_or_default(), Anchor::MiddleCenter);
        assert_eq!(i.zoom_factor(), 1.0);
        assert_eq!(i.rotate_degrees(), 0.0);
        assert!(i.padding_edges().is_empty());
        assert_eq!(i.background(), Color::TRANSPARENT);
        assert_eq!(i.frame_index(), 0);
    }

    #[test]
    fn zoom_guards() {
        assert_eq!(Instructions::new().zoom(0.0).zoom_factor(), 1.0);
        assert_eq!(Instructions::new().zoom(-2.0).zoom_factor(), 1.0);
        assert_eq!(Instructions::new().zoom(f64::NAN).zoom_factor(), 1.0);
        assert_eq!(Instructions::new().zoom(1e9).zoom_factor(), 80_000.0);
        assert_eq!(Instructions::new().zoom(2.0).zoom_factor(), 2.0);
    }

    #[test]
    fn max_only_counts_as_dimensions() {
        assert!(Instructions::new().max_width(10.0).has_dimensions());
        assert!(!Instructions::new().width(UNSET_DIMENSION).has_dimensions());
    }

    #[test]
    fn frame_falls_back_to_page() {
        let mut i = Instructions::new();
        i.page = Some(3);
        assert_eq!(i.frame_index(), 2);
        assert_eq!(i.frame(0).frame_index(), 0);
    }

    #[test]
    fn flip_axes() {
        assert_eq!(FlipMode::XY.axes(), (true, true));
        assert_eq!(FlipMode::Y.axes(), (false, true));
    }
}
