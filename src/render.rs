//! Pixel stages: source selection, canvas, background, padding, image, border.
//!
//! Geometry is final by the time these run; every stage reads the rounded
//! rings and draws into one RGBA8 canvas. Resampling, rotation and
//! compositing go through `image`; polygon fills, strokes and the affine
//! warp for arbitrary angles go through `imageproc`.

use std::borrow::Cow;
use std::collections::BTreeMap;

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_polygon_mut, draw_polygon_mut};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use imageproc::point::Point;

use crate::edges::BoxEdges;
use crate::error::{Error, Result};
use crate::geometry::{self, PointF, RectF, Size, SizeF};
use crate::instructions::{Color, Instructions};
use crate::orientation::Orientation;
use crate::pipeline::{Flow, OutputCapabilities, Pipeline, Stage};
use crate::rings::{self, RingLayout};
use crate::state::ImageState;

// ============================================================================
// Inputs and outputs
// ============================================================================

/// Decoded source pixels: one or more frames (pages).
#[derive(Clone, Debug)]
pub struct SourceBitmap {
    frames: Vec<DynamicImage>,
}

impl SourceBitmap {
    /// A single-frame source.
    pub fn new(image: DynamicImage) -> Self {
        Self {
            frames: vec![image],
        }
    }

    /// A multi-frame source. At least one frame is required.
    pub fn from_frames(frames: Vec<DynamicImage>) -> Result<Self> {
        if frames.is_empty() {
            return Err(Error::EmptySource {
                width: 0,
                height: 0,
            });
        }
        Ok(Self { frames })
    }

    /// Decode an encoded image (format sniffed from the bytes).
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes).map_err(|e| Error::Corrupted {
            message: e.to_string(),
        })?;
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            color = ?image.color(),
            "decoded source"
        );
        Ok(Self::new(image))
    }

    pub fn frames(&self) -> &[DynamicImage] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Size of the first frame.
    pub fn size(&self) -> Size {
        self.frames
            .first()
            .map(|f| Size::new(f.width(), f.height()))
            .unwrap_or(Size::new(0, 0))
    }
}

impl From<DynamicImage> for SourceBitmap {
    fn from(image: DynamicImage) -> Self {
        Self::new(image)
    }
}

impl From<RgbaImage> for SourceBitmap {
    fn from(image: RgbaImage) -> Self {
        Self::new(DynamicImage::ImageRgba8(image))
    }
}

/// A finished job.
#[derive(Clone, Debug)]
pub struct ProcessedImage {
    /// The canvas; `None` when an extension cancelled before it was allocated.
    pub pixels: Option<RgbaImage>,
    pub final_size: Size,
    /// An extension returned [`Flow::Cancel`] and the remaining stages were skipped.
    pub cancelled: bool,
    /// Output resolution metadata, if requested.
    pub dpi: Option<f64>,
    /// `source.width`, `source.height`, `final.width`, `final.height`.
    pub result_info: BTreeMap<String, String>,
}

impl Pipeline {
    /// Render `source` according to `instructions`. The source is borrowed.
    pub fn process(
        &self,
        source: &SourceBitmap,
        instructions: &Instructions,
    ) -> Result<ProcessedImage> {
        self.process_frames(Cow::Borrowed(source.frames.as_slice()), instructions)
    }

    /// Like [`process`](Self::process), taking ownership of the source. The
    /// source pixels are dropped when the job ends, whatever the outcome.
    pub fn process_owned(
        &self,
        source: SourceBitmap,
        instructions: &Instructions,
    ) -> Result<ProcessedImage> {
        self.process_frames(Cow::Owned(source.frames), instructions)
    }

    fn process_frames(
        &self,
        frames: Cow<'_, [DynamicImage]>,
        instructions: &Instructions,
    ) -> Result<ProcessedImage> {
        let _permit = match self.limiter() {
            Some(limiter) => Some(limiter.acquire(self.config().queue_timeout)?),
            None => None,
        };

        let mut state = ImageState::for_frames(frames, self.prepare_instructions(instructions));
        // Rendering needs finished geometry, so a cancelled layout ends the job.
        let cancelled = self.run_phase(&Stage::LAYOUT, &mut state)? == Flow::Cancel
            || self.run_phase(&Stage::RENDER, &mut state)? == Flow::Cancel;
        if cancelled {
            tracing::debug!(canvas = state.dest.is_some(), "job cancelled by extension");
        }

        let pixels = state.dest.take();
        let final_size = state
            .final_size
            .or(pixels.as_ref().map(|p| Size::new(p.width(), p.height())))
            .unwrap_or(state.dest_size);
        Ok(ProcessedImage {
            pixels,
            final_size,
            cancelled,
            dpi: state.job.dpi,
            result_info: std::mem::take(&mut state.job.result_info),
        })
    }
}

// ============================================================================
// Source preparation (layout phase)
// ============================================================================

/// Pick the requested frame; out-of-range requests use the last frame.
pub(crate) fn select_frame<'a>(state: &mut ImageState<'a>) {
    let count = state.frames.len();
    if count == 0 {
        return;
    }
    let requested = state.instructions.frame_index();
    let index = if requested >= count {
        tracing::warn!(requested, count, "frame out of range; using last frame");
        count - 1
    } else {
        requested
    };
    let frame: Cow<'a, DynamicImage> = match std::mem::take(&mut state.frames) {
        Cow::Borrowed(frames) => Cow::Borrowed(&frames[index]),
        Cow::Owned(mut frames) => Cow::Owned(frames.swap_remove(index)),
    };

    let size = SizeF::new(frame.width() as f64, frame.height() as f64);
    state.original_size = size;
    state.manual_crop = RectF::from_size(size);
    state.copy_rect = RectF::from_size(size);
    state.job.set("source.width", frame.width());
    state.job.set("source.height", frame.height());
    state.source = Some(frame);
}

/// Rotate/flip the selected frame's pixels.
pub(crate) fn orient_source(state: &mut ImageState<'_>, orientation: Orientation) {
    let Some(source) = state.source.take() else {
        return;
    };
    let rotated = match orientation.rotation {
        1 => Some(source.rotate90()),
        2 => Some(source.rotate180()),
        3 => Some(source.rotate270()),
        _ => None,
    };
    let oriented = match (rotated, orientation.flip) {
        (Some(r), true) => r.fliph(),
        (None, true) => source.fliph(),
        (Some(r), false) => r,
        (None, false) => {
            state.source = Some(source);
            return;
        }
    };
    state.source = Some(Cow::Owned(oriented));
}

// ============================================================================
// Render phase
// ============================================================================

pub(crate) fn run_stage(
    stage: Stage,
    state: &mut ImageState<'_>,
    pipeline: &Pipeline,
) -> Result<Flow> {
    let output = pipeline.output();
    match stage {
        Stage::PrepareDestinationBitmap => {
            let Size { width, height } = state.dest_size;
            check_canvas(width, height, pipeline.config().max_pixels)?;
            state.dest = Some(RgbaImage::new(width, height));
        }
        Stage::RenderBackground => render_background(state, output),
        Stage::RenderPadding => render_padding(state, output),
        Stage::RenderImage => render_image(state)?,
        Stage::RenderBorder => render_border(state),
        Stage::ProcessFinalBitmap => finish(state),
        _ => {}
    }
    Ok(Flow::Continue)
}

/// Refuse canvases over `max_pixels` or too large to address as RGBA8.
fn check_canvas(width: u32, height: u32, max_pixels: Option<u64>) -> Result<()> {
    let pixels = u64::from(width) * u64::from(height);
    let addressable = u64::try_from(usize::MAX / 4).unwrap_or(u64::MAX);
    let limit = max_pixels.map_or(addressable, |m| m.min(addressable));
    if pixels > limit {
        tracing::warn!(width, height, limit, "refusing oversized canvas");
        return Err(Error::CanvasTooLarge {
            width,
            height,
            limit,
        });
    }
    Ok(())
}

/// Background color after applying the output's alpha support.
fn effective_background(state: &ImageState<'_>, output: OutputCapabilities) -> Color {
    let color = state.instructions.background();
    if color.is_transparent() && !output.supports_transparency {
        Color::WHITE
    } else {
        color
    }
}

fn render_background(state: &mut ImageState<'_>, output: OutputCapabilities) {
    let source_has_alpha = state
        .source
        .as_deref()
        .map(|s| s.color().has_alpha())
        .unwrap_or(true);
    let image_bounds = state.layout.ring_bounds(rings::IMAGE);
    let nothing_to_show = !source_has_alpha && image_bounds == Some(state.layout.bounding_box());
    if nothing_to_show {
        tracing::trace!("background fully covered by opaque image");
        return;
    }

    let color = effective_background(state, output);
    let Some(dest) = state.dest.as_mut() else {
        return;
    };
    if color.a == 0 {
        return;
    }
    let px = Rgba(color.to_array());
    for p in dest.pixels_mut() {
        *p = px;
    }
}

fn render_padding(state: &mut ImageState<'_>, output: OutputCapabilities) {
    let color = state
        .instructions
        .padding_color
        .unwrap_or_else(|| effective_background(state, output));
    if color.a == 0 {
        return;
    }
    let (Some(points), Some(dest)) = (state.layout.ring(rings::PADDING), state.dest.as_mut())
    else {
        return;
    };
    fill_polygon(dest, points, Rgba(color.to_array()));
}

fn render_image(state: &mut ImageState<'_>) -> Result<()> {
    let (Some(source), Some(dest)) = (state.source.as_deref(), state.dest.as_mut()) else {
        return Ok(());
    };
    let Some(ring) = state.layout.ring(rings::IMAGE) else {
        return Ok(());
    };
    if source.width() == 0 || source.height() == 0 {
        return Err(Error::EmptySource {
            width: source.width(),
            height: source.height(),
        });
    }

    let (x, y, w, h) = pixel_rect(state.copy_rect, source.width(), source.height());
    let copied = source.crop_imm(x, y, w, h).to_rgba8();
    let Some(bounds) = geometry::bounding_box(ring) else {
        return Ok(());
    };

    match quarter_turns(state.instructions.rotate_degrees()) {
        Some(turns) => {
            let (tw, th) = if turns % 2 == 1 {
                (bounds.height, bounds.width)
            } else {
                (bounds.width, bounds.height)
            };
            let resized = resample(copied, SizeF::new(tw, th).to_pixels());
            let placed = match turns {
                1 => imageops::rotate90(&resized),
                2 => imageops::rotate180(&resized),
                3 => imageops::rotate270(&resized),
                _ => resized,
            };
            tracing::trace!(
                x = bounds.x,
                y = bounds.y,
                turns,
                "placing image"
            );
            imageops::overlay(dest, &placed, bounds.x as i64, bounds.y as i64);
        }
        None => {
            let target = state
                .image_layout
                .map(|l| l.target_size)
                .unwrap_or(SizeF::new(w as f64, h as f64));
            let resized = resample(copied, target.to_pixels());
            let projection = ring_projection(ring, &resized).ok_or_else(|| Error::Render {
                stage: Stage::RenderImage.name(),
                message: "image ring is not an invertible quadrilateral".into(),
            })?;
            let mut warped = RgbaImage::new(dest.width(), dest.height());
            warp_into(
                &resized,
                &projection,
                Interpolation::Bicubic,
                Rgba([0, 0, 0, 0]),
                &mut warped,
            );
            imageops::overlay(dest, &warped, 0, 0);
        }
    }
    Ok(())
}

fn render_border(state: &mut ImageState<'_>) {
    let edges = state.instructions.border_edges();
    let color = state.instructions.border_color.unwrap_or(Color::BLACK);
    if edges.is_empty() || color.a == 0 {
        return;
    }
    let Some(inner) = ring_inside(&state.layout, rings::BORDER) else {
        return;
    };
    let Some(dest) = state.dest.as_mut() else {
        return;
    };
    let px = Rgba(color.to_array());

    let uniform = edges.all();
    if !uniform.is_nan() {
        // Concentric one-pixel strokes along pixel centers.
        let strokes = uniform.ceil() as u32;
        for i in 0..strokes {
            let line = geometry::inflate_polygon(&inner, &BoxEdges::uniform(i as f64 + 0.5));
            let line: Vec<Point<f32>> = line
                .iter()
                .map(|p| Point::new((p.x - 0.5) as f32, (p.y - 0.5) as f32))
                .collect();
            draw_hollow_polygon_mut(dest, &line, px);
        }
        return;
    }

    // One mitered quadrilateral per edge, between the pixel-center lines
    // just outside the inner ring and just inside the outer one.
    let near = geometry::inflate_polygon(&inner, &BoxEdges::uniform(0.5));
    let far = geometry::inflate_polygon(
        &inner,
        &BoxEdges {
            top: edges.top - 0.5,
            right: edges.right - 0.5,
            bottom: edges.bottom - 0.5,
            left: edges.left - 0.5,
        },
    );
    if near.len() != 4 || far.len() != 4 {
        return;
    }
    let widths = [edges.top, edges.right, edges.bottom, edges.left];
    for i in 0..4 {
        if widths[i] <= 0.0 {
            continue;
        }
        let j = (i + 1) % 4;
        let quad: Vec<Point<i32>> = [near[i], near[j], far[j], far[i]]
            .iter()
            .map(|p| pixel_point(PointF::new(p.x - 0.5, p.y - 0.5)))
            .collect();
        draw_raster_polygon(dest, quad, px);
    }
}

fn finish(state: &mut ImageState<'_>) {
    let Some(dest) = state.dest.as_mut() else {
        return;
    };
    let (horizontal, vertical) = state.instructions.flip.unwrap_or_default().axes();
    if horizontal {
        imageops::flip_horizontal_in_place(dest);
    }
    if vertical {
        imageops::flip_vertical_in_place(dest);
    }
    let size = Size::new(dest.width(), dest.height());
    state.final_size = Some(size);
    state.job.dpi = state.instructions.dpi.filter(|d| d.is_finite() && *d > 0.0);
    state.job.set("final.width", size.width);
    state.job.set("final.height", size.height);
    tracing::debug!(width = size.width, height = size.height, "render complete");
}

// ============================================================================
// Helpers
// ============================================================================

/// Whole clockwise quarter turns, or `None` for any other angle.
fn quarter_turns(degrees: f64) -> Option<u8> {
    let wrapped = degrees % 360.0;
    let wrapped = if wrapped < 0.0 { wrapped + 360.0 } else { wrapped };
    if wrapped % 90.0 == 0.0 {
        Some((wrapped / 90.0) as u8 % 4)
    } else {
        None
    }
}

/// Round a rectangle to pixels inside a `width`×`height` image, at least 1×1.
fn pixel_rect(rect: RectF, width: u32, height: u32) -> (u32, u32, u32, u32) {
    let r = rect.rounded();
    let x = r.x.clamp(0.0, (width - 1) as f64) as u32;
    let y = r.y.clamp(0.0, (height - 1) as f64) as u32;
    let w = (r.width.max(1.0) as u32).min(width - x);
    let h = (r.height.max(1.0) as u32).min(height - y);
    (x, y, w, h)
}

fn resample(image: RgbaImage, size: Size) -> RgbaImage {
    if image.dimensions() == (size.width, size.height) {
        image
    } else {
        imageops::resize(&image, size.width, size.height, FilterType::CatmullRom)
    }
}

/// Affine map from the resized image onto the (rotated) image ring.
fn ring_projection(ring: &[PointF], image: &RgbaImage) -> Option<Projection> {
    let [tl, tr, _, bl] = <[PointF; 4]>::try_from(ring).ok()?;
    let (w, h) = (image.width() as f64, image.height() as f64);
    Projection::from_matrix([
        ((tr.x - tl.x) / w) as f32,
        ((bl.x - tl.x) / h) as f32,
        tl.x as f32,
        ((tr.y - tl.y) / w) as f32,
        ((bl.y - tl.y) / h) as f32,
        tl.y as f32,
        0.0,
        0.0,
        1.0,
    ])
}

/// The ring drawn immediately before `name`.
fn ring_inside(layout: &RingLayout, name: &str) -> Option<Vec<PointF>> {
    let rings: Vec<_> = layout.rings().collect();
    let index = rings.iter().position(|r| r.name == name)?;
    index.checked_sub(1).map(|i| rings[i].points.clone())
}

fn pixel_point(p: PointF) -> Point<i32> {
    let p = p.rounded();
    Point::new(p.x as i32, p.y as i32)
}

/// Fill the pixels whose centers lie inside a ring polygon.
fn fill_polygon(dest: &mut RgbaImage, ring: &[PointF], color: Rgba<u8>) {
    let inset = geometry::inflate_polygon(
        ring,
        &BoxEdges {
            top: -0.5,
            right: -0.5,
            bottom: -0.5,
            left: -0.5,
        },
    );
    let points = inset
        .iter()
        .map(|p| pixel_point(PointF::new(p.x - 0.5, p.y - 0.5)))
        .collect();
    draw_raster_polygon(dest, points, color);
}

/// `draw_polygon_mut` on a point list cleaned of repeats it cannot take.
fn draw_raster_polygon(dest: &mut RgbaImage, mut points: Vec<Point<i32>>, color: Rgba<u8>) {
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    match points.as_slice() {
        [] => {}
        [p] => {
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < dest.width() && (p.y as u32) < dest.height() {
                dest.put_pixel(p.x as u32, p.y as u32, color);
            }
        }
        poly => draw_polygon_mut(dest, poly, color),
    }
}
