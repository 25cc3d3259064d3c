//! Staged processing pipeline.
//!
//! A call runs two phases of fixed stages. The layout phase turns
//! instructions into rings and a canvas size; the render phase (feature
//! `render`) draws pixels. Every stage is bracketed by the registered
//! [`Extension`]s, in registration order, and any of them may cancel the rest
//! of the phase.
//!
//! ```
//! use zenrings::{Instructions, Size, get_final_size};
//!
//! let i = Instructions::new().width(100.0).height(100.0);
//! assert_eq!(get_final_size(Size::new(400, 200), &i).unwrap(), Size::new(100, 100));
//! ```

use alloc::boxed::Box;
use alloc::vec::Vec;
#[cfg(feature = "std")]
use core::time::Duration;

use crate::engine;
use crate::error::Result;
use crate::geometry::{PointF, Size};
use crate::instructions::{Color, Instructions};
#[cfg(feature = "std")]
use crate::limiter::JobLimiter;
use crate::orientation::Orientation;
use crate::rings;
use crate::state::ImageState;

/// Name of the invisible polygon carrying caller points through the layout.
const TRACKED_POINTS: &str = "points";

// ============================================================================
// Stages
// ============================================================================

/// One step of the pipeline.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    PrepareSourceBitmap,
    LayoutImage,
    LayoutPadding,
    LayoutBorder,
    LayoutMargin,
    LayoutRotate,
    LayoutNormalize,
    LayoutRound,
    EndLayout,
    PrepareDestinationBitmap,
    RenderBackground,
    RenderPadding,
    RenderImage,
    RenderBorder,
    ProcessFinalBitmap,
}

impl Stage {
    /// Layout phase, in order.
    pub const LAYOUT: [Stage; 9] = [
        Stage::PrepareSourceBitmap,
        Stage::LayoutImage,
        Stage::LayoutPadding,
        Stage::LayoutBorder,
        Stage::LayoutMargin,
        Stage::LayoutRotate,
        Stage::LayoutNormalize,
        Stage::LayoutRound,
        Stage::EndLayout,
    ];

    /// Render phase, in order.
    pub const RENDER: [Stage; 6] = [
        Stage::PrepareDestinationBitmap,
        Stage::RenderBackground,
        Stage::RenderPadding,
        Stage::RenderImage,
        Stage::RenderBorder,
        Stage::ProcessFinalBitmap,
    ];

    /// The phase this stage belongs to.
    pub fn phase(self) -> Phase {
        if Self::LAYOUT.contains(&self) {
            Phase::Layout
        } else {
            Phase::Render
        }
    }

    /// Stable name for logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Stage::PrepareSourceBitmap => "prepare_source_bitmap",
            Stage::LayoutImage => "layout_image",
            Stage::LayoutPadding => "layout_padding",
            Stage::LayoutBorder => "layout_border",
            Stage::LayoutMargin => "layout_margin",
            Stage::LayoutRotate => "layout_rotate",
            Stage::LayoutNormalize => "layout_normalize",
            Stage::LayoutRound => "layout_round",
            Stage::EndLayout => "end_layout",
            Stage::PrepareDestinationBitmap => "prepare_destination_bitmap",
            Stage::RenderBackground => "render_background",
            Stage::RenderPadding => "render_padding",
            Stage::RenderImage => "render_image",
            Stage::RenderBorder => "render_border",
            Stage::ProcessFinalBitmap => "process_final_bitmap",
        }
    }
}

/// Group of stages that cancel together.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Layout,
    Render,
}

/// Whether the phase keeps going.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Flow {
    #[default]
    Continue,
    /// Skip the remaining stages of the current phase.
    Cancel,
}

// ============================================================================
// Collaborators
// ============================================================================

/// Hooks run around every stage.
///
/// Both methods default to doing nothing. Returning [`Flow::Cancel`] skips the
/// rest of the phase, including the stage itself when returned from
/// [`before`](Self::before).
pub trait Extension: Send + Sync {
    fn before(&self, stage: Stage, state: &mut ImageState<'_>) -> Result<Flow> {
        let _ = (stage, state);
        Ok(Flow::Continue)
    }

    fn after(&self, stage: Stage, state: &mut ImageState<'_>) -> Result<Flow> {
        let _ = (stage, state);
        Ok(Flow::Continue)
    }
}

/// Rewrites instructions before a job starts (presets, defaults, policy).
pub trait SettingsModifier: Send + Sync {
    fn modify(&self, instructions: &mut Instructions);
}

impl<F> SettingsModifier for F
where
    F: Fn(&mut Instructions) + Send + Sync,
{
    fn modify(&self, instructions: &mut Instructions) {
        self(instructions)
    }
}

/// What the eventual encoder can represent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct OutputCapabilities {
    /// Whether the output format carries an alpha channel.
    pub supports_transparency: bool,
}

impl Default for OutputCapabilities {
    fn default() -> Self {
        Self {
            supports_transparency: true,
        }
    }
}

impl OutputCapabilities {
    /// An output without alpha (JPEG, for example).
    pub const OPAQUE: Self = Self {
        supports_transparency: false,
    };
}

/// Default cap on canvas pixels, about 10000×10000.
pub const DEFAULT_MAX_PIXELS: u64 = 100_000_000;

/// Pipeline-wide settings.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Concurrent `process` calls allowed; `None` = unbounded.
    pub max_concurrent_jobs: Option<usize>,
    /// Largest canvas `process` allocates; `None` = only what fits in memory.
    pub max_pixels: Option<u64>,
    /// How long `process` waits for a slot.
    #[cfg(feature = "std")]
    pub queue_timeout: Duration,
    /// Background used when instructions name none.
    pub default_background: Option<Color>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: None,
            max_pixels: Some(DEFAULT_MAX_PIXELS),
            #[cfg(feature = "std")]
            queue_timeout: Duration::from_secs(30),
            default_background: None,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound concurrent jobs.
    pub fn max_concurrent_jobs(mut self, jobs: usize) -> Self {
        self.max_concurrent_jobs = Some(jobs);
        self
    }

    /// Cap the canvas size, or lift the cap with `None`.
    pub fn max_pixels(mut self, limit: Option<u64>) -> Self {
        self.max_pixels = limit;
        self
    }

    /// How long to wait for a job slot.
    #[cfg(feature = "std")]
    pub fn queue_timeout(mut self, timeout: Duration) -> Self {
        self.queue_timeout = timeout;
        self
    }

    /// Background for instructions without `bgcolor`.
    pub fn default_background(mut self, color: Color) -> Self {
        self.default_background = Some(color);
        self
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Runs jobs through the stage list.
///
/// Holds no global state; build one per configuration and share it.
pub struct Pipeline {
    config: PipelineConfig,
    extensions: Vec<Box<dyn Extension>>,
    modifier: Option<Box<dyn SettingsModifier>>,
    output: OutputCapabilities,
    #[cfg(feature = "std")]
    limiter: Option<JobLimiter>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl core::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("extensions", &self.extensions.len())
            .field("modifier", &self.modifier.is_some())
            .field("output", &self.output)
            .finish()
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        #[cfg(feature = "std")]
        let limiter = config.max_concurrent_jobs.map(JobLimiter::new);
        Self {
            config,
            extensions: Vec::new(),
            modifier: None,
            output: OutputCapabilities::default(),
            #[cfg(feature = "std")]
            limiter,
        }
    }

    /// Register an extension. Extensions run in registration order.
    pub fn with_extension(mut self, extension: impl Extension + 'static) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    /// Install the settings modifier, replacing any previous one.
    pub fn with_settings_modifier(mut self, modifier: impl SettingsModifier + 'static) -> Self {
        self.modifier = Some(Box::new(modifier));
        self
    }

    /// Describe the output format.
    pub fn with_output(mut self, output: OutputCapabilities) -> Self {
        self.output = output;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn output(&self) -> OutputCapabilities {
        self.output
    }

    /// The concurrency limiter, when `max_concurrent_jobs` is set.
    #[cfg(feature = "std")]
    pub fn limiter(&self) -> Option<&JobLimiter> {
        self.limiter.as_ref()
    }

    /// Copy the caller's instructions and apply the modifier and defaults.
    pub(crate) fn prepare_instructions(&self, instructions: &Instructions) -> Instructions {
        let mut i = instructions.clone();
        if let Some(m) = &self.modifier {
            m.modify(&mut i);
        }
        if i.background_color.is_none() {
            i.background_color = self.config.default_background;
        }
        i
    }

    /// Run the stages of one phase.
    pub fn run_phase(&self, stages: &[Stage], state: &mut ImageState<'_>) -> Result<Flow> {
        for &stage in stages {
            if self.hooks(stage, state, true)? == Flow::Cancel {
                tracing::debug!(stage = stage.name(), "cancelled by extension before stage");
                return Ok(Flow::Cancel);
            }
            tracing::debug!(stage = stage.name(), "stage");
            if self.run_stage(stage, state)? == Flow::Cancel {
                tracing::debug!(stage = stage.name(), "stage cancelled phase");
                return Ok(Flow::Cancel);
            }
            if self.hooks(stage, state, false)? == Flow::Cancel {
                tracing::debug!(stage = stage.name(), "cancelled by extension after stage");
                return Ok(Flow::Cancel);
            }
        }
        Ok(Flow::Continue)
    }

    fn hooks(&self, stage: Stage, state: &mut ImageState<'_>, before: bool) -> Result<Flow> {
        for ext in &self.extensions {
            let flow = if before {
                ext.before(stage, state)?
            } else {
                ext.after(stage, state)?
            };
            if flow == Flow::Cancel {
                return Ok(Flow::Cancel);
            }
        }
        Ok(Flow::Continue)
    }

    fn run_stage(&self, stage: Stage, state: &mut ImageState<'_>) -> Result<Flow> {
        match stage {
            Stage::PrepareSourceBitmap => prepare_source(state),
            Stage::LayoutImage => layout_image(state),
            Stage::LayoutPadding => {
                let edges = state.instructions.padding_edges();
                add_edges(state, rings::PADDING, edges)
            }
            Stage::LayoutBorder => {
                let edges = state.instructions.border_edges();
                add_edges(state, rings::BORDER, edges)
            }
            Stage::LayoutMargin => {
                let edges = state.instructions.margin_edges();
                add_edges(state, rings::MARGIN, edges)
            }
            Stage::LayoutRotate => {
                let degrees = state.instructions.rotate_degrees();
                state.layout.rotate(degrees, PointF::default());
                Ok(Flow::Continue)
            }
            Stage::LayoutNormalize => {
                state.layout.normalize(PointF::default());
                Ok(Flow::Continue)
            }
            Stage::LayoutRound => {
                state.layout.round();
                Ok(Flow::Continue)
            }
            Stage::EndLayout => {
                state.dest_size = state.layout.bounding_box().size().to_pixels();
                tracing::debug!(
                    width = state.dest_size.width,
                    height = state.dest_size.height,
                    "layout complete"
                );
                Ok(Flow::Continue)
            }
            #[cfg(feature = "render")]
            _ => crate::render::run_stage(stage, state, self),
            #[cfg(not(feature = "render"))]
            _ => Ok(Flow::Continue),
        }
    }

    /// Canvas size the instructions produce for a source of `original` size.
    pub fn final_size(&self, original: Size, instructions: &Instructions) -> Result<Size> {
        let mut state = ImageState::for_size(original, self.prepare_instructions(instructions));
        self.run_phase(&Stage::LAYOUT, &mut state)?;
        Ok(state.dest_size)
    }

    /// Map source-space points to where they land in the output.
    ///
    /// Accounts for source rotate/flip, crop, scaling, rings, rotation and
    /// destination flip.
    pub fn translate_points(
        &self,
        points: &[PointF],
        original: Size,
        instructions: &Instructions,
    ) -> Result<Vec<PointF>> {
        let mut state = ImageState::for_size(original, self.prepare_instructions(instructions));
        state
            .layout
            .add_invisible_polygon(TRACKED_POINTS, points.to_vec());
        self.run_phase(&Stage::LAYOUT, &mut state)?;

        let flip = Orientation::from_flip(state.instructions.flip.unwrap_or_default());
        let canvas = state.dest_size.to_f64();
        Ok(state
            .layout
            .invisible(TRACKED_POINTS)
            .unwrap_or_default()
            .iter()
            .map(|&p| flip.transform_point(p, canvas))
            .collect())
    }
}

/// [`Pipeline::final_size`] with a default pipeline.
pub fn get_final_size(original: Size, instructions: &Instructions) -> Result<Size> {
    Pipeline::default().final_size(original, instructions)
}

/// [`Pipeline::translate_points`] with a default pipeline.
pub fn translate_points(
    points: &[PointF],
    original: Size,
    instructions: &Instructions,
) -> Result<Vec<PointF>> {
    Pipeline::default().translate_points(points, original, instructions)
}

// ============================================================================
// Layout stages
// ============================================================================

fn prepare_source(state: &mut ImageState<'_>) -> Result<Flow> {
    #[cfg(feature = "render")]
    crate::render::select_frame(state);

    let orientation = Orientation::from_rotate_flip(
        state.instructions.source_rotate,
        state.instructions.source_flip,
    );
    if orientation.is_identity() {
        return Ok(Flow::Continue);
    }

    let before = state.original_size;
    state
        .layout
        .map_points(|p| orientation.transform_point(p, before));
    state.original_size = orientation.transform_size(before);
    #[cfg(feature = "render")]
    crate::render::orient_source(state, orientation);

    tracing::debug!(
        rotation = orientation.rotation,
        flip = orientation.flip,
        width = state.original_size.width,
        height = state.original_size.height,
        "applied source orientation"
    );
    Ok(Flow::Continue)
}

fn layout_image(state: &mut ImageState<'_>) -> Result<Flow> {
    let manual_crop = engine::resolve_manual_crop(state.original_size, &state.instructions)?;
    let result = engine::resolve(state.original_size, manual_crop, &state.instructions)?;
    result.apply_to(&mut state.layout)?;
    state.manual_crop = manual_crop;
    state.copy_rect = result.copy_rect;
    state.image_layout = Some(result);
    Ok(Flow::Continue)
}

fn add_edges(
    state: &mut ImageState<'_>,
    name: &str,
    edges: crate::edges::BoxEdges,
) -> Result<Flow> {
    if !edges.is_empty() {
        state.layout.add_ring_edges(name, &edges)?;
    }
    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edges::BoxEdges;
    use crate::error::Error;
    use crate::geometry::RectF;
    use crate::instructions::{FitMode, FlipMode, ScaleMode};
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicUsize, Ordering};

    // ── final size ──────────────────────────────────────────────────────

    #[test]
    fn width_only_square() {
        let i = Instructions::new().width(100.0);
        assert_eq!(
            get_final_size(Size::new(400, 400), &i).unwrap(),
            Size::new(100, 100)
        );
    }

    #[test]
    fn pad_canvas_is_requested_box() {
        let i = Instructions::new().width(200.0).height(100.0).mode(FitMode::Pad);
        assert_eq!(
            get_final_size(Size::new(400, 400), &i).unwrap(),
            Size::new(200, 100)
        );
    }

    #[test]
    fn rings_grow_canvas() {
        let i = Instructions::new()
            .width(100.0)
            .height(50.0)
            .padding(BoxEdges::uniform(5.0))
            .border(BoxEdges::new(1.0, 2.0, 3.0, 4.0))
            .margin(BoxEdges::uniform(10.0));
        assert_eq!(
            get_final_size(Size::new(400, 200), &i).unwrap(),
            Size::new(100 + 10 + 6 + 20, 50 + 10 + 4 + 20)
        );
    }

    #[test]
    fn rotation_swaps_canvas() {
        let i = Instructions::new().width(100.0).rotate(90.0);
        assert_eq!(
            get_final_size(Size::new(400, 200), &i).unwrap(),
            Size::new(50, 100)
        );
    }

    #[test]
    fn arbitrary_rotation_grows_canvas() {
        let i = Instructions::new().rotate(45.0);
        let s = get_final_size(Size::new(100, 100), &i).unwrap();
        // Diagonal of a 100px square.
        assert_eq!(s, Size::new(141, 141));
    }

    #[test]
    fn source_rotation_swaps_original() {
        let i = Instructions::new().source_rotate(90.0).height(100.0);
        assert_eq!(
            get_final_size(Size::new(400, 200), &i).unwrap(),
            Size::new(50, 100)
        );
    }

    #[test]
    fn degenerate_crop_fails() {
        let i = Instructions::new().crop(0.0, 0.0, 0.0, 0.0).mode(FitMode::Crop);
        let err = get_final_size(Size::new(100, 100), &i).unwrap_err();
        assert!(matches!(err, Error::DegenerateCrop { .. }));
    }

    #[test]
    fn zero_source_still_one_pixel() {
        let s = get_final_size(Size::new(0, 0), &Instructions::new()).unwrap();
        assert_eq!(s, Size::new(1, 1));
    }

    // ── points ──────────────────────────────────────────────────────────

    #[test]
    fn empty_instructions_leave_points_alone() {
        let pts = [PointF::new(0.0, 0.0), PointF::new(12.3, 45.6)];
        let out = translate_points(&pts, Size::new(400, 300), &Instructions::new()).unwrap();
        assert_eq!(out, pts.to_vec());
    }

    #[test]
    fn points_follow_scale_and_padding() {
        let i = Instructions::new()
            .width(100.0)
            .height(100.0)
            .padding(BoxEdges::uniform(10.0));
        let out = translate_points(&[PointF::new(200.0, 100.0)], Size::new(400, 200), &i)
            .unwrap();
        // Image is 100x50 centered in 100x100, inside 10px padding.
        assert_eq!(out, alloc::vec![PointF::new(60.0, 60.0)]);
    }

    #[test]
    fn points_follow_destination_flip() {
        let i = Instructions::new().flip(FlipMode::X);
        let out = translate_points(&[PointF::new(10.0, 5.0)], Size::new(100, 50), &i).unwrap();
        assert_eq!(out, alloc::vec![PointF::new(90.0, 5.0)]);
    }

    #[test]
    fn points_follow_source_flip() {
        let i = Instructions::new().source_flip(FlipMode::Y);
        let out = translate_points(&[PointF::new(10.0, 5.0)], Size::new(100, 50), &i).unwrap();
        assert_eq!(out, alloc::vec![PointF::new(10.0, 45.0)]);
    }

    // ── extensions ──────────────────────────────────────────────────────

    struct CancelAt(Stage);

    impl Extension for CancelAt {
        fn before(&self, stage: Stage, _: &mut ImageState<'_>) -> Result<Flow> {
            Ok(if stage == self.0 {
                Flow::Cancel
            } else {
                Flow::Continue
            })
        }
    }

    #[derive(Clone, Default)]
    struct Counter(Arc<AtomicUsize>);

    impl Extension for Counter {
        fn after(&self, _: Stage, _: &mut ImageState<'_>) -> Result<Flow> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Flow::Continue)
        }
    }

    #[test]
    fn extensions_see_every_layout_stage() {
        let counter = Counter::default();
        let p = Pipeline::default().with_extension(counter.clone());
        p.final_size(Size::new(10, 10), &Instructions::new()).unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), Stage::LAYOUT.len());
    }

    #[test]
    fn cancel_skips_rest_of_phase() {
        let counter = Counter::default();
        let p = Pipeline::default()
            .with_extension(CancelAt(Stage::LayoutPadding))
            .with_extension(counter.clone());
        let i = Instructions::new().width(50.0).padding(BoxEdges::uniform(10.0));
        let s = p.final_size(Size::new(100, 100), &i).unwrap();
        // EndLayout never ran: the canvas is still the source size.
        assert_eq!(s, Size::new(100, 100));
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn extension_can_rewrite_geometry() {
        struct Shrink;
        impl Extension for Shrink {
            fn after(&self, stage: Stage, state: &mut ImageState<'_>) -> Result<Flow> {
                if stage == Stage::LayoutImage {
                    state
                        .layout
                        .add_ring(rings::IMAGE_AREA, RectF::new(0.0, 0.0, 10.0, 10.0).to_polygon());
                    state
                        .layout
                        .add_ring(rings::IMAGE, RectF::new(0.0, 0.0, 10.0, 10.0).to_polygon());
                }
                Ok(Flow::Continue)
            }
        }
        let p = Pipeline::default().with_extension(Shrink);
        assert_eq!(
            p.final_size(Size::new(100, 100), &Instructions::new()).unwrap(),
            Size::new(10, 10)
        );
    }

    // ── settings ────────────────────────────────────────────────────────

    #[test]
    fn settings_modifier_runs_first() {
        let p = Pipeline::default().with_settings_modifier(|i: &mut Instructions| {
            i.width = Some(50.0);
            i.scale = Some(ScaleMode::Both);
        });
        assert_eq!(
            p.final_size(Size::new(10, 10), &Instructions::new()).unwrap(),
            Size::new(50, 50)
        );
    }

    #[test]
    fn default_background_fills_unset_color() {
        let p = Pipeline::new(PipelineConfig::new().default_background(Color::WHITE));
        let i = p.prepare_instructions(&Instructions::new());
        assert_eq!(i.background(), Color::WHITE);
        let i = p.prepare_instructions(&Instructions::new().background_color(Color::BLACK));
        assert_eq!(i.background(), Color::BLACK);
    }

    #[test]
    fn stage_phases() {
        assert!(Stage::LAYOUT.iter().all(|s| s.phase() == Phase::Layout));
        assert!(Stage::RENDER.iter().all(|s| s.phase() == Phase::Render));
    }
}
