//! Per-call pipeline context.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
#[cfg(feature = "render")]
use alloc::borrow::Cow;

#[cfg(feature = "render")]
use image::{DynamicImage, RgbaImage};

use crate::engine::LayoutResult;
use crate::geometry::{RectF, Size, SizeF};
use crate::instructions::Instructions;
use crate::rings::RingLayout;

/// Result metadata collected while a job runs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Job {
    /// Key/value facts about the job (`source.width`, `final.height`, ...).
    pub result_info: BTreeMap<String, String>,
    /// Output resolution, when requested.
    pub dpi: Option<f64>,
}

impl Job {
    /// Record a fact.
    pub fn set(&mut self, key: &str, value: impl ToString) {
        self.result_info.insert(key.to_string(), value.to_string());
    }
}

/// Mutable state threaded through every stage of one `process` call.
///
/// Source pixels are borrowed from the caller unless the caller handed them
/// over, in which case they are dropped with the state.
#[derive(Debug)]
pub struct ImageState<'a> {
    /// Instructions after the settings modifier ran.
    pub instructions: Instructions,
    /// Source size after source rotate/flip.
    pub original_size: SizeF,
    /// Region of the source the layout works from.
    pub manual_crop: RectF,
    /// Region of the source actually copied.
    pub copy_rect: RectF,
    /// Engine output, once the image has been laid out.
    pub image_layout: Option<LayoutResult>,
    /// Canvas size, set at the end of layout.
    pub dest_size: Size,
    /// Size of the finished bitmap, set by the final stage.
    pub final_size: Option<Size>,
    /// Rings and tracked points.
    pub layout: RingLayout,
    /// Result metadata.
    pub job: Job,

    /// Every frame of the source, until one is selected.
    #[cfg(feature = "render")]
    pub frames: Cow<'a, [DynamicImage]>,
    /// The selected, oriented source frame.
    #[cfg(feature = "render")]
    pub source: Option<Cow<'a, DynamicImage>>,
    /// The canvas being drawn on.
    #[cfg(feature = "render")]
    pub dest: Option<RgbaImage>,

    #[cfg(not(feature = "render"))]
    _source: core::marker::PhantomData<&'a ()>,
}

impl<'a> ImageState<'a> {
    /// State for geometry-only runs: no pixels, just a source size.
    pub fn for_size(original: Size, instructions: Instructions) -> Self {
        let original_size = original.to_f64();
        Self {
            instructions,
            original_size,
            manual_crop: RectF::from_size(original_size),
            copy_rect: RectF::from_size(original_size),
            image_layout: None,
            dest_size: original_size.to_pixels(),
            final_size: None,
            layout: RingLayout::new(),
            job: Job::default(),
            #[cfg(feature = "render")]
            frames: Cow::Owned(alloc::vec::Vec::new()),
            #[cfg(feature = "render")]
            source: None,
            #[cfg(feature = "render")]
            dest: None,
            #[cfg(not(feature = "render"))]
            _source: core::marker::PhantomData,
        }
    }

    /// State for a pixel run over the given frames.
    #[cfg(feature = "render")]
    pub fn for_frames(frames: Cow<'a, [DynamicImage]>, instructions: Instructions) -> Self {
        let first = frames
            .first()
            .map(|f| Size::new(f.width(), f.height()))
            .unwrap_or(Size::new(0, 0));
        let mut state = Self::for_size(first, instructions);
        state.frames = frames;
        state
    }

    /// Whether pixels are being processed (as opposed to geometry only).
    pub fn has_pixels(&self) -> bool {
        #[cfg(feature = "render")]
        {
            self.source.is_some() || !self.frames.is_empty()
        }
        #[cfg(not(feature = "render"))]
        {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_state_starts_at_source_size() {
        let s = ImageState::for_size(Size::new(40, 30), Instructions::new());
        assert_eq!(s.dest_size, Size::new(40, 30));
        assert_eq!(s.copy_rect, RectF::new(0.0, 0.0, 40.0, 30.0));
        assert!(!s.has_pixels());
        assert!(s.final_size.is_none());
    }

    #[test]
    fn empty_source_still_has_a_canvas() {
        let s = ImageState::for_size(Size::new(0, 0), Instructions::new());
        assert_eq!(s.dest_size, Size::new(1, 1));
    }

    #[test]
    fn job_records_facts() {
        let mut j = Job::default();
        j.set("final.width", 10u32);
        assert_eq!(j.result_info["final.width"], "10");
    }
}
