//! Ring-based image layout and a staged resize/pad/crop/rotate pipeline.
//!
//! The geometry core (layout engine, rings, orientation, query parsing) is
//! `no_std` + `alloc`. Pixel work needs the `render` feature.
//!
//! # Modules
//!
//! - [`engine`]: fit modes, scale modes, zoom and manual crop resolution
//! - [`rings`]: named polygons (image, padding, border, margin) and their transforms
//! - [`orientation`]: D4 dihedral group for source rotate/flip
//! - [`pipeline`]: fixed stage order, extension hooks, final size and point mapping
//! - [`riapi`]: query string parsing into [`Instructions`]
//! - `render`: pixel composition with `image` and `imageproc` (feature `render`)
//! - `svg`: debug drawing of a ring layout (feature `svg`)
//!
//! # Example
//!
//! ```
//! use zenrings::{FitMode, Instructions, ScaleMode, Size, get_final_size};
//!
//! let inst = Instructions::new()
//!     .width(200.0)
//!     .height(100.0)
//!     .mode(FitMode::Crop)
//!     .scale(ScaleMode::Both);
//! assert_eq!(get_final_size(Size::new(1000, 1000), &inst).unwrap(), Size::new(200, 100));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

pub mod edges;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod instructions;
pub mod orientation;
pub mod pipeline;
pub mod riapi;
pub mod rings;
pub mod state;

#[cfg(feature = "std")]
pub mod limiter;
#[cfg(feature = "render")]
pub mod render;
#[cfg(feature = "svg")]
pub mod svg;

pub use edges::BoxEdges;
pub use engine::LayoutResult;
pub use error::{Error, ErrorKind, Result};
pub use geometry::{Anchor, PointF, RectF, Size, SizeF};
pub use instructions::{Color, FitMode, FlipMode, Instructions, ScaleMode, UNSET_DIMENSION};
pub use orientation::Orientation;
pub use pipeline::{
    Extension, Flow, OutputCapabilities, Phase, Pipeline, PipelineConfig, SettingsModifier, Stage,
    get_final_size, translate_points,
};
pub use rings::{Ring, RingLayout};
pub use state::{ImageState, Job};

#[cfg(feature = "std")]
pub use limiter::{JobLimiter, JobPermit};
#[cfg(feature = "render")]
pub use render::{ProcessedImage, SourceBitmap};
