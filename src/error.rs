//! Error taxonomy.
//!
//! - Configuration: the instructions (or the request shape) cannot be honored
//! - Corrupted: source bytes failed to decode
//! - ResourceExhausted: the job could not get a processing slot in time
//! - Render: the pixel backend rejected an operation
//!
//! Every error carries a detailed `Display` message for logs and a
//! [`public_message()`](Error::public_message) safe to return to clients.

use alloc::string::String;

use thiserror::Error;

/// Broad error class, for mapping to status codes and retry policy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad or contradictory instructions. Not retryable.
    Configuration,
    /// Undecodable source. Not retryable.
    Corrupted,
    /// Concurrency limit reached. Retryable later.
    ResourceExhausted,
    /// Pixel backend failure.
    Render,
}

/// Processing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The custom crop rectangle selects no pixels.
    #[error("crop rectangle {crop:?} selects no pixels of a {width}x{height} source")]
    DegenerateCrop {
        crop: [f64; 4],
        width: f64,
        height: f64,
    },

    /// An instruction value cannot be used.
    #[error("invalid value for {name}: {reason}")]
    InvalidInstruction {
        name: &'static str,
        reason: String,
    },

    /// A ring operation referenced a ring that does not exist yet.
    #[error("ring {name:?} must exist before this operation")]
    MissingRing { name: String },

    /// The source image has a zero dimension and pixels were requested.
    #[error("source image is {width}x{height}; cannot render an empty bitmap")]
    EmptySource { width: u32, height: u32 },

    /// The output canvas would exceed the pixel limit or addressable memory.
    #[error("output canvas {width}x{height} exceeds the limit of {limit} pixels")]
    CanvasTooLarge { width: u32, height: u32, limit: u64 },

    /// Source bytes could not be decoded.
    #[error("failed to decode source image: {message}")]
    Corrupted { message: String },

    /// No processing slot became free before the timeout.
    #[error("timed out after {waited_ms}ms waiting for one of {capacity} processing slots")]
    QueueTimeout { waited_ms: u64, capacity: usize },

    /// The pixel backend failed.
    #[error("render failed at {stage}: {message}")]
    Render {
        stage: &'static str,
        message: String,
    },
}

impl Error {
    /// The broad class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DegenerateCrop { .. }
            | Self::InvalidInstruction { .. }
            | Self::MissingRing { .. }
            | Self::EmptySource { .. }
            | Self::CanvasTooLarge { .. } => ErrorKind::Configuration,
            Self::Corrupted { .. } => ErrorKind::Corrupted,
            Self::QueueTimeout { .. } => ErrorKind::ResourceExhausted,
            Self::Render { .. } => ErrorKind::Render,
        }
    }

    /// A message without internal detail, suitable for HTTP responses.
    pub fn public_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Configuration => "The requested image instructions are invalid.",
            ErrorKind::Corrupted => "The source image is corrupted or in an unsupported format.",
            ErrorKind::ResourceExhausted => "The server is busy; try again later.",
            ErrorKind::Render => "The image could not be processed.",
        }
    }

    /// Whether repeating the same request can succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ResourceExhausted
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
