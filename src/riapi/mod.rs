//! Query string parsing into [`Instructions`].
//!
//! Parses URL query strings like `?w=800&h=600&mode=crop` into typed
//! instructions. Problems never fail the parse; they come back as
//! [`ParseWarning`]s next to whatever could be understood.
//!
//! # Example
//!
//! ```
//! use zenrings::{FitMode, Size, get_final_size, riapi};
//!
//! let result = riapi::parse("w=200&h=100&mode=crop&scale=both");
//! assert!(result.warnings.is_empty());
//! assert_eq!(result.instructions.mode, Some(FitMode::Crop));
//!
//! let size = get_final_size(Size::new(4000, 3000), &result.instructions).unwrap();
//! assert_eq!(size, Size::new(200, 100));
//! ```
//!
//! # Non-layout parameters
//!
//! Keys the layout does not use (format, quality, effects) are preserved in
//! [`Instructions::extras()`] for downstream consumers. Keys outside the
//! known set are kept too, but also produce [`ParseWarning::KeyNotRecognized`].

mod color;
mod parse;

use alloc::string::String;
use alloc::vec::Vec;

use crate::instructions::Instructions;

/// Result of parsing a query string.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed instructions.
    pub instructions: Instructions,
    /// Non-fatal parse warnings.
    pub warnings: Vec<ParseWarning>,
}

/// Non-fatal warning from query string parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// A key appeared more than once (last value wins).
    DuplicateKey { key: String, value: String },
    /// A key was not recognized as either a layout or known non-layout parameter.
    KeyNotRecognized { key: String, value: String },
    /// A key was recognized but its value could not be parsed.
    ValueInvalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Parse a query string (with or without leading `?`).
pub fn parse(query: &str) -> ParseResult {
    let (instructions, warnings) = parse::parse_query(query);
    tracing::trace!(warnings = warnings.len(), "parsed query");
    ParseResult {
        instructions,
        warnings,
    }
}
