//! Query string tokenizer and value parsers.

use alloc::string::String;
use alloc::vec::Vec;

use super::ParseWarning;
use super::color::parse_color;
use crate::edges::BoxEdges;
use crate::geometry::Anchor;
use crate::instructions::{
    Color, FitMode, FlipMode, Instructions, ScaleMode, UNSET_DIMENSION,
};

/// Non-layout keys kept in `extras` without a warning. Sorted for binary search.
const KNOWN_EXTRAS: &[&str] = &[
    "a.blur",
    "a.sharpen",
    "cache",
    "encoder",
    "f.sharpen",
    "format",
    "jpeg.quality",
    "png.quality",
    "preset",
    "quality",
    "s.grayscale",
    "s.roundcorners",
    "webp.quality",
];

/// Parse a query string into Instructions + warnings.
pub(crate) fn parse_query(query: &str) -> (Instructions, Vec<ParseWarning>) {
    let mut inst = Instructions::new();
    let mut warnings = Vec::new();

    for pair in split_query(query) {
        let (raw_key, raw_value) = split_pair(pair);
        let key = percent_decode(raw_key).to_ascii_lowercase();
        let value = percent_decode(raw_value);
        dispatch_key(&key, value.trim(), &mut inst, &mut warnings);
    }

    (inst, warnings)
}

fn dispatch_key(key: &str, value: &str, inst: &mut Instructions, warnings: &mut Vec<ParseWarning>) {
    let invalid = |reason: &'static str| ParseWarning::ValueInvalid {
        key: canonical_key(key),
        value: String::from(value),
        reason,
    };

    match key {
        "w" | "width" => match parse_dimension(value) {
            Dimension::Set(v) => set_or_warn(&mut inst.width, v, key, value, warnings),
            Dimension::Unset => {}
            Dimension::Invalid => warnings.push(invalid("expected a positive number")),
        },
        "h" | "height" => match parse_dimension(value) {
            Dimension::Set(v) => set_or_warn(&mut inst.height, v, key, value, warnings),
            Dimension::Unset => {}
            Dimension::Invalid => warnings.push(invalid("expected a positive number")),
        },
        "maxwidth" => match parse_dimension(value) {
            Dimension::Set(v) => set_or_warn(&mut inst.max_width, v, key, value, warnings),
            Dimension::Unset => {}
            Dimension::Invalid => warnings.push(invalid("expected a positive number")),
        },
        "maxheight" => match parse_dimension(value) {
            Dimension::Set(v) => set_or_warn(&mut inst.max_height, v, key, value, warnings),
            Dimension::Unset => {}
            Dimension::Invalid => warnings.push(invalid("expected a positive number")),
        },

        "zoom" | "dpr" => match parse_zoom(value) {
            Some(z) => set_or_warn(&mut inst.zoom, z, key, value, warnings),
            None => {
                warnings.push(invalid("expected a positive number, optionally suffixed with x"))
            }
        },

        "mode" => match parse_fit_mode(value) {
            Some(m) => set_or_warn(&mut inst.mode, m, key, value, warnings),
            None => warnings.push(invalid("expected none|max|pad|crop|carve|stretch")),
        },
        "scale" => match parse_scale_mode(value) {
            Some(s) => set_or_warn(&mut inst.scale, s, key, value, warnings),
            None => warnings.push(invalid("expected down|up|both|canvas")),
        },
        "anchor" => match parse_anchor(value) {
            Some(a) => set_or_warn(&mut inst.anchor, a, key, value, warnings),
            None => {
                warnings.push(invalid("expected a position name such as topleft or middlecenter"))
            }
        },

        // Legacy mode shortcuts
        "stretch" => inst.stretch_fill = value.eq_ignore_ascii_case("fill"),
        "carve" => {
            inst.carve = !value.is_empty()
                && !value.eq_ignore_ascii_case("false")
                && !value.eq_ignore_ascii_case("none");
        }

        "rotate" => match parse_finite(value) {
            Some(d) => set_or_warn(&mut inst.rotate, d, key, value, warnings),
            None => warnings.push(invalid("expected degrees")),
        },
        "srotate" => match parse_finite(value) {
            Some(d) => set_or_warn(&mut inst.source_rotate, d, key, value, warnings),
            None => warnings.push(invalid("expected degrees")),
        },
        "flip" => match parse_flip(value) {
            Some(f) => set_or_warn(&mut inst.flip, f, key, value, warnings),
            None => warnings.push(invalid("expected none|h|x|v|y|both|xy")),
        },
        "sflip" | "sourceflip" => match parse_flip(value) {
            Some(f) => set_or_warn(&mut inst.source_flip, f, key, value, warnings),
            None => warnings.push(invalid("expected none|h|x|v|y|both|xy")),
        },

        "crop" if value.eq_ignore_ascii_case("auto") => inst.crop_auto = true,
        "crop" => match parse_crop(value) {
            Some(c) => set_or_warn(&mut inst.crop, c, key, value, warnings),
            None => warnings.push(invalid("expected (x1,y1,x2,y2) or x1,y1,x2,y2")),
        },
        // Percentages: `c=` implies 100 crop units on both axes.
        "c" => match parse_crop(value) {
            Some(c) => {
                set_or_warn(&mut inst.crop, c, key, value, warnings);
                inst.crop_x_units = Some(100.0);
                inst.crop_y_units = Some(100.0);
            }
            None => warnings.push(invalid("expected x1,y1,x2,y2 percentages")),
        },
        "cropxunits" => match parse_finite(value).filter(|&u| u >= 0.0) {
            Some(u) => set_or_warn(&mut inst.crop_x_units, u, key, value, warnings),
            None => warnings.push(invalid("expected a non-negative number")),
        },
        "cropyunits" => match parse_finite(value).filter(|&u| u >= 0.0) {
            Some(u) => set_or_warn(&mut inst.crop_y_units, u, key, value, warnings),
            None => warnings.push(invalid("expected a non-negative number")),
        },

        "paddingwidth" => match BoxEdges::parse(value) {
            Some(e) => set_or_warn(&mut inst.padding, e, key, value, warnings),
            None => warnings.push(invalid("expected w or t,r,b,l")),
        },
        "borderwidth" => match BoxEdges::parse(value) {
            Some(e) => set_or_warn(&mut inst.border, e, key, value, warnings),
            None => warnings.push(invalid("expected w or t,r,b,l")),
        },
        "margin" => match BoxEdges::parse(value) {
            Some(e) => set_or_warn(&mut inst.margin, e, key, value, warnings),
            None => warnings.push(invalid("expected w or t,r,b,l")),
        },

        "bgcolor" => color_or_warn(&mut inst.background_color, key, value, warnings),
        "bordercolor" => color_or_warn(&mut inst.border_color, key, value, warnings),
        "paddingcolor" => color_or_warn(&mut inst.padding_color, key, value, warnings),

        "frame" => match value.parse::<u32>() {
            Ok(f) => set_or_warn(&mut inst.frame, f, key, value, warnings),
            Err(_) => warnings.push(invalid("expected a frame number")),
        },
        "page" => match value.parse::<u32>() {
            Ok(p) => set_or_warn(&mut inst.page, p, key, value, warnings),
            Err(_) => warnings.push(invalid("expected a page number")),
        },
        "dpi" => match parse_finite(value).filter(|&d| d > 0.0) {
            Some(d) => set_or_warn(&mut inst.dpi, d, key, value, warnings),
            None => warnings.push(invalid("expected a positive number")),
        },

        _ => {
            if KNOWN_EXTRAS.binary_search(&key).is_err() {
                warnings.push(ParseWarning::KeyNotRecognized {
                    key: String::from(key),
                    value: String::from(value),
                });
            }
            inst.extras.insert(String::from(key), String::from(value));
        }
    }
}

/// Set a field, warning on duplicate. Last value wins.
fn set_or_warn<T>(
    field: &mut Option<T>,
    parsed: T,
    key: &str,
    value: &str,
    warnings: &mut Vec<ParseWarning>,
) {
    if field.is_some() {
        warnings.push(ParseWarning::DuplicateKey {
            key: String::from(key),
            value: String::from(value),
        });
    }
    *field = Some(parsed);
}

fn color_or_warn(
    field: &mut Option<Color>,
    key: &str,
    value: &str,
    warnings: &mut Vec<ParseWarning>,
) {
    match parse_color(value) {
        Some(c) => set_or_warn(field, c, key, value, warnings),
        None if value.is_empty() => {}
        None => warnings.push(ParseWarning::ValueInvalid {
            key: canonical_key(key),
            value: String::from(value),
            reason: "expected hex color or color name",
        }),
    }
}

// ---- Value parsers ----

enum Dimension {
    Set(f64),
    /// `-1` or empty: explicitly unset.
    Unset,
    Invalid,
}

fn parse_dimension(s: &str) -> Dimension {
    if s.is_empty() {
        return Dimension::Unset;
    }
    match parse_finite(s) {
        Some(v) if v > 0.0 => Dimension::Set(v),
        Some(v) if v == UNSET_DIMENSION => Dimension::Unset,
        _ => Dimension::Invalid,
    }
}

fn parse_finite(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Zoom / DPR value, allowing a trailing `x` (`2x`).
fn parse_zoom(s: &str) -> Option<f64> {
    let s = s.trim_end_matches(['x', 'X']);
    parse_finite(s).filter(|&v| v > 0.0)
}

fn parse_fit_mode(s: &str) -> Option<FitMode> {
    match s.to_ascii_lowercase().as_str() {
        "none" => Some(FitMode::None),
        "max" => Some(FitMode::Max),
        "pad" => Some(FitMode::Pad),
        "crop" => Some(FitMode::Crop),
        "carve" => Some(FitMode::Carve),
        "stretch" => Some(FitMode::Stretch),
        _ => None,
    }
}

fn parse_scale_mode(s: &str) -> Option<ScaleMode> {
    match s.to_ascii_lowercase().as_str() {
        "down" | "downscaleonly" => Some(ScaleMode::DownscaleOnly),
        "up" | "upscaleonly" => Some(ScaleMode::UpscaleOnly),
        "both" => Some(ScaleMode::Both),
        "canvas" | "upscalecanvas" => Some(ScaleMode::UpscaleCanvas),
        _ => None,
    }
}

fn parse_flip(s: &str) -> Option<FlipMode> {
    match s.to_ascii_lowercase().as_str() {
        "none" | "" => Some(FlipMode::None),
        "h" | "x" => Some(FlipMode::X),
        "v" | "y" => Some(FlipMode::Y),
        "both" | "xy" => Some(FlipMode::XY),
        _ => None,
    }
}

fn parse_anchor(s: &str) -> Option<Anchor> {
    match s.to_ascii_lowercase().as_str() {
        "topleft" => Some(Anchor::TopLeft),
        "topcenter" => Some(Anchor::TopCenter),
        "topright" => Some(Anchor::TopRight),
        "middleleft" => Some(Anchor::MiddleLeft),
        "middlecenter" => Some(Anchor::MiddleCenter),
        "middleright" => Some(Anchor::MiddleRight),
        "bottomleft" => Some(Anchor::BottomLeft),
        "bottomcenter" => Some(Anchor::BottomCenter),
        "bottomright" => Some(Anchor::BottomRight),
        _ => None,
    }
}

/// Four comma-separated numbers, optionally wrapped in parens.
fn parse_crop(s: &str) -> Option<[f64; 4]> {
    let s = s.trim_start_matches('(').trim_end_matches(')');
    let mut out = [0.0; 4];
    let mut parts = s.split(',');
    for slot in &mut out {
        *slot = parse_finite(parts.next()?)?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

// ---- Query string tokenizer ----

/// Split on '&', dropping a leading '?'.
fn split_query(query: &str) -> impl Iterator<Item = &str> {
    let query = query.strip_prefix('?').unwrap_or(query);
    query.split('&').filter(|s| !s.is_empty())
}

/// Split a single "key=value" pair on the first '='.
fn split_pair(pair: &str) -> (&str, &str) {
    pair.split_once('=').unwrap_or((pair, ""))
}

/// Percent-decode a URL component. '+' decodes to a space.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Static name for a recognized key, used in [`ParseWarning::ValueInvalid`].
fn canonical_key(key: &str) -> &'static str {
    match key {
        "w" | "width" => "width",
        "h" | "height" => "height",
        "maxwidth" => "maxwidth",
        "maxheight" => "maxheight",
        "zoom" | "dpr" => "zoom",
        "mode" => "mode",
        "scale" => "scale",
        "anchor" => "anchor",
        "rotate" => "rotate",
        "srotate" => "srotate",
        "flip" => "flip",
        "sflip" | "sourceflip" => "sflip",
        "crop" | "c" => "crop",
        "cropxunits" => "cropxunits",
        "cropyunits" => "cropyunits",
        "paddingwidth" => "paddingwidth",
        "borderwidth" => "borderwidth",
        "margin" => "margin",
        "bgcolor" => "bgcolor",
        "bordercolor" => "bordercolor",
        "paddingcolor" => "paddingcolor",
        "frame" => "frame",
        "page" => "page",
        "dpi" => "dpi",
        _ => "unknown",
    }
}
