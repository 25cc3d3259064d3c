//! Color values: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA` and named colors.

use crate::instructions::Color;

/// Parse a hex or named color. The leading `#` is optional and names are
/// matched case-insensitively.
pub(crate) fn parse_color(s: &str) -> Option<Color> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let hex = s.strip_prefix('#').unwrap_or(s);
    parse_hex(hex).or_else(|| lookup_named(s))
}

fn parse_hex(hex: &str) -> Option<Color> {
    let digits = hex.as_bytes();
    if !digits.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let short = |i: usize| nibble(digits[i]).map(|n| n << 4 | n);
    let long = |i: usize| Some(nibble(digits[i])? << 4 | nibble(digits[i + 1])?);
    match digits.len() {
        3 => Some(Color::rgba(short(0)?, short(1)?, short(2)?, 255)),
        4 => Some(Color::rgba(short(0)?, short(1)?, short(2)?, short(3)?)),
        6 => Some(Color::rgba(long(0)?, long(2)?, long(4)?, 255)),
        8 => Some(Color::rgba(long(0)?, long(2)?, long(4)?, long(6)?)),
        _ => None,
    }
}

fn nibble(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        _ => None,
    }
}

fn lookup_named(name: &str) -> Option<Color> {
    // Longest name in the table is 20 bytes.
    let mut buf = [0u8; 24];
    let bytes = name.as_bytes();
    if bytes.len() > buf.len() {
        return None;
    }
    for (dst, src) in buf.iter_mut().zip(bytes) {
        *dst = src.to_ascii_lowercase();
    }
    let lower = core::str::from_utf8(&buf[..bytes.len()]).ok()?;
    NAMED_COLORS
        .binary_search_by_key(&lower, |&(n, _)| n)
        .ok()
        .map(|idx| {
            let [r, g, b, a] = NAMED_COLORS[idx].1;
            Color::rgba(r, g, b, a)
        })
}

/// Sorted by name for binary search.
const NAMED_COLORS: &[(&str, [u8; 4])] = &[
    ("aqua", [0, 255, 255, 255]),
    ("beige", [245, 245, 220, 255]),
    ("black", [0, 0, 0, 255]),
    ("blue", [0, 0, 255, 255]),
    ("brown", [165, 42, 42, 255]),
    ("coral", [255, 127, 80, 255]),
    ("crimson", [220, 20, 60, 255]),
    ("cyan", [0, 255, 255, 255]),
    ("darkblue", [0, 0, 139, 255]),
    ("darkgray", [169, 169, 169, 255]),
    ("darkgreen", [0, 100, 0, 255]),
    ("darkgrey", [169, 169, 169, 255]),
    ("darkred", [139, 0, 0, 255]),
    ("darkslategray", [47, 79, 79, 255]),
    ("fuchsia", [255, 0, 255, 255]),
    ("gainsboro", [220, 220, 220, 255]),
    ("gold", [255, 215, 0, 255]),
    ("gray", [128, 128, 128, 255]),
    ("green", [0, 128, 0, 255]),
    ("grey", [128, 128, 128, 255]),
    ("indigo", [75, 0, 130, 255]),
    ("ivory", [255, 255, 240, 255]),
    ("khaki", [240, 230, 140, 255]),
    ("lavender", [230, 230, 250, 255]),
    ("lightblue", [173, 216, 230, 255]),
    ("lightgray", [211, 211, 211, 255]),
    ("lightgreen", [144, 238, 144, 255]),
    ("lightgrey", [211, 211, 211, 255]),
    ("lightyellow", [255, 255, 224, 255]),
    ("lime", [0, 255, 0, 255]),
    ("magenta", [255, 0, 255, 255]),
    ("maroon", [128, 0, 0, 255]),
    ("navy", [0, 0, 128, 255]),
    ("olive", [128, 128, 0, 255]),
    ("orange", [255, 165, 0, 255]),
    ("pink", [255, 192, 203, 255]),
    ("purple", [128, 0, 128, 255]),
    ("red", [255, 0, 0, 255]),
    ("salmon", [250, 128, 114, 255]),
    ("silver", [192, 192, 192, 255]),
    ("skyblue", [135, 206, 235, 255]),
    ("tan", [210, 180, 140, 255]),
    ("teal", [0, 128, 128, 255]),
    ("tomato", [255, 99, 71, 255]),
    ("transparent", [0, 0, 0, 0]),
    ("turquoise", [64, 224, 208, 255]),
    ("violet", [238, 130, 238, 255]),
    ("wheat", [245, 222, 179, 255]),
    ("white", [255, 255, 255, 255]),
    ("whitesmoke", [245, 245, 245, 255]),
    ("yellow", [255, 255, 0, 255]),
    ("yellowgreen", [154, 205, 50, 255]),
];
