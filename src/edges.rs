//! Per-edge widths for padding, border and margin rings.

/// Four non-negative edge widths, in layout units.
///
/// Order follows CSS: top, right, bottom, left.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BoxEdges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl BoxEdges {
    /// No edges.
    pub const EMPTY: Self = Self::uniform(0.0);

    /// Independent widths (CSS order: top, right, bottom, left).
    ///
    /// Negative and non-finite widths are treated as zero.
    pub fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        let clean = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        Self {
            top: clean(top),
            right: clean(right),
            bottom: clean(bottom),
            left: clean(left),
        }
    }

    /// The same width on every edge.
    pub const fn uniform(width: f64) -> Self {
        Self {
            top: width,
            right: width,
            bottom: width,
            left: width,
        }
    }

    /// The shared width when all four edges are equal, otherwise NaN.
    ///
    /// Uniform borders render as one stroked polygon; per-edge borders need
    /// mitered segments.
    pub fn all(&self) -> f64 {
        if self.top == self.right && self.top == self.bottom && self.top == self.left {
            self.top
        } else {
            f64::NAN
        }
    }

    /// Whether every edge is zero.
    pub fn is_empty(&self) -> bool {
        self.top == 0.0 && self.right == 0.0 && self.bottom == 0.0 && self.left == 0.0
    }

    /// Multiply every edge.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(
            self.top * factor,
            self.right * factor,
            self.bottom * factor,
            self.left * factor,
        )
    }

    /// Parse `"w"` (uniform) or `"top,right,bottom,left"`.
    ///
    /// Surrounding parentheses are accepted.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().trim_start_matches('(').trim_end_matches(')');
        let mut vals = [0.0f64; 4];
        let mut count = 0;
        for part in s.split(',') {
            if count == 4 {
                return None;
            }
            vals[count] = part.trim().parse().ok()?;
            count += 1;
        }
        match count {
            1 => Some(Self::new(vals[0], vals[0], vals[0], vals[0])),
            4 => Some(Self::new(vals[0], vals[1], vals[2], vals[3])),
            _ => None,
        }
    }
}
