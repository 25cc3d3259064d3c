//! SVG visualization of a ring layout.
//!
//! Draws every visible ring as a polygon (outermost first) on the canvas the
//! layout produces, with tracked points as small markers.
//!
//! # Example
//!
//! ```
//! use zenrings::{BoxEdges, Instructions, Pipeline, Size, svg::render_layout_svg};
//!
//! let instructions = Instructions::new()
//!     .width(200.0)
//!     .height(100.0)
//!     .padding(BoxEdges::uniform(10.0));
//! let svg = render_layout_svg(&Pipeline::default(), Size::new(400, 400), &instructions).unwrap();
//! assert!(svg.contains(r#"class="ring padding""#));
//! ```

use alloc::format;
use alloc::string::String;
use core::fmt::Write;

use crate::error::Result;
use crate::geometry::{PointF, Size};
use crate::instructions::Instructions;
use crate::pipeline::{Pipeline, Stage};
use crate::rings::{self, Ring, RingLayout};
use crate::state::ImageState;

/// Largest drawn panel dimension.
const MAX_PANEL: f64 = 400.0;
/// Space around the panel.
const MARGIN: f64 = 30.0;
/// Height of the caption line.
const LABEL_H: f64 = 22.0;

/// Run the layout phase and draw the resulting rings.
pub fn render_layout_svg(
    pipeline: &Pipeline,
    original: Size,
    instructions: &Instructions,
) -> Result<String> {
    let mut state = ImageState::for_size(original, pipeline.prepare_instructions(instructions));
    pipeline.run_phase(&Stage::LAYOUT, &mut state)?;
    let caption = format!(
        "{}×{} → {}×{}",
        original.width, original.height, state.dest_size.width, state.dest_size.height
    );
    Ok(render_rings_svg(&state.layout, &caption))
}

/// Draw a ring layout as a complete SVG document.
pub fn render_rings_svg(layout: &RingLayout, caption: &str) -> String {
    let bounds = layout.bounding_box();
    let longest = bounds.width.max(bounds.height);
    let scale = if longest > 0.0 { MAX_PANEL / longest } else { 1.0 };
    let panel_w = bounds.width * scale;
    let panel_h = bounds.height * scale;
    let total_w = panel_w + 2.0 * MARGIN;
    let total_h = panel_h + 2.0 * MARGIN + LABEL_H;
    let origin = PointF::new(MARGIN - bounds.x * scale, MARGIN + LABEL_H - bounds.y * scale);

    let mut svg = String::with_capacity(2048);
    // Writing to a String cannot fail.
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {:.1} {:.1}">"#,
        total_w as u32, total_h as u32, total_w, total_h
    );
    svg.push_str(
        r##"<style>
  text { font-family: "Consolas", "DejaVu Sans Mono", monospace; font-size: 13px; fill: #333; }
  .canvas { fill: none; stroke: #999; stroke-dasharray: 4,2; }
  .ring { fill-opacity: 0.85; stroke-width: 1; }
  .margin { fill: #f4f4f4; stroke: #bbb; }
  .border { fill: #444; stroke: #222; }
  .padding { fill: #e8d9a8; stroke: #b59b4a; }
  .imageArea { fill: #ddd; stroke: #999; }
  .image { fill: #6ba3d6; stroke: #2c6faa; }
  .point { fill: #d33; }
</style>
"##,
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}">{}</text>"#,
        MARGIN,
        MARGIN + 14.0,
        escape_xml(caption)
    );
    let _ = writeln!(
        svg,
        r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" class="canvas"/>"#,
        MARGIN,
        MARGIN + LABEL_H,
        panel_w,
        panel_h
    );

    // Outermost first so inner rings paint on top.
    for ring in layout.rings().collect::<alloc::vec::Vec<_>>().iter().rev() {
        let _ = writeln!(
            svg,
            r#"<polygon points="{}" class="ring {}"><title>{}</title></polygon>"#,
            polygon_points(ring, origin, scale),
            ring_class(&ring.name),
            escape_xml(&ring.name)
        );
    }
    for tracked in layout.invisible_polygons() {
        for p in &tracked.points {
            let _ = writeln!(
                svg,
                r#"<circle cx="{:.1}" cy="{:.1}" r="3" class="point"/>"#,
                origin.x + p.x * scale,
                origin.y + p.y * scale
            );
        }
    }

    svg.push_str("</svg>\n");
    svg
}

fn polygon_points(ring: &Ring, origin: PointF, scale: f64) -> String {
    let mut out = String::new();
    for (i, p) in ring.points.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:.1},{:.1}", origin.x + p.x * scale, origin.y + p.y * scale);
    }
    out
}

/// CSS class for well-known rings; custom rings share a neutral style.
fn ring_class(name: &str) -> &str {
    match name {
        rings::IMAGE | rings::IMAGE_AREA | rings::PADDING | rings::BORDER | rings::MARGIN => name,
        _ => "custom",
    }
}

/// Escape special characters for XML text content.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edges::BoxEdges;
    use crate::geometry::{RectF, SizeF};

    #[test]
    fn draws_every_ring_outermost_first() {
        let inst = Instructions::new()
            .width(100.0)
            .height(100.0)
            .padding(BoxEdges::uniform(5.0))
            .border(BoxEdges::uniform(2.0));
        let svg = render_layout_svg(&Pipeline::default(), Size::new(200, 100), &inst).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>\n"));
        assert!(svg.contains("200×100 → 114×114"), "{svg}");
        let border = svg.find("ring border").unwrap();
        let padding = svg.find("ring padding").unwrap();
        let image = svg.find("ring image\"").unwrap();
        assert!(border < padding && padding < image);
    }

    #[test]
    fn rotated_layout_is_a_diamond() {
        let inst = Instructions::new().rotate(45.0);
        let svg = render_layout_svg(&Pipeline::default(), Size::new(10, 10), &inst).unwrap();
        assert!(svg.contains("<polygon"));
    }

    #[test]
    fn tracked_points_become_markers() {
        let mut layout = RingLayout::new();
        layout.add_ring(rings::IMAGE, RectF::from_size(SizeF::new(10.0, 10.0)).to_polygon());
        layout.add_invisible_polygon("points", alloc::vec![PointF::new(5.0, 5.0)]);
        let svg = render_rings_svg(&layout, "a < b");
        assert_eq!(svg.matches("<circle").count(), 1);
        assert!(svg.contains("a &lt; b"));
    }

    #[test]
    fn empty_layout_still_renders() {
        let svg = render_rings_svg(&RingLayout::new(), "");
        assert!(svg.starts_with("<svg"));
        assert!(!svg.contains("<polygon"));
    }

    #[test]
    fn custom_ring_names_are_escaped() {
        let mut layout = RingLayout::new();
        layout.add_ring("\"x\"", RectF::from_size(SizeF::new(4.0, 4.0)).to_polygon());
        let svg = render_rings_svg(&layout, "");
        assert!(svg.contains(r#"class="ring custom""#));
        assert!(svg.contains("&quot;x&quot;"));
    }
}
