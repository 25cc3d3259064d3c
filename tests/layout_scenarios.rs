//! End-to-end layout scenarios through the public pipeline API.

use zenrings::rings::{IMAGE, IMAGE_AREA};
use zenrings::{
    Anchor, BoxEdges, Error, ErrorKind, FitMode, FlipMode, ImageState, Instructions, Pipeline,
    PointF, RectF, ScaleMode, Size, SizeF, Stage, UNSET_DIMENSION, engine, get_final_size,
    translate_points,
};

/// Run the layout phase and hand back the finished state.
fn layout(original: Size, inst: Instructions) -> ImageState<'static> {
    let mut state = ImageState::for_size(original, inst);
    Pipeline::default()
        .run_phase(&Stage::LAYOUT, &mut state)
        .unwrap();
    state
}

fn size(w: u32, h: u32) -> Size {
    Size::new(w, h)
}

// ============================================================
// Fixed scenarios
// ============================================================

#[test]
fn width_only_keeps_aspect() {
    let inst = Instructions::new().width(100.0);
    assert_eq!(get_final_size(size(400, 400), &inst).unwrap(), size(100, 100));
}

#[test]
fn crop_both_is_exact() {
    let inst = Instructions::new()
        .width(200.0)
        .height(100.0)
        .mode(FitMode::Crop)
        .scale(ScaleMode::Both);
    for (w, h) in [(200, 100), (400, 400), (1000, 201), (333, 999)] {
        assert_eq!(get_final_size(size(w, h), &inst).unwrap(), size(200, 100), "{w}x{h}");
    }
}

#[test]
fn pad_square_into_wide_box() {
    let inst = Instructions::new()
        .width(200.0)
        .height(100.0)
        .mode(FitMode::Pad);
    let state = layout(size(400, 400), inst);
    assert_eq!(state.dest_size, size(200, 100));
    assert_eq!(
        state.layout.ring_bounds(IMAGE),
        Some(RectF::new(50.0, 0.0, 100.0, 100.0))
    );
    assert_eq!(
        state.layout.ring_bounds(IMAGE_AREA),
        Some(RectF::new(0.0, 0.0, 200.0, 100.0))
    );
}

#[test]
fn pad_wide_into_square_letterboxes() {
    let inst = Instructions::new()
        .width(100.0)
        .height(100.0)
        .mode(FitMode::Pad);
    let state = layout(size(400, 200), inst);
    assert_eq!(state.dest_size, size(100, 100));
    assert_eq!(
        state.layout.ring_bounds(IMAGE),
        Some(RectF::new(0.0, 25.0, 100.0, 50.0))
    );
}

#[test]
fn crop_square_to_smaller_square() {
    let inst = Instructions::new()
        .width(50.0)
        .height(50.0)
        .mode(FitMode::Crop);
    assert_eq!(get_final_size(size(100, 100), &inst).unwrap(), size(50, 50));

    // The whole aspect-matching region is copied, then scaled down.
    let r = engine::resolve_for(SizeF::new(100.0, 100.0), &inst).unwrap();
    assert_eq!(r.target_size, SizeF::new(50.0, 50.0));
    assert_eq!(r.copy_rect, RectF::new(0.0, 0.0, 100.0, 100.0));
}

#[test]
fn crop_mode_takes_centered_strip() {
    let inst = Instructions::new()
        .width(100.0)
        .height(100.0)
        .mode(FitMode::Crop);
    let r = engine::resolve_for(SizeF::new(400.0, 200.0), &inst).unwrap();
    assert_eq!(r.copy_rect, RectF::new(100.0, 0.0, 200.0, 200.0));
}

#[test]
fn empty_instructions_map_points_to_themselves() {
    let points = [
        PointF::new(0.0, 0.0),
        PointF::new(12.5, 7.25),
        PointF::new(640.0, 480.0),
    ];
    let out = translate_points(&points, size(640, 480), &Instructions::new()).unwrap();
    assert_eq!(out, points);
}

#[test]
fn all_zero_crop_is_a_configuration_error() {
    let inst = Instructions::new()
        .crop(0.0, 0.0, 0.0, 0.0)
        .mode(FitMode::Crop);
    let err = get_final_size(size(100, 100), &inst).unwrap_err();
    assert!(matches!(err, Error::DegenerateCrop { .. }));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

// ============================================================
// Decoration and orientation
// ============================================================

#[test]
fn rings_add_up_around_the_image() {
    let inst = Instructions::new()
        .padding(BoxEdges::uniform(5.0))
        .border(BoxEdges::new(1.0, 2.0, 3.0, 4.0))
        .margin(BoxEdges::uniform(10.0));
    assert_eq!(get_final_size(size(100, 50), &inst).unwrap(), size(136, 84));
}

#[test]
fn quarter_rotation_swaps_canvas() {
    let inst = Instructions::new().width(200.0).rotate(90.0);
    assert_eq!(get_final_size(size(400, 100), &inst).unwrap(), size(50, 200));
}

#[test]
fn source_rotation_changes_what_width_means() {
    let inst = Instructions::new().width(100.0).source_rotate(90.0);
    assert_eq!(get_final_size(size(400, 200), &inst).unwrap(), size(100, 200));
}

#[test]
fn points_follow_scale_and_flip() {
    let inst = Instructions::new().width(50.0).flip(FlipMode::X);
    let out = translate_points(&[PointF::new(10.0, 20.0)], size(100, 100), &inst).unwrap();
    assert_eq!(out, [PointF::new(45.0, 10.0)]);
}

#[test]
fn points_follow_padding() {
    let inst = Instructions::new().padding(BoxEdges::uniform(3.0));
    let out = translate_points(&[PointF::new(1.0, 2.0)], size(10, 10), &inst).unwrap();
    assert_eq!(out, [PointF::new(4.0, 5.0)]);
}

#[test]
fn points_follow_rings_through_quarter_rotation() {
    let inst = Instructions::new()
        .width(100.0)
        .padding(BoxEdges::uniform(10.0))
        .border(BoxEdges::new(1.0, 2.0, 3.0, 4.0))
        .rotate(90.0);
    assert_eq!(get_final_size(size(400, 200), &inst).unwrap(), size(74, 126));

    // The left edge becomes the top and the top edge becomes the right.
    let out = translate_points(&[PointF::new(200.0, 100.0)], size(400, 200), &inst).unwrap();
    assert_eq!(out, [PointF::new(38.0, 64.0)]);
}

#[test]
fn pad_anchor_moves_image_and_points() {
    let inst = Instructions::new()
        .width(100.0)
        .height(100.0)
        .mode(FitMode::Pad)
        .anchor(Anchor::BottomRight);
    let state = layout(size(400, 200), inst.clone());
    assert_eq!(
        state.layout.ring_bounds(IMAGE),
        Some(RectF::new(0.0, 50.0, 100.0, 50.0))
    );

    let out = translate_points(&[PointF::new(200.0, 100.0)], size(400, 200), &inst).unwrap();
    assert_eq!(out, [PointF::new(50.0, 75.0)]);

    let top_left = inst.anchor(Anchor::TopLeft);
    let out = translate_points(&[PointF::new(400.0, 200.0)], size(400, 200), &top_left).unwrap();
    assert_eq!(out, [PointF::new(100.0, 50.0)]);
}

#[test]
fn downscale_only_keeps_small_sources() {
    let inst = Instructions::new().width(1000.0).height(1000.0);
    assert_eq!(get_final_size(size(300, 200), &inst).unwrap(), size(300, 200));
}

#[test]
fn upscale_canvas_pads_small_sources() {
    let inst = Instructions::new()
        .width(400.0)
        .height(400.0)
        .mode(FitMode::Pad)
        .scale(ScaleMode::UpscaleCanvas);
    let state = layout(size(100, 50), inst);
    assert_eq!(state.dest_size, size(400, 400));
    assert_eq!(
        state.layout.ring_bounds(IMAGE),
        Some(RectF::new(150.0, 175.0, 100.0, 50.0))
    );
}

#[test]
fn zoom_scales_the_result() {
    let inst = Instructions::new().width(100.0).zoom(2.0);
    assert_eq!(get_final_size(size(400, 400), &inst).unwrap(), size(200, 200));
}

#[test]
fn minus_one_width_means_unset() {
    let inst = Instructions::new().width(UNSET_DIMENSION).height(100.0);
    assert_eq!(get_final_size(size(400, 200), &inst).unwrap(), size(200, 100));
}

#[test]
fn invalid_width_is_rejected() {
    let inst = Instructions::new().width(-5.0);
    let err = get_final_size(size(10, 10), &inst).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
