use proptest::prelude::*;
use zenrings::{
    BoxEdges, FitMode, Instructions, ScaleMode, Size, SizeF, engine, get_final_size,
};

fn fit_mode_strategy() -> impl Strategy<Value = FitMode> {
    prop_oneof![
        Just(FitMode::None),
        Just(FitMode::Max),
        Just(FitMode::Pad),
        Just(FitMode::Crop),
        Just(FitMode::Carve),
        Just(FitMode::Stretch),
    ]
}

fn scale_mode_strategy() -> impl Strategy<Value = ScaleMode> {
    prop_oneof![
        Just(ScaleMode::DownscaleOnly),
        Just(ScaleMode::UpscaleOnly),
        Just(ScaleMode::Both),
        Just(ScaleMode::UpscaleCanvas),
    ]
}

/// Fit modes that keep the aspect ratio of the copied region.
fn proportional_mode_strategy() -> impl Strategy<Value = FitMode> {
    prop_oneof![Just(FitMode::Max), Just(FitMode::Pad), Just(FitMode::Crop)]
}

fn dimension_strategy() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![Just(None), (1u32..=2000).prop_map(|v| Some(f64::from(v)))]
}

fn instructions_strategy() -> impl Strategy<Value = Instructions> {
    (
        (dimension_strategy(), dimension_strategy()),
        (dimension_strategy(), dimension_strategy()),
        fit_mode_strategy(),
        scale_mode_strategy(),
        prop_oneof![Just(0.0), Just(90.0), Just(30.0), Just(-45.0)],
        prop_oneof![Just(None), (0.1f64..4.0).prop_map(Some)],
        0u32..=8,
    )
        .prop_map(|((w, h), (mw, mh), mode, scale, rotate, zoom, pad)| {
            let mut i = Instructions::new().mode(mode).scale(scale).rotate(rotate);
            i.width = w;
            i.height = h;
            i.max_width = mw;
            i.max_height = mh;
            i.zoom = zoom;
            if pad > 0 {
                i = i.padding(BoxEdges::uniform(f64::from(pad)));
            }
            i
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_final_size_is_a_pure_function(
        w in 0u32..=3000,
        h in 0u32..=3000,
        inst in instructions_strategy(),
    ) {
        let a = get_final_size(Size::new(w, h), &inst);
        let b = get_final_size(Size::new(w, h), &inst);
        prop_assert_eq!(a.is_ok(), b.is_ok());
        if let (Ok(a), Ok(b)) = (a, b) {
            prop_assert_eq!(a, b);
        }
    }

    #[test]
    fn prop_canvas_is_never_empty(
        w in 0u32..=3000,
        h in 0u32..=3000,
        inst in instructions_strategy(),
    ) {
        let out = get_final_size(Size::new(w, h), &inst).unwrap();
        prop_assert!(out.width >= 1 && out.height >= 1, "{out:?}");
    }

    #[test]
    fn prop_downscale_only_keeps_sources_that_fit(
        sw in 1u32..=1000,
        sh in 1u32..=1000,
        extra_w in 0u32..=1000,
        extra_h in 0u32..=1000,
        mode in prop_oneof![
            Just(FitMode::Max),
            Just(FitMode::Pad),
            Just(FitMode::Crop),
            Just(FitMode::Stretch),
        ],
    ) {
        let inst = Instructions::new()
            .width(f64::from(sw + extra_w))
            .height(f64::from(sh + extra_h))
            .mode(mode)
            .scale(ScaleMode::DownscaleOnly);
        prop_assert_eq!(get_final_size(Size::new(sw, sh), &inst).unwrap(), Size::new(sw, sh));
    }

    #[test]
    fn prop_upscale_only_keeps_sources_that_overflow(
        sw in 1u32..=1000,
        sh in 1u32..=1000,
        w_frac in 0.01f64..=1.0,
        h_frac in 0.01f64..=1.0,
        mode in prop_oneof![
            Just(FitMode::Max),
            Just(FitMode::Pad),
            Just(FitMode::Crop),
            Just(FitMode::Stretch),
        ],
    ) {
        let w = (f64::from(sw) * w_frac).floor().max(1.0);
        let h = (f64::from(sh) * h_frac).floor().max(1.0);
        let inst = Instructions::new()
            .width(w)
            .height(h)
            .mode(mode)
            .scale(ScaleMode::UpscaleOnly);
        prop_assert_eq!(get_final_size(Size::new(sw, sh), &inst).unwrap(), Size::new(sw, sh));
    }

    #[test]
    fn prop_downscale_only_never_enlarges_the_image(
        sw in 1u32..=2000,
        sh in 1u32..=2000,
        w in 1u32..=2000,
        h in 1u32..=2000,
        mode in proportional_mode_strategy(),
    ) {
        let inst = Instructions::new()
            .width(f64::from(w))
            .height(f64::from(h))
            .mode(mode)
            .scale(ScaleMode::DownscaleOnly);
        let r = engine::resolve_for(SizeF::new(f64::from(sw), f64::from(sh)), &inst).unwrap();
        prop_assert!(r.target_size.width <= r.copy_rect.width + 1.0, "{r:?}");
        prop_assert!(r.target_size.height <= r.copy_rect.height + 1.0, "{r:?}");
    }

    #[test]
    fn prop_upscale_only_never_shrinks_the_image(
        sw in 1u32..=2000,
        sh in 1u32..=2000,
        w in 1u32..=2000,
        h in 1u32..=2000,
        mode in proportional_mode_strategy(),
    ) {
        let inst = Instructions::new()
            .width(f64::from(w))
            .height(f64::from(h))
            .mode(mode)
            .scale(ScaleMode::UpscaleOnly);
        let r = engine::resolve_for(SizeF::new(f64::from(sw), f64::from(sh)), &inst).unwrap();
        prop_assert!(r.target_size.width + 1.0 >= r.copy_rect.width, "{r:?}");
        prop_assert!(r.target_size.height + 1.0 >= r.copy_rect.height, "{r:?}");
    }

    #[test]
    fn prop_crop_both_is_exact_on_large_sources(
        sw in 200u32..=4000,
        sh in 100u32..=4000,
    ) {
        let inst = Instructions::new()
            .width(200.0)
            .height(100.0)
            .mode(FitMode::Crop)
            .scale(ScaleMode::Both);
        prop_assert_eq!(get_final_size(Size::new(sw, sh), &inst).unwrap(), Size::new(200, 100));
    }
}
