//! Integration tests for color conversion and the color-services suite.

use filterhost::color::{ColorSpace, Components, Route, convert, rgb_components, route, to_rgb8};
use filterhost::suites::{ColorServices, SuiteStatus};

#[test]
fn test_space_codes() {
    assert_eq!(ColorSpace::from_raw(3), Some(ColorSpace::Lab));
    assert_eq!(ColorSpace::from_raw(7), None);
    assert_eq!(ColorSpace::from_raw(-1), None);
    assert_eq!(ColorSpace::Gray.component_count(), 1);
    assert_eq!(ColorSpace::Cmyk.component_count(), 4);
}

#[test]
fn test_pure_red() {
    let red = rgb_components(255, 0, 0);
    assert_eq!(convert(ColorSpace::Rgb, ColorSpace::Cmyk, red), [0, 255, 255, 0]);
    assert_eq!(convert(ColorSpace::Rgb, ColorSpace::Hsb, red), [0, 255, 255, 0]);
    assert_eq!(convert(ColorSpace::Rgb, ColorSpace::Hsl, red), [0, 255, 128, 0]);
}

#[test]
fn test_gray_is_neutral_everywhere() {
    for g in [0i16, 64, 128, 200, 255] {
        let rgb = to_rgb8(ColorSpace::Gray, [g, 0, 0, 0]);
        assert_eq!(rgb, [g as u8; 3]);
    }
}

#[test]
fn test_black_ink_to_rgb() {
    assert_eq!(to_rgb8(ColorSpace::Cmyk, [0, 0, 0, 255]), [0, 0, 0]);
    assert_eq!(to_rgb8(ColorSpace::Cmyk, [0, 0, 0, 0]), [255, 255, 255]);
}

#[test]
fn test_indirect_conversion_matches_two_steps() {
    let hsb = [200, 180, 90, 0];
    let via = convert(ColorSpace::Rgb, ColorSpace::Lab, convert(ColorSpace::Hsb, ColorSpace::Rgb, hsb));
    assert_eq!(route(ColorSpace::Hsb, ColorSpace::Lab), Route::ViaRgb);
    assert_eq!(convert(ColorSpace::Hsb, ColorSpace::Lab, hsb), via);
}

#[test]
fn test_suite_conversion_rejects_bad_space() {
    let colors = ColorServices::new([0; 3], [255; 3]);
    assert!(colors.convert(0, 2, rgb_components(0, 0, 0)).is_ok());
    assert_eq!(colors.convert(0, 9, rgb_components(0, 0, 0)).err(), Some(SuiteStatus::BadParameter));
}

// ============================================================================
// Round trips
// ============================================================================

/// RGB colors on a 5-unit grid, both ends included.
fn cube() -> impl Iterator<Item = Components> {
    let steps = || (0..=255i16).step_by(5);
    steps().flat_map(move |r| steps().flat_map(move |g| steps().map(move |b| [r, g, b, 0])))
}

/// Largest per-component difference; hue compares around the circle.
fn distance(space: ColorSpace, a: Components, b: Components) -> i16 {
    let hue_first = matches!(space, ColorSpace::Hsb | ColorSpace::Hsl);
    (0..space.component_count())
        .map(|i| {
            let d = (a[i] - b[i]).abs();
            if i == 0 && hue_first { d.min(360 - d) } else { d }
        })
        .max()
        .unwrap_or(0)
}

/// Worst error of `start -> via -> start` over colors that exist in `start`.
fn worst_round_trip(start: ColorSpace, via: ColorSpace) -> i16 {
    cube()
        .map(|rgb| {
            let value = convert(ColorSpace::Rgb, start, rgb);
            let back = convert(via, start, convert(start, via, value));
            distance(start, value, back)
        })
        .max()
        .unwrap_or(0)
}

#[test]
fn test_round_trips_stay_within_quantization_bounds() {
    use ColorSpace::*;
    // Whole-degree hue and 8-bit XYZ/Lab codes cannot hold every RGB color
    // apart, so those pairs get wider bounds.
    let bounds = [
        (Rgb, Cmyk, 1),
        (Gray, Rgb, 0),
        (Gray, Cmyk, 0),
        (Hsb, Hsl, 1),
        (Rgb, Hsb, 2),
        (Rgb, Xyz, 2),
        (Rgb, Hsl, 3),
        (Hsl, Hsb, 3),
        (Xyz, Lab, 3),
        (Rgb, Lab, 4),
        (Lab, Xyz, 9),
    ];
    for (start, via, bound) in bounds {
        let worst = worst_round_trip(start, via);
        assert!(worst <= bound, "{start:?} -> {via:?} -> {start:?}: off by {worst}, bound {bound}");
    }
}
