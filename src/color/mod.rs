//! Color conversion among the seven color-services spaces.
//!
//! Components travel as four `i16`s with 8-bit scaling: RGB, Gray, XYZ and
//! CMYK map `[0, 1]` onto `[0, 255]`; Lab maps L `[0, 100]` onto `[0, 255]`
//! and shifts a and b by 128; HSB and HSL carry hue in whole degrees
//! `[0, 359]` and the other two components in `[0, 255]`.
//!
//! A conversion either uses one of the 18 direct pairs or goes through RGB.
//! Results are rounded to nearest and clamped; a hue that rounds to 360
//! wraps to 0.
//!
//! # Example
//!
//! ```rust
//! use filterhost::color::{convert, ColorSpace};
//!
//! let hsb = convert(ColorSpace::Rgb, ColorSpace::Hsb, [255, 0, 0, 0]);
//! assert_eq!(hsb, [0, 255, 255, 0]);
//! ```

mod spaces;

use spaces::*;

/// Four color components.
pub type Components = [i16; 4];

/// Color spaces understood by the color-services suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum ColorSpace {
    /// Red, green, blue.
    Rgb = 0,
    /// Hue, saturation, brightness.
    Hsb = 1,
    /// Cyan, magenta, yellow, black.
    Cmyk = 2,
    /// CIE L*a*b*.
    Lab = 3,
    /// Single gray channel.
    Gray = 4,
    /// Hue, saturation, lightness.
    Hsl = 5,
    /// CIE XYZ.
    Xyz = 6,
}

impl ColorSpace {
    /// Every space, in code order.
    pub const ALL: [ColorSpace; 7] = [
        Self::Rgb,
        Self::Hsb,
        Self::Cmyk,
        Self::Lab,
        Self::Gray,
        Self::Hsl,
        Self::Xyz,
    ];

    /// Decode a raw space code.
    pub fn from_raw(code: i16) -> Option<Self> {
        Self::ALL.get(usize::try_from(code).ok()?).copied()
    }

    /// Number of meaningful components.
    pub fn component_count(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Cmyk => 4,
            _ => 3,
        }
    }
}

/// How a conversion is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Source and target are the same space.
    Identity,
    /// One of the direct pairs.
    Direct,
    /// Source to RGB, then RGB to target.
    ViaRgb,
}

/// Route taken from `from` to `to`.
pub fn route(from: ColorSpace, to: ColorSpace) -> Route {
    use ColorSpace::*;
    match (from, to) {
        (a, b) if a == b => Route::Identity,
        (Rgb, _) | (_, Rgb) => Route::Direct,
        (Lab, Xyz) | (Xyz, Lab) => Route::Direct,
        (Cmyk, Gray) | (Gray, Cmyk) => Route::Direct,
        (Hsb, Hsl) | (Hsl, Hsb) => Route::Direct,
        _ => Route::ViaRgb,
    }
}

fn to_rgb(from: ColorSpace, c: Components) -> Components {
    let rgb = match from {
        ColorSpace::Rgb => return c,
        ColorSpace::Hsb => hsb_to_rgb(decode_hue3(c)),
        ColorSpace::Hsl => hsl_to_rgb(decode_hue3(c)),
        ColorSpace::Cmyk => cmyk_to_rgb(decode_cmyk(c)),
        ColorSpace::Gray => gray_to_rgb(decode_gray(c)),
        ColorSpace::Xyz => xyz_to_rgb(decode_xyz(c)),
        ColorSpace::Lab => xyz_to_rgb(lab_to_xyz(decode_lab(c))),
    };
    encode_rgb(rgb)
}

fn from_rgb(to: ColorSpace, c: Components) -> Components {
    let rgb = decode_rgb(c);
    match to {
        ColorSpace::Rgb => c,
        ColorSpace::Hsb => encode_hue3(rgb_to_hsb(rgb)),
        ColorSpace::Hsl => encode_hue3(rgb_to_hsl(rgb)),
        ColorSpace::Cmyk => encode_cmyk(rgb_to_cmyk(rgb)),
        ColorSpace::Gray => encode_gray(rgb_to_gray(rgb)),
        ColorSpace::Xyz => encode_xyz(rgb_to_xyz(rgb)),
        ColorSpace::Lab => encode_lab(xyz_to_lab(rgb_to_xyz(rgb))),
    }
}

fn direct(from: ColorSpace, to: ColorSpace, c: Components) -> Components {
    use ColorSpace::*;
    match (from, to) {
        (Rgb, _) => from_rgb(to, c),
        (_, Rgb) => to_rgb(from, c),
        (Lab, Xyz) => encode_xyz(lab_to_xyz(decode_lab(c))),
        (Xyz, Lab) => encode_lab(xyz_to_lab(decode_xyz(c))),
        (Cmyk, Gray) => encode_gray(cmyk_to_gray(decode_cmyk(c))),
        (Gray, Cmyk) => encode_cmyk(gray_to_cmyk(decode_gray(c))),
        (Hsb, Hsl) => encode_hue3(hsb_to_hsl(decode_hue3(c))),
        (Hsl, Hsb) => encode_hue3(hsl_to_hsb(decode_hue3(c))),
        _ => from_rgb(to, to_rgb(from, c)),
    }
}

/// Convert components from one space to another.
pub fn convert(from: ColorSpace, to: ColorSpace, components: Components) -> Components {
    match route(from, to) {
        Route::Identity => components,
        Route::Direct => direct(from, to, components),
        Route::ViaRgb => from_rgb(to, to_rgb(from, components)),
    }
}

/// RGB components of an 8-bit color.
pub fn rgb_components(r: u8, g: u8, b: u8) -> Components {
    [i16::from(r), i16::from(g), i16::from(b), 0]
}

/// 8-bit RGB of a color given in any space.
pub fn to_rgb8(from: ColorSpace, components: Components) -> [u8; 3] {
    let c = convert(from, ColorSpace::Rgb, components);
    [c[0] as u8, c[1] as u8, c[2] as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Components, b: Components, what: &str) {
        for i in 0..4 {
            assert!(
                (a[i] - b[i]).abs() <= 1,
                "{what}: {a:?} vs {b:?} differ at component {i}"
            );
        }
    }

    fn rgb_grid() -> impl Iterator<Item = Components> {
        let steps = [0i16, 51, 102, 153, 204, 255];
        steps.into_iter().flat_map(move |r| {
            steps
                .into_iter()
                .flat_map(move |g| steps.into_iter().map(move |b| [r, g, b, 0]))
        })
    }

    #[test]
    fn test_route_table() {
        let direct = ColorSpace::ALL
            .iter()
            .flat_map(|a| ColorSpace::ALL.iter().map(move |b| (*a, *b)))
            .filter(|(a, b)| route(*a, *b) == Route::Direct)
            .count();
        assert_eq!(direct, 18);
        assert_eq!(route(ColorSpace::Lab, ColorSpace::Hsb), Route::ViaRgb);
        assert_eq!(route(ColorSpace::Gray, ColorSpace::Gray), Route::Identity);
    }

    #[test]
    fn test_rgb_round_trips() {
        for space in [ColorSpace::Hsb, ColorSpace::Hsl, ColorSpace::Cmyk] {
            for rgb in rgb_grid() {
                let there = convert(ColorSpace::Rgb, space, rgb);
                let back = convert(space, ColorSpace::Rgb, there);
                assert_close(rgb, back, &format!("RGB via {space:?}"));
            }
        }
    }

    #[test]
    fn test_gray_round_trips() {
        for space in ColorSpace::ALL {
            for g in 0..=255i16 {
                let gray = [g, 0, 0, 0];
                let back = convert(space, ColorSpace::Gray, convert(ColorSpace::Gray, space, gray));
                assert_close(gray, back, &format!("Gray via {space:?}"));
            }
        }
    }

    #[test]
    fn test_neutral_xyz_lab_round_trip() {
        for v in 0..=255i16 {
            let xyz = [v, v, v, 0];
            let back = convert(ColorSpace::Lab, ColorSpace::Xyz, convert(ColorSpace::Xyz, ColorSpace::Lab, xyz));
            assert_close(xyz, back, "XYZ via Lab");
        }
    }

    #[test]
    fn test_hsb_hsl_direct() {
        let hsl = convert(ColorSpace::Hsb, ColorSpace::Hsl, [120, 255, 255, 0]);
        assert_eq!(hsl, [120, 255, 128, 0]);
        assert_close(
            convert(ColorSpace::Hsl, ColorSpace::Hsb, hsl),
            [120, 255, 255, 0],
            "HSB via HSL",
        );
    }

    #[test]
    fn test_known_values() {
        assert_eq!(convert(ColorSpace::Rgb, ColorSpace::Hsb, [0, 0, 255, 0]), [240, 255, 255, 0]);
        assert_eq!(convert(ColorSpace::Rgb, ColorSpace::Cmyk, [0, 0, 0, 0]), [0, 0, 0, 255]);
        assert_eq!(convert(ColorSpace::Rgb, ColorSpace::Lab, [255, 255, 255, 0]), [255, 128, 128, 0]);
        assert_eq!(convert(ColorSpace::Rgb, ColorSpace::Gray, [255, 255, 255, 0])[0], 255);
        // Hue just below 360 wraps.
        assert_eq!(convert(ColorSpace::Rgb, ColorSpace::Hsb, [255, 0, 1, 0])[0], 0);
    }
}
