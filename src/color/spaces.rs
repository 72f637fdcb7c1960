//! Per-space encodings and the direct conversions between them.
//!
//! Every space decodes its 8-bit components into normalized floats and
//! encodes back with round-to-nearest and clamping.

use super::Components;

/// Normalized RGB, each channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// Hue in degrees plus two normalized components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Hue3 {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

/// CIE XYZ normalized by the D65 white point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Xyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// CIE L*a*b*: L in `[0, 100]`, a and b in `[-128, 127]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

/// Normalized CMYK.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Cmyk {
    pub c: f64,
    pub m: f64,
    pub y: f64,
    pub k: f64,
}

// ============================================================================
// Component scaling
// ============================================================================

fn unit(c: i16) -> f64 {
    f64::from(c.clamp(0, 255)) / 255.0
}

fn byte(v: f64) -> i16 {
    (v * 255.0).round().clamp(0.0, 255.0) as i16
}

fn hue(degrees: f64) -> i16 {
    let h = degrees.round().clamp(0.0, 360.0) as i16;
    if h == 360 { 0 } else { h }
}

fn degrees(c: i16) -> f64 {
    f64::from(c.rem_euclid(360))
}

pub(crate) fn decode_rgb(c: Components) -> Rgb {
    Rgb {
        r: unit(c[0]),
        g: unit(c[1]),
        b: unit(c[2]),
    }
}

pub(crate) fn encode_rgb(rgb: Rgb) -> Components {
    [byte(rgb.r), byte(rgb.g), byte(rgb.b), 0]
}

pub(crate) fn decode_hue3(c: Components) -> Hue3 {
    Hue3 {
        h: degrees(c[0]),
        s: unit(c[1]),
        v: unit(c[2]),
    }
}

pub(crate) fn encode_hue3(value: Hue3) -> Components {
    [hue(value.h), byte(value.s), byte(value.v), 0]
}

pub(crate) fn decode_cmyk(c: Components) -> Cmyk {
    Cmyk {
        c: unit(c[0]),
        m: unit(c[1]),
        y: unit(c[2]),
        k: unit(c[3]),
    }
}

pub(crate) fn encode_cmyk(value: Cmyk) -> Components {
    [byte(value.c), byte(value.m), byte(value.y), byte(value.k)]
}

pub(crate) fn decode_gray(c: Components) -> f64 {
    unit(c[0])
}

pub(crate) fn encode_gray(gray: f64) -> Components {
    [byte(gray), 0, 0, 0]
}

pub(crate) fn decode_xyz(c: Components) -> Xyz {
    Xyz {
        x: unit(c[0]),
        y: unit(c[1]),
        z: unit(c[2]),
    }
}

pub(crate) fn encode_xyz(value: Xyz) -> Components {
    [byte(value.x), byte(value.y), byte(value.z), 0]
}

pub(crate) fn decode_lab(c: Components) -> Lab {
    Lab {
        l: f64::from(c[0].clamp(0, 255)) * 100.0 / 255.0,
        a: f64::from(c[1].clamp(0, 255)) - 128.0,
        b: f64::from(c[2].clamp(0, 255)) - 128.0,
    }
}

pub(crate) fn encode_lab(value: Lab) -> Components {
    let shifted = |v: f64| (v + 128.0).round().clamp(0.0, 255.0) as i16;
    [
        (value.l * 255.0 / 100.0).round().clamp(0.0, 255.0) as i16,
        shifted(value.a),
        shifted(value.b),
        0,
    ]
}

// ============================================================================
// RGB <-> HSB / HSL
// ============================================================================

fn hue_of(rgb: Rgb, max: f64, delta: f64) -> f64 {
    if delta <= 0.0 {
        return 0.0;
    }
    let h = if max == rgb.r {
        60.0 * ((rgb.g - rgb.b) / delta)
    } else if max == rgb.g {
        60.0 * ((rgb.b - rgb.r) / delta + 2.0)
    } else {
        60.0 * ((rgb.r - rgb.g) / delta + 4.0)
    };
    h.rem_euclid(360.0)
}

/// RGB from hue, chroma and the amount added to every channel.
fn from_hue_chroma(h: f64, chroma: f64, m: f64) -> Rgb {
    let sector = (h.rem_euclid(360.0)) / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    Rgb {
        r: r + m,
        g: g + m,
        b: b + m,
    }
}

pub(crate) fn rgb_to_hsb(rgb: Rgb) -> Hue3 {
    let max = rgb.r.max(rgb.g).max(rgb.b);
    let min = rgb.r.min(rgb.g).min(rgb.b);
    let delta = max - min;
    Hue3 {
        h: hue_of(rgb, max, delta),
        s: if max > 0.0 { delta / max } else { 0.0 },
        v: max,
    }
}

pub(crate) fn hsb_to_rgb(hsb: Hue3) -> Rgb {
    let chroma = hsb.v * hsb.s;
    from_hue_chroma(hsb.h, chroma, hsb.v - chroma)
}

pub(crate) fn rgb_to_hsl(rgb: Rgb) -> Hue3 {
    let max = rgb.r.max(rgb.g).max(rgb.b);
    let min = rgb.r.min(rgb.g).min(rgb.b);
    let delta = max - min;
    let l = (max + min) / 2.0;
    let denom = 1.0 - (2.0 * l - 1.0).abs();
    Hue3 {
        h: hue_of(rgb, max, delta),
        s: if delta > 0.0 && denom > 0.0 { delta / denom } else { 0.0 },
        v: l,
    }
}

pub(crate) fn hsl_to_rgb(hsl: Hue3) -> Rgb {
    let chroma = (1.0 - (2.0 * hsl.v - 1.0).abs()) * hsl.s;
    from_hue_chroma(hsl.h, chroma, hsl.v - chroma / 2.0)
}

pub(crate) fn hsb_to_hsl(hsb: Hue3) -> Hue3 {
    let l = hsb.v * (1.0 - hsb.s / 2.0);
    let denom = l.min(1.0 - l);
    Hue3 {
        h: hsb.h,
        s: if denom > 0.0 { (hsb.v - l) / denom } else { 0.0 },
        v: l,
    }
}

pub(crate) fn hsl_to_hsb(hsl: Hue3) -> Hue3 {
    let v = hsl.v + hsl.s * hsl.v.min(1.0 - hsl.v);
    Hue3 {
        h: hsl.h,
        s: if v > 0.0 { 2.0 * (1.0 - hsl.v / v) } else { 0.0 },
        v,
    }
}

// ============================================================================
// RGB <-> CMYK / Gray
// ============================================================================

const LUMA: [f64; 3] = [0.299, 0.587, 0.114];

pub(crate) fn rgb_to_gray(rgb: Rgb) -> f64 {
    LUMA[0] * rgb.r + LUMA[1] * rgb.g + LUMA[2] * rgb.b
}

pub(crate) fn gray_to_rgb(gray: f64) -> Rgb {
    Rgb {
        r: gray,
        g: gray,
        b: gray,
    }
}

pub(crate) fn rgb_to_cmyk(rgb: Rgb) -> Cmyk {
    let k = 1.0 - rgb.r.max(rgb.g).max(rgb.b);
    if k >= 1.0 {
        return Cmyk {
            c: 0.0,
            m: 0.0,
            y: 0.0,
            k: 1.0,
        };
    }
    let ink = |channel: f64| (1.0 - channel - k) / (1.0 - k);
    Cmyk {
        c: ink(rgb.r),
        m: ink(rgb.g),
        y: ink(rgb.b),
        k,
    }
}

pub(crate) fn cmyk_to_rgb(cmyk: Cmyk) -> Rgb {
    Rgb {
        r: (1.0 - cmyk.c) * (1.0 - cmyk.k),
        g: (1.0 - cmyk.m) * (1.0 - cmyk.k),
        b: (1.0 - cmyk.y) * (1.0 - cmyk.k),
    }
}

pub(crate) fn cmyk_to_gray(cmyk: Cmyk) -> f64 {
    (1.0 - cmyk.k) * (1.0 - (LUMA[0] * cmyk.c + LUMA[1] * cmyk.m + LUMA[2] * cmyk.y))
}

pub(crate) fn gray_to_cmyk(gray: f64) -> Cmyk {
    Cmyk {
        c: 0.0,
        m: 0.0,
        y: 0.0,
        k: 1.0 - gray,
    }
}

// ============================================================================
// RGB <-> XYZ <-> Lab
// ============================================================================

/// D65 white point (row sums of [`RGB_TO_XYZ`]).
const WHITE: [f64; 3] = [0.950_47, 1.0, 1.088_83];

const RGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.412_456_4, 0.357_576_1, 0.180_437_5],
    [0.212_672_9, 0.715_152_2, 0.072_175_0],
    [0.019_333_9, 0.119_192_0, 0.950_304_1],
];

const XYZ_TO_RGB: [[f64; 3]; 3] = [
    [3.240_454_2, -1.537_138_5, -0.498_531_4],
    [-0.969_266_0, 1.876_010_8, 0.041_556_0],
    [0.055_643_4, -0.204_025_9, 1.057_225_2],
];

fn apply(m: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// 8-bit RGB channels are treated as linear light.
pub(crate) fn rgb_to_xyz(rgb: Rgb) -> Xyz {
    let [x, y, z] = apply(&RGB_TO_XYZ, [rgb.r, rgb.g, rgb.b]);
    Xyz {
        x: x / WHITE[0],
        y: y / WHITE[1],
        z: z / WHITE[2],
    }
}

pub(crate) fn xyz_to_rgb(xyz: Xyz) -> Rgb {
    let [r, g, b] = apply(
        &XYZ_TO_RGB,
        [xyz.x * WHITE[0], xyz.y * WHITE[1], xyz.z * WHITE[2]],
    );
    Rgb { r, g, b }
}

const DELTA: f64 = 6.0 / 29.0;

fn lab_f(t: f64) -> f64 {
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

fn lab_f_inv(t: f64) -> f64 {
    if t > DELTA {
        t * t * t
    } else {
        3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
    }
}

pub(crate) fn xyz_to_lab(xyz: Xyz) -> Lab {
    let (fx, fy, fz) = (lab_f(xyz.x), lab_f(xyz.y), lab_f(xyz.z));
    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

pub(crate) fn lab_to_xyz(lab: Lab) -> Xyz {
    let fy = (lab.l + 16.0) / 116.0;
    Xyz {
        x: lab_f_inv(fy + lab.a / 500.0),
        y: lab_f_inv(fy),
        z: lab_f_inv(fy - lab.b / 200.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_maps_to_unit_xyz() {
        let xyz = rgb_to_xyz(Rgb {
            r: 1.0,
            g: 1.0,
            b: 1.0,
        });
        assert!((xyz.x - 1.0).abs() < 1e-6);
        assert!((xyz.y - 1.0).abs() < 1e-6);
        assert!((xyz.z - 1.0).abs() < 1e-6);
        let lab = xyz_to_lab(xyz);
        assert!((lab.l - 100.0).abs() < 1e-4);
        assert!(lab.a.abs() < 1e-4 && lab.b.abs() < 1e-4);
    }

    #[test]
    fn test_hue_wraps_to_zero() {
        assert_eq!(hue(359.6), 0);
        assert_eq!(hue(359.4), 359);
    }
}
