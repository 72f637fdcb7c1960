//! Channel shuffles between stored pixels and delivered planes.
//!
//! Surfaces store blue, green, red, alpha. Filters address planes in red,
//! green, blue, alpha order, so delivered plane `p` is stored channel
//! [`PLANE_ORDER`]`[p]`. The common three- and four-plane layouts starting at
//! plane 0 get dedicated loops over fixed-size chunks so the compiler can
//! vectorize them.

use crate::surface::Bgra8;

/// Stored channel index of each delivered plane.
pub const PLANE_ORDER: [usize; 4] = [2, 1, 0, 3];

/// Copy planes `lo..lo + count` of each pixel into interleaved bytes.
///
/// `out` must hold `pixels.len() * count` bytes.
#[inline]
pub fn gather(pixels: &[Bgra8], lo: usize, count: usize, out: &mut [u8]) {
    debug_assert!(lo + count <= 4);
    debug_assert!(out.len() >= pixels.len() * count);
    match (lo, count) {
        (0, 3) => {
            for (p, o) in pixels.iter().zip(out.chunks_exact_mut(3)) {
                o[0] = p.r;
                o[1] = p.g;
                o[2] = p.b;
            }
        }
        (0, 4) => {
            for (p, o) in pixels.iter().zip(out.chunks_exact_mut(4)) {
                o[0] = p.r;
                o[1] = p.g;
                o[2] = p.b;
                o[3] = p.a;
            }
        }
        (_, 0) => {}
        _ => {
            for (p, o) in pixels.iter().zip(out.chunks_exact_mut(count)) {
                for (k, slot) in o.iter_mut().enumerate() {
                    *slot = p.channel(PLANE_ORDER[lo + k]);
                }
            }
        }
    }
}

/// Write interleaved bytes for planes `lo..lo + count` back into pixels.
/// Channels outside the range are left alone.
#[inline]
pub fn scatter(bytes: &[u8], lo: usize, count: usize, pixels: &mut [Bgra8]) {
    debug_assert!(lo + count <= 4);
    match (lo, count) {
        (0, 3) => {
            for (p, i) in pixels.iter_mut().zip(bytes.chunks_exact(3)) {
                p.r = i[0];
                p.g = i[1];
                p.b = i[2];
            }
        }
        (0, 4) => {
            for (p, i) in pixels.iter_mut().zip(bytes.chunks_exact(4)) {
                p.r = i[0];
                p.g = i[1];
                p.b = i[2];
                p.a = i[3];
            }
        }
        (_, 0) => {}
        _ => {
            for (p, i) in pixels.iter_mut().zip(bytes.chunks_exact(count)) {
                for (k, &value) in i.iter().enumerate() {
                    *p.channel_mut(PLANE_ORDER[lo + k]) = value;
                }
            }
        }
    }
}

/// Linear blend of `filtered` over `original` by mask weight.
#[inline]
pub fn blend(original: Bgra8, filtered: Bgra8, weight: u8) -> Bgra8 {
    match weight {
        0 => original,
        255 => filtered,
        w => {
            let w = u32::from(w);
            let mix = |o: u8, f: u8| ((u32::from(o) * (255 - w) + u32::from(f) * w + 127) / 255) as u8;
            Bgra8 {
                b: mix(original.b, filtered.b),
                g: mix(original.g, filtered.g),
                r: mix(original.r, filtered.r),
                a: mix(original.a, filtered.a),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Vec<Bgra8> {
        vec![Bgra8::from_rgba(1, 2, 3, 4), Bgra8::from_rgba(5, 6, 7, 8)]
    }

    #[test]
    fn test_gather_rgb() {
        let mut out = [0u8; 6];
        gather(&row(), 0, 3, &mut out);
        assert_eq!(out, [1, 2, 3, 5, 6, 7]);
    }

    #[test]
    fn test_gather_partial_planes() {
        let mut out = [0u8; 4];
        gather(&row(), 2, 2, &mut out);
        assert_eq!(out, [3, 4, 7, 8]);

        let mut alpha = [0u8; 2];
        gather(&row(), 3, 1, &mut alpha);
        assert_eq!(alpha, [4, 8]);
    }

    #[test]
    fn test_scatter_leaves_other_channels() {
        let mut pixels = row();
        scatter(&[9, 10], 1, 1, &mut pixels);
        assert_eq!(pixels[0], Bgra8::from_rgba(1, 9, 3, 4));
        assert_eq!(pixels[1], Bgra8::from_rgba(5, 10, 7, 8));
    }

    #[test]
    fn test_scatter_rgba() {
        let mut pixels = row();
        scatter(&[10, 20, 30, 40, 50, 60, 70, 80], 0, 4, &mut pixels);
        assert_eq!(pixels[1], Bgra8::from_rgba(50, 60, 70, 80));
    }

    #[test]
    fn test_blend_weights() {
        let a = Bgra8::from_rgba(0, 0, 0, 0);
        let b = Bgra8::from_rgba(255, 255, 255, 255);
        assert_eq!(blend(a, b, 0), a);
        assert_eq!(blend(a, b, 255), b);
        assert_eq!(blend(a, b, 128).r, 128);
    }
}
