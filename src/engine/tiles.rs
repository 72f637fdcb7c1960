//! Tile provisioning.
//!
//! A tile is a packed `width * planes * height` byte buffer covering the
//! requested rectangle. Parts of the rectangle outside the image are filled
//! according to the requested padding policy.

use crate::abi::padding;
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::observability;
use crate::surface::{SelectionMask, Surface};

use super::{phase, pixels};

/// What to put in the parts of a tile outside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Padding {
    /// Repeat the nearest edge pixel.
    EdgeReplicate,
    /// Leave the bytes zeroed.
    None,
    /// Refuse the request.
    ErrorOnBounds,
    /// Fill with a constant byte.
    Fixed(u8),
}

impl Padding {
    /// Decode a padding field.
    pub fn from_raw(value: i16) -> Self {
        match value {
            padding::EDGE_REPLICATION => Self::EdgeReplicate,
            padding::ERROR_ON_BOUNDS => Self::ErrorOnBounds,
            v if v >= 0 => Self::Fixed(v.min(255) as u8),
            _ => Self::None,
        }
    }

    fn fill_byte(self) -> u8 {
        match self {
            Self::Fixed(v) => v,
            _ => 0,
        }
    }
}

/// One tile request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRequest {
    /// Covered area in image coordinates.
    pub rect: Rect,
    /// First delivered plane.
    pub lo_plane: usize,
    /// Number of planes.
    pub planes: usize,
    /// Out-of-bounds policy.
    pub padding: Padding,
}

impl TileRequest {
    /// Whether nothing is requested.
    pub fn is_empty(&self) -> bool {
        self.rect.is_empty() || self.planes == 0
    }

    /// Bytes per tile row.
    pub fn row_bytes(&self) -> usize {
        self.rect.width().max(0) as usize * self.planes
    }

    /// Bytes in the whole tile.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.row_bytes().saturating_mul(self.rect.height() as usize)
        }
    }
}

fn fill<T>(
    data: &[T],
    width: i32,
    height: i32,
    request: &TileRequest,
    out: &mut Vec<u8>,
    copy: impl Fn(&[T], &mut [u8]),
) -> Result<()> {
    out.clear();
    if request.is_empty() {
        return Ok(());
    }
    let rect = request.rect;
    let bounds = Rect::from_size(width, height);
    if request.padding == Padding::ErrorOnBounds && !bounds.contains_rect(&rect) {
        return Err(Error::TileOutOfBounds(rect));
    }
    let len = request.len();
    if out.try_reserve_exact(len).is_err() {
        tracing::warn!(bytes = len, ?rect, "tile allocation failed");
        observability::record_suite_allocation_failure("tile");
        return Err(phase::status_error(phase::MEM_FULL, None));
    }
    out.resize(len, request.padding.fill_byte());

    let planes = request.planes;
    let row_bytes = request.row_bytes();
    let replicate = request.padding == Padding::EdgeReplicate;
    let inner_left = rect.left.clamp(0, width);
    let inner_right = rect.right.clamp(0, width);

    for (tile_row, y) in (rect.top..rect.bottom).enumerate() {
        if !replicate && !(0..height).contains(&y) {
            continue;
        }
        let sy = y.clamp(0, height - 1) as usize;
        let source = &data[sy * width as usize..(sy + 1) * width as usize];
        let dest = &mut out[tile_row * row_bytes..(tile_row + 1) * row_bytes];

        if inner_left < inner_right {
            let start = (inner_left - rect.left) as usize * planes;
            let end = (inner_right - rect.left) as usize * planes;
            copy(&source[inner_left as usize..inner_right as usize], &mut dest[start..end]);
        }
        if replicate {
            for x in (rect.left..rect.right).filter(|x| !(inner_left..inner_right).contains(x)) {
                let sx = x.clamp(0, width - 1) as usize;
                let at = (x - rect.left) as usize * planes;
                copy(&source[sx..=sx], &mut dest[at..at + planes]);
            }
        }
    }
    Ok(())
}

/// Fill `out` with the planes `request` names from `surface`.
pub fn read_surface(surface: &Surface, request: &TileRequest, out: &mut Vec<u8>) -> Result<()> {
    let (lo, planes) = (request.lo_plane, request.planes);
    fill(
        surface.pixels(),
        surface.width() as i32,
        surface.height() as i32,
        request,
        out,
        |px, o| pixels::gather(px, lo, planes, o),
    )
}

/// Fill `out` with the mask values under `request`.
pub fn read_mask(mask: &SelectionMask, request: &TileRequest, out: &mut Vec<u8>) -> Result<()> {
    fill(
        mask.as_bytes(),
        mask.width() as i32,
        mask.height() as i32,
        request,
        out,
        |px, o| o.copy_from_slice(px),
    )
}

/// Write a tile back into `surface`. Only the part inside the image is
/// written.
pub fn write_surface(surface: &mut Surface, request: &TileRequest, bytes: &[u8]) {
    if request.is_empty() || bytes.len() < request.len() {
        return;
    }
    let rect = request.rect;
    let bounds = Rect::from_size(surface.width() as i32, surface.height() as i32);
    let inner = rect.intersect(&bounds);
    if inner.is_empty() {
        return;
    }
    let row_bytes = request.row_bytes();
    let planes = request.planes;
    for y in inner.top..inner.bottom {
        let offset = (y - rect.top) as usize * row_bytes + (inner.left - rect.left) as usize * planes;
        let len = inner.width() as usize * planes;
        let row = &mut surface.row_mut(y as u32)[inner.left as usize..inner.right as usize];
        pixels::scatter(&bytes[offset..offset + len], request.lo_plane, planes, row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Bgra8;

    fn gradient() -> Surface {
        let pixels = (0..4)
            .flat_map(|y| (0..4).map(move |x| Bgra8::from_rgba(x * 10 + y, 0, 0, 255)))
            .collect();
        Surface::from_pixels(4, 4, pixels).unwrap()
    }

    fn request(rect: Rect, padding: Padding) -> TileRequest {
        TileRequest {
            rect,
            lo_plane: 0,
            planes: 1,
            padding,
        }
    }

    #[test]
    fn test_padding_from_raw() {
        assert_eq!(Padding::from_raw(-1), Padding::EdgeReplicate);
        assert_eq!(Padding::from_raw(-2), Padding::None);
        assert_eq!(Padding::from_raw(-3), Padding::ErrorOnBounds);
        assert_eq!(Padding::from_raw(7), Padding::Fixed(7));
    }

    #[test]
    fn test_inside_tile() {
        let mut out = Vec::new();
        read_surface(&gradient(), &request(Rect::new(1, 1, 3, 3), Padding::None), &mut out).unwrap();
        assert_eq!(out, vec![11, 21, 12, 22]);
    }

    #[test]
    fn test_edge_replication() {
        let mut out = Vec::new();
        let req = request(Rect::new(-1, -1, 1, 1), Padding::EdgeReplicate);
        read_surface(&gradient(), &req, &mut out).unwrap();
        assert_eq!(out, vec![0, 0, 0, 0]);

        let req = request(Rect::new(3, 3, 5, 5), Padding::EdgeReplicate);
        read_surface(&gradient(), &req, &mut out).unwrap();
        assert_eq!(out, vec![33, 33, 33, 33]);
    }

    #[test]
    fn test_fixed_and_none_padding() {
        let mut out = Vec::new();
        let req = request(Rect::new(3, 3, 4, 5), Padding::Fixed(200));
        read_surface(&gradient(), &req, &mut out).unwrap();
        assert_eq!(out, vec![33, 200]);

        let req = request(Rect::new(3, 3, 4, 5), Padding::None);
        read_surface(&gradient(), &req, &mut out).unwrap();
        assert_eq!(out, vec![33, 0]);
    }

    #[test]
    fn test_error_on_bounds() {
        let mut out = Vec::new();
        let rect = Rect::new(0, 0, 5, 4);
        let err = read_surface(&gradient(), &request(rect, Padding::ErrorOnBounds), &mut out);
        assert!(matches!(err, Err(Error::TileOutOfBounds(r)) if r == rect));
    }

    #[test]
    fn test_oversized_tile_reports_out_of_memory() {
        let mut out = vec![1, 2, 3];
        let req = TileRequest {
            rect: Rect::new(0, 0, 1 << 30, 1 << 30),
            lo_plane: 0,
            planes: 4,
            padding: Padding::None,
        };
        let err = read_surface(&gradient(), &req, &mut out);
        assert!(matches!(err, Err(Error::FilterFailed { status: phase::MEM_FULL, .. })));
        assert!(out.is_empty());
    }

    #[test]
    fn test_write_clips_to_image() {
        let mut surface = gradient();
        let req = TileRequest {
            rect: Rect::new(3, 3, 5, 5),
            lo_plane: 0,
            planes: 3,
            padding: Padding::None,
        };
        write_surface(&mut surface, &req, &[1, 2, 3].repeat(4));
        assert_eq!(surface.pixel(3, 3), Bgra8::from_rgba(1, 2, 3, 255));
        assert_eq!(surface.pixel(2, 3), Bgra8::from_rgba(23, 0, 0, 255));
    }

    #[test]
    fn test_mask_tile() {
        let mask = SelectionMask::from_bytes(2, 1, vec![0, 255]).unwrap();
        let mut out = Vec::new();
        read_mask(&mask, &request(Rect::new(0, 0, 1, 3), Padding::EdgeReplicate), &mut out).unwrap();
        assert_eq!(out, vec![0, 255, 255]);
    }
}
