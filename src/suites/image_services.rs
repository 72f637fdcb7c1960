//! Image-services suite: resampling one image plane into another.
//!
//! Coordinates are 16.16 fixed point in source space. The 1-D variant
//! takes one horizontal coordinate per destination column and samples the
//! same row; the 2-D variant takes a `(v, h)` pair per destination pixel,
//! row-major over the area. Coordinates outside the source are clamped to
//! its edge.

use super::{SuiteResult, SuiteStatus};
use crate::geometry::Rect;

/// Resampling method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Nearest neighbour.
    Nearest,
    /// Bilinear.
    Bilinear,
}

impl Interpolation {
    /// Decode a method code. Codes above bilinear fall back to bilinear.
    pub fn from_code(code: i16) -> Self {
        if code >= 2 {
            Self::Bilinear
        } else {
            Self::Nearest
        }
    }
}

/// A read-only plane: `bounds` addressed with `row_bytes`/`col_bytes`
/// strides from the first byte of `data`.
#[derive(Debug, Clone, Copy)]
pub struct PlaneRef<'a> {
    /// Bytes of the plane.
    pub data: &'a [u8],
    /// Area the plane covers.
    pub bounds: Rect,
    /// Distance between rows.
    pub row_bytes: usize,
    /// Distance between columns.
    pub col_bytes: usize,
}

/// A writable plane.
#[derive(Debug)]
pub struct PlaneMut<'a> {
    /// Bytes of the plane.
    pub data: &'a mut [u8],
    /// Area the plane covers.
    pub bounds: Rect,
    /// Distance between rows.
    pub row_bytes: usize,
    /// Distance between columns.
    pub col_bytes: usize,
}

/// Bytes needed to address `bounds` with the given strides and `planes`
/// interleaved channels.
pub fn plane_len(bounds: Rect, row_bytes: usize, col_bytes: usize, planes: usize) -> usize {
    if bounds.is_empty() {
        return 0;
    }
    (bounds.height() as usize - 1) * row_bytes + (bounds.width() as usize - 1) * col_bytes + planes
}

impl PlaneRef<'_> {
    fn at(&self, x: i32, y: i32, channel: usize) -> u8 {
        let x = x.clamp(self.bounds.left, self.bounds.right - 1) - self.bounds.left;
        let y = y.clamp(self.bounds.top, self.bounds.bottom - 1) - self.bounds.top;
        self.data
            .get(y as usize * self.row_bytes + x as usize * self.col_bytes + channel)
            .copied()
            .unwrap_or(0)
    }

    fn sample(&self, v: i32, h: i32, channel: usize, method: Interpolation) -> u8 {
        match method {
            Interpolation::Nearest => {
                let round = |f: i32| (f + 0x8000) >> 16;
                self.at(round(h), round(v), channel)
            }
            Interpolation::Bilinear => {
                let (x0, y0) = (h >> 16, v >> 16);
                let (fx, fy) = (f64::from(h & 0xFFFF) / 65536.0, f64::from(v & 0xFFFF) / 65536.0);
                let p = |x, y| f64::from(self.at(x, y, channel));
                let top = p(x0, y0) * (1.0 - fx) + p(x0 + 1, y0) * fx;
                let bottom = p(x0, y0 + 1) * (1.0 - fx) + p(x0 + 1, y0 + 1) * fx;
                (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
            }
        }
    }
}

fn check(source: &PlaneRef<'_>, dest: &PlaneMut<'_>, area: Rect, planes: usize) -> SuiteResult<()> {
    if source.bounds.is_empty() || !dest.bounds.contains_rect(&area) {
        return Err(SuiteStatus::BadParameter);
    }
    let needed = |bounds, row, col| plane_len(bounds, row, col, planes);
    if source.data.len() < needed(source.bounds, source.row_bytes, source.col_bytes)
        || dest.data.len() < needed(dest.bounds, dest.row_bytes, dest.col_bytes)
    {
        return Err(SuiteStatus::BadParameter);
    }
    Ok(())
}

fn write(dest: &mut PlaneMut<'_>, x: i32, y: i32, channel: usize, value: u8) {
    let offset = (y - dest.bounds.top) as usize * dest.row_bytes
        + (x - dest.bounds.left) as usize * dest.col_bytes
        + channel;
    if let Some(slot) = dest.data.get_mut(offset) {
        *slot = value;
    }
}

/// Resample rows: `coords` holds one horizontal coordinate per column of
/// `area`. Every one of `planes` interleaved channels is processed.
pub fn interpolate_1d(
    source: &PlaneRef<'_>,
    dest: &mut PlaneMut<'_>,
    area: Rect,
    coords: &[i32],
    method: Interpolation,
    planes: usize,
) -> SuiteResult<()> {
    tracing::trace!(?area, ?method, planes, "interpolate 1d");
    check(source, dest, area, planes)?;
    if coords.len() < area.width() as usize {
        return Err(SuiteStatus::BadParameter);
    }
    for y in area.top..area.bottom {
        for (x, &h) in (area.left..area.right).zip(coords) {
            for channel in 0..planes {
                let value = source.sample(y << 16, h, channel, method);
                write(dest, x, y, channel, value);
            }
        }
    }
    Ok(())
}

/// Resample freely: `coords` holds a `(v, h)` pair per pixel of `area`,
/// row-major.
pub fn interpolate_2d(
    source: &PlaneRef<'_>,
    dest: &mut PlaneMut<'_>,
    area: Rect,
    coords: &[i32],
    method: Interpolation,
    planes: usize,
) -> SuiteResult<()> {
    tracing::trace!(?area, ?method, planes, "interpolate 2d");
    check(source, dest, area, planes)?;
    let width = area.width() as usize;
    if coords.len() < width * area.height() as usize * 2 {
        return Err(SuiteStatus::BadParameter);
    }
    for (row, y) in (area.top..area.bottom).enumerate() {
        for (col, x) in (area.left..area.right).enumerate() {
            let i = (row * width + col) * 2;
            let (v, h) = (coords[i], coords[i + 1]);
            for channel in 0..planes {
                let value = source.sample(v, h, channel, method);
                write(dest, x, y, channel, value);
            }
        }
    }
    Ok(())
}
