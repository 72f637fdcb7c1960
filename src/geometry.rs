//! Rectangles and points.
//!
//! The native interface uses 16-bit `top, left, bottom, right` rectangles and
//! `v, h` points. Internally everything is `i32` so out-of-bounds arithmetic
//! during padding cannot overflow.

use crate::abi::{Point16, Rect16};

/// Half-open rectangle: `left..right` by `top..bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// First row.
    pub top: i32,
    /// First column.
    pub left: i32,
    /// One past the last row.
    pub bottom: i32,
    /// One past the last column.
    pub right: i32,
}

impl Rect {
    /// Create a rectangle from its edges.
    pub const fn new(top: i32, left: i32, bottom: i32, right: i32) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// Rectangle at the origin with the given size.
    pub const fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, height, width)
    }

    /// Width in pixels (zero if inverted).
    #[inline]
    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    /// Height in pixels (zero if inverted).
    #[inline]
    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    /// Whether the rectangle covers no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Intersection with another rectangle (possibly empty).
    pub fn intersect(&self, other: &Rect) -> Rect {
        Rect {
            top: self.top.max(other.top),
            left: self.left.max(other.left),
            bottom: self.bottom.min(other.bottom),
            right: self.right.min(other.right),
        }
    }

    /// Whether `other` lies entirely within this rectangle.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right <= self.right
            && other.bottom <= self.bottom
    }

    /// Whether the point lies within this rectangle.
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

impl From<Rect16> for Rect {
    fn from(r: Rect16) -> Self {
        Rect::new(
            i32::from(r.top),
            i32::from(r.left),
            i32::from(r.bottom),
            i32::from(r.right),
        )
    }
}

impl From<Rect> for Rect16 {
    fn from(r: Rect) -> Self {
        let clamp = |v: i32| v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
        Rect16 {
            top: clamp(r.top),
            left: clamp(r.left),
            bottom: clamp(r.bottom),
            right: clamp(r.right),
        }
    }
}

/// A point (`x` = column, `y` = row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl From<Point16> for Point {
    fn from(p: Point16) -> Self {
        Point {
            x: i32::from(p.h),
            y: i32::from(p.v),
        }
    }
}

impl From<Point> for Point16 {
    fn from(p: Point) -> Self {
        Point16 {
            v: p.y.clamp(0, i32::from(i16::MAX)) as i16,
            h: p.x.clamp(0, i32::from(i16::MAX)) as i16,
        }
    }
}
