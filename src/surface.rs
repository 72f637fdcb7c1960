//! Host image collaborators: pixel surfaces and selection masks.
//!
//! A [`Surface`] stores pixels in blue-green-red-alpha byte order, one
//! [`Bgra8`] per pixel, rows packed without padding. It is the
//! row-addressable image provider the execution engine reads source pixels
//! from and writes destination pixels to.

use crate::error::{Error, Result};

/// A pixel in stored (blue, green, red, alpha) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(C)]
pub struct Bgra8 {
    /// Blue.
    pub b: u8,
    /// Green.
    pub g: u8,
    /// Red.
    pub r: u8,
    /// Alpha (255 = opaque).
    pub a: u8,
}

impl Bgra8 {
    /// Build a pixel from red, green, blue and alpha.
    #[inline]
    pub const fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { b, g, r, a }
    }

    /// Byte at stored channel index (0 = blue .. 3 = alpha).
    #[inline]
    pub fn channel(&self, index: usize) -> u8 {
        match index {
            0 => self.b,
            1 => self.g,
            2 => self.r,
            _ => self.a,
        }
    }

    /// Mutable byte at stored channel index.
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut u8 {
        match index {
            0 => &mut self.b,
            1 => &mut self.g,
            2 => &mut self.r,
            _ => &mut self.a,
        }
    }
}

/// A BGRA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<Bgra8>,
}

impl Surface {
    /// Create a surface filled with transparent black.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::filled(width, height, Bgra8::default())
    }

    /// Create a surface filled with one color.
    pub fn filled(width: u32, height: u32, color: Bgra8) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::Config("surface dimensions must be non-zero".into()));
        }
        if width > i16::MAX as u32 || height > i16::MAX as u32 {
            return Err(Error::Config(format!(
                "surface {width}x{height} exceeds the 32767 pixel limit of the plugin interface"
            )));
        }
        Ok(Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        })
    }

    /// Create a surface from existing pixels.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Bgra8>) -> Result<Self> {
        if pixels.len() != width as usize * height as usize {
            return Err(Error::Config(format!(
                "expected {} pixels, got {}",
                width as usize * height as usize,
                pixels.len()
            )));
        }
        let mut surface = Self::new(width, height)?;
        surface.pixels = pixels;
        Ok(surface)
    }

    /// Create a surface from packed BGRA bytes.
    pub fn from_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(Error::Config(format!("{} bytes is not whole pixels", bytes.len())));
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|p| Bgra8 {
                b: p[0],
                g: p[1],
                r: p[2],
                a: p[3],
            })
            .collect();
        Self::from_pixels(width, height, pixels)
    }

    /// Packed BGRA bytes, row-major.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| [p.b, p.g, p.r, p.a]).collect()
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// One row of pixels.
    #[inline]
    pub fn row(&self, y: u32) -> &[Bgra8] {
        let start = y as usize * self.width as usize;
        &self.pixels[start..start + self.width as usize]
    }

    /// One mutable row of pixels.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [Bgra8] {
        let start = y as usize * self.width as usize;
        let width = self.width as usize;
        &mut self.pixels[start..start + width]
    }

    /// Pixel at (x, y).
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Bgra8 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Mutable pixel at (x, y).
    #[inline]
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut Bgra8 {
        &mut self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// All pixels, row-major.
    pub fn pixels(&self) -> &[Bgra8] {
        &self.pixels
    }

    /// All pixels, row-major, mutable.
    pub fn pixels_mut(&mut self) -> &mut [Bgra8] {
        &mut self.pixels
    }

    /// Whether any pixel is not fully opaque.
    pub fn has_transparency(&self) -> bool {
        self.pixels.iter().any(|p| p.a != 255)
    }
}

/// An 8-bit selection mask (0 = unselected, 255 = fully selected).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl SelectionMask {
    /// Create a mask with every pixel set to `value`.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    /// Create a mask from raw bytes.
    pub fn from_bytes(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if data.len() != width as usize * height as usize {
            return Err(Error::Config(format!(
                "expected {} mask bytes, got {}",
                width as usize * height as usize,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Synthesize a mask from a surface's alpha channel: every pixel with
    /// alpha above zero becomes 255, every other pixel 0.
    pub fn from_alpha(surface: &Surface) -> Self {
        let data = surface
            .pixels()
            .iter()
            .map(|p| if p.a > 0 { 255 } else { 0 })
            .collect();
        Self {
            width: surface.width(),
            height: surface.height(),
            data,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// One row of mask values.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.width as usize;
        &self.data[start..start + self.width as usize]
    }

    /// Mask value at (x, y).
    #[inline]
    pub fn value(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Raw mask bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Bounding rectangle of all non-zero mask values, if any.
    pub fn bounds(&self) -> Option<crate::geometry::Rect> {
        let mut bounds: Option<crate::geometry::Rect> = None;
        for y in 0..self.height {
            let row = self.row(y);
            let Some(first) = row.iter().position(|&v| v != 0) else {
                continue;
            };
            let last = row.iter().rposition(|&v| v != 0).unwrap_or(first);
            let (x0, x1, y) = (first as i32, last as i32 + 1, y as i32);
            bounds = Some(match bounds {
                None => crate::geometry::Rect::new(y, x0, y + 1, x1),
                Some(b) => crate::geometry::Rect::new(b.top, b.left.min(x0), y + 1, b.right.max(x1)),
            });
        }
        bounds
    }
}

/// The images a filter run operates on.
#[derive(Debug, Clone)]
pub struct FilterImages {
    /// Pixels the filter reads.
    pub source: Surface,
    /// Pixels the filter writes. Starts as a copy of `source`.
    pub destination: Surface,
    /// Active selection, if any.
    pub selection: Option<SelectionMask>,
}

impl FilterImages {
    /// Images for filtering `source` without a selection.
    pub fn new(source: Surface) -> Self {
        Self {
            destination: source.clone(),
            source,
            selection: None,
        }
    }

    /// Attach a selection mask.
    pub fn with_selection(mut self, selection: SelectionMask) -> Result<Self> {
        if selection.width() != self.source.width() || selection.height() != self.source.height() {
            return Err(Error::Config(
                "selection mask dimensions must match the source surface".into(),
            ));
        }
        self.selection = Some(selection);
        Ok(self)
    }
}
