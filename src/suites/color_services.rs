//! Color-services suite.
//!
//! One entry point multiplexes four requests by selector: choose a color
//! through the host picker, convert between spaces, sample the source image
//! and fetch the foreground or background color.

use super::{SuiteResult, SuiteStatus};
use crate::color::{self, ColorSpace, Components};
use crate::engine::ColorPicker;
use crate::geometry::Point;
use crate::surface::Surface;

/// Result space code meaning "whatever space the color is already in".
pub const CHOSEN_SPACE: i16 = -1;

/// Request selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum Selector {
    /// Show the color picker.
    ChooseColor = 0,
    /// Convert between spaces.
    ConvertColor = 1,
    /// Sample the source image.
    SamplePoint = 2,
    /// Foreground or background color.
    GetSpecialColor = 3,
}

impl Selector {
    /// Decode a raw selector.
    pub fn from_raw(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::ChooseColor),
            1 => Some(Self::ConvertColor),
            2 => Some(Self::SamplePoint),
            3 => Some(Self::GetSpecialColor),
            _ => None,
        }
    }
}

/// Special colors.
pub mod special {
    /// Background color.
    pub const BACKGROUND: i16 = 0;
    /// Foreground color.
    pub const FOREGROUND: i16 = 1;
}

/// A color in a particular space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpacedColor {
    /// Space of `components`.
    pub space: ColorSpace,
    /// Components.
    pub components: Components,
}

/// State behind the color-services suite.
pub struct ColorServices {
    foreground: [u8; 3],
    background: [u8; 3],
    picker: Option<Box<dyn ColorPicker>>,
}

impl std::fmt::Debug for ColorServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColorServices")
            .field("foreground", &self.foreground)
            .field("background", &self.background)
            .field("picker", &self.picker.is_some())
            .finish()
    }
}

fn space(code: i16) -> SuiteResult<ColorSpace> {
    ColorSpace::from_raw(code).ok_or(SuiteStatus::BadParameter)
}

fn result_space(code: i16, source: ColorSpace) -> SuiteResult<ColorSpace> {
    if code == CHOSEN_SPACE {
        Ok(source)
    } else {
        space(code)
    }
}

fn from_rgb8(rgb: [u8; 3], to: ColorSpace) -> SpacedColor {
    SpacedColor {
        space: to,
        components: color::convert(ColorSpace::Rgb, to, color::rgb_components(rgb[0], rgb[1], rgb[2])),
    }
}

impl ColorServices {
    /// Create the suite state with the run's colors.
    pub fn new(foreground: [u8; 3], background: [u8; 3]) -> Self {
        Self {
            foreground,
            background,
            picker: None,
        }
    }

    /// Install the picker used by [`ColorServices::choose`].
    pub fn with_picker(mut self, picker: Option<Box<dyn ColorPicker>>) -> Self {
        self.picker = picker;
        self
    }

    /// Convert `components` from `source` to `result`.
    pub fn convert(&self, source: i16, result: i16, components: Components) -> SuiteResult<SpacedColor> {
        let from = space(source)?;
        let to = result_space(result, from)?;
        tracing::trace!(?from, ?to, ?components, "convert color");
        Ok(SpacedColor {
            space: to,
            components: color::convert(from, to, components),
        })
    }

    /// Ask the picker for a color starting from `components`.
    pub fn choose(
        &mut self,
        prompt: &str,
        source: i16,
        result: i16,
        components: Components,
    ) -> SuiteResult<SpacedColor> {
        let from = space(source)?;
        let to = result_space(result, from)?;
        let picker = self.picker.as_mut().ok_or(SuiteStatus::Unimplemented)?;
        let initial = color::to_rgb8(from, components);
        tracing::trace!(prompt, ?initial, "choose color");
        let picked = picker.pick(prompt, initial).ok_or(SuiteStatus::Cancelled)?;
        Ok(from_rgb8(picked, to))
    }

    /// Color of the source pixel at `point`.
    pub fn sample(&self, surface: &Surface, point: Point, result: i16) -> SuiteResult<SpacedColor> {
        let to = result_space(result, ColorSpace::Rgb)?;
        let inside = point.x >= 0
            && point.y >= 0
            && (point.x as u32) < surface.width()
            && (point.y as u32) < surface.height();
        if !inside {
            return Err(SuiteStatus::BadParameter);
        }
        let p = surface.pixel(point.x as u32, point.y as u32);
        Ok(from_rgb8([p.r, p.g, p.b], to))
    }

    /// Foreground or background color.
    pub fn special(&self, which: i16, result: i16) -> SuiteResult<SpacedColor> {
        let to = result_space(result, ColorSpace::Rgb)?;
        let rgb = match which {
            special::BACKGROUND => self.background,
            special::FOREGROUND => self.foreground,
            _ => return Err(SuiteStatus::BadParameter),
        };
        Ok(from_rgb8(rgb, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Bgra8;

    #[test]
    fn test_special_colors() {
        let services = ColorServices::new([255, 0, 0], [0, 0, 0]);
        let fg = services.special(special::FOREGROUND, ColorSpace::Hsb as i16).unwrap();
        assert_eq!(fg.components, [0, 255, 255, 0]);
        let bg = services.special(special::BACKGROUND, CHOSEN_SPACE).unwrap();
        assert_eq!(bg.space, ColorSpace::Rgb);
        assert_eq!(services.special(7, 0), Err(SuiteStatus::BadParameter));
    }

    #[test]
    fn test_sample_point() {
        let surface = Surface::filled(2, 2, Bgra8::from_rgba(10, 20, 30, 255)).unwrap();
        let services = ColorServices::new([0; 3], [0; 3]);
        let c = services.sample(&surface, Point { x: 1, y: 1 }, 0).unwrap();
        assert_eq!(c.components, [10, 20, 30, 0]);
        assert!(services.sample(&surface, Point { x: 2, y: 0 }, 0).is_err());
    }

    #[test]
    fn test_choose_without_picker() {
        let mut services = ColorServices::new([0; 3], [0; 3]);
        assert_eq!(
            services.choose("Pick", 0, 0, [0; 4]),
            Err(SuiteStatus::Unimplemented)
        );
        let mut services = services.with_picker(Some(Box::new(|_: &str, _: [u8; 3]| Some([1, 2, 3]))));
        assert_eq!(services.choose("Pick", 0, 0, [0; 4]).unwrap().components, [1, 2, 3, 0]);
        let mut cancelling =
            ColorServices::new([0; 3], [0; 3]).with_picker(Some(Box::new(|_: &str, _: [u8; 3]| None)));
        assert_eq!(cancelling.choose("Pick", 0, 0, [0; 4]), Err(SuiteStatus::Cancelled));
    }
}
