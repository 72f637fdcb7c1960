//! Property suite: read-only facts about the host and the document.

use super::{SuiteResult, SuiteStatus};
use crate::fourcc::{FourCC, VENDOR_ADOBE};

/// Property keys.
pub mod keys {
    use crate::fourcc::FourCC;

    /// Big nudge distance, horizontal (16.16 fixed).
    pub const BIG_NUDGE_H: FourCC = FourCC::new(b"bndH");
    /// Big nudge distance, vertical (16.16 fixed).
    pub const BIG_NUDGE_V: FourCC = FourCC::new(b"bndV");
    /// Document caption.
    pub const CAPTION: FourCC = FourCC::new(b"capt");
    /// Name of channel `index`.
    pub const CHANNEL_NAME: FourCC = FourCC::new(b"nmch");
    /// Copyright flag.
    pub const COPYRIGHT: FourCC = FourCC::new(b"cpyr");
    /// Document height in pixels.
    pub const DOCUMENT_HEIGHT: FourCC = FourCC::new(b"docH");
    /// Document width in pixels.
    pub const DOCUMENT_WIDTH: FourCC = FourCC::new(b"docW");
    /// Major grid spacing (16.16 fixed).
    pub const GRID_MAJOR: FourCC = FourCC::new(b"grmj");
    /// Minor grid subdivisions.
    pub const GRID_MINOR: FourCC = FourCC::new(b"grmn");
    /// Image mode.
    pub const IMAGE_MODE: FourCC = FourCC::new(b"mode");
    /// Interpolation method preference.
    pub const INTERPOLATION: FourCC = FourCC::new(b"intp");
    /// Number of channels.
    pub const NUMBER_OF_CHANNELS: FourCC = FourCC::new(b"nuch");
    /// Number of paths.
    pub const NUMBER_OF_PATHS: FourCC = FourCC::new(b"nupa");
    /// Clipping path index.
    pub const CLIPPING_PATH_INDEX: FourCC = FourCC::new(b"clpa");
    /// Target path index.
    pub const TARGET_PATH_INDEX: FourCC = FourCC::new(b"tgpa");
    /// Work path index.
    pub const WORK_PATH_INDEX: FourCC = FourCC::new(b"wkpa");
    /// Ruler units.
    pub const RULER_UNITS: FourCC = FourCC::new(b"rulr");
    /// Horizontal ruler origin (16.16 fixed).
    pub const RULER_ORIGIN_H: FourCC = FourCC::new(b"rorH");
    /// Vertical ruler origin (16.16 fixed).
    pub const RULER_ORIGIN_V: FourCC = FourCC::new(b"rorV");
    /// Host serial string.
    pub const SERIAL_STRING: FourCC = FourCC::new(b"sstr");
    /// Document title.
    pub const TITLE: FourCC = FourCC::new(b"titl");
    /// Tool tips enabled.
    pub const TOOL_TIPS: FourCC = FourCC::new(b"tltp");
    /// Document URL.
    pub const URL: FourCC = FourCC::new(b"URL ");
    /// Host version, `(major << 16) | minor`.
    pub const VERSION: FourCC = FourCC::new(b"vers");
    /// Watch suspension level.
    pub const WATCH_SUSPENSION: FourCC = FourCC::new(b"wtch");
    /// Watermark flag.
    pub const WATERMARK: FourCC = FourCC::new(b"watr");
}

/// Image mode value for RGB documents.
pub const IMAGE_MODE_RGB: isize = 3;

/// Facts the property suite reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyContext {
    /// Document width in pixels.
    pub document_width: i32,
    /// Document height in pixels.
    pub document_height: i32,
    /// Channels delivered to the filter.
    pub channels: i32,
    /// Document title.
    pub title: String,
    /// Host serial string.
    pub serial_string: String,
    /// Host version (major, minor, fix).
    pub host_version: (u16, u16, u16),
}

impl Default for PropertyContext {
    fn default() -> Self {
        Self {
            document_width: 0,
            document_height: 0,
            channels: 3,
            title: String::new(),
            serial_string: "0".to_string(),
            host_version: (1, 0, 0),
        }
    }
}

/// A property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Pointer-sized integer.
    Simple(isize),
    /// Byte string; handed to the plugin in a new handle.
    Complex(Vec<u8>),
}

/// Answers property queries.
#[derive(Debug, Clone, Default)]
pub struct PropertySuite {
    context: PropertyContext,
}

const CHANNEL_NAMES: [&str; 4] = ["Red", "Green", "Blue", "Alpha"];

fn fixed(value: i32) -> isize {
    (value as isize) << 16
}

impl PropertySuite {
    /// Create a suite over `context`.
    pub fn new(context: PropertyContext) -> Self {
        Self { context }
    }

    /// The facts being reported.
    pub fn context(&self) -> &PropertyContext {
        &self.context
    }

    /// Look up a property.
    pub fn get(&self, signature: FourCC, key: FourCC, index: i32) -> SuiteResult<PropertyValue> {
        tracing::trace!(signature = %signature, key = %key, index, "get property");
        if signature != VENDOR_ADOBE {
            return Err(SuiteStatus::PropertyUndefined);
        }
        let ctx = &self.context;
        let value = match key {
            keys::BIG_NUDGE_H | keys::BIG_NUDGE_V => PropertyValue::Simple(fixed(10)),
            keys::CAPTION | keys::URL => PropertyValue::Complex(Vec::new()),
            keys::CHANNEL_NAME => {
                let name = usize::try_from(index)
                    .ok()
                    .filter(|i| (*i as i32) < ctx.channels)
                    .and_then(|i| CHANNEL_NAMES.get(i))
                    .ok_or(SuiteStatus::PropertyUndefined)?;
                PropertyValue::Complex(name.as_bytes().to_vec())
            }
            keys::COPYRIGHT | keys::WATERMARK | keys::WATCH_SUSPENSION => {
                PropertyValue::Simple(0)
            }
            keys::DOCUMENT_WIDTH => PropertyValue::Simple(ctx.document_width as isize),
            keys::DOCUMENT_HEIGHT => PropertyValue::Simple(ctx.document_height as isize),
            keys::GRID_MAJOR => PropertyValue::Simple(fixed(1)),
            keys::GRID_MINOR => PropertyValue::Simple(4),
            keys::IMAGE_MODE => PropertyValue::Simple(IMAGE_MODE_RGB),
            keys::INTERPOLATION => PropertyValue::Simple(1),
            keys::NUMBER_OF_CHANNELS => PropertyValue::Simple(ctx.channels as isize),
            keys::NUMBER_OF_PATHS => PropertyValue::Simple(0),
            keys::CLIPPING_PATH_INDEX | keys::TARGET_PATH_INDEX | keys::WORK_PATH_INDEX => {
                PropertyValue::Simple(-1)
            }
            keys::RULER_UNITS | keys::RULER_ORIGIN_H | keys::RULER_ORIGIN_V => {
                PropertyValue::Simple(0)
            }
            keys::SERIAL_STRING => PropertyValue::Complex(ctx.serial_string.as_bytes().to_vec()),
            keys::TITLE => PropertyValue::Complex(ctx.title.as_bytes().to_vec()),
            keys::TOOL_TIPS => PropertyValue::Simple(1),
            keys::VERSION => {
                let (major, minor, _) = ctx.host_version;
                PropertyValue::Simple(((major as isize) << 16) | minor as isize)
            }
            _ => return Err(SuiteStatus::PropertyUndefined),
        };
        Ok(value)
    }

    /// Setting properties is accepted and ignored.
    pub fn set(&mut self, signature: FourCC, key: FourCC, index: i32) -> SuiteResult<()> {
        tracing::trace!(signature = %signature, key = %key, index, "ignored property set");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suite() -> PropertySuite {
        PropertySuite::new(PropertyContext {
            document_width: 640,
            document_height: 480,
            channels: 4,
            title: "photo.png".into(),
            serial_string: "1234".into(),
            host_version: (2, 5, 0),
        })
    }

    #[test]
    fn test_simple_properties() {
        let s = suite();
        assert_eq!(
            s.get(VENDOR_ADOBE, keys::NUMBER_OF_CHANNELS, 0),
            Ok(PropertyValue::Simple(4))
        );
        assert_eq!(
            s.get(VENDOR_ADOBE, keys::VERSION, 0),
            Ok(PropertyValue::Simple((2 << 16) | 5))
        );
        assert_eq!(
            s.get(VENDOR_ADOBE, keys::BIG_NUDGE_H, 0),
            Ok(PropertyValue::Simple(10 << 16))
        );
    }

    #[test]
    fn test_complex_properties() {
        let s = suite();
        assert_eq!(
            s.get(VENDOR_ADOBE, keys::TITLE, 0),
            Ok(PropertyValue::Complex(b"photo.png".to_vec()))
        );
        assert_eq!(
            s.get(VENDOR_ADOBE, keys::CHANNEL_NAME, 3),
            Ok(PropertyValue::Complex(b"Alpha".to_vec()))
        );
        assert_eq!(
            s.get(VENDOR_ADOBE, keys::CHANNEL_NAME, 4),
            Err(SuiteStatus::PropertyUndefined)
        );
    }

    #[test]
    fn test_unknown_property() {
        let s = suite();
        assert_eq!(
            s.get(VENDOR_ADOBE, FourCC::new(b"zzzz"), 0),
            Err(SuiteStatus::PropertyUndefined)
        );
        assert_eq!(
            s.get(FourCC::new(b"ABCD"), keys::TITLE, 0),
            Err(SuiteStatus::PropertyUndefined)
        );
    }
}
