//! Four-character codes.
//!
//! The plugin interface identifies almost everything (resource tags, suite
//! signatures, descriptor keys, value types, units) by multi-character
//! constants. On disk and across the ABI they travel as a `u32` whose most
//! significant byte is the first character.

use std::fmt;

/// A four-character code such as `'8BIM'`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct FourCC(pub u32);

impl FourCC {
    /// Build a code from its four characters, first character most significant.
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(u32::from_be_bytes(*code))
    }

    /// The all-zero code, used as a list terminator.
    pub const NONE: FourCC = FourCC(0);

    /// The raw numeric value.
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// The four characters, first character first.
    #[inline]
    pub const fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Whether this is the zero terminator.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for FourCC {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<FourCC> for u32 {
    fn from(value: FourCC) -> Self {
        value.0
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({self})")
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        if bytes.iter().all(|b| (0x20..0x7f).contains(b)) {
            for b in bytes {
                write!(f, "{}", b as char)?;
            }
            Ok(())
        } else {
            write!(f, "{:#010x}", self.0)
        }
    }
}

// ============================================================================
// Well-known codes
// ============================================================================

/// Vendor code used by the original host for its own properties.
pub const VENDOR_ADOBE: FourCC = FourCC::new(b"8BIM");
/// Plugin kind for filters.
pub const KIND_FILTER: FourCC = FourCC::new(b"8BFM");
/// Required-host wildcard (any host).
pub const HOST_ANY: FourCC = FourCC::new(b"    ");

/// Descriptor value type codes.
pub mod types {
    use super::FourCC;

    /// No value; also the sentinel written over matched expected keys.
    pub const NULL: FourCC = FourCC::new(b"null");
    /// 32-bit integer.
    pub const INTEGER: FourCC = FourCC::new(b"long");
    /// 64-bit float.
    pub const FLOAT: FourCC = FourCC::new(b"doub");
    /// Float with a unit.
    pub const UNIT_FLOAT: FourCC = FourCC::new(b"UntF");
    /// Boolean.
    pub const BOOLEAN: FourCC = FourCC::new(b"bool");
    /// Text.
    pub const TEXT: FourCC = FourCC::new(b"TEXT");
    /// Class identifier.
    pub const CLASS: FourCC = FourCC::new(b"type");
    /// Global class identifier.
    pub const GLOBAL_CLASS: FourCC = FourCC::new(b"GlbC");
    /// Enumerated value.
    pub const ENUMERATED: FourCC = FourCC::new(b"enum");
    /// File alias.
    pub const ALIAS: FourCC = FourCC::new(b"alis");
    /// Nested object.
    pub const OBJECT: FourCC = FourCC::new(b"Objc");
    /// Nested global object.
    pub const GLOBAL_OBJECT: FourCC = FourCC::new(b"GlbO");
    /// Object reference.
    pub const OBJECT_REFERENCE: FourCC = FourCC::new(b"obj ");
    /// Raw data.
    pub const RAW_DATA: FourCC = FourCC::new(b"tdta");
    /// Value list.
    pub const VALUE_LIST: FourCC = FourCC::new(b"VlLs");
}

/// Unit codes for unit floats.
pub mod units {
    use super::FourCC;

    /// Unitless.
    pub const NONE: FourCC = FourCC::new(b"#Nne");
    /// Angle in degrees.
    pub const ANGLE: FourCC = FourCC::new(b"#Ang");
    /// Density (resolution).
    pub const DENSITY: FourCC = FourCC::new(b"#Rsl");
    /// Distance (points).
    pub const DISTANCE: FourCC = FourCC::new(b"#Rlt");
    /// Percent.
    pub const PERCENT: FourCC = FourCC::new(b"#Prc");
    /// Pixels.
    pub const PIXELS: FourCC = FourCC::new(b"#Pxl");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_value_ordering() {
        assert_eq!(FourCC::new(b"kind").value(), 0x6B69_6E64);
        assert_eq!(FourCC::new(b"8BIM").to_bytes(), *b"8BIM");
    }

    #[test]
    fn test_fourcc_display() {
        assert_eq!(FourCC::new(b"8BFM").to_string(), "8BFM");
        assert_eq!(FourCC(1).to_string(), "0x00000001");
    }
}
