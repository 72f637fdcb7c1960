//! Legacy metadata resource (`PiMI`) parsing.
//!
//! The legacy format carries a category string and a fixed info block. The
//! title comes from the companion `_8BFM` resource with the same id, and the
//! entry point name is synthesized from the id.

use winnow::Parser;
use winnow::binary::{le_i16, le_u32};
use winnow::error::ContextError;
use winnow::token::take;

use super::{legacy_text, pascal_string};
use super::pe::ResourceDirectory;
use super::pipl::{FilterMetadata, MAX_INTERFACE_VERSION, MODE_RGB};
use crate::fourcc::{FourCC, HOST_ANY};

type WResult<T> = std::result::Result<T, ContextError>;

/// Companion resource type holding the title.
pub const TITLE_RESOURCE: &str = "_8BFM";

/// Fixed info block following the category string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyInfo {
    /// Interface version.
    pub version: i16,
    /// Interface sub-version.
    pub sub_version: i16,
    /// Menu priority.
    pub priority: i16,
    /// Size of the general info block.
    pub general_info_size: i16,
    /// Size of the type-specific info block.
    pub type_info_size: i16,
    /// Supported image modes.
    pub supported_modes: i16,
    /// Required host signature.
    pub required_host: FourCC,
}

fn category(input: &mut &[u8]) -> WResult<String> {
    let len = winnow::binary::u8.parse_next(input)?;
    let bytes: &[u8] = take(len as usize).parse_next(input)?;
    Ok(legacy_text(bytes))
}

fn info(input: &mut &[u8]) -> WResult<LegacyInfo> {
    let (version, sub_version, priority, general_info_size, type_info_size, supported_modes, host) =
        (le_i16, le_i16, le_i16, le_i16, le_i16, le_i16, le_u32).parse_next(input)?;
    Ok(LegacyInfo {
        version,
        sub_version,
        priority,
        general_info_size,
        type_info_size,
        supported_modes,
        required_host: FourCC(host),
    })
}

/// Entry point name synthesized for legacy resource `id`.
pub fn entry_point_name(id: u16) -> String {
    format!("ENTRYPOINT{id}")
}

/// Parse one `PiMI` resource with resource id `id`.
pub fn parse_pimi(
    data: &[u8],
    id: u16,
    host_signature: FourCC,
    resources: &ResourceDirectory<'_>,
) -> Option<FilterMetadata> {
    let mut input = data;
    let (category, info) = (category, info).parse_next(&mut input).ok()?;

    if info.version as u16 > MAX_INTERFACE_VERSION {
        tracing::debug!(version = info.version, "legacy interface version too new");
        return None;
    }
    if (info.supported_modes as u16 & 0xFF) as u8 & MODE_RGB == 0 {
        tracing::debug!(modes = info.supported_modes, "legacy filter does not support RGB");
        return None;
    }
    if info.required_host != host_signature && info.required_host != HOST_ANY {
        tracing::debug!(required = %info.required_host, "legacy filter requires another host");
        return None;
    }

    let title = resources.find(TITLE_RESOURCE, id).map(pascal_string);
    if title.is_none() {
        tracing::debug!(id, "legacy filter has no title resource");
    }

    Some(FilterMetadata {
        entry_point: Some(entry_point_name(id)),
        category: Some(category),
        title,
        ..FilterMetadata::default()
    })
}

/// Serialize a legacy resource body.
pub fn encode_pimi(category: &str, info: &LegacyInfo) -> Vec<u8> {
    let mut out = vec![category.len().min(255) as u8];
    out.extend_from_slice(&category.as_bytes()[..category.len().min(255)]);
    for field in [
        info.version,
        info.sub_version,
        info.priority,
        info.general_info_size,
        info.type_info_size,
        info.supported_modes,
    ] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    out.extend_from_slice(&info.required_host.value().to_le_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> LegacyInfo {
        LegacyInfo {
            version: 4,
            sub_version: 0,
            priority: 0,
            general_info_size: 16,
            type_info_size: 0,
            supported_modes: 0x10,
            required_host: HOST_ANY,
        }
    }

    #[test]
    fn test_parse_without_title() {
        let data = encode_pimi("Old Stuff", &info());
        let resources = ResourceDirectory::empty();
        let meta = parse_pimi(&data, 16000, crate::fourcc::VENDOR_ADOBE, &resources).unwrap();
        assert_eq!(meta.category.as_deref(), Some("Old Stuff"));
        assert_eq!(meta.entry_point.as_deref(), Some("ENTRYPOINT16000"));
        assert!(meta.title.is_none());
        assert!(!meta.is_complete());
    }

    #[test]
    fn test_reject_foreign_host() {
        let mut i = info();
        i.required_host = FourCC::new(b"XXXX");
        let resources = ResourceDirectory::empty();
        assert!(parse_pimi(&encode_pimi("C", &i), 1, crate::fourcc::VENDOR_ADOBE, &resources).is_none());
    }

    #[test]
    fn test_reject_without_rgb() {
        let mut i = info();
        i.supported_modes = 0x0F;
        let resources = ResourceDirectory::empty();
        assert!(parse_pimi(&encode_pimi("C", &i), 1, crate::fourcc::VENDOR_ADOBE, &resources).is_none());
    }
}
