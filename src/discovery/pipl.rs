//! Modern metadata resource (`PIPL`) parsing.
//!
//! A resource is a small header followed by a count-prefixed list of tagged
//! properties. Each property is `vendor, key, id, length, data` with the
//! data padded to a 4-byte boundary. Any property that disqualifies the
//! filter (wrong kind, newer interface, no RGB support, foreign host)
//! rejects the whole resource; unknown keys are skipped.

use winnow::Parser;
use winnow::binary::{le_i16, le_i32, le_u32};
use winnow::error::ContextError;

use super::arch::Architecture;
use super::fici::decode_filter_case_table;
use super::pe::ResourceDirectory;
use super::{aete, c_string, pascal_string};
use crate::fourcc::{FourCC, HOST_ANY, KIND_FILTER};
use crate::plugin::{FilterCaseTable, ScriptingGrammar};

type WResult<T> = std::result::Result<T, ContextError>;

/// Expected resource signature.
pub const RESOURCE_SIGNATURE: i16 = 1;
/// The one supported property-list version.
pub const LIST_VERSION: i32 = 0;
/// Newest supported interface major version.
pub const MAX_INTERFACE_VERSION: u16 = 4;
/// RGB bit in the first byte of the image-mode flags.
pub const MODE_RGB: u8 = 0x10;

/// Property keys.
pub mod keys {
    use crate::fourcc::FourCC;

    /// Plugin kind.
    pub const KIND: FourCC = FourCC::new(b"kind");
    /// x86 entry point.
    pub const ENTRY_X86: FourCC = FourCC::new(b"wx86");
    /// x64 entry point.
    pub const ENTRY_X64: FourCC = FourCC::new(b"8664");
    /// Arm64 entry point.
    pub const ENTRY_ARM64: FourCC = FourCC::new(b"wa64");
    /// Interface version.
    pub const VERSION: FourCC = FourCC::new(b"vers");
    /// Supported image modes.
    pub const IMAGE_MODES: FourCC = FourCC::new(b"mode");
    /// Menu category.
    pub const CATEGORY: FourCC = FourCC::new(b"catg");
    /// Menu title.
    pub const TITLE: FourCC = FourCC::new(b"name");
    /// Transparency-handling table.
    pub const FILTER_CASES: FourCC = FourCC::new(b"fici");
    /// Scripting-grammar pointer.
    pub const GRAMMAR: FourCC = FourCC::new(b"hstm");
    /// Enable expression.
    pub const ENABLE: FourCC = FourCC::new(b"enbl");
    /// Required host.
    pub const REQUIRED_HOST: FourCC = FourCC::new(b"host");
}

/// What a resource contributes to a catalog record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterMetadata {
    /// Entry point matching the module architecture.
    pub entry_point: Option<String>,
    /// Menu category.
    pub category: Option<String>,
    /// Menu title.
    pub title: Option<String>,
    /// Transparency-handling table.
    pub filter_cases: Option<FilterCaseTable>,
    /// Scripting grammar.
    pub grammar: Option<ScriptingGrammar>,
    /// Enable expression.
    pub enable_expression: Option<String>,
}

impl FilterMetadata {
    /// Whether enough was declared to run the filter.
    pub fn is_complete(&self) -> bool {
        self.entry_point.is_some() && self.category.is_some() && self.title.is_some()
    }
}

/// Inputs that decide whether a resource applies to this host.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'r, 'a> {
    /// Module architecture, selects the entry-point key.
    pub architecture: Architecture,
    /// This host's signature.
    pub host_signature: FourCC,
    /// Resources of the same module, for grammar lookups.
    pub resources: &'r ResourceDirectory<'a>,
}

/// Entry-point key for a module architecture.
pub fn entry_point_key(architecture: Architecture) -> Option<FourCC> {
    match architecture {
        Architecture::X86 => Some(keys::ENTRY_X86),
        Architecture::X64 => Some(keys::ENTRY_X64),
        Architecture::Arm64 => Some(keys::ENTRY_ARM64),
        Architecture::Arm | Architecture::Unknown => None,
    }
}

#[derive(Debug)]
struct PropertyHeader {
    key: FourCC,
    length: usize,
}

fn resource_header(input: &mut &[u8]) -> WResult<(i16, i32, i32)> {
    (le_i16, le_i32, le_i32).parse_next(input)
}

fn property_header(input: &mut &[u8]) -> WResult<PropertyHeader> {
    let (_vendor, key, _id, length) = (le_u32, le_u32, le_i32, le_i32).parse_next(input)?;
    Ok(PropertyHeader {
        key: FourCC(key),
        length: length.max(0) as usize,
    })
}

#[inline]
fn pad4(n: usize) -> usize {
    (n + 3) & !3
}

/// Parse one `PIPL` resource.
///
/// Returns `None` when the resource is malformed or rejected. A complete
/// result still needs [`FilterMetadata::is_complete`] to be usable.
pub fn parse_pipl(data: &[u8], ctx: &ParseContext<'_, '_>) -> Option<FilterMetadata> {
    let mut input = data;
    let (signature, version, count) = resource_header(&mut input).ok()?;
    if signature != RESOURCE_SIGNATURE || version != LIST_VERSION {
        tracing::debug!(signature, version, "unsupported PIPL header");
        return None;
    }

    let entry_key = entry_point_key(ctx.architecture);
    let mut meta = FilterMetadata::default();

    for index in 0..count.max(0) {
        let Ok(header) = property_header(&mut input) else {
            tracing::debug!(index, count, "PIPL property list truncated");
            break;
        };
        let rest = input;
        let value = rest.get(..header.length.min(rest.len())).unwrap_or_default();
        let mut advance = pad4(header.length);

        match header.key {
            keys::KIND => {
                let kind = read_u32(value)?;
                if FourCC(kind) != KIND_FILTER {
                    tracing::debug!(kind = %FourCC(kind), "not a filter resource");
                    return None;
                }
            }
            key if Some(key) == entry_key => {
                meta.entry_point = Some(c_string(value));
            }
            keys::VERSION => {
                let version = read_u32(value)?;
                let major = (version >> 16) as u16;
                if major > MAX_INTERFACE_VERSION {
                    tracing::debug!(major, "interface version too new");
                    return None;
                }
            }
            keys::IMAGE_MODES => {
                if value.first().is_none_or(|modes| modes & MODE_RGB == 0) {
                    tracing::debug!("filter does not support RGB");
                    return None;
                }
            }
            keys::CATEGORY => meta.category = Some(pascal_string(value)),
            keys::TITLE => meta.title = Some(pascal_string(value)),
            keys::FILTER_CASES => {
                let decoded = decode_filter_case_table(rest);
                meta.filter_cases = decoded.table;
                advance = pad4(header.length.max(decoded.consumed));
            }
            keys::GRAMMAR => meta.grammar = grammar_reference(value, ctx.resources),
            keys::ENABLE => meta.enable_expression = Some(c_string(value)),
            keys::REQUIRED_HOST => {
                let host = FourCC(read_u32(value)?);
                if host != ctx.host_signature && host != HOST_ANY {
                    tracing::debug!(required = %host, "filter requires another host");
                    return None;
                }
            }
            other => tracing::trace!(key = %other, "ignoring PIPL property"),
        }

        input = rest.get(advance..).unwrap_or_default();
    }

    Some(meta)
}

fn read_u32(value: &[u8]) -> Option<u32> {
    Some(u32::from_le_bytes(value.get(..4)?.try_into().ok()?))
}

/// Resolve a grammar pointer: `i32 version, u32 class, u32 event,
/// i16 terminology id, scope C string`. The grammar lives in the `AETE`
/// resource named by the terminology id.
fn grammar_reference(value: &[u8], resources: &ResourceDirectory<'_>) -> Option<ScriptingGrammar> {
    let mut input = value;
    let (_version, _class, _event, terminology_id) =
        (le_i32::<_, ContextError>, le_u32, le_u32, le_i16)
            .parse_next(&mut input)
            .ok()?;
    let id = u16::try_from(terminology_id).ok()?;
    let Some(block) = resources.find("AETE", id) else {
        tracing::debug!(id, "grammar resource missing");
        return None;
    };
    aete::parse_grammar(block)
}

/// Serialize one property in the layout [`parse_pipl`] reads.
pub fn encode_property(out: &mut Vec<u8>, key: FourCC, data: &[u8]) {
    out.extend_from_slice(&crate::fourcc::VENDOR_ADOBE.value().to_le_bytes());
    out.extend_from_slice(&key.value().to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&(data.len() as i32).to_le_bytes());
    out.extend_from_slice(data);
    out.resize(out.len() + pad4(data.len()) - data.len(), 0);
}

/// Serialize a resource header for `count` properties.
pub fn encode_header(count: i32) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    out.extend_from_slice(&RESOURCE_SIGNATURE.to_le_bytes());
    out.extend_from_slice(&LIST_VERSION.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pstr(s: &str) -> Vec<u8> {
        let mut v = vec![s.len() as u8];
        v.extend_from_slice(s.as_bytes());
        v
    }

    fn no_resources() -> ResourceDirectory<'static> {
        ResourceDirectory::empty()
    }

    fn ctx<'r>(resources: &'r ResourceDirectory<'static>) -> ParseContext<'r, 'static> {
        ParseContext {
            architecture: Architecture::X64,
            host_signature: crate::fourcc::VENDOR_ADOBE,
            resources,
        }
    }

    fn basic_properties() -> Vec<(FourCC, Vec<u8>)> {
        vec![
            (keys::KIND, KIND_FILTER.value().to_le_bytes().to_vec()),
            (keys::ENTRY_X86, b"Entry32\0".to_vec()),
            (keys::ENTRY_X64, b"Entry64\0".to_vec()),
            (keys::VERSION, (4u32 << 16).to_le_bytes().to_vec()),
            (keys::IMAGE_MODES, vec![0x10, 0x00]),
            (keys::CATEGORY, pstr("Distort")),
            (keys::TITLE, pstr("Twirl")),
        ]
    }

    fn build(props: &[(FourCC, Vec<u8>)]) -> Vec<u8> {
        let mut out = encode_header(props.len() as i32);
        for (key, data) in props {
            encode_property(&mut out, *key, data);
        }
        out
    }

    #[test]
    fn test_parse_complete_record() {
        let resources = no_resources();
        let meta = parse_pipl(&build(&basic_properties()), &ctx(&resources)).unwrap();
        assert!(meta.is_complete());
        assert_eq!(meta.entry_point.as_deref(), Some("Entry64"));
        assert_eq!(meta.category.as_deref(), Some("Distort"));
        assert_eq!(meta.title.as_deref(), Some("Twirl"));
    }

    #[test]
    fn test_reject_wrong_kind() {
        let mut props = basic_properties();
        props[0].1 = FourCC::new(b"8BAM").value().to_le_bytes().to_vec();
        let resources = no_resources();
        assert!(parse_pipl(&build(&props), &ctx(&resources)).is_none());
    }

    #[test]
    fn test_reject_newer_interface() {
        let mut props = basic_properties();
        props[3].1 = (5u32 << 16).to_le_bytes().to_vec();
        let resources = no_resources();
        assert!(parse_pipl(&build(&props), &ctx(&resources)).is_none());
    }

    #[test]
    fn test_reject_without_rgb() {
        let mut props = basic_properties();
        props[4].1 = vec![0x01, 0x00];
        let resources = no_resources();
        assert!(parse_pipl(&build(&props), &ctx(&resources)).is_none());
    }

    #[test]
    fn test_required_host() {
        let resources = no_resources();
        let mut props = basic_properties();
        props.push((keys::REQUIRED_HOST, HOST_ANY.value().to_le_bytes().to_vec()));
        assert!(parse_pipl(&build(&props), &ctx(&resources)).is_some());

        let mut props = basic_properties();
        props.push((
            keys::REQUIRED_HOST,
            FourCC::new(b"PSP ").value().to_le_bytes().to_vec(),
        ));
        assert!(parse_pipl(&build(&props), &ctx(&resources)).is_none());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let mut props = basic_properties();
        props.insert(2, (FourCC::new(b"zzzz"), vec![1, 2, 3, 4, 5]));
        let resources = no_resources();
        let meta = parse_pipl(&build(&props), &ctx(&resources)).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Twirl"));
    }

    #[test]
    fn test_misescaped_table_lands_on_next_property() {
        let raw: Vec<u8> = (0..28u8).map(|i| i % 10 + 1).collect();
        let mut escaped = raw.clone();
        escaped.splice(5..6, b"/x1A".iter().copied());
        let mut clean = raw;
        clean[5] = 0x1A;

        let resources = no_resources();
        let mut out = encode_header(2);
        // The declared length is the nominal 28 bytes; the escaped token
        // spills past it.
        out.extend_from_slice(&crate::fourcc::VENDOR_ADOBE.value().to_le_bytes());
        out.extend_from_slice(&keys::FILTER_CASES.value().to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());
        out.extend_from_slice(&28i32.to_le_bytes());
        out.extend_from_slice(&escaped);
        out.resize(out.len() + 1, 0);
        encode_property(&mut out, keys::TITLE, &pstr("After"));

        let meta = parse_pipl(&out, &ctx(&resources)).unwrap();
        let expected = decode_filter_case_table(&clean).table;
        assert_eq!(meta.filter_cases, expected);
        assert_eq!(meta.title.as_deref(), Some("After"));
    }
}
