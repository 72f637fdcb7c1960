//! Scripting-grammar block parsing.
//!
//! The block describes exactly one vendor suite holding exactly one event.
//! Anything else (several suites, several events, an unsupported version)
//! leaves the filter usable but not scriptable, so every failure here
//! returns `None` rather than an error.

use winnow::Parser;
use winnow::binary::{le_u16, le_u32, u8 as byte};
use winnow::error::ContextError;
use winnow::token::take;

use crate::fourcc::FourCC;
use crate::plugin::{
    GrammarEnumItem, GrammarEnumeration, GrammarParameter, ScriptingGrammar,
};

type WResult<T> = std::result::Result<T, ContextError>;

/// The one supported major version.
const SUPPORTED_MAJOR: u8 = 1;
/// The one supported minor version.
const SUPPORTED_MINOR: u8 = 0;
/// The one supported suite level.
const SUPPORTED_SUITE_LEVEL: u16 = 1;
/// The one supported suite version.
const SUPPORTED_SUITE_VERSION: u16 = 1;
/// Reserved leading character of the parameter type token.
const PARAMETER_TYPE_RESERVED: u8 = b'#';

/// Parse a grammar block. Returns `None` if the block is malformed or uses
/// an unsupported layout.
pub fn parse_grammar(data: &[u8]) -> Option<ScriptingGrammar> {
    let mut input = data;
    match grammar.parse_next(&mut input) {
        Ok(grammar) => grammar,
        Err(_) => {
            tracing::debug!(len = data.len(), "malformed scripting grammar");
            None
        }
    }
}

fn pascal_string(input: &mut &[u8]) -> WResult<String> {
    let len = byte.parse_next(input)?;
    let bytes = take(len as usize).parse_next(input)?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

fn four_cc(input: &mut &[u8]) -> WResult<FourCC> {
    le_u32.map(FourCC).parse_next(input)
}

fn grammar(input: &mut &[u8]) -> WResult<Option<ScriptingGrammar>> {
    let major = byte.parse_next(input)?;
    let minor = byte.parse_next(input)?;
    let _language = le_u16.parse_next(input)?;
    let _script = le_u16.parse_next(input)?;
    let suite_count = le_u16.parse_next(input)?;
    if suite_count != 1 {
        tracing::debug!(suite_count, "grammar must hold exactly one suite");
        return Ok(None);
    }

    let _vendor = pascal_string.parse_next(input)?;
    let _suite_description = pascal_string.parse_next(input)?;
    let _suite_id = four_cc.parse_next(input)?;
    let level = le_u16.parse_next(input)?;
    let version = le_u16.parse_next(input)?;
    let event_count = le_u16.parse_next(input)?;
    if event_count != 1 {
        tracing::debug!(event_count, "grammar suite must hold exactly one event");
        return Ok(None);
    }

    let name = pascal_string.parse_next(input)?;
    let description = pascal_string.parse_next(input)?;
    let class_id = four_cc.parse_next(input)?;
    let event_id = four_cc.parse_next(input)?;
    let reply_type = four_cc.parse_next(input)?;
    let token: &[u8] = take(4usize).parse_next(input)?;
    let parameter_type = parameter_type_name(token);
    let _event_flags = le_u16.parse_next(input)?;

    let parameter_count = le_u16.parse_next(input)?;
    let mut parameters = Vec::with_capacity(parameter_count as usize);
    for _ in 0..parameter_count {
        parameters.push(GrammarParameter {
            name: pascal_string.parse_next(input)?,
            key: four_cc.parse_next(input)?,
            kind: four_cc.parse_next(input)?,
            description: pascal_string.parse_next(input)?,
            flags: le_u16.parse_next(input)?,
        });
    }

    let class_count = le_u16.parse_next(input)?;
    let mut enumerations = Vec::new();
    if class_count == 0 {
        let comparison_ops = le_u16.parse_next(input)?;
        if comparison_ops != 0 {
            return Err(ContextError::new());
        }
        let enum_count = le_u16.parse_next(input)?;
        for _ in 0..enum_count {
            let kind = four_cc.parse_next(input)?;
            let item_count = le_u16.parse_next(input)?;
            let mut items = Vec::with_capacity(item_count as usize);
            for _ in 0..item_count {
                items.push(GrammarEnumItem {
                    name: pascal_string.parse_next(input)?,
                    value: four_cc.parse_next(input)?,
                    description: pascal_string.parse_next(input)?,
                });
            }
            enumerations.push(GrammarEnumeration { kind, items });
        }
    }

    if major != SUPPORTED_MAJOR
        || minor != SUPPORTED_MINOR
        || level != SUPPORTED_SUITE_LEVEL
        || version != SUPPORTED_SUITE_VERSION
    {
        tracing::debug!(major, minor, level, version, "unsupported grammar version");
        return Ok(None);
    }

    Ok(Some(ScriptingGrammar {
        name,
        description,
        class_id,
        event_id,
        reply_type,
        parameter_type,
        parameters,
        enumerations,
    }))
}

fn parameter_type_name(token: &[u8]) -> String {
    let stripped = match token.split_first() {
        Some((&PARAMETER_TYPE_RESERVED, rest)) => rest,
        _ => token,
    };
    String::from_utf8_lossy(stripped)
        .trim_end_matches(['\0', ' '])
        .to_string()
}

/// Serialize a grammar in the layout [`parse_grammar`] reads.
///
/// Used to build synthetic modules and to hand grammars to the shim.
pub fn encode_grammar(grammar: &ScriptingGrammar) -> Vec<u8> {
    fn pstr(out: &mut Vec<u8>, s: &str) {
        let bytes = &s.as_bytes()[..s.len().min(255)];
        out.push(bytes.len() as u8);
        out.extend_from_slice(bytes);
    }
    let mut out = vec![SUPPORTED_MAJOR, SUPPORTED_MINOR];
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    pstr(&mut out, "");
    pstr(&mut out, "");
    out.extend_from_slice(&grammar.class_id.value().to_le_bytes());
    out.extend_from_slice(&SUPPORTED_SUITE_LEVEL.to_le_bytes());
    out.extend_from_slice(&SUPPORTED_SUITE_VERSION.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    pstr(&mut out, &grammar.name);
    pstr(&mut out, &grammar.description);
    out.extend_from_slice(&grammar.class_id.value().to_le_bytes());
    out.extend_from_slice(&grammar.event_id.value().to_le_bytes());
    out.extend_from_slice(&grammar.reply_type.value().to_le_bytes());
    let mut token = [b' '; 4];
    token[0] = PARAMETER_TYPE_RESERVED;
    for (slot, b) in token[1..].iter_mut().zip(grammar.parameter_type.bytes()) {
        *slot = b;
    }
    out.extend_from_slice(&token);
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&(grammar.parameters.len() as u16).to_le_bytes());
    for p in &grammar.parameters {
        pstr(&mut out, &p.name);
        out.extend_from_slice(&p.key.value().to_le_bytes());
        out.extend_from_slice(&p.kind.value().to_le_bytes());
        pstr(&mut out, &p.description);
        out.extend_from_slice(&p.flags.to_le_bytes());
    }
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&(grammar.enumerations.len() as u16).to_le_bytes());
    for e in &grammar.enumerations {
        out.extend_from_slice(&e.kind.value().to_le_bytes());
        out.extend_from_slice(&(e.items.len() as u16).to_le_bytes());
        for item in &e.items {
            pstr(&mut out, &item.name);
            out.extend_from_slice(&item.value.value().to_le_bytes());
            pstr(&mut out, &item.description);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ScriptingGrammar {
        ScriptingGrammar {
            name: "Ripple".into(),
            description: "Ripple the image".into(),
            class_id: FourCC::new(b"Rppl"),
            event_id: FourCC::new(b"Rppl"),
            reply_type: FourCC::new(b"null"),
            parameter_type: "ImR".into(),
            parameters: vec![GrammarParameter {
                name: "amount".into(),
                key: FourCC::new(b"Amnt"),
                kind: FourCC::new(b"long"),
                description: "Amount".into(),
                flags: 0,
            }],
            enumerations: vec![GrammarEnumeration {
                kind: FourCC::new(b"Sz  "),
                items: vec![GrammarEnumItem {
                    name: "small".into(),
                    value: FourCC::new(b"Smll"),
                    description: String::new(),
                }],
            }],
        }
    }

    #[test]
    fn test_parse_encoded_grammar() {
        let grammar = sample();
        let parsed = parse_grammar(&encode_grammar(&grammar)).unwrap();
        assert_eq!(parsed, grammar);
    }

    #[test]
    fn test_unsupported_version_is_absent() {
        let mut bytes = encode_grammar(&sample());
        bytes[1] = 2;
        assert!(parse_grammar(&bytes).is_none());
    }

    #[test]
    fn test_two_suites_is_absent() {
        let mut bytes = encode_grammar(&sample());
        bytes[6] = 2;
        assert!(parse_grammar(&bytes).is_none());
    }

    #[test]
    fn test_truncated_is_absent() {
        let bytes = encode_grammar(&sample());
        assert!(parse_grammar(&bytes[..bytes.len() - 3]).is_none());
    }

    #[test]
    fn test_parameter_type_strip() {
        assert_eq!(parameter_type_name(b"#ImR"), "ImR");
        assert_eq!(parameter_type_name(b"TEXT"), "TEXT");
    }
}
