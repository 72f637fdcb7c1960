//! Transparency-handling table decoding with field repair.
//!
//! Some authoring tools wrote individual table bytes as escaped-hex text
//! (`/x1A` instead of the raw byte `0x1A`). Each sub-field is therefore
//! decoded as either such a token or a single raw byte, and the caller is
//! told how many bytes were really consumed so the property cursor can skip
//! past the whole thing.

use winnow::Parser;
use winnow::combinator::alt;
use winnow::error::ContextError;
use winnow::token::{any, one_of, take_while};

use crate::plugin::{FILTER_CASE_COUNT, FilterCaseInfo, FilterCaseTable};

type WResult<T> = std::result::Result<T, ContextError>;

/// Outcome of decoding a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCaseDecode {
    /// The table, or `None` if any sub-field could not be read.
    pub table: Option<FilterCaseTable>,
    /// Bytes consumed from the start of the property data.
    pub consumed: usize,
}

/// Decode a 7-slot table from the start of `data`.
///
/// `data` should extend to the end of the property list rather than stop at
/// the declared property length, because repaired fields are longer than one
/// byte.
pub fn decode_filter_case_table(data: &[u8]) -> FilterCaseDecode {
    let mut input = data;
    let mut table = [FilterCaseInfo::default(); FILTER_CASE_COUNT];
    let mut ok = true;

    'slots: for slot in table.iter_mut() {
        let mut fields = [0u8; 4];
        for field in fields.iter_mut() {
            match case_byte.parse_next(&mut input) {
                Ok(value) => *field = value,
                Err(_) => {
                    ok = false;
                    break 'slots;
                }
            }
        }
        *slot = FilterCaseInfo {
            input_handling: fields[0],
            output_handling: fields[1],
            flags1: fields[2],
            flags2: fields[3],
        };
    }

    let consumed = data.len() - input.len();
    if !ok {
        tracing::debug!(consumed, "transparency table truncated, discarding it");
    }
    FilterCaseDecode {
        table: ok.then_some(table),
        consumed,
    }
}

/// One sub-field: an escaped-hex token or a raw byte.
fn case_byte(input: &mut &[u8]) -> WResult<u8> {
    alt((escaped_hex, any)).parse_next(input)
}

/// `/` then `x` or `X` then one or two hex digits.
fn escaped_hex(input: &mut &[u8]) -> WResult<u8> {
    let (_, _, digits) = (
        one_of(b'/'),
        one_of([b'x', b'X']),
        take_while(1..=2, |c: u8| c.is_ascii_hexdigit()),
    )
        .parse_next(input)?;
    // Two hex digits always fit in a byte.
    let value = digits
        .iter()
        .fold(0u8, |acc, &d| (acc << 4) | hex_value(d));
    Ok(value)
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}
