//! Sans-IO parsing primitives for the FICHES format.
//!
//! These functions work on byte slices without any I/O traits. All of them
//! return `(value, bytes_consumed)` on success, so the caller manages buffer
//! positions and can always advance with `pos += consumed`.

use byteorder::{ByteOrder, LittleEndian};
use memchr::memmem;

use crate::record::{ChildLink, PartialDate, PersonRef, Relationship};

/// The 4-byte pattern marking the start of each person record.
pub const SENTINEL: &[u8; 4] = &[0x01, 0x01, 0x01, 0x01];

/// Sub-field value marking an individually unknown date component.
const DATE_UNKNOWN: u16 = u16::MAX;

/// Error type for parsing operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Need more bytes to complete parsing. Contains minimum additional bytes needed.
    #[error("need {0} more bytes")]
    NeedMoreBytes(usize),
}

pub type ParseResult<T> = Result<(T, usize), ParseError>;

/// Split a raw FICHES buffer into one sub-buffer per person record.
///
/// Records are delimited by [`SENTINEL`]. Bytes before the first occurrence
/// are header noise and dropped, each record spans from the end of one
/// sentinel to the start of the next, and the final record runs to the end
/// of the buffer. A buffer with no sentinel yields no records.
pub fn split_records(data: &[u8]) -> Vec<&[u8]> {
    let starts: Vec<usize> = memmem::find_iter(data, SENTINEL).collect();
    let mut records = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let body = start + SENTINEL.len();
        let end = starts.get(i + 1).copied().unwrap_or(data.len());
        records.push(&data[body..end]);
    }
    records
}

/// Parse a single byte.
#[inline]
pub fn parse_u8(data: &[u8]) -> ParseResult<u8> {
    if data.is_empty() {
        return Err(ParseError::NeedMoreBytes(1));
    }
    Ok((data[0], 1))
}

/// Parse a little-endian u16.
#[inline]
pub fn parse_u16_le(data: &[u8]) -> ParseResult<u16> {
    if data.len() < 2 {
        return Err(ParseError::NeedMoreBytes(2 - data.len()));
    }
    Ok((LittleEndian::read_u16(data), 2))
}

/// Parse a reference site: a u16 id where `0` means "no link".
pub fn parse_reference(data: &[u8], source: Option<&str>) -> ParseResult<Option<PersonRef>> {
    let (raw, consumed) = parse_u16_le(data)?;
    Ok((PersonRef::new(raw, source), consumed))
}

/// Parse a length-prefixed text: a u16 length, then that many bytes, each
/// mapped to the Unicode code point of the same value.
///
/// Zero-length text is absent. Consumed is always `2 + length`.
pub fn parse_text(data: &[u8]) -> ParseResult<Option<String>> {
    let (len, prefix) = parse_u16_le(data)?;
    let len = len as usize;
    let total = prefix + len;
    if data.len() < total {
        return Err(ParseError::NeedMoreBytes(total - data.len()));
    }
    if len == 0 {
        return Ok((None, total));
    }
    let text = data[prefix..total].iter().map(|&b| b as char).collect();
    Ok((Some(text), total))
}

/// Parse a 6-byte date: three consecutive u16 fields (day, month, year).
///
/// All-zero and all-65535 both mean "no date recorded". Otherwise any
/// individual 65535 component is unknown while the others are kept.
/// Always consumes 6 bytes regardless of outcome.
pub fn parse_date(data: &[u8]) -> ParseResult<Option<PartialDate>> {
    if data.len() < 6 {
        return Err(ParseError::NeedMoreBytes(6 - data.len()));
    }
    let day = LittleEndian::read_u16(&data[0..2]);
    let month = LittleEndian::read_u16(&data[2..4]);
    let year = LittleEndian::read_u16(&data[4..6]);

    let fields = [day, month, year];
    if fields.iter().all(|&v| v == 0) || fields.iter().all(|&v| v == DATE_UNKNOWN) {
        return Ok((None, 6));
    }

    let known = |v: u16| if v == DATE_UNKNOWN { None } else { Some(v) };
    Ok((
        Some(PartialDate {
            day: known(day),
            month: known(month),
            year: known(year),
        }),
        6,
    ))
}

/// Advance past `n` uninterpreted bytes starting at `pos`.
#[inline]
fn skip(data: &[u8], pos: usize, n: usize) -> Result<usize, ParseError> {
    let end = pos + n;
    if data.len() < end {
        return Err(ParseError::NeedMoreBytes(end - data.len()));
    }
    Ok(end)
}

/// Parse the child list: a u16 count, then 4 bytes per child holding the
/// child reference and a one-based relationship index (stored value is the
/// index plus one; a stored `0` carries no index).
pub fn parse_children(data: &[u8], source: Option<&str>) -> ParseResult<Vec<ChildLink>> {
    let (count, mut pos) = parse_u16_le(data)?;

    let mut children = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (child, consumed) = parse_reference(&data[pos..], source)?;
        pos += consumed;
        let (raw_index, consumed) = parse_u16_le(&data[pos..])?;
        pos += consumed;
        children.push(ChildLink {
            child,
            relationship_index: raw_index.checked_sub(1),
        });
    }
    Ok((children, pos))
}

/// Parse the relationship list: a u16 count, then per element a partner
/// reference, 2 pad bytes, a date, 4 pad bytes, a place text and 4 pad
/// bytes. Consumes exactly the declared layout so the cursor lands
/// correctly after the list.
pub fn parse_relationships(data: &[u8], source: Option<&str>) -> ParseResult<Vec<Relationship>> {
    let (count, mut pos) = parse_u16_le(data)?;

    let mut relationships = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (partner, consumed) = parse_reference(&data[pos..], source)?;
        pos = skip(data, pos + consumed, 2)?;
        let (date, consumed) = parse_date(&data[pos..])?;
        pos = skip(data, pos + consumed, 4)?;
        let (place, consumed) = parse_text(&data[pos..])?;
        pos = skip(data, pos + consumed, 4)?;
        relationships.push(Relationship {
            partner,
            date,
            place,
        });
    }
    Ok((relationships, pos))
}
