//! Person-record decoding.
//!
//! The field walk below follows the reverse-engineered record layout. The
//! regions skipped between fields were never reverse-engineered; the cursor
//! advances through them without interpreting the bytes.

use tracing::{debug, warn};

use crate::parse::{self, ParseError};
use crate::record::{Gender, Person};

/// A field-level decode failure, locating the primitive read that failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not decode {field} at offset {offset}: {source}")]
pub struct DecodeError {
    /// The field whose read (including any uninterpreted bytes leading up
    /// to it) failed.
    pub field: &'static str,
    /// Byte offset into the record buffer where the failing read started.
    pub offset: usize,
    #[source]
    pub source: ParseError,
}

/// The outcome of decoding one record: the person built from every field
/// read before the first failure, plus the failures themselves.
///
/// Decoding is best-effort. A truncated or corrupted record still
/// contributes whatever fields it carried; it never sinks the rest of the
/// import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPerson {
    pub person: Person,
    pub errors: Vec<DecodeError>,
}

/// Split a raw FICHES buffer and decode every record it contains.
pub fn decode_records(data: &[u8], source: Option<&str>) -> Vec<DecodedPerson> {
    let records = parse::split_records(data);
    debug!(records = records.len(), bytes = data.len(), "split input buffer");
    records
        .iter()
        .map(|record| decode_person(record, source))
        .collect()
}

/// Decode one record buffer into a person, best-effort.
pub fn decode_person(data: &[u8], source: Option<&str>) -> DecodedPerson {
    let mut person = Person::default();
    let mut errors = Vec::new();

    match walk_fields(data, source, &mut person) {
        Ok(()) => {
            debug!(id = ?person.id, bytes = data.len(), "decoded record");
        }
        Err(err) => {
            warn!(
                field = err.field,
                offset = err.offset,
                id = ?person.id,
                "record decode halted, keeping fields read so far"
            );
            errors.push(err);
        }
    }

    DecodedPerson { person, errors }
}

fn located<T>(
    field: &'static str,
    offset: usize,
    result: parse::ParseResult<T>,
) -> Result<(T, usize), DecodeError> {
    result.map_err(|source| DecodeError {
        field,
        offset,
        source,
    })
}

/// Advance past uninterpreted bytes preceding `field`.
fn pad(
    field: &'static str,
    data: &[u8],
    pos: usize,
    n: usize,
) -> Result<usize, DecodeError> {
    let end = pos + n;
    if data.len() < end {
        return Err(DecodeError {
            field,
            offset: pos,
            source: ParseError::NeedMoreBytes(end - data.len()),
        });
    }
    Ok(end)
}

fn walk_fields(
    data: &[u8],
    source: Option<&str>,
    person: &mut Person,
) -> Result<(), DecodeError> {
    let mut pos = 0;

    let (name, consumed) = located("name", pos, parse::parse_text(&data[pos..]))?;
    person.name = name;
    pos += consumed;

    pos = pad("id", data, pos, 2)?;
    let (id, consumed) = located("id", pos, parse::parse_reference(&data[pos..], source))?;
    person.id = id;
    pos += consumed;

    pos = pad("comment", data, pos, 4)?;
    let (comment, consumed) = located("comment", pos, parse::parse_text(&data[pos..]))?;
    person.comment = comment;
    pos += consumed;

    let (picture, consumed) = located("picture", pos, parse::parse_text(&data[pos..]))?;
    person.picture = picture;
    pos += consumed;

    let (job, consumed) = located("job", pos, parse::parse_text(&data[pos..]))?;
    person.job = job;
    pos += consumed;

    pos = pad("note", data, pos, 2)?;
    let (note, consumed) = located("note", pos, parse::parse_text(&data[pos..]))?;
    person.note = note;
    pos += consumed;

    pos = pad("birthday", data, pos, 9)?;
    let (birthday, consumed) = located("birthday", pos, parse::parse_date(&data[pos..]))?;
    person.birthday = birthday;
    pos += consumed;

    pos = pad("birth place", data, pos, 4)?;
    let (birth_place, consumed) = located("birth place", pos, parse::parse_text(&data[pos..]))?;
    person.birth_place = birth_place;
    pos += consumed;

    pos = pad("religion", data, pos, 12)?;
    let (religion, consumed) = located("religion", pos, parse::parse_text(&data[pos..]))?;
    person.religion = religion;
    pos += consumed;

    pos = pad("death date", data, pos, 2)?;
    let (death_date, consumed) = located("death date", pos, parse::parse_date(&data[pos..]))?;
    person.death_date = death_date;
    pos += consumed;

    pos = pad("death place", data, pos, 4)?;
    let (death_place, consumed) = located("death place", pos, parse::parse_text(&data[pos..]))?;
    person.death_place = death_place;
    pos += consumed;

    pos = pad("gender", data, pos, 53)?;
    let (flag, consumed) = located("gender", pos, parse::parse_u8(&data[pos..]))?;
    person.gender = Some(if flag != 0 {
        Gender::Female
    } else {
        Gender::Male
    });
    pos += consumed;

    pos = pad("father", data, pos, 5)?;
    let (father, consumed) = located("father", pos, parse::parse_reference(&data[pos..], source))?;
    person.father = father;
    pos += consumed;

    let (mother, consumed) = located("mother", pos, parse::parse_reference(&data[pos..], source))?;
    person.mother = mother;
    pos += consumed;

    let (children, consumed) =
        located("children", pos, parse::parse_children(&data[pos..], source))?;
    person.children = children;
    pos += consumed;

    let (relationships, _) = located(
        "relationships",
        pos,
        parse::parse_relationships(&data[pos..], source),
    )?;
    person.relationships = relationships;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::PartialDate;

    fn text(s: &str) -> Vec<u8> {
        let mut out = (s.len() as u16).to_le_bytes().to_vec();
        out.extend(s.bytes());
        out
    }

    fn date(day: u16, month: u16, year: u16) -> Vec<u8> {
        let mut out = day.to_le_bytes().to_vec();
        out.extend_from_slice(&month.to_le_bytes());
        out.extend_from_slice(&year.to_le_bytes());
        out
    }

    /// Assemble one record body in the full field layout.
    #[allow(clippy::too_many_arguments)]
    fn record(
        name: &str,
        id: u16,
        comment: &str,
        picture: &str,
        job: &str,
        note: &str,
        birthday: &[u8],
        birth_place: &str,
        religion: &str,
        death_date: &[u8],
        death_place: &str,
        female: bool,
        father: u16,
        mother: u16,
        children: &[(u16, u16)],
        relationships: &[(u16, &[u8], &str)],
    ) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(text(name));
        out.extend_from_slice(&[0; 2]);
        out.extend_from_slice(&id.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend(text(comment));
        out.extend(text(picture));
        out.extend(text(job));
        out.extend_from_slice(&[0; 2]);
        out.extend(text(note));
        out.extend_from_slice(&[0; 9]);
        out.extend_from_slice(birthday);
        out.extend_from_slice(&[0; 4]);
        out.extend(text(birth_place));
        out.extend_from_slice(&[0; 12]);
        out.extend(text(religion));
        out.extend_from_slice(&[0; 2]);
        out.extend_from_slice(death_date);
        out.extend_from_slice(&[0; 4]);
        out.extend(text(death_place));
        out.extend_from_slice(&[0; 53]);
        out.push(if female { 1 } else { 0 });
        out.extend_from_slice(&[0; 5]);
        out.extend_from_slice(&father.to_le_bytes());
        out.extend_from_slice(&mother.to_le_bytes());
        out.extend_from_slice(&(children.len() as u16).to_le_bytes());
        for &(child, index) in children {
            out.extend_from_slice(&child.to_le_bytes());
            out.extend_from_slice(&index.to_le_bytes());
        }
        out.extend_from_slice(&(relationships.len() as u16).to_le_bytes());
        for &(partner, rel_date, place) in relationships {
            out.extend_from_slice(&partner.to_le_bytes());
            out.extend_from_slice(&[0; 2]);
            out.extend_from_slice(rel_date);
            out.extend_from_slice(&[0; 4]);
            out.extend(text(place));
            out.extend_from_slice(&[0; 4]);
        }
        out
    }

    #[test]
    fn decode_full_record() {
        let data = record(
            "Huber Anna",
            3,
            "a comment",
            "anna.bmp",
            "Weberin",
            "a note",
            &date(24, 12, 1901),
            "Wien",
            "r.k.",
            &date(0xFFFF, 3, 1980),
            "Graz",
            true,
            1,
            2,
            &[(7, 1)],
            &[(4, &date(1, 6, 1920), "Linz")],
        );

        let decoded = decode_person(&data, None);
        assert!(decoded.errors.is_empty());

        let person = decoded.person;
        assert_eq!(person.name.as_deref(), Some("Huber Anna"));
        assert_eq!(person.id.as_ref().unwrap().id, 3);
        assert_eq!(person.comment.as_deref(), Some("a comment"));
        assert_eq!(person.picture.as_deref(), Some("anna.bmp"));
        assert_eq!(person.job.as_deref(), Some("Weberin"));
        assert_eq!(person.note.as_deref(), Some("a note"));
        assert_eq!(
            person.birthday,
            Some(PartialDate {
                day: Some(24),
                month: Some(12),
                year: Some(1901),
            })
        );
        assert_eq!(person.birth_place.as_deref(), Some("Wien"));
        assert_eq!(person.religion.as_deref(), Some("r.k."));
        assert_eq!(
            person.death_date,
            Some(PartialDate {
                day: None,
                month: Some(3),
                year: Some(1980),
            })
        );
        assert_eq!(person.death_place.as_deref(), Some("Graz"));
        assert_eq!(person.gender, Some(Gender::Female));
        assert_eq!(person.father.as_ref().unwrap().id, 1);
        assert_eq!(person.mother.as_ref().unwrap().id, 2);
        assert_eq!(person.children.len(), 1);
        assert_eq!(person.children[0].child.as_ref().unwrap().id, 7);
        assert_eq!(person.children[0].relationship_index, Some(0));
        assert_eq!(person.relationships.len(), 1);
        assert_eq!(person.relationships[0].partner.as_ref().unwrap().id, 4);
        assert_eq!(person.relationships[0].place.as_deref(), Some("Linz"));
    }

    #[test]
    fn decode_scoped_record() {
        let data = record(
            "Huber Anna",
            3,
            "",
            "",
            "",
            "",
            &date(0, 0, 0),
            "",
            "",
            &date(0, 0, 0),
            "",
            false,
            1,
            0,
            &[],
            &[],
        );

        let person = decode_person(&data, Some("tree")).person;
        assert_eq!(person.id.as_ref().unwrap().to_string(), "tree_3");
        assert_eq!(person.father.as_ref().unwrap().to_string(), "tree_1");
        assert_eq!(person.mother, None);
        assert_eq!(person.birthday, None);
    }

    #[test]
    fn decode_truncated_record_keeps_leading_fields() {
        let full = record(
            "Huber Anna",
            3,
            "a comment",
            "anna.bmp",
            "Weberin",
            "a note",
            &date(24, 12, 1901),
            "Wien",
            "r.k.",
            &date(0, 0, 0),
            "Graz",
            false,
            0,
            0,
            &[],
            &[],
        );

        // Cut inside the note text: everything before it survives,
        // everything after it stays absent.
        let note_starts = full
            .windows(6)
            .position(|window| window == b"a note")
            .unwrap();
        let decoded = decode_person(&full[..note_starts + 3], None);

        assert_eq!(decoded.errors.len(), 1);
        assert_eq!(decoded.errors[0].field, "note");
        assert!(matches!(
            decoded.errors[0].source,
            ParseError::NeedMoreBytes(_)
        ));

        let person = decoded.person;
        assert_eq!(person.name.as_deref(), Some("Huber Anna"));
        assert_eq!(person.id.as_ref().unwrap().id, 3);
        assert_eq!(person.comment.as_deref(), Some("a comment"));
        assert_eq!(person.picture.as_deref(), Some("anna.bmp"));
        assert_eq!(person.job.as_deref(), Some("Weberin"));
        assert_eq!(person.note, None);
        assert_eq!(person.birthday, None);
        assert_eq!(person.gender, None);
        assert!(person.children.is_empty());
        assert!(person.relationships.is_empty());
    }

    #[test]
    fn decode_empty_record() {
        let decoded = decode_person(&[], None);
        assert_eq!(decoded.errors.len(), 1);
        assert_eq!(decoded.errors[0].field, "name");
        assert_eq!(decoded.person, Person::default());
    }

    #[test]
    fn decode_records_tolerates_one_bad_record() {
        let good = record(
            "Huber Anna",
            3,
            "",
            "",
            "",
            "",
            &date(0, 0, 0),
            "",
            "",
            &date(0, 0, 0),
            "",
            false,
            0,
            0,
            &[],
            &[],
        );

        let mut data = crate::parse::SENTINEL.to_vec();
        data.extend_from_slice(&good);
        data.extend_from_slice(crate::parse::SENTINEL);
        data.extend_from_slice(&[0xFF, 0xFF, 0x00]); // hopeless record

        let decoded = decode_records(&data, None);
        assert_eq!(decoded.len(), 2);
        assert!(decoded[0].errors.is_empty());
        assert_eq!(decoded[0].person.id.as_ref().unwrap().id, 3);
        assert!(!decoded[1].errors.is_empty());
    }
}
