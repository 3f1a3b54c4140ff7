//! GEDCOM 5.5 serialization of decoded persons and inferred families.
//!
//! Output order is fixed: header, one individual block per person in input
//! order, one family block per family in id order, trailer. Every field is
//! optional and simply omitted when absent, so serialization itself has no
//! failure mode beyond the underlying writer.

use std::fmt::{self, Write};

use tracing::warn;

use crate::record::{Family, Gender, PartialDate, Person};

/// Three-letter month abbreviations, indexed by month number minus one.
const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Header metadata describing the emitting application.
#[derive(Debug, Clone)]
pub struct GedcomMeta {
    pub source: String,
    pub version: String,
    /// Already rendered, e.g. "13 Oct 2024".
    pub date: String,
}

/// Render the present components of a date, space-joined, as day, month
/// abbreviation, year. Zero-valued components are skipped like absent ones,
/// as are months outside 1..=12.
pub fn format_date(date: &PartialDate) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(3);
    if let Some(day) = date.day.filter(|&day| day != 0) {
        parts.push(day.to_string());
    }
    if let Some(month) = date.month.filter(|&month| (1..=12).contains(&month)) {
        parts.push(MONTHS[month as usize - 1].to_string());
    }
    if let Some(year) = date.year.filter(|&year| year != 0) {
        parts.push(year.to_string());
    }
    parts.join(" ")
}

/// Serialize everything into a fresh string.
pub fn to_gedcom(persons: &[Person], families: &[Family], meta: &GedcomMeta) -> String {
    let mut out = String::new();
    write_gedcom(&mut out, persons, families, meta)
        .expect("formatting into a String does not fail");
    out
}

/// Serialize the header, all individuals, all families and the trailer.
pub fn write_gedcom<W: Write>(
    out: &mut W,
    persons: &[Person],
    families: &[Family],
    meta: &GedcomMeta,
) -> fmt::Result {
    write_header(out, meta)?;
    for person in persons {
        write_individual(out, person, families)?;
    }
    for family in families {
        write_family(out, family)?;
    }
    writeln!(out, "0 TRLR")
}

fn write_header<W: Write>(out: &mut W, meta: &GedcomMeta) -> fmt::Result {
    writeln!(out, "0 HEAD")?;
    writeln!(out, "1 SOUR {}", meta.source)?;
    writeln!(out, "2 VERS {}", meta.version)?;
    writeln!(out, "2 NAME {}", meta.source)?;
    writeln!(out, "1 DATE {}", meta.date)?;
    writeln!(out, "1 GEDC")?;
    writeln!(out, "2 VERS 5.5")?;
    writeln!(out, "2 FORM LINEAGE-LINKED")?;
    writeln!(out, "1 CHAR UTF-8")
}

/// Flatten embedded line breaks so the value stays on one GEDCOM line.
fn flattened(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}

fn write_note<W: Write>(out: &mut W, text: &str) -> fmt::Result {
    writeln!(out, "1 NOTE")?;
    writeln!(out, "2 CONT {}", flattened(text))
}

/// The stored name keeps the family name first; the remaining tokens form
/// the given name. Preserved as-is, since consumers of existing exports
/// rely on that ordering.
fn write_name<W: Write>(out: &mut W, name: &str) -> fmt::Result {
    let mut tokens = name.split_whitespace();
    let surname = match tokens.next() {
        Some(surname) => surname,
        None => return Ok(()),
    };
    let given = tokens.collect::<Vec<_>>().join(" ").replace([',', ';'], " ");
    writeln!(out, "1 NAME {} /{}/", given, surname)
}

fn write_event<W: Write>(
    out: &mut W,
    tag: &str,
    date: Option<&PartialDate>,
    place: Option<&str>,
) -> fmt::Result {
    if date.is_none() && place.is_none() {
        return Ok(());
    }
    writeln!(out, "1 {}", tag)?;
    if let Some(date) = date {
        writeln!(out, "2 DATE {}", format_date(date))?;
    }
    if let Some(place) = place {
        writeln!(out, "2 PLAC {}", place)?;
    }
    Ok(())
}

fn write_individual<W: Write>(
    out: &mut W,
    person: &Person,
    families: &[Family],
) -> fmt::Result {
    let id = match &person.id {
        Some(id) => id,
        None => {
            // Without an id the block could never be referenced; there is
            // nothing addressable to emit.
            warn!(name = ?person.name, "skipping person without id");
            return Ok(());
        }
    };

    writeln!(out, "0 @I{}@ INDI", id)?;
    if let Some(name) = &person.name {
        write_name(out, name)?;
    }
    write_event(out, "BIRT", person.birthday.as_ref(), person.birth_place.as_deref())?;
    write_event(out, "DEAT", person.death_date.as_ref(), person.death_place.as_deref())?;
    if let Some(gender) = person.gender {
        let sex = match gender {
            Gender::Male => "M",
            Gender::Female => "F",
        };
        writeln!(out, "1 SEX {}", sex)?;
    }
    if let Some(religion) = &person.religion {
        writeln!(out, "1 RELI {}", religion)?;
    }
    if let Some(job) = &person.job {
        writeln!(out, "1 OCCU {}", job)?;
    }
    for text in [&person.note, &person.comment, &person.picture]
        .into_iter()
        .flatten()
    {
        write_note(out, text)?;
    }

    if let Some(parent_family) = families.iter().find(|family| family.children.contains(id)) {
        writeln!(out, "1 FAMC @F{}@", parent_family.id)?;
    }
    for family in families.iter().filter(|family| {
        family.husband.as_ref() == Some(id) || family.wife.as_ref() == Some(id)
    }) {
        writeln!(out, "1 FAMS @F{}@", family.id)?;
    }
    Ok(())
}

fn write_family<W: Write>(out: &mut W, family: &Family) -> fmt::Result {
    writeln!(out, "0 @F{}@ FAM", family.id)?;
    if let Some(husband) = &family.husband {
        writeln!(out, "1 HUSB @I{}@", husband)?;
    }
    if let Some(wife) = &family.wife {
        writeln!(out, "1 WIFE @I{}@", wife)?;
    }
    write_event(
        out,
        "MARR",
        family.marriage_date.as_ref(),
        family.marriage_place.as_deref(),
    )?;
    for child in &family.children {
        writeln!(out, "1 CHIL @I{}@", child)?;
    }
    Ok(())
}
