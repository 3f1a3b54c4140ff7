//! Herein lies the decoder for the legacy FICHES genealogy export format,
//! together with the family reconstruction and GEDCOM 5.5 serialization
//! built on top of it.
//!
//! The pipeline is pure and synchronous: split a raw buffer into person
//! records with [`parse::split_records`], decode each record best-effort
//! with [`decode_records`], reconstruct couples and children with
//! [`infer_families`], and render everything with [`to_gedcom`].
//!
//! Decoding favors completeness over strictness: a corrupted record yields
//! whatever fields it carried before the corruption, and inconsistent
//! family links never abort a conversion.

pub mod de;
pub mod family;
pub mod parse;
pub mod record;
pub mod ser;

pub use de::{decode_person, decode_records, DecodeError, DecodedPerson};
pub use family::infer_families;
pub use parse::{ParseError, ParseResult};
pub use record::{ChildLink, Family, Gender, PartialDate, Person, PersonRef, Relationship};
pub use ser::{format_date, to_gedcom, write_gedcom, GedcomMeta};
