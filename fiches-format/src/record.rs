use std::fmt;

use serde::Serialize;

/// A calendar date where any component may be unknown.
///
/// Distinct from "no date at all": callers hold a wholly-unrecorded date as
/// `None` at the use site, never as a `PartialDate` of three `None`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartialDate {
    pub day: Option<u16>,
    pub month: Option<u16>,
    pub year: Option<u16>,
}

/// An identifier linking one person record to another, optionally scoped by
/// the source tag of the import it came from so that ids stay unique when
/// several files are merged.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PersonRef {
    pub source: Option<String>,
    pub id: u16,
}

impl PersonRef {
    /// Build a reference from a raw id. Raw id `0` means "no link" at every
    /// reference site and never produces a reference.
    pub fn new(raw: u16, source: Option<&str>) -> Option<PersonRef> {
        if raw == 0 {
            return None;
        }
        Some(PersonRef {
            source: source.map(str::to_string),
            id: raw,
        })
    }
}

impl fmt::Display for PersonRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}_{}", source, self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

/// The gender flag knows only two states; a record that failed to decode
/// far enough simply has no gender at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// One child link on a parent's record.
///
/// The relationship index ties the child to a specific one of the parent's
/// relationships. It is decoded and retained, but family reconstruction
/// currently matches on parent references alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildLink {
    pub child: Option<PersonRef>,
    pub relationship_index: Option<u16>,
}

/// One partnership instance attached to a person record. Directionless in
/// meaning, but stored per record, so a couple's partnership may appear on
/// both partners' records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub partner: Option<PersonRef>,
    pub date: Option<PartialDate>,
    pub place: Option<String>,
}

/// One decoded person record. Never mutated after decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Person {
    pub id: Option<PersonRef>,
    pub name: Option<String>,
    pub birthday: Option<PartialDate>,
    pub birth_place: Option<String>,
    pub death_date: Option<PartialDate>,
    pub death_place: Option<String>,
    pub gender: Option<Gender>,
    pub job: Option<String>,
    pub religion: Option<String>,
    pub note: Option<String>,
    pub comment: Option<String>,
    pub picture: Option<String>,
    pub father: Option<PersonRef>,
    pub mother: Option<PersonRef>,
    pub children: Vec<ChildLink>,
    pub relationships: Vec<Relationship>,
}

/// An inferred couple-plus-children aggregate, used only to structure the
/// output. At most one family exists per unordered (husband, wife) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Family {
    /// Dense sequential id, assigned from 1 in discovery order.
    pub id: u32,
    pub husband: Option<PersonRef>,
    pub wife: Option<PersonRef>,
    pub children: Vec<PersonRef>,
    pub marriage_date: Option<PartialDate>,
    pub marriage_place: Option<String>,
}
