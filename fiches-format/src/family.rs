//! Family reconstruction.
//!
//! Couples are matched symmetrically: a family discovered once via a
//! relationship on one partner and once via a child's parentage must
//! collapse to a single record, regardless of which partner was seen first.

use std::collections::HashMap;

use tracing::debug;

use crate::record::{Family, Gender, Person, PersonRef};

/// One unordered couple, normalized so that (a, b) and (b, a) key the same
/// family. Either side may be absent.
type CoupleKey = (Option<PersonRef>, Option<PersonRef>);

fn couple_key(a: Option<PersonRef>, b: Option<PersonRef>) -> CoupleKey {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Default)]
struct FamilyFold {
    families: Vec<Family>,
    by_couple: HashMap<CoupleKey, usize>,
}

impl FamilyFold {
    /// Find or create the family for an unordered couple, preserving
    /// discovery order.
    fn family_mut(&mut self, a: Option<PersonRef>, b: Option<PersonRef>) -> &mut Family {
        let key = couple_key(a, b);
        let index = match self.by_couple.get(&key) {
            Some(&index) => index,
            None => {
                self.families.push(Family::default());
                let index = self.families.len() - 1;
                self.by_couple.insert(key, index);
                index
            }
        };
        &mut self.families[index]
    }
}

/// Reconstruct families from the full set of decoded persons.
///
/// Ids are assigned densely from 1, in discovery order. Contradictory or
/// orphaned links are tolerated: a child whose parent pair was never seen
/// elsewhere simply creates a new family.
pub fn infer_families(persons: &[Person]) -> Vec<Family> {
    let mut fold = FamilyFold::default();

    for person in persons {
        for relationship in &person.relationships {
            let family = fold.family_mut(person.id.clone(), relationship.partner.clone());
            match person.gender {
                Some(Gender::Male) => {
                    family.husband = person.id.clone();
                    family.wife = relationship.partner.clone();
                }
                // An unrecorded gender lands in the wife slot. The format
                // always encodes the gender flag, so the fallback is only
                // reachable for partially decoded records.
                Some(Gender::Female) | None => {
                    family.wife = person.id.clone();
                    family.husband = relationship.partner.clone();
                }
            }
            if family.marriage_date.is_none() {
                family.marriage_date = relationship.date;
            }
            if family.marriage_place.is_none() {
                family.marriage_place = relationship.place.clone();
            }
        }

        if person.id.is_some() && (person.father.is_some() || person.mother.is_some()) {
            let family = fold.family_mut(person.father.clone(), person.mother.clone());
            family.husband = person.father.clone();
            family.wife = person.mother.clone();
            if let Some(id) = &person.id {
                family.children.push(id.clone());
            }
        }
    }

    let mut families = fold.families;
    for (index, family) in families.iter_mut().enumerate() {
        family.id = index as u32 + 1;
    }
    debug!(families = families.len(), persons = persons.len(), "inferred families");
    families
}
