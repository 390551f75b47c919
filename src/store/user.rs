//! User-authored place store, override semantics and the merged view.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{
    EventLink, GazetteerRecord, MergeSource, MergedPlace, PersonEvents, UnmatchedPlace, UserPlace,
};

use super::gazetteer::GazetteerStore;
use super::table::{decode, encode, Table};

/// Partial update of a user place. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPlacePatch {
    pub name: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub municipality: Option<String>,
    pub parish: Option<String>,
    pub village: Option<String>,
    pub specific: Option<String>,
    pub coordinates: Option<String>,
    pub note: Option<String>,
}

#[derive(Clone)]
pub struct UserPlaceStore {
    table: Arc<dyn Table>,
}

impl UserPlaceStore {
    pub fn new(table: Arc<dyn Table>) -> Self {
        Self { table }
    }

    /// Persist a new user place. The caller sets `matched_place_id` before
    /// calling, after consulting the matcher; it stays absent on no match.
    pub fn add(&self, mut place: UserPlace) -> Result<u64> {
        if place.name.trim().is_empty() {
            return Err(Error::Validation("place name must not be empty".into()));
        }
        place.id = self.table.next_id()?;
        self.table.put(place.id, &encode(&place)?)?;
        Ok(place.id)
    }

    pub fn get(&self, id: u64) -> Result<Option<UserPlace>> {
        match self.table.get(id)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn all(&self) -> Result<Vec<UserPlace>> {
        self.table
            .scan()?
            .iter()
            .map(|(_, bytes)| decode(bytes))
            .collect()
    }

    pub fn update(&self, id: u64, patch: &UserPlacePatch) -> Result<UserPlace> {
        let mut place = self.get(id)?.ok_or(Error::NotFound(id))?;
        let set = |field: &mut String, value: &Option<String>| {
            if let Some(value) = value {
                *field = value.clone();
            }
        };
        set(&mut place.name, &patch.name);
        set(&mut place.country, &patch.country);
        set(&mut place.region, &patch.region);
        set(&mut place.municipality, &patch.municipality);
        set(&mut place.parish, &patch.parish);
        set(&mut place.village, &patch.village);
        set(&mut place.specific, &patch.specific);
        set(&mut place.coordinates, &patch.coordinates);
        set(&mut place.note, &patch.note);
        if place.name.trim().is_empty() {
            return Err(Error::Validation("place name must not be empty".into()));
        }
        self.table.put(id, &encode(&place)?)?;
        Ok(place)
    }

    pub fn delete(&self, id: u64) -> Result<()> {
        if self.table.delete(id)? {
            Ok(())
        } else {
            Err(Error::NotFound(id))
        }
    }

    pub fn set_matched_place(&self, id: u64, matched: Option<u64>) -> Result<()> {
        let mut place = self.get(id)?.ok_or(Error::NotFound(id))?;
        place.matched_place_id = matched;
        self.table.put(id, &encode(&place)?)
    }

    /// Mark an official copy as overridden so the merged view drops it while
    /// its identity key keeps shadowing the official record.
    pub fn hide(&self, id: u64) -> Result<()> {
        let mut place = self.get(id)?.ok_or(Error::NotFound(id))?;
        place.hidden = true;
        self.table.put(id, &encode(&place)?)
    }

    /// Copy an official record into this store as an editable user place,
    /// pre-linked to its gazetteer source.
    pub fn copy_from_gazetteer(&self, record: &GazetteerRecord) -> Result<u64> {
        let mut place = record.to_user_place();
        place.id = 0;
        place.hidden = false;
        self.add(place)
    }

    /// User places without a gazetteer match, annotated with the events that
    /// reference them, for operator triage.
    pub fn unmatched(&self, people: &[PersonEvents]) -> Result<Vec<UnmatchedPlace>> {
        let mut links_by_place: HashMap<u64, Vec<EventLink>> = HashMap::new();
        for person in people {
            for event in &person.events {
                if let Some(place_id) = event.place_id {
                    links_by_place.entry(place_id).or_default().push(EventLink {
                        person_id: person.person_id.clone(),
                        person_name: person.person_name.clone(),
                        event_id: event.event_id.clone(),
                        kind: event.kind.clone(),
                        date: event.date.clone(),
                    });
                }
            }
        }

        Ok(self
            .all()?
            .into_iter()
            .filter(|p| p.matched_place_id.is_none())
            .map(|place| {
                let links = links_by_place.remove(&place.id).unwrap_or_default();
                let link_count = links.len();
                UnmatchedPlace {
                    place,
                    links,
                    link_count,
                }
            })
            .collect())
    }
}

/// Merged listing: user places first, then official records whose identity
/// key no user place has claimed. Hidden user places are not emitted but
/// still claim their key, which is what makes override-without-delete work.
pub fn merged_places(
    users: &UserPlaceStore,
    gazetteer: &GazetteerStore,
) -> Result<Vec<MergedPlace>> {
    let user_places = users.all()?;
    let claimed: HashSet<String> = user_places.iter().map(|p| p.identity_key()).collect();

    let mut merged: Vec<MergedPlace> = user_places
        .into_iter()
        .filter(|p| !p.hidden)
        .map(|place| MergedPlace {
            source: MergeSource::User,
            place,
        })
        .collect();

    for record in gazetteer.all()? {
        let place = record.to_user_place();
        if !claimed.contains(&place.identity_key()) {
            merged.push(MergedPlace {
                source: MergeSource::Official,
                place,
            });
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventRecord;
    use crate::store::memory::MemTable;

    fn stores() -> (UserPlaceStore, GazetteerStore) {
        (
            UserPlaceStore::new(Arc::new(MemTable::new())),
            GazetteerStore::new(Arc::new(MemTable::new())),
        )
    }

    fn user_place(name: &str) -> UserPlace {
        UserPlace {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn official(locality: &str, county: &str) -> GazetteerRecord {
        let mut r = GazetteerRecord::new("test");
        r.locality_name = locality.to_string();
        r.county_name = county.to_string();
        r
    }

    #[test]
    fn add_requires_name() {
        let (users, _) = stores();
        let err = users.add(user_place("   ")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn hide_missing_place_is_not_found() {
        let (users, _) = stores();
        assert!(matches!(users.hide(9).unwrap_err(), Error::NotFound(9)));
    }

    #[test]
    fn merged_view_prefers_user_entry_for_shared_key() {
        let (users, gazetteer) = stores();
        let record = official("Gårdlösa", "Kristianstads län");
        gazetteer.insert(record.clone()).unwrap();

        // Same identity key as the official record's projection.
        let mut duplicate = record.to_user_place();
        duplicate.id = 0;
        duplicate.matched_place_id = None;
        users.add(duplicate).unwrap();
        users.add(user_place("Eget ställe")).unwrap();

        let merged = merged_places(&users, &gazetteer).unwrap();
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|m| m.source == MergeSource::User));

        let keys: Vec<String> = merged.iter().map(|m| m.place.identity_key()).collect();
        let distinct: HashSet<&String> = keys.iter().collect();
        assert_eq!(distinct.len(), keys.len());
    }

    #[test]
    fn hidden_copy_suppresses_official_without_being_listed() {
        let (users, gazetteer) = stores();
        let record = official("Tjustorp", "Kristianstads län");
        gazetteer.insert(record.clone()).unwrap();

        let copy_id = users.copy_from_gazetteer(&record).unwrap();
        users.hide(copy_id).unwrap();

        let merged = merged_places(&users, &gazetteer).unwrap();
        assert!(merged.is_empty());
    }

    #[test]
    fn unmatched_places_carry_event_links() {
        let (users, _) = stores();
        let unmatched_id = users.add(user_place("Okänd gård")).unwrap();
        let mut matched = user_place("Gårdlösa");
        matched.matched_place_id = Some(17);
        users.add(matched).unwrap();

        let people = vec![PersonEvents {
            person_id: "p1".into(),
            person_name: "Elna Persdotter".into(),
            events: vec![
                EventRecord {
                    event_id: "e1".into(),
                    kind: "birth".into(),
                    date: "1834-02-11".into(),
                    place_id: Some(unmatched_id),
                },
                EventRecord {
                    event_id: "e2".into(),
                    kind: "death".into(),
                    date: "1901-05-30".into(),
                    place_id: None,
                },
            ],
        }];

        let unmatched = users.unmatched(&people).unwrap();
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].place.id, unmatched_id);
        assert_eq!(unmatched[0].link_count, 1);
        assert_eq!(unmatched[0].links[0].event_id, "e1");
    }
}
