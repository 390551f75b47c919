//! Persistent stores for the two record sets: the canonical gazetteer and the
//! user's own places.

pub mod disk;
pub mod gazetteer;
pub mod memory;
pub mod table;
pub mod user;

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::matcher::{self, MatchOutcome};
use crate::models::UserPlace;
use crate::parse;

pub use disk::SledTable;
pub use gazetteer::{AdminEntry, GazetteerPatch, GazetteerStore, LocalityEntry};
pub use memory::MemTable;
pub use table::Table;
pub use user::{merged_places, UserPlacePatch, UserPlaceStore};

/// Both stores, opened over a shared backend.
#[derive(Clone)]
pub struct Stores {
    pub gazetteer: GazetteerStore,
    pub users: UserPlaceStore,
}

/// Open the sled-backed stores at `path`, creating them if absent.
pub fn open(path: &Path) -> Result<Stores> {
    let db = sled::open(path)?;
    Ok(Stores {
        gazetteer: GazetteerStore::new(Arc::new(SledTable::open(&db, "gazetteer")?)),
        users: UserPlaceStore::new(Arc::new(SledTable::open(&db, "user_places")?)),
    })
}

/// In-memory stores for tests and harnesses.
pub fn open_in_memory() -> Stores {
    Stores {
        gazetteer: GazetteerStore::new(Arc::new(MemTable::new())),
        users: UserPlaceStore::new(Arc::new(MemTable::new())),
    }
}

/// Result of recording a place against an event.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedPlace {
    #[serde(flatten)]
    pub place: UserPlace,
    pub match_outcome: Option<MatchOutcome>,
}

impl Stores {
    /// The request-time flow: parse the free-text name, fill missing
    /// hierarchy fields, prefilter candidates on the most specific available
    /// name, match, and persist. A place that matches nothing is stored with
    /// an absent match reference, not rejected.
    pub fn record_place(&self, mut place: UserPlace) -> Result<RecordedPlace> {
        let parsed = parse::parse(&place.name);
        place.fill_from(&parsed);

        let query = [&place.village, &place.parish, &place.name]
            .into_iter()
            .find(|f| !f.trim().is_empty())
            .cloned()
            .unwrap_or_default();
        let candidates = self.gazetteer.search(&query)?;
        let outcome = matcher::match_place(&place, &candidates);

        match &outcome {
            Some(outcome) => info!(
                "place '{}' matched gazetteer record {} ({:?})",
                place.name, outcome.place_id, outcome.reason
            ),
            None => info!("place '{}' left unmatched", place.name),
        }

        place.matched_place_id = outcome.as_ref().map(|o| o.place_id);
        let id = self.users.add(place)?;
        let place = self
            .users
            .get(id)?
            .ok_or(crate::error::Error::NotFound(id))?;
        Ok(RecordedPlace {
            place,
            match_outcome: outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchReason;
    use crate::models::GazetteerRecord;

    fn seeded() -> Stores {
        let stores = open_in_memory();
        let mut record = GazetteerRecord::new("test");
        record.locality_name = "Gårdlösa".into();
        record.parish_name = "Smedstorp".into();
        record.municipality_name = "Tomelilla".into();
        record.county_name = "Kristianstads län".into();
        stores.gazetteer.insert(record).unwrap();
        stores
    }

    #[test]
    fn record_place_links_match_and_persists() {
        let stores = seeded();
        let place = UserPlace {
            name: "Gårdlösa, Smedstorp, Kristianstads län, Sverige".into(),
            ..Default::default()
        };
        let recorded = stores.record_place(place).unwrap();

        let outcome = recorded.match_outcome.expect("should match");
        assert_eq!(outcome.reason, MatchReason::Exact);
        assert_eq!(recorded.place.matched_place_id, Some(outcome.place_id));
        // Parser filled the hierarchy fields from the name.
        assert_eq!(recorded.place.country, "Sverige");
        assert_eq!(recorded.place.region, "Kristianstads län");
        assert_eq!(recorded.place.village, "Gårdlösa");

        let stored = stores.users.get(recorded.place.id).unwrap().unwrap();
        assert_eq!(stored.matched_place_id, recorded.place.matched_place_id);
    }

    #[test]
    fn record_place_without_match_persists_unlinked() {
        let stores = seeded();
        let place = UserPlace {
            name: "Ingenstans, Okänt län".into(),
            ..Default::default()
        };
        let recorded = stores.record_place(place).unwrap();
        assert!(recorded.match_outcome.is_none());
        assert_eq!(recorded.place.matched_place_id, None);
        assert_eq!(stores.users.unmatched(&[]).unwrap().len(), 1);
    }
}
