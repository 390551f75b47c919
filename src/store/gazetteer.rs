//! Canonical gazetteer store: CRUD, substring search and duplicate cleanup.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{normalize, GazetteerRecord};

use super::table::{decode, encode, Table};

/// Partial update of a gazetteer record. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GazetteerPatch {
    pub locality_name: Option<String>,
    pub parish_name: Option<String>,
    pub parish_code: Option<String>,
    pub municipality_code: Option<String>,
    pub municipality_name: Option<String>,
    pub county_code: Option<String>,
    pub county_name: Option<String>,
    pub detail_type: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A distinct administrative unit in the drill-down listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminEntry {
    pub code: String,
    pub name: String,
}

/// A locality under a parish, listed by id and name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalityEntry {
    pub id: u64,
    pub name: String,
}

#[derive(Clone)]
pub struct GazetteerStore {
    table: Arc<dyn Table>,
}

impl GazetteerStore {
    pub fn new(table: Arc<dyn Table>) -> Self {
        Self { table }
    }

    /// Insert a record, assigning its id. Key-uniqueness is the load
    /// pipeline's job; the store itself accepts whatever it is handed.
    pub fn insert(&self, mut record: GazetteerRecord) -> Result<u64> {
        record.id = self.table.next_id()?;
        self.table.put(record.id, &encode(&record)?)?;
        Ok(record.id)
    }

    pub fn get(&self, id: u64) -> Result<Option<GazetteerRecord>> {
        match self.table.get(id)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All records in ascending id order.
    pub fn all(&self) -> Result<Vec<GazetteerRecord>> {
        self.table
            .scan()?
            .iter()
            .map(|(_, bytes)| decode(bytes))
            .collect()
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.table.scan()?.len())
    }

    pub fn update(&self, id: u64, patch: &GazetteerPatch) -> Result<GazetteerRecord> {
        let mut record = self.get(id)?.ok_or(Error::NotFound(id))?;
        let set = |field: &mut String, value: &Option<String>| {
            if let Some(value) = value {
                *field = value.clone();
            }
        };
        set(&mut record.locality_name, &patch.locality_name);
        set(&mut record.parish_name, &patch.parish_name);
        set(&mut record.parish_code, &patch.parish_code);
        set(&mut record.municipality_code, &patch.municipality_code);
        set(&mut record.municipality_name, &patch.municipality_name);
        set(&mut record.county_code, &patch.county_code);
        set(&mut record.county_name, &patch.county_name);
        set(&mut record.detail_type, &patch.detail_type);
        if patch.latitude.is_some() {
            record.latitude = patch.latitude;
        }
        if patch.longitude.is_some() {
            record.longitude = patch.longitude;
        }
        self.table.put(id, &encode(&record)?)?;
        Ok(record)
    }

    pub fn delete(&self, id: u64) -> Result<()> {
        if self.table.delete(id)? {
            Ok(())
        } else {
            Err(Error::NotFound(id))
        }
    }

    /// Drop every record. Used by a fresh ingest run.
    pub fn clear(&self) -> Result<usize> {
        let rows = self.table.scan()?;
        for (id, _) in &rows {
            self.table.delete(*id)?;
        }
        Ok(rows.len())
    }

    /// Case-insensitive substring prefilter over locality, municipality,
    /// county and parish names. Results come back in id order, which is what
    /// makes the matcher's first-match tie-break deterministic.
    pub fn search(&self, query: &str) -> Result<Vec<GazetteerRecord>> {
        let needle = normalize(query);
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .all()?
            .into_iter()
            .filter(|r| {
                [
                    &r.locality_name,
                    &r.municipality_name,
                    &r.county_name,
                    &r.parish_name,
                ]
                .iter()
                .any(|f| normalize(f).contains(&needle))
            })
            .collect())
    }

    /// Delete every record whose cleanup key is already claimed by a
    /// lower-id record. Safe to re-run; a second pass deletes nothing.
    pub fn remove_duplicates(&self) -> Result<usize> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut removed = 0;
        for record in self.all()? {
            if !seen.insert(record.cleanup_key()) {
                self.table.delete(record.id)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Distinct counties, sorted by name.
    pub fn counties(&self) -> Result<Vec<AdminEntry>> {
        self.distinct(|r| {
            (!r.county_name.is_empty()).then(|| AdminEntry {
                code: r.county_code.clone(),
                name: r.county_name.clone(),
            })
        })
    }

    /// Distinct municipalities within a county, sorted by name.
    pub fn municipalities_in_county(&self, county_code: &str) -> Result<Vec<AdminEntry>> {
        let county = normalize(county_code);
        self.distinct(|r| {
            (normalize(&r.county_code) == county && !r.municipality_name.is_empty()).then(|| {
                AdminEntry {
                    code: r.municipality_code.clone(),
                    name: r.municipality_name.clone(),
                }
            })
        })
    }

    /// Distinct parishes within a municipality, sorted by name.
    pub fn parishes_in_municipality(&self, municipality_code: &str) -> Result<Vec<AdminEntry>> {
        let municipality = normalize(municipality_code);
        self.distinct(|r| {
            (normalize(&r.municipality_code) == municipality && !r.parish_name.is_empty()).then(
                || AdminEntry {
                    code: r.parish_code.clone(),
                    name: r.parish_name.clone(),
                },
            )
        })
    }

    /// Localities within a parish, sorted by name.
    pub fn localities_in_parish(&self, parish_code: &str) -> Result<Vec<LocalityEntry>> {
        let parish = normalize(parish_code);
        let mut entries: Vec<LocalityEntry> = self
            .all()?
            .into_iter()
            .filter(|r| normalize(&r.parish_code) == parish && !r.locality_name.is_empty())
            .map(|r| LocalityEntry {
                id: r.id,
                name: r.locality_name,
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn distinct<F>(&self, project: F) -> Result<Vec<AdminEntry>>
    where
        F: Fn(&GazetteerRecord) -> Option<AdminEntry>,
    {
        let mut by_key: HashMap<String, AdminEntry> = HashMap::new();
        for record in self.all()? {
            if let Some(entry) = project(&record) {
                by_key.entry(normalize(&entry.name)).or_insert(entry);
            }
        }
        let mut entries: Vec<AdminEntry> = by_key.into_values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemTable;

    fn store() -> GazetteerStore {
        GazetteerStore::new(Arc::new(MemTable::new()))
    }

    fn record(locality: &str, parish: &str, municipality: &str, county: &str) -> GazetteerRecord {
        let mut r = GazetteerRecord::new("test");
        r.locality_name = locality.to_string();
        r.parish_name = parish.to_string();
        r.municipality_name = municipality.to_string();
        r.county_name = county.to_string();
        r
    }

    #[test]
    fn update_patches_only_given_fields() {
        let store = store();
        let id = store
            .insert(record("Gårdlösa", "Smedstorp", "Tomelilla", "Kristianstad"))
            .unwrap();

        let patch = GazetteerPatch {
            locality_name: Some("Gårdlösa by".to_string()),
            ..Default::default()
        };
        let updated = store.update(id, &patch).unwrap();
        assert_eq!(updated.locality_name, "Gårdlösa by");
        assert_eq!(updated.parish_name, "Smedstorp");
    }

    #[test]
    fn update_missing_id_is_not_found() {
        let err = store().update(42, &GazetteerPatch::default()).unwrap_err();
        assert!(matches!(err, Error::NotFound(42)));
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let store = store();
        store
            .insert(record("Gårdlösa", "Smedstorp", "Tomelilla", "Kristianstad"))
            .unwrap();
        store
            .insert(record("Fresta", "Fresta", "Upplands Väsby", "Stockholm"))
            .unwrap();

        let hits = store.search("tomel").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].locality_name, "Gårdlösa");
        assert!(store.search("").unwrap().is_empty());
    }

    #[test]
    fn remove_duplicates_keeps_lowest_id_and_is_idempotent() {
        let store = store();
        let first = store
            .insert(record("Byn", "Socknen", "Kommunen", "Länet"))
            .unwrap();
        store
            .insert(record("  byn ", "SOCKNEN", "Kommunen", "Länet"))
            .unwrap();
        store
            .insert(record("Byn", "Socknen", "Kommunen", "Länet"))
            .unwrap();
        store
            .insert(record("Annan", "Socknen", "Kommunen", "Länet"))
            .unwrap();

        assert_eq!(store.remove_duplicates().unwrap(), 2);
        assert_eq!(store.count().unwrap(), 2);
        assert!(store.get(first).unwrap().is_some());

        assert_eq!(store.remove_duplicates().unwrap(), 0);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn drill_down_listings_are_distinct_and_sorted() {
        let store = store();
        let mut a = record("Gårdlösa", "Smedstorp", "Tomelilla", "Kristianstads län");
        a.county_code = "L".into();
        a.municipality_code = "1270".into();
        a.parish_code = "L-12345".into();
        store.insert(a.clone()).unwrap();
        a.locality_name = "Tjustorp".into();
        store.insert(a).unwrap();
        let mut b = record("Everöd", "Everöd", "Kristianstad", "Kristianstads län");
        b.county_code = "L".into();
        b.municipality_code = "1290".into();
        b.parish_code = "L-54321".into();
        store.insert(b).unwrap();

        let counties = store.counties().unwrap();
        assert_eq!(counties.len(), 1);
        assert_eq!(counties[0].name, "Kristianstads län");

        let municipalities = store.municipalities_in_county("L").unwrap();
        assert_eq!(
            municipalities
                .iter()
                .map(|m| m.name.as_str())
                .collect::<Vec<_>>(),
            vec!["Kristianstad", "Tomelilla"]
        );

        let localities = store.localities_in_parish("L-12345").unwrap();
        assert_eq!(
            localities.iter().map(|l| l.name.as_str()).collect::<Vec<_>>(),
            vec!["Gårdlösa", "Tjustorp"]
        );
    }
}
