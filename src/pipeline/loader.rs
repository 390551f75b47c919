//! Dedup/load pipeline: partition merging and key-based admission into the
//! gazetteer store.
//!
//! Every candidate row passes through the same gate: excluded detail types
//! are dropped outright, then the normalized composite key decides. First
//! occurrence wins; later candidates with a seen key are counted and skipped.
//! The seen set is seeded from the store, so re-running a load over the same
//! input inserts nothing new.

use hashbrown::HashSet;
use tracing::warn;

use crate::error::Result;
use crate::hierarchy::{ClassifierConfig, CountyTable, DerivedPlace, PlaceForest, RawPlaceNode};
use crate::models::{normalize, GazetteerRecord};
use crate::store::GazetteerStore;

use super::survey::SurveyFeature;

/// Counters for one load run. Returned alongside success; a bad or duplicate
/// record never aborts the batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub inserted: usize,
    pub duplicate_keys: usize,
    pub excluded: usize,
}

impl LoadReport {
    pub fn absorb(&mut self, other: LoadReport) {
        self.inserted += other.inserted;
        self.duplicate_keys += other.duplicate_keys;
        self.excluded += other.excluded;
    }
}

pub struct Loader {
    gazetteer: GazetteerStore,
    exclude: HashSet<String>,
    seen: HashSet<String>,
}

impl Loader {
    /// Seeds the seen-key set from the rows already in the store.
    pub fn new<I, S>(gazetteer: GazetteerStore, exclude_types: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let seen = gazetteer
            .all()?
            .iter()
            .map(GazetteerRecord::composite_key)
            .collect();
        Ok(Self {
            gazetteer,
            exclude: exclude_types
                .into_iter()
                .map(|t| t.as_ref().to_uppercase())
                .collect(),
            seen,
        })
    }

    pub fn load_derived(&mut self, places: &[DerivedPlace]) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        for place in places {
            self.admit(place.to_record(), &mut report)?;
        }
        Ok(report)
    }

    pub fn load_survey(&mut self, features: &[SurveyFeature], source: &str) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        for feature in features {
            self.admit(feature.to_record(source), &mut report)?;
        }
        Ok(report)
    }

    fn admit(&mut self, record: GazetteerRecord, report: &mut LoadReport) -> Result<()> {
        if self.exclude.contains(&record.detail_type.to_uppercase()) {
            report.excluded += 1;
            return Ok(());
        }
        if !self.seen.insert(record.composite_key()) {
            report.duplicate_keys += 1;
            return Ok(());
        }
        self.gazetteer.insert(record)?;
        report.inserted += 1;
        Ok(())
    }
}

/// Counters for combining source partitions. Collisions are skipped, never
/// fatal.
#[derive(Debug, Default, Clone)]
pub struct MergeReport {
    pub nodes: usize,
    /// Same place id seen in two partitions.
    pub id_collisions: usize,
    /// Same administrative code seen in two partitions.
    pub code_collisions: usize,
    /// Municipality or county nodes repeated by name across partitions.
    pub unit_duplicates: usize,
    /// Partition labels whose county letter had to be guessed.
    pub ambiguous_sources: Vec<String>,
}

/// Combines per-county partitions into one forest.
///
/// Node, parent and administrative ids are prefixed with the partition's
/// county letter so they stay unique across partitions. Shared municipality
/// and county nodes that reappear in several partitions keep only their
/// first occurrence.
pub struct PartitionMerger<'a> {
    config: &'a ClassifierConfig,
    counties: &'a CountyTable,
    forest: PlaceForest,
    seen_codes: HashSet<String>,
    seen_municipalities: HashSet<String>,
    seen_counties: HashSet<String>,
    report: MergeReport,
}

impl<'a> PartitionMerger<'a> {
    pub fn new(config: &'a ClassifierConfig, counties: &'a CountyTable) -> Self {
        Self {
            config,
            counties,
            forest: PlaceForest::new(),
            seen_codes: HashSet::new(),
            seen_municipalities: HashSet::new(),
            seen_counties: HashSet::new(),
            report: MergeReport::default(),
        }
    }

    /// Absorb one partition's nodes under its source label.
    pub fn absorb(&mut self, label: &str, nodes: Vec<RawPlaceNode>) {
        let resolution = self.counties.resolve(label);
        if resolution.ambiguous {
            self.report.ambiguous_sources.push(label.to_string());
        }
        let letter = resolution.code;

        for mut node in nodes {
            node.source = label.to_string();
            prefix(&mut node.place_id, &letter);
            prefix(&mut node.parent_id, &letter);
            prefix(&mut node.code, &letter);

            if self.config.is_municipality(&node.kind_tag)
                && !self.seen_municipalities.insert(normalize(&node.short_name))
            {
                self.report.unit_duplicates += 1;
                continue;
            }
            if self.config.is_county_code(&node.kind_tag)
                && !self.seen_counties.insert(normalize(&node.short_name))
            {
                self.report.unit_duplicates += 1;
                continue;
            }
            if self.forest.contains(&node.place_id) {
                warn!("place id {} already absorbed from another partition", node.place_id);
                self.report.id_collisions += 1;
                continue;
            }
            if !node.code.is_empty() && !self.seen_codes.insert(node.code.clone()) {
                warn!("code {} already absorbed from another partition", node.code);
                self.report.code_collisions += 1;
                continue;
            }
            self.forest.insert(node);
            self.report.nodes += 1;
        }
    }

    pub fn finish(self) -> (PlaceForest, MergeReport) {
        (self.forest, self.report)
    }
}

fn prefix(id: &mut String, letter: &str) {
    if !id.is_empty() {
        *id = format!("{}-{}", letter, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::HierarchyBuilder;
    use crate::store::MemTable;
    use std::sync::Arc;

    fn store() -> GazetteerStore {
        GazetteerStore::new(Arc::new(MemTable::new()))
    }

    fn loader(gazetteer: &GazetteerStore) -> Loader {
        Loader::new(gazetteer.clone(), crate::codes::NATURE_DETAIL_TYPES.iter()).unwrap()
    }

    fn raw(id: &str, parent: &str, name: &str, kind: &str, code: &str) -> RawPlaceNode {
        RawPlaceNode {
            place_id: id.to_string(),
            parent_id: parent.to_string(),
            short_name: name.to_string(),
            kind_tag: kind.to_string(),
            code: code.to_string(),
            ..Default::default()
        }
    }

    fn derived(locality: &str, parish: &str, kommun: &str, lan: &str) -> DerivedPlace {
        DerivedPlace {
            node: RawPlaceNode {
                place_id: locality.to_lowercase(),
                short_name: locality.to_string(),
                ..Default::default()
            },
            municipality_name: kommun.to_string(),
            municipality_code: kommun.to_lowercase(),
            county_name: lan.to_string(),
            county_code: lan.chars().take(1).collect(),
            is_parish: !parish.is_empty(),
        }
    }

    #[test]
    fn load_derived_dedups_on_composite_key() {
        let gazetteer = store();
        let mut loader = loader(&gazetteer);

        let places = vec![
            derived("Gårdlösa", "x", "Tomelilla", "L"),
            derived("Gårdlösa", "x", "Tomelilla", "L"),
            derived("Tjustorp", "x", "Tomelilla", "L"),
        ];
        let report = loader.load_derived(&places).unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.duplicate_keys, 1);
        assert_eq!(gazetteer.count().unwrap(), 2);
    }

    #[test]
    fn reload_over_same_input_inserts_nothing() {
        let gazetteer = store();
        let places = vec![derived("Gårdlösa", "x", "Tomelilla", "L")];

        let report = loader(&gazetteer).load_derived(&places).unwrap();
        assert_eq!(report.inserted, 1);

        // Fresh loader, same store: the seen set is rebuilt from rows.
        let report = loader(&gazetteer).load_derived(&places).unwrap();
        assert_eq!(report.inserted, 0);
        assert_eq!(report.duplicate_keys, 1);
        assert_eq!(gazetteer.count().unwrap(), 1);
    }

    #[test]
    fn excluded_detail_types_never_load() {
        let gazetteer = store();
        let mut loader = loader(&gazetteer);

        let mut lake = derived("Stora sjön", "", "Tomelilla", "L");
        lake.node.kind_tag = "sjö".to_string();
        let report = loader.load_derived(&[lake]).unwrap();
        assert_eq!(report.excluded, 1);
        assert_eq!(gazetteer.count().unwrap(), 0);
    }

    #[test]
    fn survey_features_pass_the_same_gate() {
        use crate::pipeline::survey::{SurveyProperties, SurveyFeature};

        let gazetteer = store();
        let mut loader = loader(&gazetteer);
        let feature = |ortnamn: &str, detaljtyp: &str| SurveyFeature {
            properties: SurveyProperties {
                ortnamn: ortnamn.to_string(),
                kommunkod: "1270".to_string(),
                lanskod: "12".to_string(),
                detaljtyp: detaljtyp.to_string(),
                ..Default::default()
            },
            geometry: None,
        };

        let features = vec![
            feature("Gårdlösa", "BEBTX"),
            feature("Gårdlösa", "BEBTX"),
            feature("Lillsjön", "SJÖ"),
        ];
        let report = loader.load_survey(&features, "map.geojson").unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.duplicate_keys, 1);
        assert_eq!(report.excluded, 1);
        assert_eq!(gazetteer.all().unwrap()[0].municipality_name, "Tomelilla");
    }

    #[test]
    fn merger_prefixes_ids_and_codes_with_county_letter() {
        let config = ClassifierConfig::default();
        let counties = CountyTable::builtin();
        let mut merger = PartitionMerger::new(&config, &counties);

        merger.absorb(
            "kristianstads.json",
            vec![
                raw("1", "", "Kristianstads län", "L", ""),
                raw("2", "1", "Tomelilla kommun", "Kommun", "1270"),
                raw("3", "2", "Smedstorp", "Socken", "12345"),
            ],
        );
        let (forest, report) = merger.finish();

        assert_eq!(report.nodes, 3);
        let parish = forest.get("L-3").unwrap();
        assert_eq!(parish.parent_id, "L-2");
        assert_eq!(parish.code, "L-12345");
        assert_eq!(parish.source, "kristianstads.json");

        // Prefixed chains still resolve end to end.
        let (derived, _) = HierarchyBuilder::default().derive(&forest);
        let smedstorp = derived
            .iter()
            .find(|p| p.node.place_id == "L-3")
            .unwrap();
        assert_eq!(smedstorp.county_code, "L");
        assert_eq!(smedstorp.municipality_code, "L-1270");
        assert!(smedstorp.is_parish);
    }

    #[test]
    fn cross_partition_collisions_are_counted_and_skipped() {
        let config = ClassifierConfig::default();
        let counties = CountyTable::builtin();
        let mut merger = PartitionMerger::new(&config, &counties);

        merger.absorb("blekinge.json", vec![raw("7", "", "Nättraby", "By", "500")]);
        // Same label resolves to the same prefix, so both ids collide.
        merger.absorb("blekinge.json", vec![raw("7", "", "Nättraby", "By", "501")]);
        merger.absorb("blekinge.json", vec![raw("8", "", "Annat", "By", "500")]);

        let (forest, report) = merger.finish();
        assert_eq!(forest.len(), 1);
        assert_eq!(report.id_collisions, 1);
        assert_eq!(report.code_collisions, 1);
    }

    #[test]
    fn shared_units_keep_first_occurrence_only() {
        let config = ClassifierConfig::default();
        let counties = CountyTable::builtin();
        let mut merger = PartitionMerger::new(&config, &counties);

        merger.absorb(
            "kristianstads.json",
            vec![raw("1", "", "Tomelilla kommun", "Kommun", "1270")],
        );
        merger.absorb(
            "malmöhus.json",
            vec![raw("1", "", " tomelilla kommun ", "Kommun", "1270")],
        );

        let (forest, report) = merger.finish();
        assert_eq!(forest.len(), 1);
        assert_eq!(report.unit_duplicates, 1);
        assert!(forest.contains("L-1"));
        assert!(!forest.contains("M-1"));
    }

    #[test]
    fn unknown_partition_label_is_reported_ambiguous() {
        let config = ClassifierConfig::default();
        let counties = CountyTable::builtin();
        let mut merger = PartitionMerger::new(&config, &counties);

        merger.absorb("mystery.json", vec![raw("1", "", "Ställe", "By", "")]);
        let (_, report) = merger.finish();
        assert_eq!(report.ambiguous_sources, vec!["mystery.json".to_string()]);
    }
}
