//! Derivation of enclosing municipality and county for every hierarchy node.
//!
//! Export nodes carry their administrative context only implicitly, through
//! parent links. The builder walks each node's chain upward, takes the first
//! municipality and county ancestor it meets, and classifies the node itself
//! as a parish or not. The result is a flat set of records ready for loading.

use regex::Regex;
use tracing::warn;

use crate::models::GazetteerRecord;

use super::forest::{PlaceForest, RawPlaceNode};

/// Keyword and pattern tables for classifying hierarchy nodes.
///
/// These are fuzzy domain vocabulary, kept as explicit injectable data so
/// they can be extended for other export dialects without touching the walk.
pub struct ClassifierConfig {
    /// Case-insensitive substring marking a municipality kind tag.
    municipality_token: String,
    /// Kind tags that mark a parish outright.
    parish_kinds: Vec<String>,
    /// Administrative codes of this shape also mark a parish.
    parish_code: Regex,
    /// Suffixes stripped from county names.
    county_suffixes: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            municipality_token: "kommun".to_string(),
            parish_kinds: ["parish", "socken", "församling"]
                .map(str::to_string)
                .to_vec(),
            parish_code: Regex::new(r"^[A-Z]{1,2}-\d{5,6}$").expect("valid regex"),
            county_suffixes: [" län", " Län"].map(str::to_string).to_vec(),
        }
    }
}

impl ClassifierConfig {
    pub fn is_municipality(&self, kind_tag: &str) -> bool {
        kind_tag.to_lowercase().contains(&self.municipality_token)
    }

    /// County nodes carry their county letter as the kind tag: one or two
    /// uppercase letters ("L", "AB", "BD").
    pub fn is_county_code(&self, kind_tag: &str) -> bool {
        let count = kind_tag.chars().count();
        (1..=2).contains(&count) && kind_tag.chars().all(|c| c.is_uppercase())
    }

    pub fn is_parish(&self, kind_tag: &str, code: &str) -> bool {
        let kind = kind_tag.trim().to_lowercase();
        self.parish_kinds.iter().any(|k| *k == kind) || self.parish_code.is_match(code)
    }

    pub fn strip_county_suffix(&self, name: &str) -> String {
        for suffix in &self.county_suffixes {
            if let Some(stripped) = name.strip_suffix(suffix.as_str()) {
                return stripped.to_string();
            }
        }
        name.to_string()
    }
}

/// A node with its derived administrative context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedPlace {
    pub node: RawPlaceNode,
    pub municipality_name: String,
    pub municipality_code: String,
    pub county_name: String,
    pub county_code: String,
    pub is_parish: bool,
}

impl DerivedPlace {
    /// Gazetteer row for this node. Parishes get their own name in the
    /// parish slot; everything keeps its name as the locality.
    pub fn to_record(&self) -> GazetteerRecord {
        let mut record = GazetteerRecord::new(&self.node.source);
        record.locality_name = self.node.short_name.clone();
        if self.is_parish {
            record.parish_name = self.node.short_name.clone();
        }
        record.parish_code = self.node.code.clone();
        record.municipality_code = self.municipality_code.clone();
        record.municipality_name = self.municipality_name.clone();
        record.county_code = self.county_code.clone();
        record.county_name = self.county_name.clone();
        record.detail_type = self.node.kind_tag.clone();
        record.latitude = self.node.latitude;
        record.longitude = self.node.longitude;
        record
    }
}

/// Counters accumulated over one derivation run. Nothing here is fatal.
#[derive(Debug, Default, Clone)]
pub struct BuildReport {
    pub nodes: usize,
    pub parishes: usize,
    /// Nodes whose parent chain revisited a node.
    pub cycles: usize,
    pub cycle_ids: Vec<String>,
    /// Nodes left without any municipality or county.
    pub unresolved: usize,
}

pub struct HierarchyBuilder {
    config: ClassifierConfig,
}

impl Default for HierarchyBuilder {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

impl HierarchyBuilder {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Derive municipality, county and parish classification for every node.
    ///
    /// Each node depends only on its own fields and its ancestor chain, so
    /// the outcome is independent of processing order; output is sorted by
    /// place id. Nodes that resolve nothing are kept with empty fields.
    pub fn derive(&self, forest: &PlaceForest) -> (Vec<DerivedPlace>, BuildReport) {
        let mut report = BuildReport {
            nodes: forest.len(),
            ..Default::default()
        };

        let mut derived: Vec<DerivedPlace> = forest
            .iter()
            .map(|node| self.derive_one(forest, node, &mut report))
            .collect();
        derived.sort_by(|a, b| a.node.place_id.cmp(&b.node.place_id));

        (derived, report)
    }

    fn derive_one(
        &self,
        forest: &PlaceForest,
        node: &RawPlaceNode,
        report: &mut BuildReport,
    ) -> DerivedPlace {
        let chain = forest.ancestors(&node.place_id);
        if chain.cycle {
            warn!(
                "parent chain of {} ('{}') contains a cycle",
                node.place_id, node.short_name
            );
            report.cycles += 1;
            report.cycle_ids.push(node.place_id.clone());
        }

        let mut place = DerivedPlace {
            node: node.clone(),
            ..Default::default()
        };

        for ancestor in &chain.nodes {
            if place.municipality_name.is_empty() && self.config.is_municipality(&ancestor.kind_tag)
            {
                place.municipality_name = ancestor.short_name.clone();
                place.municipality_code = ancestor.code.clone();
            }
            if place.county_code.is_empty() && self.config.is_county_code(&ancestor.kind_tag) {
                place.county_code = ancestor.kind_tag.clone();
                place.county_name = self.config.strip_county_suffix(&ancestor.short_name);
            }
        }

        // A node that is itself a county or municipality trumps whatever the
        // walk found above it.
        if self.config.is_county_code(&node.kind_tag) {
            place.county_code = node.kind_tag.clone();
            place.county_name = self.config.strip_county_suffix(&node.short_name);
        }
        if self.config.is_municipality(&node.kind_tag) {
            place.municipality_name = node.short_name.clone();
            place.municipality_code = node.code.clone();
        }

        place.is_parish = self.config.is_parish(&node.kind_tag, &node.code);
        if place.is_parish {
            report.parishes += 1;
        }
        if place.municipality_name.is_empty() && place.county_code.is_empty() {
            report.unresolved += 1;
        }
        place
    }
}
