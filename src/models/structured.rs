//! Structured view of a free-text place reference.

use serde::{Deserialize, Serialize};

use super::normalize;

/// Country classification of a parsed place string.
///
/// `Unknown` means the trailing token matched neither heuristic; consumers
/// must handle it explicitly rather than assuming Sweden.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceKind {
    Sweden,
    Usa,
    #[default]
    Unknown,
}

/// Output of the place-string parser. A value object, never persisted as-is.
///
/// Fields hold whatever segment occupied the corresponding position in the
/// input; short inputs leave trailing positions empty. For Swedish records the
/// canonical five-segment order is farm, village, parish, county, country.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredPlace {
    #[serde(rename = "type")]
    pub kind: PlaceKind,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub municipality: String,
    #[serde(default)]
    pub parish: String,
    #[serde(default)]
    pub village: String,
    #[serde(default)]
    pub specific: String,
}

impl StructuredPlace {
    pub fn fields(&self) -> PlaceFields {
        PlaceFields {
            country: self.country.clone(),
            region: self.region.clone(),
            municipality: self.municipality.clone(),
            parish: self.parish.clone(),
            village: self.village.clone(),
            specific: self.specific.clone(),
        }
    }
}

/// The six comparable fields shared by user input and gazetteer candidates.
///
/// Both sides of a match are projected into this shape so the matcher and the
/// merge view compare like with like.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceFields {
    pub country: String,
    pub region: String,
    pub municipality: String,
    pub parish: String,
    pub village: String,
    pub specific: String,
}

impl PlaceFields {
    pub fn as_array(&self) -> [&str; 6] {
        [
            &self.country,
            &self.region,
            &self.municipality,
            &self.parish,
            &self.village,
            &self.specific,
        ]
    }

    /// True when every incoming non-empty field equals the candidate's
    /// corresponding field after normalization. Absent incoming fields impose
    /// no constraint; an empty candidate field fails a constrained comparison.
    pub fn satisfies(&self, incoming: &PlaceFields) -> bool {
        incoming
            .as_array()
            .iter()
            .zip(self.as_array())
            .all(|(wanted, have)| {
                let wanted = normalize(wanted);
                wanted.is_empty() || wanted == normalize(have)
            })
    }
}
