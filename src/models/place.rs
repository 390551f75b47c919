//! Persisted place records: the canonical gazetteer row and the user-authored
//! place, plus the merged display form combining the two.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{normalize, PlaceFields, StructuredPlace};

/// Administrative level of a gazetteer record, judged from which denormalized
/// fields it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceLevel {
    Locality,
    Parish,
    Municipality,
    County,
    Unknown,
}

/// One row of the canonical gazetteer.
///
/// The administrative hierarchy is denormalized onto every record: a locality
/// row also names its parish, municipality and county, so lookups never walk
/// anything at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GazetteerRecord {
    pub id: u64,
    /// Locality name (ortnamn): village, farm or building.
    #[serde(default)]
    pub locality_name: String,
    #[serde(default)]
    pub parish_name: String,
    #[serde(default)]
    pub parish_code: String,
    #[serde(default)]
    pub municipality_code: String,
    #[serde(default)]
    pub municipality_name: String,
    #[serde(default)]
    pub county_code: String,
    #[serde(default)]
    pub county_name: String,
    /// Survey detail-type tag (BEBTX, KYRKA, ...) or hierarchy kind tag.
    #[serde(default)]
    pub detail_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Source partition or file name, for refresh tracking.
    #[serde(default)]
    pub source: String,
    pub imported_at: DateTime<Utc>,
}

impl GazetteerRecord {
    /// Create an empty record stamped with its source.
    pub fn new(source: &str) -> Self {
        Self {
            id: 0,
            locality_name: String::new(),
            parish_name: String::new(),
            parish_code: String::new(),
            municipality_code: String::new(),
            municipality_name: String::new(),
            county_code: String::new(),
            county_name: String::new(),
            detail_type: String::new(),
            latitude: None,
            longitude: None,
            source: source.to_string(),
            imported_at: Utc::now(),
        }
    }

    /// Normalized composite key the load pipeline dedups on.
    pub fn composite_key(&self) -> String {
        [
            &self.locality_name,
            &self.parish_name,
            &self.municipality_code,
            &self.county_code,
        ]
        .map(|f| normalize(f))
        .join("|")
    }

    /// Grouping key for post-load duplicate cleanup. Unlike the load key this
    /// groups on municipality and county *names*, so rows that entered through
    /// differently-coded pipelines still collapse.
    pub fn cleanup_key(&self) -> String {
        [
            &self.locality_name,
            &self.parish_name,
            &self.municipality_name,
            &self.county_name,
        ]
        .map(|f| normalize(f))
        .join("|")
    }

    pub fn level(&self) -> PlaceLevel {
        if !self.locality_name.is_empty() {
            PlaceLevel::Locality
        } else if !self.parish_name.is_empty() {
            PlaceLevel::Parish
        } else if !self.municipality_name.is_empty() {
            PlaceLevel::Municipality
        } else if !self.county_name.is_empty() {
            PlaceLevel::County
        } else {
            PlaceLevel::Unknown
        }
    }

    /// Most specific non-empty name on the record.
    pub fn display_name(&self) -> &str {
        [
            &self.locality_name,
            &self.parish_name,
            &self.municipality_name,
            &self.county_name,
        ]
        .into_iter()
        .find(|n| !n.is_empty())
        .map(String::as_str)
        .unwrap_or("")
    }

    /// Projection into the six comparable fields. The county occupies the
    /// region slot (genealogical place strings put the county second from the
    /// end), the country slot is the fixed national name, and `specific` has
    /// no gazetteer counterpart and stays empty.
    pub fn fields(&self) -> PlaceFields {
        PlaceFields {
            country: "Sverige".to_string(),
            region: self.county_name.clone(),
            municipality: self.municipality_name.clone(),
            parish: self.parish_name.clone(),
            village: self.locality_name.clone(),
            specific: String::new(),
        }
    }

    /// Editable user-schema view of this record, used when copying it into a
    /// user store and when it appears in the merged place list.
    pub fn to_user_place(&self) -> UserPlace {
        let fields = self.fields();
        UserPlace {
            id: self.id,
            name: self.display_name().to_string(),
            country: fields.country,
            region: fields.region,
            municipality: fields.municipality,
            parish: fields.parish,
            village: fields.village,
            specific: String::new(),
            coordinates: match (self.latitude, self.longitude) {
                (Some(lat), Some(lon)) => format!("{}, {}", lat, lon),
                _ => String::new(),
            },
            note: String::new(),
            matched_place_id: Some(self.id),
            hidden: false,
        }
    }
}

/// A place as a user recorded it against an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPlace {
    #[serde(default)]
    pub id: u64,
    pub name: String,
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
    #[serde(default)]
    pub coordinates: String,
    #[serde(default)]
    pub note: String,
    /// Soft reference to the matched gazetteer record, absent when the
    /// matcher found nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_place_id: Option<u64>,
    /// Set when this is an overridden copy of an official record that should
    /// no longer show up in merged listings.
    #[serde(default)]
    pub hidden: bool,
}

impl UserPlace {
    /// Identity key used by the merge view: a user place claims this key and
    /// thereby shadows the official record sharing it.
    pub fn identity_key(&self) -> String {
        [&self.name, &self.country, &self.region, &self.parish]
            .map(|f| normalize(f))
            .join("|")
    }

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

    /// Fill empty hierarchy fields from a parsed place string, leaving any
    /// field the user supplied untouched.
    pub fn fill_from(&mut self, parsed: &StructuredPlace) {
        let fill = |own: &mut String, parsed: &str| {
            if own.is_empty() && !parsed.is_empty() {
                *own = parsed.to_string();
            }
        };
        fill(&mut self.country, &parsed.country);
        fill(&mut self.region, &parsed.region);
        fill(&mut self.municipality, &parsed.municipality);
        fill(&mut self.parish, &parsed.parish);
        fill(&mut self.village, &parsed.village);
        fill(&mut self.specific, &parsed.specific);
    }
}

/// Where a merged-list entry originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeSource {
    User,
    Official,
}

/// One entry of the merged place list served to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct MergedPlace {
    pub source: MergeSource,
    #[serde(flatten)]
    pub place: UserPlace,
}
