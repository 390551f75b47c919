//! Reader for geographic survey dumps: GeoJSON point features whose
//! properties carry the denormalized administrative fields.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::info;

use crate::codes;
use crate::models::GazetteerRecord;

#[derive(Debug, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<SurveyFeature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SurveyFeature {
    #[serde(default)]
    pub properties: SurveyProperties,
    #[serde(default)]
    pub geometry: Option<PointGeometry>,
}

/// Property names follow the survey dump's Swedish column vocabulary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SurveyProperties {
    #[serde(default)]
    pub ortnamn: String,
    #[serde(default)]
    pub sockenstadnamn: String,
    #[serde(default)]
    pub sockenstadkod: String,
    #[serde(default)]
    pub kommunkod: String,
    #[serde(default)]
    pub lanskod: String,
    #[serde(default)]
    pub detaljtyp: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PointGeometry {
    /// GeoJSON order: longitude, latitude.
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

impl SurveyFeature {
    /// Gazetteer row for this feature. Municipality and county names are
    /// resolved from the code registries; unknown codes leave the name empty.
    pub fn to_record(&self, source: &str) -> GazetteerRecord {
        let props = &self.properties;
        let mut record = GazetteerRecord::new(source);
        record.locality_name = props.ortnamn.clone();
        record.parish_name = props.sockenstadnamn.clone();
        record.parish_code = props.sockenstadkod.clone();
        record.municipality_code = props.kommunkod.clone();
        record.municipality_name = codes::municipality_name(&props.kommunkod)
            .unwrap_or_default()
            .to_string();
        record.county_code = props.lanskod.clone();
        record.county_name = codes::county_name(&props.lanskod)
            .unwrap_or_default()
            .to_string();
        record.detail_type = props.detaljtyp.clone();
        if let Some(geometry) = &self.geometry {
            if let [lon, lat, ..] = geometry.coordinates[..] {
                record.longitude = Some(lon);
                record.latitude = Some(lat);
            }
        }
        record
    }
}

/// Read a survey FeatureCollection, transparently decompressing `.gz` files.
pub fn read_survey(path: &Path) -> Result<Vec<SurveyFeature>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open survey file {}", path.display()))?;
    let reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let collection: FeatureCollection =
        serde_json::from_reader(reader).context("Failed to parse survey GeoJSON")?;
    info!(
        "read {} survey features from {}",
        collection.features.len(),
        path.display()
    );
    Ok(collection.features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {
                    "ortnamn": "Gårdlösa",
                    "sockenstadnamn": "Smedstorp",
                    "sockenstadkod": "L-12345",
                    "kommunkod": "1270",
                    "lanskod": "12",
                    "detaljtyp": "BEBTX"
                },
                "geometry": { "type": "Point", "coordinates": [14.1261, 55.5565] }
            }
        ]
    }"#;

    #[test]
    fn feature_resolves_names_from_code_registries() {
        let collection: FeatureCollection = serde_json::from_str(SAMPLE).unwrap();
        let record = collection.features[0].to_record("map.geojson");

        assert_eq!(record.locality_name, "Gårdlösa");
        assert_eq!(record.municipality_name, "Tomelilla");
        assert_eq!(record.county_name, "Skåne län");
        assert_eq!(record.latitude, Some(55.5565));
        assert_eq!(record.longitude, Some(14.1261));
        assert_eq!(record.source, "map.geojson");
    }

    #[test]
    fn unknown_codes_leave_names_empty() {
        let feature = SurveyFeature {
            properties: SurveyProperties {
                ortnamn: "Okänd".into(),
                kommunkod: "9999".into(),
                lanskod: "99".into(),
                ..Default::default()
            },
            geometry: None,
        };
        let record = feature.to_record("test");
        assert!(record.municipality_name.is_empty());
        assert!(record.county_name.is_empty());
        assert_eq!(record.latitude, None);
    }

    #[test]
    fn reads_plain_and_gzipped_files() {
        let dir = tempfile::tempdir().unwrap();

        let plain = dir.path().join("map.geojson");
        std::fs::write(&plain, SAMPLE).unwrap();
        assert_eq!(read_survey(&plain).unwrap().len(), 1);

        let gz_path = dir.path().join("map.geojson.gz");
        let mut encoder = GzEncoder::new(File::create(&gz_path).unwrap(), Compression::default());
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        encoder.finish().unwrap();
        assert_eq!(read_survey(&gz_path).unwrap().len(), 1);
    }
}
