//! Ingest run configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::codes;

/// Configuration for one ingest run. The exclusion set is part of the config
/// rather than baked into the loader, so the natural-feature vocabulary can
/// be tuned per run.
#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Sled database directory.
    pub db_path: PathBuf,
    /// Directory of JSON hierarchy partitions, one file per county.
    #[serde(default)]
    pub partitions_dir: Option<PathBuf>,
    /// GeoJSON survey file, optionally gzipped.
    #[serde(default)]
    pub survey_file: Option<PathBuf>,
    /// Detail-type tags skipped unconditionally.
    #[serde(default = "default_exclude_types")]
    pub exclude_types: Vec<String>,
}

fn default_exclude_types() -> Vec<String> {
    codes::NATURE_DETAIL_TYPES
        .iter()
        .map(|t| t.to_string())
        .collect()
}

impl IngestConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: IngestConfig = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Config from command-line flags alone.
    pub fn from_parts(
        db_path: PathBuf,
        partitions_dir: Option<PathBuf>,
        survey_file: Option<PathBuf>,
    ) -> Self {
        Self {
            db_path,
            partitions_dir,
            survey_file,
            exclude_types: default_exclude_types(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_with_default_exclusions() {
        let config: IngestConfig = toml::from_str(r#"db_path = "gazetteer.db""#).unwrap();
        assert_eq!(config.db_path, PathBuf::from("gazetteer.db"));
        assert!(config.partitions_dir.is_none());
        assert!(config.exclude_types.contains(&"SJÖ".to_string()));
    }

    #[test]
    fn explicit_exclusions_replace_defaults() {
        let config: IngestConfig = toml::from_str(
            r#"
            db_path = "gazetteer.db"
            partitions_dir = "partitions"
            survey_file = "map.geojson.gz"
            exclude_types = ["SJÖ"]
            "#,
        )
        .unwrap();
        assert_eq!(config.exclude_types, vec!["SJÖ".to_string()]);
        assert_eq!(config.survey_file, Some(PathBuf::from("map.geojson.gz")));
    }
}
