//! Batch pipeline from raw exports to gazetteer rows.

pub mod config;
pub mod loader;
pub mod survey;

pub use config::IngestConfig;
pub use loader::{LoadReport, Loader, MergeReport, PartitionMerger};
pub use survey::{read_survey, FeatureCollection, SurveyFeature, SurveyProperties};
