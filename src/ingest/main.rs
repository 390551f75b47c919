//! Gazetteer ingest pipeline.
//!
//! Reads per-county hierarchy partitions and a geographic survey dump,
//! derives the administrative hierarchy, and loads deduplicated rows into
//! the sled-backed gazetteer.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use walkdir::WalkDir;

use ortnamn::hierarchy::{ClassifierConfig, CountyTable, HierarchyBuilder, RawPlaceNode};
use ortnamn::pipeline::{read_survey, IngestConfig, LoadReport, Loader, PartitionMerger};
use ortnamn::store;

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Build the place gazetteer from hierarchy partitions and survey data")]
struct Args {
    /// TOML config file; flags below are used when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sled database directory
    #[arg(long, default_value = "gazetteer.db")]
    db: PathBuf,

    /// Directory of JSON hierarchy partitions, one per county
    #[arg(long)]
    partitions: Option<PathBuf>,

    /// GeoJSON survey file (optionally gzipped)
    #[arg(long)]
    survey: Option<PathBuf>,

    /// Clear the gazetteer before loading
    #[arg(long)]
    clear: bool,

    /// Run duplicate cleanup after loading
    #[arg(long)]
    dedup: bool,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => IngestConfig::load_from_file(path)?,
        None => IngestConfig::from_parts(args.db.clone(), args.partitions.clone(), args.survey.clone()),
    };

    info!("Gazetteer Ingest Pipeline");
    info!("Database: {}", config.db_path.display());

    let stores = store::open(&config.db_path).context("Failed to open place database")?;
    if args.clear {
        let cleared = stores.gazetteer.clear()?;
        info!("Cleared {} existing records", cleared);
    }

    let mut loader = Loader::new(stores.gazetteer.clone(), &config.exclude_types)?;
    let mut totals = LoadReport::default();

    if let Some(dir) = &config.partitions_dir {
        totals.absorb(load_partitions(dir, &mut loader)?);
    }

    if let Some(path) = &config.survey_file {
        totals.absorb(load_survey_file(path, &mut loader)?);
    }

    info!(
        "Loaded {} records ({} duplicate keys skipped, {} excluded)",
        totals.inserted, totals.duplicate_keys, totals.excluded
    );

    if args.dedup {
        let removed = stores.gazetteer.remove_duplicates()?;
        info!("Duplicate cleanup removed {} records", removed);
    }

    info!("Gazetteer now holds {} records", stores.gazetteer.count()?);
    Ok(())
}

/// Merge every JSON partition under `dir`, derive the hierarchy, and load
/// the result.
fn load_partitions(dir: &Path, loader: &mut Loader) -> Result<LoadReport> {
    let config = ClassifierConfig::default();
    let counties = CountyTable::builtin();
    let mut merger = PartitionMerger::new(&config, &counties);

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().map_or(false, |e| e == "json"))
        .collect();
    files.sort();
    info!("Found {} partition files in {}", files.len(), dir.display());

    for path in &files {
        let label = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.json");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read partition {}", path.display()))?;
        let nodes: Vec<RawPlaceNode> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse partition {}", path.display()))?;
        info!("Partition {}: {} nodes", label, nodes.len());
        merger.absorb(label, nodes);
    }

    let (forest, merge_report) = merger.finish();
    if merge_report.id_collisions > 0 || merge_report.code_collisions > 0 {
        warn!(
            "Skipped {} place-id and {} code collisions across partitions",
            merge_report.id_collisions, merge_report.code_collisions
        );
    }
    for label in &merge_report.ambiguous_sources {
        warn!("County letter for partition '{}' was guessed", label);
    }

    info!("Deriving hierarchy for {} nodes...", forest.len());
    let (derived, build_report) = HierarchyBuilder::new(config).derive(&forest);
    info!(
        "Derived {} nodes: {} parishes, {} unresolved, {} cycles",
        build_report.nodes, build_report.parishes, build_report.unresolved, build_report.cycles
    );

    let pb = progress_bar(derived.len() as u64)?;
    let mut report = LoadReport::default();
    for chunk in derived.chunks(1000) {
        report.absorb(loader.load_derived(chunk)?);
        pb.inc(chunk.len() as u64);
    }
    pb.finish_with_message("Hierarchy load complete");
    Ok(report)
}

fn load_survey_file(path: &Path, loader: &mut Loader) -> Result<LoadReport> {
    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("survey.geojson");
    let features = read_survey(path)?;

    let pb = progress_bar(features.len() as u64)?;
    let mut report = LoadReport::default();
    for chunk in features.chunks(1000) {
        report.absorb(loader.load_survey(chunk, source)?);
        pb.inc(chunk.len() as u64);
    }
    pb.finish_with_message("Survey load complete");
    Ok(report)
}

fn progress_bar(len: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
            )?
            .progress_chars("#>-"),
    );
    Ok(pb)
}
