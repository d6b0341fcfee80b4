use chrono::NaiveDate;
use indicatif::ParallelProgressIterator;
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::aggregate::{DailyAggregate, group_by_week_year};
use crate::parsers::Parser;
use crate::records::{HeatSample, Movement, Stay};
use crate::style::mode_color;
use crate::trip_log::TripLog;

/// What the rendering layer reads.
#[derive(Serialize)]
pub struct TripExport<'a> {
    pub stays: &'a [Stay],
    pub movements: &'a [Movement],
    pub heat: &'a [HeatSample],
    pub daily: &'a BTreeMap<NaiveDate, DailyAggregate>,
    pub week_years: BTreeMap<i32, Vec<DailyAggregate>>,
    pub mode_colors: BTreeMap<&'a str, &'static str>,
}

impl<'a> TripExport<'a> {
    pub fn new(log: &'a TripLog) -> Self {
        let mode_colors = log
            .movements()
            .iter()
            .map(|movement| (movement.mode.as_str(), mode_color(&movement.mode)))
            .collect();

        TripExport {
            stays: log.stays(),
            movements: log.movements(),
            heat: log.heat_samples(),
            daily: log.daily_distances(),
            week_years: group_by_week_year(log.daily_distances()),
            mode_colors,
        }
    }
}

/// All `.csv` exports below `data_dir`, sorted by path.
pub fn find_exports(data_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(data_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "csv")
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Parse every export on its own, in parallel, then merge the results in
/// path order. Unreadable files are reported and left out.
pub fn parse_exports<P: Parser + Sync>(parser: &P, files: &[PathBuf]) -> TripLog {
    info!("Processing {} exports with {}...", files.len(), parser.name());

    let logs: Vec<TripLog> = files
        .par_iter()
        .progress()
        .filter_map(|path| match parser.parse_file(path) {
            Ok(log) => {
                info!(
                    "✓ {}: {} stays, {} movements, {} skipped rows",
                    path.display(),
                    log.stays().len(),
                    log.movements().len(),
                    log.skipped().len()
                );
                Some(log)
            }
            Err(e) => {
                warn!("✗ Error reading {}: {}", path.display(), e);
                None
            }
        })
        .collect();

    let mut merged = TripLog::default();
    for log in logs {
        merged.merge(log);
    }
    merged
}

pub fn write_json(log: &TripLog, output_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer(writer, &TripExport::new(log))?;
    Ok(())
}
