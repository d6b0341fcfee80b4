use chrono::NaiveDate;
use clap::Parser as _;
use log::{info, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use trip_trail::config::{DEFAULT_MERGED_FLAG, DEFAULT_MODE_PREFIX, ParserConfig};
use trip_trail::error::RowErrorKind;
use trip_trail::io::{find_exports, parse_exports, write_json};
use trip_trail::parsers::motion_tag::MotionTagParser;
use trip_trail::style::format_distance;

pub const DATA_DIR: &str = "data";
pub const OUT_PATH: &str = "data/trips.json";

/// Turn trip-log CSV exports into stays, movements, a density overlay and
/// daily distance totals for the map.
#[derive(clap::Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Directory searched recursively for .csv exports
    #[arg(short, long, default_value = DATA_DIR)]
    data_dir: PathBuf,

    #[arg(short, long, default_value = OUT_PATH)]
    out: PathBuf,

    #[arg(long, default_value = DEFAULT_MODE_PREFIX)]
    mode_prefix: String,

    #[arg(long, default_value = DEFAULT_MERGED_FLAG)]
    merged_flag: String,

    /// First day to keep (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day to keep (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let parser = MotionTagParser::new(ParserConfig {
        mode_prefix: args.mode_prefix,
        merged_flag: args.merged_flag,
        from: args.from,
        to: args.to,
        ..ParserConfig::default()
    });

    let files = find_exports(&args.data_dir);
    info!("Found {} exports in {}", files.len(), args.data_dir.display());

    if files.is_empty() {
        info!("No exports to process.");
        return Ok(());
    }

    let log = parse_exports(&parser, &files);

    info!("--- Summary ---");
    info!(
        "{} stays, {} movements, {} heat samples over {} days",
        log.stays().len(),
        log.movements().len(),
        log.heat_samples().len(),
        log.daily_distances().len()
    );

    match log
        .daily_distances()
        .values()
        .try_fold(0i64, |sum, day| sum.checked_add(day.total()))
    {
        Some(total) => info!("Travelled {}", format_distance(total)),
        None => warn!("Total distance does not fit into 64 bits"),
    }

    let mut skipped: HashMap<RowErrorKind, usize> = HashMap::new();
    for row in log.skipped() {
        *skipped.entry(row.error.kind()).or_insert(0) += 1;
    }
    info!(
        "Skipped {} rows {:?}, dropped {} merged and {} out of range",
        log.skipped().len(),
        skipped,
        log.merged_count(),
        log.filtered_count()
    );

    write_json(&log, &args.out)?;
    info!("✓ Successfully wrote trips to {}", args.out.display());

    Ok(())
}
