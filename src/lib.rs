//! Trip-log ingestion: decodes the WKB geometries embedded in a trip-log
//! export, classifies rows into stays and movements, and rolls movement
//! distances up into per-day, per-mode totals for a calendar heat map.
//!
//! ```
//! use trip_trail::parsers::{Parser, motion_tag::MotionTagParser};
//!
//! let log = MotionTagParser::default().parse("header only\n");
//! assert!(log.is_empty());
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod parsers;
pub mod records;
pub mod style;
pub mod trip_log;
pub mod wkb;

pub use aggregate::{DailyAggregate, DistanceAggregator, group_by_week_year, iso_week, iso_week_year};
pub use config::ParserConfig;
pub use error::{GeometryError, RowError, RowErrorKind};
pub use geometry::{Geometry, GeometryKind};
pub use records::{Entry, HeatSample, LatLon, Movement, RowKind, Stay};
pub use trip_log::{SkippedRow, TripLog};
