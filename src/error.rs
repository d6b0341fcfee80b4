//! Error types for trip-log ingestion.
//!
//! Geometry errors come out of the WKB decoder, row errors out of the
//! trip-log parser. Every row error is recoverable: the parser records it
//! and moves on to the next line.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while decoding a WKB buffer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// The buffer ended before a read could complete
    #[error("buffer truncated: needed {needed} bytes at offset {offset}, buffer is {len} bytes")]
    Truncated {
        needed: usize,
        offset: usize,
        len: usize,
    },

    /// A declared element count cannot fit into what is left of the buffer
    #[error("declared count {count} at offset {offset} exceeds the remaining {remaining} bytes")]
    CountOverflow {
        count: u32,
        offset: usize,
        remaining: usize,
    },

    /// A collection member is not of the kind its container requires
    #[error("member {index} of a MultiLineString is a {found}")]
    NestedKind { index: usize, found: &'static str },

    /// The type code is outside Point / LineString / MultiLineString
    #[error("unsupported geometry type code {code:#010x}")]
    Unsupported { code: u32 },
}

impl GeometryError {
    /// True for structural faults (truncation, inconsistent counts).
    pub fn is_malformed(&self) -> bool {
        !matches!(self, GeometryError::Unsupported { .. })
    }
}

/// Coarse classification of a row error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowErrorKind {
    Shape,
    Mismatch,
    Unsupported,
    Malformed,
}

/// Reasons a single trip-log row was skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("geometry hex string has odd length {0}")]
    OddHex(usize),

    #[error("invalid hex digit {digit:?} at position {position}")]
    InvalidHex { digit: char, position: usize },

    #[error("invalid length {0:?}")]
    InvalidLength(String),

    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),

    #[error("length {length} overflows the distance total of {date}")]
    DistanceOverflow { date: NaiveDate, length: i64 },

    #[error("unreadable record: {0}")]
    Unreadable(String),

    #[error("{kind} row carries a {found} geometry")]
    GeometryMismatch {
        kind: &'static str,
        found: &'static str,
    },

    #[error("movement geometry has no points")]
    EmptyPath,

    #[error("unsupported geometry type code {0:#010x}")]
    UnsupportedGeometry(u32),

    #[error("malformed geometry: {0}")]
    MalformedGeometry(GeometryError),
}

impl RowError {
    pub fn kind(&self) -> RowErrorKind {
        match self {
            RowError::FieldCount { .. }
            | RowError::OddHex(_)
            | RowError::InvalidHex { .. }
            | RowError::InvalidLength(_)
            | RowError::InvalidTimestamp(_)
            | RowError::DistanceOverflow { .. }
            | RowError::Unreadable(_) => RowErrorKind::Shape,
            RowError::GeometryMismatch { .. } | RowError::EmptyPath => RowErrorKind::Mismatch,
            RowError::UnsupportedGeometry(_) => RowErrorKind::Unsupported,
            RowError::MalformedGeometry(_) => RowErrorKind::Malformed,
        }
    }
}

impl From<GeometryError> for RowError {
    fn from(err: GeometryError) -> Self {
        match err {
            GeometryError::Unsupported { code } => RowError::UnsupportedGeometry(code),
            other => RowError::MalformedGeometry(other),
        }
    }
}
