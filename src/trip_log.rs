use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::aggregate::{DailyAggregate, DistanceAggregator};
use crate::error::RowError;
use crate::records::{HeatSample, Movement, Stay};

/// A row that was dropped, with its 1-based line number in the export.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub line: usize,
    pub error: RowError,
}

/// Everything one parse produced, in input row order.
#[derive(Debug, Clone, Default)]
pub struct TripLog {
    stays: Vec<Stay>,
    movements: Vec<Movement>,
    heat: Vec<HeatSample>,
    distances: DistanceAggregator,
    skipped: Vec<SkippedRow>,
    merged: usize,
    filtered: usize,
}

impl TripLog {
    pub fn push_stay(&mut self, stay: Stay, weight: f64) {
        self.heat.push(HeatSample::new(stay.position, weight));
        self.stays.push(stay);
    }

    /// Record a movement: one heat sample per path point, and its length
    /// booked on the day it started. A length the day's totals cannot hold
    /// rejects the whole movement and leaves the log as it was.
    pub fn push_movement(&mut self, movement: Movement, weight: f64) -> Result<(), RowError> {
        self.distances
            .accumulate(&movement.entry.started_at, movement.length, &movement.mode)?;
        self.heat
            .extend(movement.path.iter().map(|point| HeatSample::new(*point, weight)));
        self.movements.push(movement);
        Ok(())
    }

    pub fn skip(&mut self, line: usize, error: RowError) {
        self.skipped.push(SkippedRow { line, error });
    }

    pub fn count_merged(&mut self) {
        self.merged += 1;
    }

    pub fn count_filtered(&mut self) {
        self.filtered += 1;
    }

    /// Append another log after this one.
    pub fn merge(&mut self, other: TripLog) {
        self.distances.merge(&other.distances);
        self.stays.extend(other.stays);
        self.movements.extend(other.movements);
        self.heat.extend(other.heat);
        self.skipped.extend(other.skipped);
        self.merged += other.merged;
        self.filtered += other.filtered;
    }

    pub fn stays(&self) -> &[Stay] {
        &self.stays
    }

    pub fn movements(&self) -> &[Movement] {
        &self.movements
    }

    pub fn heat_samples(&self) -> &[HeatSample] {
        &self.heat
    }

    pub fn daily_distances(&self) -> &BTreeMap<NaiveDate, DailyAggregate> {
        self.distances.snapshot()
    }

    pub fn skipped(&self) -> &[SkippedRow] {
        &self.skipped
    }

    /// Rows dropped because they were merged into another row.
    pub fn merged_count(&self) -> usize {
        self.merged
    }

    /// Rows dropped by the configured date range.
    pub fn filtered_count(&self) -> usize {
        self.filtered
    }

    pub fn stays_on(&self, date: NaiveDate) -> impl Iterator<Item = &Stay> {
        self.stays
            .iter()
            .filter(move |stay| stay.entry.started_on() == date)
    }

    pub fn movements_on(&self, date: NaiveDate) -> impl Iterator<Item = &Movement> {
        self.movements
            .iter()
            .filter(move |movement| movement.entry.started_on() == date)
    }

    pub fn is_empty(&self) -> bool {
        self.stays.is_empty() && self.movements.is_empty()
    }
}
