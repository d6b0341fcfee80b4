//! Per-day movement distance totals.
//!
//! Movements are bucketed by the calendar day they started on. Each bucket
//! keeps a grand total and a per-mode breakdown; both only ever change through
//! [`DailyAggregate::add`], so the total always equals the sum of the modes.
//! An add that would overflow either sum is refused and changes nothing.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use log::warn;
use serde::Serialize;

use crate::error::RowError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyAggregate {
    date: NaiveDate,
    total: i64,
    modes: BTreeMap<String, i64>,
}

impl DailyAggregate {
    pub fn new(date: NaiveDate) -> Self {
        DailyAggregate {
            date,
            total: 0,
            modes: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, length: i64, mode: &str) -> Result<(), RowError> {
        let date = self.date;
        let overflow = || RowError::DistanceOverflow { date, length };
        let total = self.total.checked_add(length).ok_or_else(overflow)?;
        let by_mode = self
            .mode(mode)
            .unwrap_or(0)
            .checked_add(length)
            .ok_or_else(overflow)?;

        self.total = total;
        self.modes.insert(mode.to_string(), by_mode);
        Ok(())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Meters travelled on this day across all modes.
    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn modes(&self) -> &BTreeMap<String, i64> {
        &self.modes
    }

    pub fn mode(&self, mode: &str) -> Option<i64> {
        self.modes.get(mode).copied()
    }

    /// Modes ordered by descending distance, ties by name.
    pub fn modes_by_distance(&self) -> Vec<(&str, i64)> {
        let mut modes: Vec<(&str, i64)> = self
            .modes
            .iter()
            .map(|(mode, length)| (mode.as_str(), *length))
            .collect();
        modes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        modes
    }

    pub fn week(&self) -> u32 {
        iso_week(self.date)
    }

    pub fn week_year(&self) -> i32 {
        iso_week_year(self.date)
    }
}

/// Day-keyed distance accumulator. Accumulation is a plain sum per key, so
/// replay order never changes the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistanceAggregator {
    days: BTreeMap<NaiveDate, DailyAggregate>,
}

impl DistanceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `length` meters travelled by `mode` to the day `started_at` falls on.
    pub fn accumulate(
        &mut self,
        started_at: &DateTime<FixedOffset>,
        length: i64,
        mode: &str,
    ) -> Result<(), RowError> {
        self.accumulate_on(started_at.date_naive(), length, mode)
    }

    pub fn accumulate_on(&mut self, date: NaiveDate, length: i64, mode: &str) -> Result<(), RowError> {
        self.days
            .entry(date)
            .or_insert_with(|| DailyAggregate::new(date))
            .add(length, mode)
    }

    /// Fold another aggregator's buckets into this one. A mode total that no
    /// longer fits is left out of the merged bucket.
    pub fn merge(&mut self, other: &DistanceAggregator) {
        for day in other.days.values() {
            for (mode, length) in &day.modes {
                if let Err(e) = self.accumulate_on(day.date, *length, mode) {
                    warn!("Dropping {} meters of {} while merging: {}", length, mode, e);
                }
            }
        }
    }

    pub fn snapshot(&self) -> &BTreeMap<NaiveDate, DailyAggregate> {
        &self.days
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailyAggregate> {
        self.days.get(&date)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// ISO 8601 week number: the week of the date's Thursday, counted from the
/// first Thursday of that Thursday's year.
pub fn iso_week(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

/// Year an ISO week number belongs to. Late December days can sit in week 1
/// of the next year and early January days in week 52/53 of the previous one.
pub fn iso_week_year(date: NaiveDate) -> i32 {
    let week = iso_week(date);
    match date.month() {
        12 if week == 1 => date.year() + 1,
        1 if week >= 52 => date.year() - 1,
        _ => date.year(),
    }
}

/// Group daily buckets into calendar pages keyed by ISO week-year, each page
/// in date order.
pub fn group_by_week_year(
    days: &BTreeMap<NaiveDate, DailyAggregate>,
) -> BTreeMap<i32, Vec<DailyAggregate>> {
    let mut years: BTreeMap<i32, Vec<DailyAggregate>> = BTreeMap::new();
    for day in days.values() {
        years.entry(day.week_year()).or_default().push(day.clone());
    }
    years
}
