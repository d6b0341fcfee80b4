use super::Parser;
use crate::config::ParserConfig;
use crate::error::RowError;
use crate::geometry::Geometry;
use crate::records::{Entry, LatLon, Movement, RowKind, Stay, parse_timestamp};
use crate::trip_log::TripLog;
use crate::wkb;
use csv::StringRecord;
use log::{debug, warn};

// column positions in the semicolon separated export
const ID: usize = 0;
const KIND: usize = 2;
const STARTED_AT: usize = 3;
const FINISHED_AT: usize = 5;
const LENGTH: usize = 7;
const MODE: usize = 9;
const PURPOSE: usize = 10;
const GEOMETRY: usize = 11;
const MERGED: usize = 15;

/**
 * Parse trip-log CSV exports: one header record, then one stay or movement
 * per record with the geometry as hex encoded WKB. Fields are separated by
 * `;` and may be quoted.
 */
#[derive(Debug, Clone, Default)]
pub struct MotionTagParser {
    config: ParserConfig,
}

enum Row {
    Stay(Stay),
    Movement(Movement),
    Merged,
    OutOfRange,
}

impl MotionTagParser {
    pub fn new(config: ParserConfig) -> Self {
        MotionTagParser { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Short display name of a mode code, e.g. `Bus` for `Mode::Bus`.
    pub fn mode_name<'a>(&self, raw: &'a str) -> &'a str {
        match raw.strip_prefix(self.config.mode_prefix.as_str()) {
            Some(mode) => mode,
            None => {
                debug!(
                    "Mode {:?} lacks prefix {:?}, keeping it as is",
                    raw, self.config.mode_prefix
                );
                raw
            }
        }
    }

    fn parse_row(&self, fields: &StringRecord) -> Result<Row, RowError> {
        if fields.len() != self.config.expected_fields {
            return Err(RowError::FieldCount {
                expected: self.config.expected_fields,
                found: fields.len(),
            });
        }

        if &fields[MERGED] == self.config.merged_flag.as_str() {
            return Ok(Row::Merged);
        }

        let started_at = parse_timestamp(&fields[STARTED_AT])
            .ok_or_else(|| RowError::InvalidTimestamp(fields[STARTED_AT].to_string()))?;
        let finished_at = parse_timestamp(&fields[FINISHED_AT])
            .ok_or_else(|| RowError::InvalidTimestamp(fields[FINISHED_AT].to_string()))?;

        if !self.config.includes(started_at.date_naive()) {
            return Ok(Row::OutOfRange);
        }

        let entry = Entry {
            id: fields[ID].to_string(),
            started_at,
            finished_at,
        };
        let kind = RowKind::from_field(&fields[KIND]);
        let geometry = wkb::decode_hex_geometry(&fields[GEOMETRY])?;

        match kind {
            RowKind::Stay => {
                let point = match geometry {
                    Geometry::Point { point, .. } => point,
                    other => return Err(mismatch(kind, &other)),
                };
                Ok(Row::Stay(Stay {
                    entry,
                    purpose: fields[PURPOSE].to_string(),
                    position: LatLon::from(point.0),
                }))
            }
            RowKind::Movement => {
                if !matches!(
                    geometry,
                    Geometry::LineString { .. } | Geometry::MultiLineString { .. }
                ) {
                    return Err(mismatch(kind, &geometry));
                }

                let path: Vec<LatLon> = geometry.coords().into_iter().map(LatLon::from).collect();
                if path.is_empty() {
                    return Err(RowError::EmptyPath);
                }

                let length = fields[LENGTH]
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| RowError::InvalidLength(fields[LENGTH].to_string()))?;

                Ok(Row::Movement(Movement {
                    entry,
                    mode: self.mode_name(&fields[MODE]).to_string(),
                    length,
                    path,
                }))
            }
        }
    }
}

fn mismatch(kind: RowKind, geometry: &Geometry) -> RowError {
    match geometry {
        Geometry::Unsupported { code, .. } => RowError::UnsupportedGeometry(*code),
        other => RowError::GeometryMismatch {
            kind: kind.name(),
            found: other.kind().name(),
        },
    }
}

impl Parser for MotionTagParser {
    fn parse(&self, text: &str) -> TripLog {
        let mut log = TripLog::default();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        for result in reader.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    let line = e.position().map_or(0, |p| p.line() as usize);
                    warn!("Skipping line {}: {}", line, e);
                    log.skip(line, RowError::Unreadable(e.to_string()));
                    continue;
                }
            };
            if record.len() == 1 && record[0].trim().is_empty() {
                continue;
            }
            let line = record.position().map_or(0, |p| p.line() as usize);

            let recorded = match self.parse_row(&record) {
                Ok(Row::Stay(stay)) => {
                    log.push_stay(stay, self.config.stay_intensity);
                    Ok(())
                }
                Ok(Row::Movement(movement)) => {
                    log.push_movement(movement, self.config.move_intensity)
                }
                Ok(Row::Merged) => {
                    log.count_merged();
                    Ok(())
                }
                Ok(Row::OutOfRange) => {
                    log.count_filtered();
                    Ok(())
                }
                Err(error) => Err(error),
            };

            if let Err(error) = recorded {
                warn!("Skipping line {}: {}", line, error);
                log.skip(line, error);
            }
        }

        debug!(
            "Parsed {} stays and {} movements, skipped {} rows ({} merged, {} out of range)",
            log.stays().len(),
            log.movements().len(),
            log.skipped().len(),
            log.merged_count(),
            log.filtered_count()
        );
        log
    }

    fn name(&self) -> &'static str {
        "MotionTag Parser"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RowErrorKind;
    use crate::wkb::{ByteOrder, encode, to_hex};
    use chrono::NaiveDate;
    use geo::{LineString, MultiLineString, Point, coord};

    const HEADER: &str = "id;user_id;type;started_at;started_at_timezone;finished_at;finished_at_timezone;length;detected_mode;mode;purpose;geometry;confirmed_at;started_on;misdetected_completely;merged;created_at;updated_at;started_at_in_timezone;finished_at_in_timezone;confirmed_at_in_timezone;created_at_in_timezone;updated_at_in_timezone;comment_feedback";

    fn hex(geometry: Geometry) -> String {
        to_hex(&encode(&geometry, ByteOrder::LittleEndian).unwrap())
    }

    fn point_hex(lat: f64, lon: f64) -> String {
        hex(Geometry::Point {
            point: Point::new(lon, lat),
            srid: Some(4326),
        })
    }

    fn line_hex(points: &[(f64, f64)]) -> String {
        hex(Geometry::LineString {
            line: points.iter().map(|&(lat, lon)| coord! { x: lon, y: lat }).collect(),
            srid: None,
        })
    }

    struct CsvRow<'a> {
        id: &'a str,
        kind: &'a str,
        started_at: &'a str,
        length: &'a str,
        mode: &'a str,
        purpose: &'a str,
        geometry: String,
        merged: &'a str,
    }

    impl Default for CsvRow<'_> {
        fn default() -> Self {
            CsvRow {
                id: "row",
                kind: "Track",
                started_at: "2024-03-05T08:00:00+01:00",
                length: "",
                mode: "",
                purpose: "",
                geometry: String::new(),
                merged: "false",
            }
        }
    }

    impl CsvRow<'_> {
        fn line(&self) -> String {
            let mut fields = vec![""; 24];
            fields[ID] = self.id;
            fields[KIND] = self.kind;
            fields[STARTED_AT] = self.started_at;
            fields[FINISHED_AT] = self.started_at;
            fields[LENGTH] = self.length;
            fields[MODE] = self.mode;
            fields[PURPOSE] = self.purpose;
            fields[GEOMETRY] = self.geometry.as_str();
            fields[MERGED] = self.merged;
            fields.join(";")
        }
    }

    fn export(rows: &[CsvRow]) -> String {
        let mut lines = vec![HEADER.to_string()];
        lines.extend(rows.iter().map(CsvRow::line));
        lines.join("\n")
    }

    #[test]
    fn stay_row_yields_stay_and_one_heat_sample() {
        let text = export(&[CsvRow {
            kind: "Stay",
            purpose: "work",
            geometry: point_hex(52.5, 13.4),
            ..CsvRow::default()
        }]);

        let log = MotionTagParser::default().parse(&text);

        assert_eq!(log.stays().len(), 1);
        assert!(log.movements().is_empty());
        let stay = &log.stays()[0];
        assert_eq!(stay.purpose, "work");
        assert_eq!(stay.position, LatLon { lat: 52.5, lon: 13.4 });
        assert_eq!(log.heat_samples().len(), 1);
        assert_eq!(log.heat_samples()[0].weight, 1.0);
    }

    #[test]
    fn movement_row_is_aggregated_under_its_day() {
        let text = export(&[CsvRow {
            length: "1000",
            mode: "Mode::Bus",
            geometry: line_hex(&[(52.5, 13.4), (52.6, 13.5)]),
            ..CsvRow::default()
        }]);

        let log = MotionTagParser::default().parse(&text);

        let movement = &log.movements()[0];
        assert_eq!(movement.mode, "Bus");
        assert_eq!(movement.length, 1000);
        assert_eq!(movement.path[1], LatLon { lat: 52.6, lon: 13.5 });
        assert!(log.heat_samples().iter().all(|s| s.weight == 0.1));

        let day = &log.daily_distances()[&NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()];
        assert_eq!(day.total(), 1000);
        assert_eq!(day.mode("Bus"), Some(1000));
    }

    #[test]
    fn multilinestring_paths_are_flattened_in_member_order() {
        let geometry = hex(Geometry::MultiLineString {
            lines: MultiLineString::new(vec![
                LineString::new(vec![coord! { x: 1.0, y: 10.0 }]),
                LineString::new(vec![coord! { x: 2.0, y: 20.0 }, coord! { x: 3.0, y: 30.0 }]),
            ]),
            srid: None,
        });
        let text = export(&[CsvRow {
            length: "5",
            mode: "Mode::Walk",
            geometry,
            ..CsvRow::default()
        }]);

        let log = MotionTagParser::default().parse(&text);

        let lats: Vec<f64> = log.movements()[0].path.iter().map(|p| p.lat).collect();
        assert_eq!(lats, vec![10.0, 20.0, 30.0]);
        assert_eq!(log.heat_samples().len(), 3);
    }

    #[test]
    fn mismatched_geometry_is_skipped() {
        let text = export(&[
            CsvRow {
                kind: "Stay",
                geometry: line_hex(&[(1.0, 1.0)]),
                ..CsvRow::default()
            },
            CsvRow {
                length: "10",
                geometry: point_hex(1.0, 1.0),
                ..CsvRow::default()
            },
        ]);

        let log = MotionTagParser::default().parse(&text);

        assert!(log.is_empty());
        assert!(log.heat_samples().is_empty());
        assert!(log.daily_distances().is_empty());
        let kinds: Vec<RowErrorKind> = log.skipped().iter().map(|s| s.error.kind()).collect();
        assert_eq!(kinds, vec![RowErrorKind::Mismatch, RowErrorKind::Mismatch]);
        assert_eq!(log.skipped()[0].line, 2);
    }

    #[test]
    fn merged_rows_are_dropped_silently() {
        let text = export(&[CsvRow {
            length: "10",
            mode: "Mode::Car",
            geometry: line_hex(&[(1.0, 1.0)]),
            merged: "true",
            ..CsvRow::default()
        }]);

        let log = MotionTagParser::default().parse(&text);

        assert!(log.is_empty());
        assert!(log.skipped().is_empty());
        assert_eq!(log.merged_count(), 1);
    }

    #[test]
    fn row_level_faults_do_not_stop_the_parse() {
        let mut truncated = point_hex(1.0, 1.0);
        truncated.truncate(20);
        let text = [
            export(&[
                CsvRow {
                    kind: "Stay",
                    geometry: truncated,
                    ..CsvRow::default()
                },
                CsvRow {
                    kind: "Stay",
                    geometry: "0101000".to_string(),
                    ..CsvRow::default()
                },
                CsvRow {
                    length: "far",
                    geometry: line_hex(&[(1.0, 1.0)]),
                    ..CsvRow::default()
                },
                CsvRow {
                    geometry: "0103000000".to_string(),
                    ..CsvRow::default()
                },
                CsvRow {
                    kind: "Stay",
                    purpose: "home",
                    geometry: point_hex(2.0, 3.0),
                    ..CsvRow::default()
                },
            ]),
            "too;few;fields".to_string(),
            String::new(),
        ]
        .join("\n");

        let log = MotionTagParser::default().parse(&text);

        assert_eq!(log.stays().len(), 1);
        assert_eq!(log.stays()[0].purpose, "home");
        let errors: Vec<&RowError> = log.skipped().iter().map(|s| &s.error).collect();
        assert!(matches!(errors[0], RowError::MalformedGeometry(_)));
        assert_eq!(errors[1], &RowError::OddHex(7));
        assert_eq!(errors[2], &RowError::InvalidLength("far".to_string()));
        assert_eq!(errors[3], &RowError::UnsupportedGeometry(3));
        assert_eq!(
            errors[4],
            &RowError::FieldCount {
                expected: 24,
                found: 3
            }
        );
        assert_eq!(log.skipped()[4].line, 7);
    }

    #[test]
    fn quoted_fields_may_contain_the_separator() {
        let row = CsvRow {
            kind: "Stay",
            purpose: "work",
            geometry: point_hex(52.5, 13.4),
            ..CsvRow::default()
        };
        let text = format!("{}\n{}\"late; bus was full\"", HEADER, row.line());

        let log = MotionTagParser::default().parse(&text);

        assert!(log.skipped().is_empty());
        assert_eq!(log.stays().len(), 1);
        assert_eq!(log.stays()[0].purpose, "work");
    }

    #[test]
    fn overflowing_day_total_skips_only_the_offending_row() {
        let row = || CsvRow {
            length: "9223372036854775807",
            mode: "Mode::Plane",
            geometry: line_hex(&[(1.0, 1.0)]),
            ..CsvRow::default()
        };
        let text = export(&[row(), row()]);

        let log = MotionTagParser::default().parse(&text);

        assert_eq!(log.movements().len(), 1);
        assert_eq!(log.heat_samples().len(), 1);
        assert_eq!(log.skipped().len(), 1);
        assert_eq!(log.skipped()[0].line, 3);
        assert!(matches!(log.skipped()[0].error, RowError::DistanceOverflow { .. }));
        let day = &log.daily_distances()[&NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()];
        assert_eq!(day.total(), i64::MAX);
    }

    #[test]
    fn deeply_nested_geometry_is_skipped() {
        let text = export(&[
            CsvRow {
                length: "10",
                geometry: "010500000001000000".repeat(20_000),
                ..CsvRow::default()
            },
            CsvRow {
                kind: "Stay",
                geometry: point_hex(1.0, 1.0),
                ..CsvRow::default()
            },
        ]);

        let log = MotionTagParser::default().parse(&text);

        assert_eq!(log.stays().len(), 1);
        assert_eq!(log.skipped()[0].error.kind(), RowErrorKind::Malformed);
    }

    #[test]
    fn mode_without_prefix_is_kept() {
        let parser = MotionTagParser::default();
        assert_eq!(parser.mode_name("Mode::RegionalTrain"), "RegionalTrain");
        assert_eq!(parser.mode_name("Bicycle"), "Bicycle");
    }

    #[test]
    fn date_range_filters_rows() {
        let config = ParserConfig {
            from: NaiveDate::from_ymd_opt(2024, 3, 6),
            ..ParserConfig::default()
        };
        let text = export(&[
            CsvRow {
                kind: "Stay",
                geometry: point_hex(1.0, 1.0),
                ..CsvRow::default()
            },
            CsvRow {
                kind: "Stay",
                started_at: "2024-03-06T08:00:00+01:00",
                geometry: point_hex(1.0, 1.0),
                ..CsvRow::default()
            },
        ]);

        let log = MotionTagParser::new(config).parse(&text);

        assert_eq!(log.stays().len(), 1);
        assert_eq!(log.filtered_count(), 1);
    }

    #[test]
    fn each_parse_starts_fresh() {
        let parser = MotionTagParser::default();
        let text = export(&[CsvRow {
            length: "100",
            mode: "Mode::Tram",
            geometry: line_hex(&[(1.0, 1.0)]),
            ..CsvRow::default()
        }]);

        let first = parser.parse(&text);
        let second = parser.parse(&text);

        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(first.daily_distances()[&day].total(), 100);
        assert_eq!(second.daily_distances()[&day].total(), 100);
    }
}
