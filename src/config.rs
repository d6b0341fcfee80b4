use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODE_PREFIX: &str = "Mode::";
pub const DEFAULT_MERGED_FLAG: &str = "true";

/// Heat weight of a stay position.
pub const STAY_INTENSITY: f64 = 1.0;
/// Heat weight of every movement path point; kept well below the stay
/// weight so travel corridors don't drown out places.
pub const MOVE_INTENSITY: f64 = 0.1;

/// Knobs for reading a trip-log export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub expected_fields: usize,
    /// Category prefix in front of the mode code, e.g. `Mode::` in `Mode::Bus`
    pub mode_prefix: String,
    /// Value of the merge column that marks a row folded into another one
    pub merged_flag: String,
    pub stay_intensity: f64,
    pub move_intensity: f64,
    /// First day to keep, inclusive
    pub from: Option<NaiveDate>,
    /// Last day to keep, inclusive
    pub to: Option<NaiveDate>,
}

impl ParserConfig {
    pub fn includes(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            expected_fields: 24,
            mode_prefix: DEFAULT_MODE_PREFIX.to_string(),
            merged_flag: DEFAULT_MERGED_FLAG.to_string(),
            stay_intensity: STAY_INTENSITY,
            move_intensity: MOVE_INTENSITY,
            from: None,
            to: None,
        }
    }
}
