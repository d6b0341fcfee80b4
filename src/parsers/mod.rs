pub mod motion_tag;

use std::fs;
use std::path::Path;

use crate::trip_log::TripLog;

// turn an export into typed trip records
pub trait Parser {
    /// Parse a whole export held in memory. Bad rows are skipped and
    /// recorded in the returned log, never raised.
    fn parse(&self, text: &str) -> TripLog;

    fn name(&self) -> &'static str;

    fn parse_file(&self, path: &Path) -> Result<TripLog, std::io::Error> {
        let text = fs::read_to_string(path)?;
        Ok(self.parse(&text))
    }
}
