use crate::model::block::Block;
use crate::model::tour::{DAY_MINUTES, Tour};

/// Absolute minute from Monday 00:00. All constraint arithmetic is integer
/// minutes; ordering across days uses this scale so that rest over empty days
/// (e.g. Sat end to Mon start) is well-defined.
pub fn minutes_of_week(day: u8, minute_of_day: u32) -> u32 {
    day as u32 * DAY_MINUTES + minute_of_day
}

/// Gap in minutes between two tours of the same day, negative on overlap.
pub fn gap_between_tours(earlier: &Tour, later: &Tour) -> i64 {
    later.start_minute as i64 - earlier.end_minute as i64
}

/// Rest in minutes between the end of one block and the start of a later one,
/// negative on overlap.
pub fn rest_between(earlier: &Block, later: &Block) -> i64 {
    later.week_start_minute() as i64 - earlier.week_end_minute() as i64
}
