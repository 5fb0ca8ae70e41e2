use crate::model::tour::{DAY_MINUTES, TourIdx, TourList};
use serde::Serialize;

/// Index of a block inside the block pool arena.
pub type BlockIdx = u32;

/// Legal pause regime of a block. Every inter-tour gap of a block lies in the
/// zone's interval; blocks mixing regular and split gaps are illegal and are
/// never constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PauseZone {
    Regular,
    Split,
}

/// An ordered set of 1 to 3 tours glued on one day for one driver.
/// Blocks never cross midnight: a block ends on the weekday it starts on,
/// even when its last tour runs past 24:00.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: Box<str>,
    pub day: u8,
    /// Tour indices ordered by start minute.
    pub tour_idxs: Box<[TourIdx]>,
    pub first_start: u32,
    pub last_end: u32,
    pub work_min: u32,
    pub span_min: u32,
    pub zone: PauseZone,
    /// Deterministic utility used for dominance pruning and pool capping.
    pub score: i64,
}

impl Block {
    /// Assembles a block from tours already known to satisfy the gap and span
    /// rules. Derives id, extents and score; `tour_idxs` must be start-ordered.
    pub fn assemble(tours: &TourList, tour_idxs: Vec<TourIdx>, zone: PauseZone) -> Block {
        debug_assert!(!tour_idxs.is_empty() && tour_idxs.len() <= 3);
        let day = tours.get(tour_idxs[0]).day;
        let first_start = tours.get(tour_idxs[0]).start_minute;
        let last_end = tour_idxs
            .iter()
            .map(|&t| tours.get(t).end_minute)
            .max()
            .unwrap_or(0);
        let work_min: u32 = tour_idxs.iter().map(|&t| tours.get(t).duration_min()).sum();
        let span_min = last_end - first_start;
        let id = Self::derive_id(tours, &tour_idxs, zone);
        Block {
            id,
            day,
            tour_idxs: tour_idxs.into_boxed_slice(),
            first_start,
            last_end,
            work_min,
            span_min,
            zone,
            score: 0,
        }
    }

    /// Stable id derived from the sorted tour ids, prefixed by size and
    /// pause regime: `B1-`, `B2R-`/`B2S-` and `B3-`.
    fn derive_id(tours: &TourList, tour_idxs: &[TourIdx], zone: PauseZone) -> Box<str> {
        let mut ids: Vec<&str> = tour_idxs.iter().map(|&t| tours.get(t).id.as_ref()).collect();
        ids.sort_unstable();
        let prefix = match (tour_idxs.len(), zone) {
            (1, _) => "B1",
            (2, PauseZone::Regular) => "B2R",
            (2, PauseZone::Split) => "B2S",
            _ => "B3",
        };
        format!("{}-{}", prefix, ids.join("-")).into_boxed_str()
    }

    pub fn tours_count(&self) -> usize {
        self.tour_idxs.len()
    }
    pub fn covers(&self, tour: TourIdx) -> bool {
        self.tour_idxs.contains(&tour)
    }
    /// Absolute minute from Monday 00:00 at which the block starts.
    pub fn week_start_minute(&self) -> u32 {
        self.day as u32 * DAY_MINUTES + self.first_start
    }
    /// Absolute minute from Monday 00:00 at which the block ends.
    pub fn week_end_minute(&self) -> u32 {
        self.day as u32 * DAY_MINUTES + self.last_end
    }
    /// Minutes inside the span not spent working.
    pub fn idle_min(&self) -> u32 {
        self.span_min - self.work_min
    }
}
