use crate::error::KernelError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DAY_MINUTES: u32 = 24 * 60;
pub const WEEK_DAYS: u8 = 7;

/// Index of a tour inside the normalised [`TourList`] arena.
/// All cross-references between tours, blocks and columns use these indices.
pub type TourIdx = u32;

/// A demand item for a single driver on one weekday.
/// `end_minute` may exceed 1440 for midnight-crossing tours, but a tour always
/// belongs to the weekday it starts on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tour {
    pub id: Box<str>,
    pub day: u8,
    pub start_minute: u32,
    pub end_minute: u32,
    pub depot: Box<str>,
    #[serde(rename = "qual", default)]
    pub qualification: Option<Box<str>>,
}

impl Tour {
    pub fn duration_min(&self) -> u32 {
        self.end_minute - self.start_minute
    }
    /// Absolute minute from Monday 00:00 at which the tour starts.
    pub fn week_start_minute(&self) -> u32 {
        self.day as u32 * DAY_MINUTES + self.start_minute
    }
    /// Absolute minute from Monday 00:00 at which the tour ends.
    pub fn week_end_minute(&self) -> u32 {
        self.day as u32 * DAY_MINUTES + self.end_minute
    }
    /// Canonical line form used for the input hash: `<day>|<start>|<end>|<depot>|<qual>`.
    pub fn canonical_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.day,
            self.start_minute,
            self.end_minute,
            self.depot,
            self.qualification.as_deref().unwrap_or("")
        )
    }
}

/// The normalised, immutable tour arena. Tours are totally ordered by
/// `(day, start_minute, id)`; duplicate instances (identical attributes under
/// distinct ids) are kept because forecast demand says so.
#[derive(Debug, Clone)]
pub struct TourList {
    tours: Vec<Tour>,
}

impl TourList {
    /// Validates and sorts the raw tour records.
    /// Rejects duplicate ids and out-of-range minute values at the boundary.
    pub fn normalize(mut tours: Vec<Tour>) -> Result<TourList, KernelError> {
        let mut seen: HashSet<Box<str>> = HashSet::with_capacity(tours.len());
        for tour in &tours {
            if !seen.insert(tour.id.clone()) {
                return Err(KernelError::InputDuplicateTourId(tour.id.clone()));
            }
            if tour.day >= WEEK_DAYS {
                return Err(KernelError::InputOutOfRange {
                    id: tour.id.clone(),
                    detail: format!("day index {} outside 0..=6", tour.day),
                });
            }
            if tour.start_minute >= DAY_MINUTES {
                return Err(KernelError::InputOutOfRange {
                    id: tour.id.clone(),
                    detail: format!("start minute {} outside [0, 1440)", tour.start_minute),
                });
            }
            if tour.end_minute >= 2 * DAY_MINUTES {
                return Err(KernelError::InputOutOfRange {
                    id: tour.id.clone(),
                    detail: format!("end minute {} outside [0, 2880)", tour.end_minute),
                });
            }
            if tour.end_minute <= tour.start_minute {
                return Err(KernelError::InputOutOfRange {
                    id: tour.id.clone(),
                    detail: format!(
                        "end minute {} not after start minute {}",
                        tour.end_minute, tour.start_minute
                    ),
                });
            }
        }
        tours.sort_by(|a, b| {
            (a.day, a.start_minute, a.id.as_ref()).cmp(&(b.day, b.start_minute, b.id.as_ref()))
        });
        Ok(TourList { tours })
    }

    pub fn len(&self) -> usize {
        self.tours.len()
    }
    pub fn is_empty(&self) -> bool {
        self.tours.is_empty()
    }
    pub fn get(&self, idx: TourIdx) -> &Tour {
        &self.tours[idx as usize]
    }
    pub fn iter(&self) -> impl Iterator<Item = &Tour> {
        self.tours.iter()
    }
    /// Tour indices grouped per weekday, preserving the canonical order.
    pub fn idxs_by_day(&self) -> [Vec<TourIdx>; 7] {
        let mut by_day: [Vec<TourIdx>; 7] = Default::default();
        for (i, tour) in self.tours.iter().enumerate() {
            by_day[tour.day as usize].push(i as TourIdx);
        }
        by_day
    }
    pub fn total_work_minutes(&self) -> u64 {
        self.tours.iter().map(|t| t.duration_min() as u64).sum()
    }
}

/// Builder used by tests and collaborators to assemble tour records tersely.
pub struct TourBuilder {
    id: Box<str>,
    day: u8,
    start_minute: u32,
    end_minute: u32,
    depot: Box<str>,
    qualification: Option<Box<str>>,
}

impl TourBuilder {
    pub fn new(id: &str) -> Self {
        TourBuilder {
            id: id.into(),
            day: 0,
            start_minute: 0,
            end_minute: 1,
            depot: "main".into(),
            qualification: None,
        }
    }
    pub fn day(mut self, day: u8) -> Self {
        self.day = day;
        self
    }
    pub fn minutes(mut self, start: u32, end: u32) -> Self {
        self.start_minute = start;
        self.end_minute = end;
        self
    }
    pub fn depot(mut self, depot: &str) -> Self {
        self.depot = depot.into();
        self
    }
    pub fn qualification(mut self, qual: &str) -> Self {
        self.qualification = Some(qual.into());
        self
    }
    pub fn build(self) -> Tour {
        Tour {
            id: self.id,
            day: self.day,
            start_minute: self.start_minute,
            end_minute: self.end_minute,
            depot: self.depot,
            qualification: self.qualification,
        }
    }
}
