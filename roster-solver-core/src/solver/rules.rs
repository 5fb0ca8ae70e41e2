use crate::model::block::{Block, BlockIdx, PauseZone};
use crate::model::column::DriverType;
use crate::model::configuration::SolverConfig;
use crate::model::tour::{TourIdx, TourList};
use crate::solver::time::{gap_between_tours, rest_between};
use std::collections::HashSet;

/// Minimum pause between two tours glued into one block, minutes.
pub const MIN_PAUSE: u32 = 30;
/// Maximum legal span of a regular block, minutes.
pub const MAX_SPAN_REGULAR: u32 = 14 * 60;
/// Maximum legal span of a split block, minutes.
pub const MAX_SPAN_SPLIT: u32 = 16 * 60;
/// Minimum rest between two worked days, minutes.
pub const MIN_REST: u32 = 11 * 60;
/// Minimum rest after a 3-tour day, minutes.
pub const MIN_REST_AFTER_3TOUR: u32 = 14 * 60;
/// Maximum tours on the day following a 3-tour day.
pub const MAX_NEXT_DAY_TOURS_AFTER_3TOUR: usize = 2;
/// Maximum tours glued on one day.
pub const MAX_DAILY_TOURS: usize = 3;

/// Why an extension, chain or assignment is rejected. Closed set shared by
/// the block builder, the column generator, the pricing oracle and the
/// post-hoc validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleViolation {
    Overlap,
    Rest11h,
    Rest14hAfter3Tour,
    WeeklyCap,
    DailyTours,
    Span,
    PauseZone,
    Qual,
}

impl RuleViolation {
    pub fn code(&self) -> &'static str {
        match self {
            RuleViolation::Overlap => "OVERLAP",
            RuleViolation::Rest11h => "REST_11H",
            RuleViolation::Rest14hAfter3Tour => "REST_14H_AFTER_3TOUR",
            RuleViolation::WeeklyCap => "WEEKLY_CAP",
            RuleViolation::DailyTours => "DAILY_TOURS",
            RuleViolation::Span => "SPAN",
            RuleViolation::PauseZone => "PAUSE_ZONE",
            RuleViolation::Qual => "QUAL",
        }
    }
}

/// Single source of truth for the numeric policy. Built once per run from the
/// configuration and passed by reference to every component that checks
/// legality.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub max_pause_regular: u32,
    pub split_min: u32,
    pub split_max: u32,
    pub enable_split: bool,
    pub weekly_cap_min: u32,
    pub fte_min_min: u32,
    pub fte_max_min: u32,
    pub pt_max_min: u32,
}

impl RuleSet {
    pub fn from_config(cfg: &SolverConfig) -> RuleSet {
        RuleSet {
            max_pause_regular: cfg.max_pause_regular,
            split_min: cfg.split_pause,
            split_max: cfg.split_pause,
            enable_split: cfg.enable_split_blocks,
            weekly_cap_min: (cfg.weekly_hard_cap * 60.0).round() as u32,
            fte_min_min: (cfg.fte_target_min * 60.0).round() as u32,
            fte_max_min: (cfg.fte_target_max * 60.0).round() as u32,
            pt_max_min: (cfg.pt_max * 60.0).round() as u32,
        }
    }

    /// Classifies an inter-tour gap into its legal pause zone, if any.
    pub fn pause_zone(&self, gap: i64) -> Option<PauseZone> {
        if gap >= MIN_PAUSE as i64 && gap <= self.max_pause_regular as i64 {
            return Some(PauseZone::Regular);
        }
        if self.enable_split && gap >= self.split_min as i64 && gap <= self.split_max as i64 {
            return Some(PauseZone::Split);
        }
        None
    }

    pub fn span_limit(&self, zone: PauseZone) -> u32 {
        match zone {
            PauseZone::Regular => MAX_SPAN_REGULAR,
            PauseZone::Split => MAX_SPAN_SPLIT,
        }
    }

    /// Checks whether `candidate` can be glued after the last tour of a block
    /// currently in `zone`. Mixed pause zones are illegal, so the gap must
    /// fall in the block's own zone and the grown span must respect that
    /// zone's limit. Returns the zone of the extended block.
    pub fn can_extend_block(
        &self,
        tours: &TourList,
        block_tour_idxs: &[TourIdx],
        zone: Option<PauseZone>,
        candidate: TourIdx,
    ) -> Option<PauseZone> {
        if block_tour_idxs.len() >= MAX_DAILY_TOURS {
            return None;
        }
        let last = tours.get(*block_tour_idxs.last()?);
        let next = tours.get(candidate);
        if last.day != next.day {
            return None;
        }
        let gap_zone = self.pause_zone(gap_between_tours(last, next))?;
        let merged = match zone {
            None => gap_zone,
            Some(existing) if existing == gap_zone => existing,
            Some(_) => return None,
        };
        let first = tours.get(block_tour_idxs[0]);
        let last_end = block_tour_idxs
            .iter()
            .chain(std::iter::once(&candidate))
            .map(|&t| tours.get(t).end_minute)
            .max()
            .unwrap_or(0);
        let span = last_end - first.start_minute;
        if span > self.span_limit(merged) {
            return None;
        }
        Some(merged)
    }

    /// Whether `later` can follow `earlier` on a subsequent day of the same
    /// column: 11h rest (14h after a 3-tour day), and at most 2 tours on the
    /// calendar day following a 3-tour day.
    pub fn can_chain_days(&self, earlier: &Block, later: &Block) -> bool {
        self.chain_violation(earlier, later).is_none()
    }

    pub fn chain_violation(&self, earlier: &Block, later: &Block) -> Option<RuleViolation> {
        if later.day <= earlier.day {
            return Some(RuleViolation::Overlap);
        }
        let rest = rest_between(earlier, later);
        if earlier.tours_count() == MAX_DAILY_TOURS {
            if rest < MIN_REST_AFTER_3TOUR as i64 {
                return Some(RuleViolation::Rest14hAfter3Tour);
            }
            if later.day == earlier.day + 1
                && later.tours_count() > MAX_NEXT_DAY_TOURS_AFTER_3TOUR
            {
                return Some(RuleViolation::Rest14hAfter3Tour);
            }
        } else if rest < MIN_REST as i64 {
            return Some(RuleViolation::Rest11h);
        }
        None
    }

    /// Whether a driver already holding `column_blocks` can additionally take
    /// `candidate`. Checks overlap first, then rest, then the weekly hour
    /// cap, then qualifications.
    pub fn driver_can_take(
        &self,
        blocks: &[Block],
        tours: &TourList,
        column_blocks: &[BlockIdx],
        candidate: BlockIdx,
        driver_quals: Option<&HashSet<&str>>,
    ) -> Result<(), RuleViolation> {
        let cand = &blocks[candidate as usize];
        let mut work_min = cand.work_min;
        for &b in column_blocks {
            let held = &blocks[b as usize];
            if held.day == cand.day {
                return Err(RuleViolation::Overlap);
            }
            let (earlier, later) = if held.day < cand.day { (held, cand) } else { (cand, held) };
            if let Some(violation) = self.chain_violation(earlier, later) {
                return Err(violation);
            }
            work_min += held.work_min;
        }
        if work_min > self.weekly_cap_min {
            return Err(RuleViolation::WeeklyCap);
        }
        if let Some(quals) = driver_quals {
            for &t in cand.tour_idxs.iter() {
                if let Some(required) = &tours.get(t).qualification {
                    if !quals.contains(required.as_ref()) {
                        return Err(RuleViolation::Qual);
                    }
                }
            }
        }
        Ok(())
    }

    /// Full legality check of a column: day-ordered disjoint blocks, chain
    /// rules between every consecutive pair, and the weekly hour windows.
    pub fn column_is_legal(
        &self,
        blocks: &[Block],
        block_idxs: &[BlockIdx],
    ) -> Result<(), RuleViolation> {
        let mut work_min = 0u32;
        for (i, &b) in block_idxs.iter().enumerate() {
            let block = &blocks[b as usize];
            work_min += block.work_min;
            if i > 0 {
                let prev = &blocks[block_idxs[i - 1] as usize];
                if block.day <= prev.day {
                    return Err(RuleViolation::Overlap);
                }
                if let Some(violation) = self.chain_violation(prev, block) {
                    return Err(violation);
                }
            }
        }
        if work_min > self.weekly_cap_min {
            return Err(RuleViolation::WeeklyCap);
        }
        // Driver-type hour windows: PT up to pt_max, FTE up to the target
        // ceiling.
        match self.driver_type(work_min) {
            DriverType::Pt if work_min > self.pt_max_min => Err(RuleViolation::WeeklyCap),
            DriverType::Fte if work_min > self.fte_max_min => Err(RuleViolation::WeeklyCap),
            _ => Ok(()),
        }
    }

    /// FTE when the weekly hours reach the FTE target floor, PT otherwise.
    pub fn driver_type(&self, work_min: u32) -> DriverType {
        if work_min >= self.fte_min_min { DriverType::Fte } else { DriverType::Pt }
    }
}
