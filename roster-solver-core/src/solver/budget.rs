/*
 * Copyright (c) 2025 Clément GRENNERAT
 *
 * This program is free software: you can redistribute it and/or modify it under the terms of the
 * GNU General Public License as published by the Free Software Foundation, version 3.
 * This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
 * even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
 * See the GNU General Public License for more details.
 * You should have received a copy of the GNU General Public License along with this program.
 * If not, see https://www.gnu.org/licenses/.
 *
 */

use crate::model::configuration::SolverConfig;
use crate::model::plan::{Reason, ReasonCode};
use std::time::{Duration, Instant};

/// Overrun beyond this share of a phase slice is recorded as BUDGET_OVERRUN.
const OVERRUN_TOLERANCE: f64 = 0.10;

/// The sequential phases of a kernel run, one per configured slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Profiling,
    Construction,
    Search,
    Polish,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Profiling => "profiling",
            Phase::Construction => "construction",
            Phase::Search => "search",
            Phase::Polish => "polish",
        }
    }
    fn index(&self) -> usize {
        match self {
            Phase::Profiling => 0,
            Phase::Construction => 1,
            Phase::Search => 2,
            Phase::Polish => 3,
        }
    }
}

/// Wall-clock budget of one run, split into phase slices. Consulted at the
/// suspension points; a phase may short-circuit once its slice elapsed, and
/// overrunning a slice by more than 10% is recorded but never aborts the run.
#[derive(Debug, Clone)]
pub struct RunBudget {
    start: Instant,
    total: Duration,
    slices: [f64; 4],
}

impl RunBudget {
    pub fn start(cfg: &SolverConfig) -> RunBudget {
        RunBudget {
            start: Instant::now(),
            total: Duration::from_secs_f64(cfg.time_budget_seconds),
            slices: cfg.phase_slices,
        }
    }

    pub fn total_deadline(&self) -> Instant {
        self.start + self.total
    }

    /// Cumulative deadline of a phase: the slices are spent in order and the
    /// un-sliced remainder is buffer at the end.
    pub fn phase_deadline(&self, phase: Phase) -> Instant {
        let cumulative: f64 = self.slices[..=phase.index()].iter().sum();
        self.start + Duration::from_secs_f64(self.total.as_secs_f64() * cumulative)
    }

    pub fn phase_elapsed(&self, phase: Phase) -> bool {
        Instant::now() >= self.phase_deadline(phase)
    }

    pub fn phase_budget(&self, phase: Phase, max_new_columns: usize) -> PhaseBudget {
        PhaseBudget { deadline: self.phase_deadline(phase), max_new_columns }
    }

    /// Called when a phase ends; reports an overrun of more than 10% of the
    /// phase slice as a BUDGET_OVERRUN reason.
    pub fn overrun(&self, phase: Phase) -> Option<Reason> {
        let slice = self.total.as_secs_f64() * self.slices[phase.index()];
        if slice <= 0.0 {
            return None;
        }
        let deadline = self.phase_deadline(phase);
        let now = Instant::now();
        if now <= deadline {
            return None;
        }
        let over = (now - deadline).as_secs_f64();
        if over > slice * OVERRUN_TOLERANCE {
            Some(Reason::new(
                ReasonCode::BudgetOverrun,
                format!("phase {} overran its slice by {:.2}s", phase.name(), over),
            ))
        } else {
            None
        }
    }
}

/// Slice of budget handed to a single producer call.
#[derive(Debug, Clone, Copy)]
pub struct PhaseBudget {
    pub deadline: Instant,
    pub max_new_columns: usize,
}

impl PhaseBudget {
    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryPressure {
    Normal,
    /// Approaching the soft cap: column generation backs off.
    Soft,
    /// Hard cap breached: the run aborts with MEMORY_EXCEEDED.
    Hard,
}

/// Estimated working-set gauge. The kernel has no allocator hooks; the pool
/// sizes are estimated from element counts, which is enough to back off
/// column generation before the caps are reached.
#[derive(Debug, Clone, Copy)]
pub struct MemoryGauge {
    pub soft_cap_bytes: u64,
    pub hard_cap_bytes: u64,
}

impl Default for MemoryGauge {
    fn default() -> Self {
        MemoryGauge {
            soft_cap_bytes: 256 * 1024 * 1024,
            hard_cap_bytes: 1024 * 1024 * 1024,
        }
    }
}

impl MemoryGauge {
    pub fn pressure(&self, estimated_bytes: u64) -> MemoryPressure {
        if estimated_bytes >= self.hard_cap_bytes {
            MemoryPressure::Hard
        } else if estimated_bytes >= self.soft_cap_bytes / 2 {
            MemoryPressure::Soft
        } else {
            MemoryPressure::Normal
        }
    }
}
