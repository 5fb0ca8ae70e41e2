use crate::model::column::{ColumnIdx, DriverType};
use crate::model::plan::Kpis;
use crate::model::tour::{TourIdx, TourList};
use crate::solver::block_builder::BlockPool;
use crate::solver::lower_bound::fleet_peak;
use crate::solver::pool::ColumnPool;
use crate::solver::rules::{RuleSet, RuleViolation};
use crate::solver::time::gap_between_tours;
use log::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The plan is rejected; the kernel fails closed.
    Block,
    Warn,
}

#[derive(Debug, Clone)]
pub struct Violation {
    pub severity: Severity,
    pub code: &'static str,
    pub detail: String,
}

impl Violation {
    fn block(code: &'static str, detail: String) -> Violation {
        Violation { severity: Severity::Block, code, detail }
    }
    fn warn(code: &'static str, detail: String) -> Violation {
        Violation { severity: Severity::Warn, code, detail }
    }
}

/// Post-hoc validation of the selected solution, independent of the solver
/// path that produced it. Overlaps, unassigned tours and 11h-rest breaches
/// are BLOCK severity; span, hour-window and fatigue findings are WARN.
pub fn validate(
    tours: &TourList,
    blocks: &BlockPool,
    pool: &ColumnPool,
    selected: &[ColumnIdx],
    rules: &RuleSet,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    // Coverage recount: every tour in exactly one selected column.
    let mut cover_count = vec![0usize; tours.len()];
    for &c in selected {
        for &t in pool.column(c).tour_idxs.iter() {
            cover_count[t as usize] += 1;
        }
    }
    for (t, &count) in cover_count.iter().enumerate() {
        let id = &tours.get(t as TourIdx).id;
        if count == 0 {
            violations.push(Violation::block("UNASSIGNED", format!("tour {id} is not assigned")));
        } else if count > 1 {
            violations.push(Violation::block(
                "OVERLAP",
                format!("tour {id} is assigned {count} times"),
            ));
        }
    }

    for &c in selected {
        let column = pool.column(c);
        for (i, &b) in column.block_idxs.iter().enumerate() {
            let block = blocks.block(b);
            // Re-derive the block-level invariants.
            if block.span_min > rules.span_limit(block.zone) {
                violations.push(Violation::warn(
                    RuleViolation::Span.code(),
                    format!("block {} spans {} minutes", block.id, block.span_min),
                ));
            }
            for pair in block.tour_idxs.windows(2) {
                let gap = gap_between_tours(tours.get(pair[0]), tours.get(pair[1]));
                if gap < 0 {
                    violations.push(Violation::block(
                        RuleViolation::Overlap.code(),
                        format!("block {} glues overlapping tours", block.id),
                    ));
                } else if rules.pause_zone(gap).is_none() {
                    violations.push(Violation::warn(
                        RuleViolation::PauseZone.code(),
                        format!("block {} has a {}-minute gap outside the legal zones", block.id, gap),
                    ));
                }
            }
            if i == 0 {
                continue;
            }
            let prev = blocks.block(column.block_idxs[i - 1]);
            match rules.chain_violation(prev, block) {
                None => {}
                Some(RuleViolation::Rest11h) | Some(RuleViolation::Overlap) => {
                    violations.push(Violation::block(
                        RuleViolation::Rest11h.code(),
                        format!("rest between {} and {} is below 11h", prev.id, block.id),
                    ));
                }
                Some(violation) => {
                    violations.push(Violation::warn(
                        violation.code(),
                        format!("fatigue pattern between {} and {}", prev.id, block.id),
                    ));
                }
            }
        }
        if column.work_min > rules.weekly_cap_min {
            violations.push(Violation::warn(
                RuleViolation::WeeklyCap.code(),
                format!("column works {} minutes over the weekly cap", column.work_min),
            ));
        } else {
            // Driver-type hour windows are soft breaches.
            let ceiling = match rules.driver_type(column.work_min) {
                DriverType::Fte => rules.fte_max_min,
                DriverType::Pt => rules.pt_max_min,
            };
            if column.work_min > ceiling {
                violations.push(Violation::warn(
                    RuleViolation::WeeklyCap.code(),
                    format!(
                        "column works {} minutes, above its {}-minute hour window",
                        column.work_min, ceiling
                    ),
                ));
            }
        }
    }

    for violation in &violations {
        match violation.severity {
            Severity::Block => error!("BLOCK violation [{}]: {}", violation.code, violation.detail),
            Severity::Warn => warn!("WARN violation [{}]: {}", violation.code, violation.detail),
        }
    }
    violations
}

pub fn has_block_violation(violations: &[Violation]) -> bool {
    violations.iter().any(|v| v.severity == Severity::Block)
}

/// KPIs recomputed from the selected columns, not from solver by-products.
pub fn compute_kpis(
    tours: &TourList,
    blocks: &BlockPool,
    pool: &ColumnPool,
    selected: &[ColumnIdx],
    rules: &RuleSet,
) -> Kpis {
    let mut kpis = Kpis::default();
    kpis.tours_total = tours.len();
    kpis.drivers_total = selected.len();
    kpis.hours_histogram = vec![0; 12];

    let mut driver_hours: Vec<f64> = Vec::with_capacity(selected.len());
    let mut assigned = 0usize;
    for &c in selected {
        let column = pool.column(c);
        assigned += column.tour_idxs.len();
        let hours = column.hours();
        driver_hours.push(hours);
        kpis.total_hours += hours;
        match rules.driver_type(column.work_min) {
            DriverType::Fte => kpis.fte_count += 1,
            DriverType::Pt => {
                kpis.pt_count += 1;
                kpis.pt_hours_total += hours;
            }
        }
        let bucket = ((hours / 5.0).floor() as usize).min(11);
        kpis.hours_histogram[bucket] += 1;
        for &b in column.block_idxs.iter() {
            match blocks.block(b).tours_count() {
                1 => kpis.blocks_1er += 1,
                2 => kpis.blocks_2er += 1,
                _ => kpis.blocks_3er += 1,
            }
        }
    }
    kpis.tours_assigned = assigned;
    if kpis.total_hours > 0.0 {
        kpis.pt_share_hours_pct = (kpis.pt_hours_total / kpis.total_hours * 100.0 * 100.0).round() / 100.0;
    }
    let (peak, by_day) = fleet_peak(tours.iter());
    kpis.fleet_peak = peak;
    kpis.fleet_peak_by_day = by_day.to_vec();
    kpis.gini_hours = gini(&mut driver_hours);
    kpis
}

/// Gini coefficient of the driver-hours distribution, 0 when empty or even.
fn gini(hours: &mut [f64]) -> f64 {
    let n = hours.len();
    let total: f64 = hours.iter().sum();
    if n == 0 || total <= 0.0 {
        return 0.0;
    }
    hours.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let weighted: f64 = hours
        .iter()
        .enumerate()
        .map(|(i, h)| (i + 1) as f64 * h)
        .sum();
    let n = n as f64;
    ((2.0 * weighted) / (n * total) - (n + 1.0) / n).max(0.0)
}
